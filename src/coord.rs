use crate::num::Int;
use crate::tuple::IntTuple;

/// Map a coordinate to a linear index: the leaf-wise inner product of the
/// coordinate against the stride.
///
/// Accepts three coordinate views, all yielding the same image:
/// - a single integer, colexicographically decomposed by `shape` first,
/// - an R-D coordinate (one integer per top-level mode),
/// - a fully hierarchical coordinate matching `shape`'s tree.
pub fn crd2idx(crd: &IntTuple, shape: &IntTuple, stride: &IntTuple) -> Int {
    match (crd, shape, stride) {
        (IntTuple::Int(c), IntTuple::Int(_), IntTuple::Int(d)) => *c * *d,
        (IntTuple::Int(c), IntTuple::Tuple(ss), IntTuple::Tuple(dd)) => {
            // colexicographic peel; the final mode absorbs any excess
            let mut acc = Int::ZERO;
            let mut rem = *c;
            for (i, (s, d)) in ss.iter().zip(dd).enumerate() {
                let n = s.size();
                let c_i = if i + 1 == ss.len() { rem } else { rem % n };
                acc = acc + crd2idx(&IntTuple::Int(c_i), s, d);
                rem = rem / n;
            }
            acc
        }
        (IntTuple::Tuple(cs), IntTuple::Tuple(ss), IntTuple::Tuple(dd))
            if cs.len() == ss.len() =>
        {
            cs.iter()
                .zip(ss)
                .zip(dd)
                .fold(Int::ZERO, |acc, ((c, s), d)| acc + crd2idx(c, s, d))
        }
        _ => panic!("coordinate {} does not match shape {}", crd, shape),
    }
}

/// Map a 1-D index to the natural (hierarchical) coordinate of `shape`,
/// in colexicographic order.
pub fn idx2crd(idx: Int, shape: &IntTuple) -> IntTuple {
    let stride = compact_col_major(shape);
    idx2crd_with_stride(idx, shape, &stride)
}

fn idx2crd_with_stride(idx: Int, shape: &IntTuple, stride: &IntTuple) -> IntTuple {
    match (shape, stride) {
        (IntTuple::Int(s), IntTuple::Int(d)) => IntTuple::Int((idx / *d) % *s),
        (IntTuple::Tuple(ss), IntTuple::Tuple(dd)) => IntTuple::Tuple(
            ss.iter()
                .zip(dd)
                .map(|(s, d)| idx2crd_with_stride(idx, s, d))
                .collect(),
        ),
        _ => panic!("shape {} and stride {} are not congruent", shape, stride),
    }
}

/// Convert a coordinate between two shapes of equal size through the
/// shared 1-D index.
pub fn crd2crd(crd: &IntTuple, from: &IntTuple, to: &IntTuple) -> IntTuple {
    debug_assert_eq!(from.size().value(), to.size().value());
    let stride = compact_col_major(from);
    idx2crd(crd2idx(crd, from, &stride), to)
}

/// Compact column-major strides: the flattened pair reads
/// `(s₁,s₂,…,sₙ):(1, s₁, s₁s₂, …)`, with the tree structure preserved.
pub fn compact_col_major(shape: &IntTuple) -> IntTuple {
    compact_col_major_from(shape, Int::ONE)
}

fn compact_col_major_from(shape: &IntTuple, current: Int) -> IntTuple {
    match shape {
        IntTuple::Int(_) => IntTuple::Int(current),
        IntTuple::Tuple(ss) => {
            let mut strides = Vec::with_capacity(ss.len());
            let mut cur = current;
            for s in ss {
                strides.push(compact_col_major_from(s, cur));
                cur = cur * s.size();
            }
            IntTuple::Tuple(strides)
        }
    }
}

/// Compact row-major strides: the reversed cumulative product, with the
/// tree structure preserved.
pub fn compact_row_major(shape: &IntTuple) -> IntTuple {
    let flat = shape.flatten();
    let mut strides = Vec::with_capacity(flat.len());
    let mut cur = Int::ONE;
    for s in flat.iter().rev() {
        strides.push(cur);
        cur = cur * *s;
    }
    strides.reverse();
    reshape_flat(&strides, shape)
}

/// Rebuild a tree with `shape`'s structure from a flat leaf sequence
pub(crate) fn reshape_flat(flat: &[Int], shape: &IntTuple) -> IntTuple {
    let mut pos = 0;
    let out = reshape_flat_at(flat, shape, &mut pos);
    debug_assert_eq!(pos, flat.len());
    out
}

fn reshape_flat_at(flat: &[Int], shape: &IntTuple, pos: &mut usize) -> IntTuple {
    match shape {
        IntTuple::Int(_) => {
            let v = flat[*pos];
            *pos += 1;
            IntTuple::Int(v)
        }
        IntTuple::Tuple(ss) => IntTuple::Tuple(
            ss.iter()
                .map(|s| reshape_flat_at(flat, s, pos))
                .collect(),
        ),
    }
}

/// Compact strides where leaves are filled in ascending `order`, ties
/// broken by flattened position. `order` must be weakly congruent to
/// `shape`: an integer order entry covers its whole subtree.
pub fn compact_order(shape: &IntTuple, order: &IntTuple) -> IntTuple {
    let shapes = shape.flatten();
    let keys = flatten_order(shape, order);
    let mut by_key: Vec<usize> = (0..shapes.len()).collect();
    by_key.sort_by_key(|&i| (keys[i], i));

    let mut strides = vec![Int::ZERO; shapes.len()];
    let mut cur = Int::ONE;
    for &i in &by_key {
        strides[i] = cur;
        cur = cur * shapes[i];
    }
    reshape_flat(&strides, shape)
}

fn flatten_order(shape: &IntTuple, order: &IntTuple) -> Vec<i64> {
    match (shape, order) {
        (_, IntTuple::Int(k)) => vec![k.value(); shape.leaf_count()],
        (IntTuple::Tuple(ss), IntTuple::Tuple(oo)) if ss.len() == oo.len() => ss
            .iter()
            .zip(oo)
            .flat_map(|(s, o)| flatten_order(s, o))
            .collect(),
        _ => panic!("order {} is not weakly congruent to shape {}", order, shape),
    }
}
