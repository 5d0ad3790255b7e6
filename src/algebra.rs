//! The layout algebra: coalesce, filter, composition, complement,
//! products, divisions, inverses and element-type recasting.
//!
//! Every operation preserves shape/stride congruence and, on fully static
//! inputs, produces fully static results. Fallible operations surface
//! non-divisible static operands as [`LayoutError::Divisibility`].

use itertools::Itertools;

use crate::error::LayoutError;
use crate::layout::{make_layout, Layout};
use crate::num::{shape_div, Int};
use crate::tuple::IntTuple;

/* ============================================================
   Flat-mode helpers
   ============================================================ */

fn flat_modes(l: &Layout) -> Vec<(Int, Int)> {
    l.shape()
        .flatten()
        .into_iter()
        .zip(l.stride().flatten())
        .collect()
}

fn modes_to_tuples(modes: Vec<(Int, Int)>) -> (IntTuple, IntTuple) {
    match modes.len() {
        0 => (IntTuple::int(1), IntTuple::int(0)),
        1 => (IntTuple::Int(modes[0].0), IntTuple::Int(modes[0].1)),
        _ => {
            let (shapes, strides): (Vec<Int>, Vec<Int>) = modes.into_iter().unzip();
            (
                IntTuple::Tuple(shapes.into_iter().map(IntTuple::Int).collect()),
                IntTuple::Tuple(strides.into_iter().map(IntTuple::Int).collect()),
            )
        }
    }
}

fn modes_to_layout(modes: Vec<(Int, Int)>) -> Layout {
    let (shape, stride) = modes_to_tuples(modes);
    Layout::new(shape, stride)
}

/// Right-to-left coalescing fold over flat modes: size-1 modes drop,
/// adjacent modes fuse when `sᵢ·dᵢ == dⱼ`.
fn bw_coalesce(modes: &[(Int, Int)]) -> Vec<(Int, Int)> {
    let mut out: Vec<(Int, Int)> = Vec::new();
    for &(s, d) in modes.iter().rev() {
        if s.value() == 1 {
            continue;
        }
        match out.first().copied() {
            Some((hs, hd)) if (s * d).value() == hd.value() => {
                out[0] = (s * hs, d);
            }
            _ => out.insert(0, (s, d)),
        }
    }
    out
}

fn unit_layout() -> Layout {
    Layout::new(IntTuple::int(1), IntTuple::int(0))
}

/* ============================================================
   Coalesce & filter
   ============================================================ */

/// Smallest layout with the same function on `[0, size)`
pub fn coalesce(l: &Layout) -> Layout {
    modes_to_layout(bw_coalesce(&flat_modes(l)))
}

/// Coalesce per top-level mode, stopping at the boundaries the profile
/// demands: an integer profile entry coalesces the whole sub-layout, a
/// tuple entry recurses.
pub fn coalesce_profile(l: &Layout, profile: &IntTuple) -> Layout {
    match profile {
        IntTuple::Int(_) => coalesce(l),
        IntTuple::Tuple(ps) => {
            assert_eq!(
                ps.len(),
                l.rank(),
                "coalesce profile rank {} does not match layout rank {}",
                ps.len(),
                l.rank()
            );
            let parts: Vec<Layout> = ps
                .iter()
                .enumerate()
                .map(|(i, p)| coalesce_profile(&l.mode(i), p))
                .collect();
            let refs: Vec<&Layout> = parts.iter().collect();
            make_layout(&refs)
        }
    }
}

/// Replace every stride-0 mode's shape with 1
pub fn filter_zeros(l: &Layout) -> Layout {
    fn recur(shape: &IntTuple, stride: &IntTuple) -> (IntTuple, IntTuple) {
        match (shape, stride) {
            (IntTuple::Int(s), IntTuple::Int(d)) => {
                if d.value() == 0 {
                    (IntTuple::Int(Int::like(1, *s, *s)), IntTuple::Int(*d))
                } else {
                    (IntTuple::Int(*s), IntTuple::Int(*d))
                }
            }
            (IntTuple::Tuple(ss), IntTuple::Tuple(dd)) => {
                let (shapes, strides) = ss
                    .iter()
                    .zip(dd)
                    .map(|(s, d)| recur(s, d))
                    .unzip();
                (IntTuple::Tuple(shapes), IntTuple::Tuple(strides))
            }
            _ => unreachable!("congruence is a layout invariant"),
        }
    }
    let (shape, stride) = recur(l.shape(), l.stride());
    Layout::new(shape, stride)
}

/// `coalesce(filter_zeros(l))`
pub fn filter(l: &Layout) -> Layout {
    coalesce(&filter_zeros(l))
}

/* ============================================================
   Composition
   ============================================================ */

/// Compose one flat right-hand mode `(s : d)` against the flattened,
/// coalesced left operand: skip `d` positions, then take `s`.
fn compose_leaf(a: &[(Int, Int)], s: Int, d: Int) -> Result<Vec<(Int, Int)>, LayoutError> {
    if d.value() == 0 {
        return Ok(vec![(s, d)]);
    }

    let mut modes = a.to_vec();
    let mut i = 0usize;
    let mut rest = d;
    while rest.value() > 1 {
        if i >= modes.len() {
            // d lands past the end of A's domain
            return Err(LayoutError::Divisibility {
                num: d,
                den: a.iter().fold(Int::ONE, |p, &(s, _)| p * s),
            });
        }
        let (ai, bi) = modes[i];
        if ai.value() <= rest.value() {
            rest = shape_div(rest, ai)?;
            i += 1;
        } else {
            let q = shape_div(ai, rest)?;
            modes[i] = (q, bi * rest);
            rest = Int::ONE;
        }
    }

    let mut out: Vec<(Int, Int)> = Vec::new();
    let mut rem = s;
    let mut j = i;
    while rem.value() > 1 && j < modes.len() {
        let (aj, bj) = modes[j];
        if aj.value() >= rem.value() {
            out.push((rem, bj));
            rem = Int::ONE;
        } else {
            out.push((aj, bj));
            rem = shape_div(rem, aj)?;
        }
        j += 1;
    }
    if rem.value() > 1 {
        // past A's extent the final mode keeps stepping with its own stride
        match out.last_mut() {
            Some(last) => last.0 = last.0 * rem,
            None => {
                let &(al, bl) = a.last().expect("layout has at least one mode");
                out.push((rem, al * bl));
            }
        }
    }
    Ok(out)
}

fn compose_tuple(
    a: &[(Int, Int)],
    bs: &IntTuple,
    bd: &IntTuple,
) -> Result<(IntTuple, IntTuple), LayoutError> {
    match (bs, bd) {
        (IntTuple::Int(s), IntTuple::Int(d)) => {
            let modes = bw_coalesce(&compose_leaf(a, *s, *d)?);
            Ok(modes_to_tuples(modes))
        }
        (IntTuple::Tuple(ss), IntTuple::Tuple(dd)) => {
            let mut shapes = Vec::with_capacity(ss.len());
            let mut strides = Vec::with_capacity(ss.len());
            for (s, d) in ss.iter().zip(dd) {
                let (rs, rd) = compose_tuple(a, s, d)?;
                shapes.push(rs);
                strides.push(rd);
            }
            Ok((IntTuple::Tuple(shapes), IntTuple::Tuple(strides)))
        }
        _ => unreachable!("congruence is a layout invariant"),
    }
}

/// Functional composition `A ∘ B`: `(A ∘ B)(c) = A(B(c))`, distributing
/// over `B`'s top-level modes so the result refines `B`'s shape.
pub fn composition(a: &Layout, b: &Layout) -> Result<Layout, LayoutError> {
    let a_flat = bw_coalesce(&flat_modes(a));
    let a_flat = if a_flat.is_empty() {
        vec![(Int::ONE, Int::ZERO)]
    } else {
        a_flat
    };
    let (shape, stride) = compose_tuple(&a_flat, b.shape(), b.stride())?;
    Ok(Layout::new(shape, stride))
}

/* ============================================================
   Complement
   ============================================================ */

/// A layout covering `[0, m)` positions the filtered `l` does not reach.
/// `make_layout(l, complement(l, m))` tiles `[0, m)` without overlap.
pub fn complement(l: &Layout, m: Int) -> Result<Layout, LayoutError> {
    let f = filter(l);
    let mut modes = flat_modes(&f);
    if modes.len() == 1 && modes[0].1.value() == 0 {
        // filtered away entirely: the complement is all of [0, m)
        modes.clear();
    }
    let modes: Vec<(Int, Int)> = modes
        .into_iter()
        .sorted_by_key(|&(_, d)| d.value())
        .collect();

    let mut out: Vec<(Int, Int)> = Vec::new();
    let mut reach = Int::ONE;
    for (s, d) in modes {
        let gap = shape_div(d, reach)?;
        out.push((gap, reach));
        reach = s * d;
    }
    out.push((m.ceil_div(reach), reach));
    Ok(modes_to_layout(bw_coalesce(&out)))
}

/// Complement against the layout's own filtered codomain
pub fn complement_full(l: &Layout) -> Result<Layout, LayoutError> {
    let m = filter(l).cosize();
    complement(l, m)
}

/* ============================================================
   Products
   ============================================================ */

/// `logical_product(A, B) = (A, complement(A, size(A)·cosize(B)) ∘ B)`:
/// mode 0 is the block, mode 1 iterates its replications as `B` orders
/// them.
pub fn logical_product(a: &Layout, b: &Layout) -> Result<Layout, LayoutError> {
    let m = a.size() * b.cosize();
    let rest = composition(&complement(a, m)?, b)?;
    Ok(make_layout(&[a, &rest]))
}

fn pad_to_rank(l: &Layout, r: usize) -> Layout {
    let mut modes: Vec<Layout> = (0..l.rank()).map(|i| l.mode(i)).collect();
    while modes.len() < r {
        modes.push(unit_layout());
    }
    let refs: Vec<&Layout> = modes.iter().collect();
    make_layout(&refs)
}

/// Product with the block and its replication zipped per mode: mode `i`
/// of the result is `(block_i, rest_i)`. With `coalesce_result`, each
/// zipped mode is coalesced afterwards.
pub fn blocked_product(a: &Layout, b: &Layout, coalesce_result: bool) -> Result<Layout, LayoutError> {
    let r = a.rank().max(b.rank());
    let p = logical_product(&pad_to_rank(a, r), &pad_to_rank(b, r))?;
    zip_product_modes(&p, r, false, coalesce_result)
}

/// Product with the zip reversed, interleaving the replication inside the
/// block: mode `i` of the result is `(rest_i, block_i)`.
pub fn raked_product(a: &Layout, b: &Layout, coalesce_result: bool) -> Result<Layout, LayoutError> {
    let r = a.rank().max(b.rank());
    let p = logical_product(&pad_to_rank(a, r), &pad_to_rank(b, r))?;
    zip_product_modes(&p, r, true, coalesce_result)
}

fn zip_product_modes(
    p: &Layout,
    r: usize,
    raked: bool,
    coalesce_result: bool,
) -> Result<Layout, LayoutError> {
    let block = p.mode(0);
    let rest = p.mode(1);
    let zipped: Vec<Layout> = (0..r)
        .map(|i| {
            if raked {
                make_layout(&[&rest.mode(i), &block.mode(i)])
            } else {
                make_layout(&[&block.mode(i), &rest.mode(i)])
            }
        })
        .collect();
    let refs: Vec<&Layout> = zipped.iter().collect();
    let out = make_layout(&refs);
    if coalesce_result {
        let profile = IntTuple::Tuple(vec![IntTuple::int(1); r]);
        Ok(coalesce_profile(&out, &profile))
    } else {
        Ok(out)
    }
}

/* ============================================================
   Divisions
   ============================================================ */

/// A tiler selects how a division gathers elements: a single layout for
/// the whole domain, a by-mode tuple (missing or wildcard modes pass
/// through untouched), or a plain shape standing for stride-1 layouts.
#[derive(Debug, Clone, PartialEq)]
pub enum Tiler {
    /// Leave the corresponding mode untouched
    Pass,
    Leaf(Layout),
    Tuple(Vec<Tiler>),
}

impl Tiler {
    /// Interpret a shape as a by-mode tiler of stride-1 layouts
    pub fn from_shape(shape: &IntTuple) -> Tiler {
        match shape {
            IntTuple::Int(s) => Tiler::Leaf(Layout::new(
                IntTuple::Int(*s),
                IntTuple::Int(Int::like(1, *s, *s)),
            )),
            IntTuple::Tuple(ss) => Tiler::Tuple(
                ss.iter()
                    .map(|s| {
                        let n = s.size();
                        Tiler::Leaf(Layout::new(IntTuple::Int(n), IntTuple::Int(Int::like(1, n, n))))
                    })
                    .collect(),
            ),
        }
    }
}

impl From<Layout> for Tiler {
    fn from(l: Layout) -> Tiler {
        Tiler::Leaf(l)
    }
}

/// `logical_divide(L, tile) = L ∘ (tile, complement(tile, size(L)))`:
/// per divided mode, sub-mode 0 walks inside one tile and sub-mode 1
/// walks across tiles.
pub fn logical_divide(l: &Layout, tiler: &Tiler) -> Result<Layout, LayoutError> {
    match tiler {
        Tiler::Pass => Ok(l.clone()),
        Tiler::Leaf(t) => {
            let comp = complement(t, l.size())?;
            composition(l, &make_layout(&[t, &comp]))
        }
        Tiler::Tuple(ts) => {
            if ts.len() > l.rank() {
                return Err(LayoutError::RankMismatch {
                    layout: l.rank(),
                    tile: ts.len(),
                });
            }
            let modes: Vec<Layout> = (0..l.rank())
                .map(|i| {
                    if i < ts.len() {
                        logical_divide(&l.mode(i), &ts[i])
                    } else {
                        Ok(l.mode(i))
                    }
                })
                .collect::<Result<_, _>>()?;
            let refs: Vec<&Layout> = modes.iter().collect();
            Ok(make_layout(&refs))
        }
    }
}

/// Division reshaped so mode 0 gathers the inside-tile axes and mode 1
/// gathers the across-tiles axes (untouched modes join mode 1).
pub fn zipped_divide(l: &Layout, tiler: &Tiler) -> Result<Layout, LayoutError> {
    match tiler {
        Tiler::Pass => logical_divide(l, tiler),
        Tiler::Leaf(_) => logical_divide(l, tiler),
        Tiler::Tuple(ts) => {
            if ts.len() > l.rank() {
                return Err(LayoutError::RankMismatch {
                    layout: l.rank(),
                    tile: ts.len(),
                });
            }
            let mut tiles: Vec<Layout> = Vec::new();
            let mut rests: Vec<Layout> = Vec::new();
            for i in 0..l.rank() {
                match ts.get(i) {
                    Some(Tiler::Pass) | None => rests.push(l.mode(i)),
                    Some(t) => {
                        let ld = logical_divide(&l.mode(i), t)?;
                        tiles.push(ld.mode(0));
                        rests.push(ld.mode(1));
                    }
                }
            }
            let tile_refs: Vec<&Layout> = tiles.iter().collect();
            let rest_refs: Vec<&Layout> = rests.iter().collect();
            let tile = make_layout(&tile_refs);
            let rest = make_layout(&rest_refs);
            Ok(make_layout(&[&tile, &rest]))
        }
    }
}

/// Like `zipped_divide`, with the across-tiles mode unpacked into its
/// per-mode components: `((tile…), rest₁, rest₂, …)`.
pub fn tiled_divide(l: &Layout, tiler: &Tiler) -> Result<Layout, LayoutError> {
    let z = zipped_divide(l, tiler)?;
    let rest = z.mode(1);
    let mut modes: Vec<Layout> = vec![z.mode(0)];
    for i in 0..rest.rank() {
        modes.push(rest.mode(i));
    }
    let refs: Vec<&Layout> = modes.iter().collect();
    Ok(make_layout(&refs))
}

/// Fully unpacked division: `(tile₁, tile₂, …, rest₁, rest₂, …)`
pub fn flat_divide(l: &Layout, tiler: &Tiler) -> Result<Layout, LayoutError> {
    let z = zipped_divide(l, tiler)?;
    let tile = z.mode(0);
    let rest = z.mode(1);
    let mut modes: Vec<Layout> = (0..tile.rank()).map(|i| tile.mode(i)).collect();
    for i in 0..rest.rank() {
        modes.push(rest.mode(i));
    }
    let refs: Vec<&Layout> = modes.iter().collect();
    Ok(make_layout(&refs))
}

/// Reshape `l` to `shape` without changing the function: composition
/// with the compact column-major identity of `shape`.
pub fn with_shape(l: &Layout, shape: &IntTuple) -> Result<Layout, LayoutError> {
    debug_assert_eq!(l.size().value(), shape.size().value());
    composition(l, &Layout::col_major(shape.clone()))
}

/* ============================================================
   Inverses
   ============================================================ */

/// Layout `R` with `L(R(i)) = i` on the longest stride-chained prefix of
/// `L`'s sorted modes; `(1:0)` when `L` has no unit-stride mode.
pub fn right_inverse(l: &Layout) -> Layout {
    let f = filter(l);
    let modes = flat_modes(&f);
    if modes.len() == 1 && modes[0].1.value() == 0 {
        return unit_layout();
    }

    // prefix products of the flattened shapes locate each mode in the
    // colexicographic domain
    let mut prefix = Vec::with_capacity(modes.len());
    let mut acc = Int::ONE;
    for &(s, _) in &modes {
        prefix.push(acc);
        acc = acc * s;
    }

    let order: Vec<usize> = (0..modes.len())
        .sorted_by_key(|&i| modes[i].1.value().abs())
        .collect();

    let mut out: Vec<(Int, Int)> = Vec::new();
    let mut next = 1i64;
    for &i in &order {
        let (s, d) = modes[i];
        if d.value().abs() != next {
            break;
        }
        out.push((s, prefix[i] * d.signum()));
        next = d.value().abs() * s.value();
    }
    if out.is_empty() {
        return unit_layout();
    }
    modes_to_layout(bw_coalesce(&out))
}

/// `left_inverse(L) = right_inverse((L, complement(L)))`: a left inverse
/// on `L`'s image when `L` is injective.
pub fn left_inverse(l: &Layout) -> Result<Layout, LayoutError> {
    let c = complement_full(l)?;
    Ok(right_inverse(&make_layout(&[l, &c])))
}

/* ============================================================
   Common vectorization width
   ============================================================ */

/// Largest common stride-1 prefix of two static layouts, as a layout:
/// `coalesce(A ∘ right_inverse(B))` when its head stride is 1, else
/// `(1:0)`. Dynamic inputs get no vectorization guarantee.
pub fn max_common_layout(a: &Layout, b: &Layout) -> Layout {
    if !a.is_static() || !b.is_static() {
        return unit_layout();
    }
    let inv = right_inverse(b);
    let common = match composition(a, &inv) {
        Ok(c) => coalesce(&c),
        Err(_) => return unit_layout(),
    };
    let head = flat_modes(&common)[0];
    if head.1.value() == 1 {
        modes_to_layout(vec![head])
    } else {
        unit_layout()
    }
}

/// Vector width usable for moving data between the two layouts
pub fn max_common_vector(a: &Layout, b: &Layout) -> i64 {
    max_common_layout(a, b).size().value()
}

/* ============================================================
   Element-type recasting
   ============================================================ */

/// The same byte addresses under elements `m×` larger: the stride-1
/// mode's shape shrinks by `m`, every other stride divides by `m`.
pub fn upcast(l: &Layout, m: i64) -> Result<Layout, LayoutError> {
    let m = Int::st(m);
    fn recur(shape: &IntTuple, stride: &IntTuple, m: Int) -> Result<(IntTuple, IntTuple), LayoutError> {
        match (shape, stride) {
            (IntTuple::Int(s), IntTuple::Int(d)) => {
                if d.value() == 0 {
                    Ok((IntTuple::Int(*s), IntTuple::Int(*d)))
                } else if d.value().abs() == 1 {
                    Ok((IntTuple::Int(shape_div(*s, m)?), IntTuple::Int(*d)))
                } else {
                    Ok((IntTuple::Int(*s), IntTuple::Int(shape_div(*d, m)?)))
                }
            }
            (IntTuple::Tuple(ss), IntTuple::Tuple(dd)) => {
                let mut shapes = Vec::with_capacity(ss.len());
                let mut strides = Vec::with_capacity(ss.len());
                for (s, d) in ss.iter().zip(dd) {
                    let (rs, rd) = recur(s, d, m)?;
                    shapes.push(rs);
                    strides.push(rd);
                }
                Ok((IntTuple::Tuple(shapes), IntTuple::Tuple(strides)))
            }
            _ => unreachable!("congruence is a layout invariant"),
        }
    }
    let (shape, stride) = recur(l.shape(), l.stride(), m)?;
    Ok(Layout::new(shape, stride))
}

/// The inverse of [`upcast`]: elements `n×` smaller, the stride-1 mode's
/// shape grows by `n`, every other stride multiplies by `n`.
pub fn downcast(l: &Layout, n: i64) -> Result<Layout, LayoutError> {
    let n = Int::st(n);
    fn recur(shape: &IntTuple, stride: &IntTuple, n: Int) -> (IntTuple, IntTuple) {
        match (shape, stride) {
            (IntTuple::Int(s), IntTuple::Int(d)) => {
                if d.value() == 0 {
                    (IntTuple::Int(*s), IntTuple::Int(*d))
                } else if d.value().abs() == 1 {
                    (IntTuple::Int(*s * n), IntTuple::Int(*d))
                } else {
                    (IntTuple::Int(*s), IntTuple::Int(*d * n))
                }
            }
            (IntTuple::Tuple(ss), IntTuple::Tuple(dd)) => {
                let (shapes, strides) = ss.iter().zip(dd).map(|(s, d)| recur(s, d, n)).unzip();
                (IntTuple::Tuple(shapes), IntTuple::Tuple(strides))
            }
            _ => unreachable!("congruence is a layout invariant"),
        }
    }
    let (shape, stride) = recur(l.shape(), l.stride(), n);
    Ok(Layout::new(shape, stride))
}

/// Dispatch to [`upcast`] / [`downcast`] / identity by the element-size
/// ratio; sizes must be whole multiples of each other.
pub fn recast_layout(l: &Layout, new_size: usize, old_size: usize) -> Result<Layout, LayoutError> {
    if new_size == old_size {
        Ok(l.clone())
    } else if old_size % new_size == 0 {
        downcast(l, (old_size / new_size) as i64)
    } else if new_size % old_size == 0 {
        upcast(l, (new_size / old_size) as i64)
    } else {
        Err(LayoutError::Recast { new_size, old_size })
    }
}
