use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::coord::{compact_col_major, compact_order, compact_row_major, crd2idx, idx2crd};
use crate::error::LayoutError;
use crate::num::Int;
use crate::tuple::{congruent, IntTuple};

/// Layout = mapping from coordinates → linear index.
///
/// A layout is a pair of congruent hierarchical tuples: a shape (every
/// leaf ≥ 1) and a stride (every leaf ≥ 0; stride 0 encodes a broadcast
/// mode). Coordinates and the returned index are 0-based.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Layout {
    shape: IntTuple,
    stride: IntTuple,
}

/// Stride-generation policy for compact layouts
pub trait LayoutPolicy {
    fn make_stride(shape: &IntTuple) -> IntTuple;
}

/// Column-major policy: leftmost mode fastest
pub struct ColMajor;

/// Row-major policy: rightmost mode fastest
pub struct RowMajor;

impl LayoutPolicy for ColMajor {
    fn make_stride(shape: &IntTuple) -> IntTuple {
        compact_col_major(shape)
    }
}

impl LayoutPolicy for RowMajor {
    fn make_stride(shape: &IntTuple) -> IntTuple {
        compact_row_major(shape)
    }
}

impl Layout {
    /// Create a layout from congruent shape and stride trees.
    ///
    /// Panics when the trees differ in structure, a shape leaf is < 1, or
    /// a stride leaf is negative (negative strides are rejected up front;
    /// the algebra does not compose them).
    pub fn new(shape: IntTuple, stride: IntTuple) -> Self {
        assert!(
            congruent(&shape, &stride),
            "{}",
            LayoutError::ShapeMismatch {
                shape: shape.clone(),
                stride: stride.clone()
            }
        );
        assert!(
            shape.flatten().iter().all(|s| s.value() >= 1),
            "shape {} has a leaf < 1",
            shape
        );
        assert!(
            stride.flatten().iter().all(|d| d.value() >= 0),
            "stride {} has a negative leaf",
            stride
        );
        Self { shape, stride }
    }

    /// Compact layout under the given stride policy
    pub fn compact<P: LayoutPolicy>(shape: IntTuple) -> Self {
        let stride = P::make_stride(&shape);
        Self::new(shape, stride)
    }

    pub fn col_major(shape: IntTuple) -> Self {
        Self::compact::<ColMajor>(shape)
    }

    pub fn row_major(shape: IntTuple) -> Self {
        Self::compact::<RowMajor>(shape)
    }

    pub fn shape(&self) -> &IntTuple {
        &self.shape
    }

    pub fn stride(&self) -> &IntTuple {
        &self.stride
    }

    /// Number of top-level modes; a single-integer layout has rank 1
    pub fn rank(&self) -> usize {
        match &self.shape {
            IntTuple::Int(_) => 1,
            IntTuple::Tuple(v) => v.len(),
        }
    }

    pub fn depth(&self) -> usize {
        self.shape.depth()
    }

    /// Cardinality of the coordinate domain
    pub fn size(&self) -> Int {
        self.shape.size()
    }

    /// `L(size − 1) + 1`: least upper bound of the image
    pub fn cosize(&self) -> Int {
        let n = self.size();
        if n.value() == 0 {
            return Int::ZERO;
        }
        self.call(&IntTuple::Int(n - Int::ONE)) + Int::ONE
    }

    /// True when every shape and stride leaf is compile-time static
    pub fn is_static(&self) -> bool {
        self.shape.is_static() && self.stride.is_static()
    }

    /// Evaluate the layout at a coordinate (1-D, R-D or hierarchical)
    pub fn call(&self, crd: &IntTuple) -> Int {
        crd2idx(crd, &self.shape, &self.stride)
    }

    /// Evaluate at a 1-D index, in colexicographic order
    pub fn call_1d(&self, idx: i64) -> i64 {
        debug_assert!(
            idx >= 0 && idx < self.size().value().max(1),
            "{}",
            LayoutError::OutOfBounds {
                index: idx,
                size: self.size().value()
            }
        );
        self.call(&IntTuple::Int(Int::dy(idx))).value()
    }

    /// Natural coordinate of a 1-D index
    pub fn get_hier_coord(&self, idx: i64) -> IntTuple {
        idx2crd(Int::dy(idx), &self.shape)
    }

    /// Sublayout for top-level mode `i`; a leaf layout is its own mode 0
    pub fn mode(&self, i: usize) -> Layout {
        Layout {
            shape: self.shape.modes()[i].clone(),
            stride: self.stride.modes()[i].clone(),
        }
    }

    /// Iterate over the top-level sublayouts
    pub fn modes(&self) -> impl Iterator<Item = Layout> + '_ {
        (0..self.rank()).map(|i| self.mode(i))
    }

    /// Nested sublayout along a path of mode indices
    pub fn layout_at(&self, path: &[usize]) -> Layout {
        let mut out = self.clone();
        for &i in path {
            out = out.mode(i);
        }
        out
    }

    /// Select specific top-level modes by index
    pub fn select(&self, idxs: &[usize]) -> Layout {
        Layout {
            shape: IntTuple::Tuple(idxs.iter().map(|&i| self.shape.modes()[i].clone()).collect()),
            stride: IntTuple::Tuple(
                idxs.iter().map(|&i| self.stride.modes()[i].clone()).collect(),
            ),
        }
    }

    /// Take the mode range `[b, e)`
    pub fn take(&self, b: usize, e: usize) -> Layout {
        let idxs: Vec<usize> = (b..e).collect();
        self.select(&idxs)
    }

    /// Swap the two modes of a rank-2 layout
    pub fn transpose(&self) -> Layout {
        assert_eq!(self.rank(), 2, "transpose requires a rank-2 layout");
        self.select(&[1, 0])
    }

    /// Append `other` as a new trailing mode
    pub fn append(&self, other: &Layout) -> Layout {
        let mut shapes = self.shape.modes().to_vec();
        let mut strides = self.stride.modes().to_vec();
        shapes.push(other.shape.clone());
        strides.push(other.stride.clone());
        Layout {
            shape: IntTuple::Tuple(shapes),
            stride: IntTuple::Tuple(strides),
        }
    }

    /// Prepend `other` as a new leading mode
    pub fn prepend(&self, other: &Layout) -> Layout {
        let mut shapes = vec![other.shape.clone()];
        let mut strides = vec![other.stride.clone()];
        shapes.extend(self.shape.modes().to_vec());
        strides.extend(self.stride.modes().to_vec());
        Layout {
            shape: IntTuple::Tuple(shapes),
            stride: IntTuple::Tuple(strides),
        }
    }

    /// Replace mode `i` with `other`
    pub fn replace(&self, i: usize, other: &Layout) -> Layout {
        Layout {
            shape: self.shape.replace(other.shape.clone(), i),
            stride: self.stride.replace(other.stride.clone(), i),
        }
    }

    /// Group modes `[b, e)` into one nested mode
    pub fn group(&self, b: usize, e: usize) -> Layout {
        Layout {
            shape: self.shape.group(b, e),
            stride: self.stride.group(b, e),
        }
    }

    /// Flatten the tree into a single-level layout
    pub fn flatten(&self) -> Layout {
        let shapes = self.shape.flatten();
        let strides = self.stride.flatten();
        if shapes.len() == 1 {
            return Layout {
                shape: IntTuple::Int(shapes[0]),
                stride: IntTuple::Int(strides[0]),
            };
        }
        Layout {
            shape: IntTuple::Tuple(shapes.into_iter().map(IntTuple::Int).collect()),
            stride: IntTuple::Tuple(strides.into_iter().map(IntTuple::Int).collect()),
        }
    }

    /// Keep the modes where `crd` holds a wildcard, dropping the rest
    pub fn slice(&self, crd: &Crd) -> Layout {
        self.slice_and_offset(crd).0
    }

    /// Slice plus the linear offset of the sliced origin:
    /// `offset = L(crd with wildcards replaced by 0)`.
    pub fn slice_and_offset(&self, crd: &Crd) -> (Layout, i64) {
        let mut offset = Int::ZERO;
        let sliced = slice_impl(crd, &self.shape, &self.stride, &mut offset, self);
        let layout = match sliced {
            Some((shape, stride)) => Layout { shape, stride },
            None => Layout::new(IntTuple::int(1), IntTuple::int(0)),
        };
        (layout, offset.value())
    }

    /// The dual of `slice`: keep the modes `crd` pins with an index
    pub fn dice(&self, crd: &Crd) -> Layout {
        let diced = dice_impl(crd, &self.shape, &self.stride, self);
        match diced {
            Some((shape, stride)) => Layout { shape, stride },
            None => Layout::new(IntTuple::int(1), IntTuple::int(0)),
        }
    }
}

fn slice_impl(
    crd: &Crd,
    shape: &IntTuple,
    stride: &IntTuple,
    offset: &mut Int,
    root: &Layout,
) -> Option<(IntTuple, IntTuple)> {
    match (crd, shape, stride) {
        (Crd::Wild, s, d) => Some((s.clone(), d.clone())),
        (Crd::Idx(v), s, d) => {
            *offset = *offset + crd2idx(&IntTuple::Int(*v), s, d);
            None
        }
        (Crd::Tuple(cs), IntTuple::Tuple(ss), IntTuple::Tuple(dd)) if cs.len() == ss.len() => {
            let kept: Vec<(IntTuple, IntTuple)> = cs
                .iter()
                .zip(ss.iter().zip(dd))
                .filter_map(|(c, (s, d))| slice_impl(c, s, d, offset, root))
                .collect();
            match kept.len() {
                0 => None,
                1 => Some(kept.into_iter().next().unwrap()),
                _ => {
                    let (shapes, strides) = kept.into_iter().unzip();
                    Some((IntTuple::Tuple(shapes), IntTuple::Tuple(strides)))
                }
            }
        }
        _ => panic!(
            "{}",
            LayoutError::InvalidSlice {
                crd: crd.clone(),
                shape: root.shape.clone()
            }
        ),
    }
}

fn dice_impl(
    crd: &Crd,
    shape: &IntTuple,
    stride: &IntTuple,
    root: &Layout,
) -> Option<(IntTuple, IntTuple)> {
    match (crd, shape, stride) {
        (Crd::Wild, _, _) => None,
        (Crd::Idx(_), s, d) => Some((s.clone(), d.clone())),
        (Crd::Tuple(cs), IntTuple::Tuple(ss), IntTuple::Tuple(dd)) if cs.len() == ss.len() => {
            let kept: Vec<(IntTuple, IntTuple)> = cs
                .iter()
                .zip(ss.iter().zip(dd))
                .filter_map(|(c, (s, d))| dice_impl(c, s, d, root))
                .collect();
            match kept.len() {
                0 => None,
                1 => Some(kept.into_iter().next().unwrap()),
                _ => {
                    let (shapes, strides) = kept.into_iter().unzip();
                    Some((IntTuple::Tuple(shapes), IntTuple::Tuple(strides)))
                }
            }
        }
        _ => panic!(
            "{}",
            LayoutError::InvalidSlice {
                crd: crd.clone(),
                shape: root.shape.clone()
            }
        ),
    }
}

/// Concatenate layouts: each input becomes one top-level mode
pub fn make_layout(parts: &[&Layout]) -> Layout {
    Layout {
        shape: IntTuple::Tuple(parts.iter().map(|l| l.shape.clone()).collect()),
        stride: IntTuple::Tuple(parts.iter().map(|l| l.stride.clone()).collect()),
    }
}

/// Compact layout whose modes are filled in ascending `order`
pub fn make_ordered_layout(shape: IntTuple, order: &IntTuple) -> Layout {
    let stride = compact_order(&shape, order);
    Layout::new(shape, stride)
}

/// Layout for a compact fragment shaped like `l`: mode 0 becomes
/// column-major innermost, the remaining modes are ordered by their
/// smallest stride. Any dynamic leaf falls back to plain column-major
/// (the static ordering is not defined for mixed inputs).
pub fn make_fragment_like(l: &Layout) -> Layout {
    if l.rank() <= 1 || !l.is_static() {
        return Layout::col_major(l.shape().clone());
    }
    let r = l.rank();
    let min_strides: Vec<i64> = (1..r)
        .map(|i| {
            l.mode(i)
                .stride()
                .flatten()
                .iter()
                .map(|d| d.value().abs())
                .min()
                .unwrap_or(0)
        })
        .collect();
    let mut by_stride: Vec<usize> = (0..r - 1).collect();
    by_stride.sort_by_key(|&i| (min_strides[i], i));

    let mut keys = vec![0i64; r];
    for (pos, &i) in by_stride.iter().enumerate() {
        keys[i + 1] = 1 + pos as i64;
    }
    let order = IntTuple::Tuple(keys.into_iter().map(IntTuple::int).collect());
    make_ordered_layout(l.shape().clone(), &order)
}

/// A coordinate that may pin a mode with an index or keep it with a
/// wildcard. Used for slicing and dicing.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Crd {
    Wild,
    Idx(Int),
    Tuple(Vec<Crd>),
}

impl Crd {
    /// Pin with a static index
    pub fn idx(v: i64) -> Crd {
        Crd::Idx(Int::st(v))
    }

    /// Coordinate tuple with every entry pinned
    pub fn from_tuple(t: &IntTuple) -> Crd {
        match t {
            IntTuple::Int(v) => Crd::Idx(*v),
            IntTuple::Tuple(ts) => Crd::Tuple(ts.iter().map(Crd::from_tuple).collect()),
        }
    }
}

impl From<i64> for Crd {
    fn from(v: i64) -> Crd {
        Crd::idx(v)
    }
}

impl fmt::Display for Crd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Crd::Wild => write!(f, "_"),
            Crd::Idx(v) => write!(f, "{}", v),
            Crd::Tuple(v) => {
                write!(f, "(")?;
                for (i, c) in v.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", c)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.shape, self.stride)
    }
}
