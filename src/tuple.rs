use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::num::Int;

/// Recursive integer tuple (CuTe-style).
///
/// An `IntTuple` is either a single integer or an ordered sequence of
/// `IntTuple`s. Shapes, strides and coordinates all share this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum IntTuple {
    Int(Int),
    Tuple(Vec<IntTuple>),
}

impl IntTuple {
    /// Static integer leaf
    pub fn int(v: i64) -> Self {
        IntTuple::Int(Int::st(v))
    }

    /// Leaf from an existing tagged integer
    pub fn leaf(v: Int) -> Self {
        IntTuple::Int(v)
    }

    pub fn tuple(v: Vec<IntTuple>) -> Self {
        IntTuple::Tuple(v)
    }

    /// Number of top-level entries; 0 for a leaf
    pub fn rank(&self) -> usize {
        match self {
            IntTuple::Int(_) => 0,
            IntTuple::Tuple(v) => v.len(),
        }
    }

    /// Nesting depth; 0 for a leaf
    pub fn depth(&self) -> usize {
        match self {
            IntTuple::Int(_) => 0,
            IntTuple::Tuple(v) => 1 + v.iter().map(|t| t.depth()).max().unwrap_or(0),
        }
    }

    /// Product of all leaves; the coordinate-space size of a shape.
    /// Staticness is the join over all leaves.
    pub fn size(&self) -> Int {
        match self {
            IntTuple::Int(v) => *v,
            IntTuple::Tuple(v) => v.iter().fold(Int::ONE, |acc, t| acc * t.size()),
        }
    }

    /// Left-to-right sequence of leaves
    pub fn flatten(&self) -> Vec<Int> {
        match self {
            IntTuple::Int(v) => vec![*v],
            IntTuple::Tuple(v) => v.iter().flat_map(|t| t.flatten()).collect(),
        }
    }

    pub fn leaf_count(&self) -> usize {
        match self {
            IntTuple::Int(_) => 1,
            IntTuple::Tuple(v) => v.iter().map(|t| t.leaf_count()).sum(),
        }
    }

    pub fn is_int(&self) -> bool {
        matches!(self, IntTuple::Int(_))
    }

    /// Extract the leaf value. Panics on a tuple.
    pub fn as_int(&self) -> Int {
        match self {
            IntTuple::Int(v) => *v,
            IntTuple::Tuple(_) => panic!("expected integer, got tuple {}", self),
        }
    }

    /// True when every leaf is compile-time static
    pub fn is_static(&self) -> bool {
        match self {
            IntTuple::Int(v) => v.is_static(),
            IntTuple::Tuple(v) => v.iter().all(|t| t.is_static()),
        }
    }

    /// Top-level entry at `i`. Panics on a leaf or out of bounds.
    pub fn get(&self, i: usize) -> &IntTuple {
        match self {
            IntTuple::Int(_) => panic!("cannot index into integer {}", self),
            IntTuple::Tuple(v) => &v[i],
        }
    }

    /// Top-level entries, treating a leaf as a one-entry sequence
    pub fn modes(&self) -> &[IntTuple] {
        match self {
            IntTuple::Int(_) => std::slice::from_ref(self),
            IntTuple::Tuple(v) => v,
        }
    }

    /// Insert `x` at top-level position `n` (0-based)
    pub fn insert(&self, x: IntTuple, n: usize) -> IntTuple {
        let mut v = self.modes().to_vec();
        v.insert(n, x);
        IntTuple::Tuple(v)
    }

    /// Remove the top-level entry at position `n` (0-based)
    pub fn remove(&self, n: usize) -> IntTuple {
        let mut v = self.modes().to_vec();
        v.remove(n);
        IntTuple::Tuple(v)
    }

    /// Replace the top-level entry at position `n` (0-based)
    pub fn replace(&self, x: IntTuple, n: usize) -> IntTuple {
        let mut v = self.modes().to_vec();
        v[n] = x;
        IntTuple::Tuple(v)
    }

    /// Pad on the right with copies of `x` until length `n`
    pub fn append(&self, x: &IntTuple, n: usize) -> IntTuple {
        let mut v = self.modes().to_vec();
        while v.len() < n {
            v.push(x.clone());
        }
        IntTuple::Tuple(v)
    }

    /// Pad on the left with copies of `x` until length `n`
    pub fn prepend(&self, x: &IntTuple, n: usize) -> IntTuple {
        let mut v = self.modes().to_vec();
        while v.len() < n {
            v.insert(0, x.clone());
        }
        IntTuple::Tuple(v)
    }

    /// Wrap entries `[b, e)` into a nested tuple
    pub fn group(&self, b: usize, e: usize) -> IntTuple {
        let v = self.modes();
        let mut out: Vec<IntTuple> = v[..b].to_vec();
        out.push(IntTuple::Tuple(v[b..e].to_vec()));
        out.extend(v[e..].iter().cloned());
        IntTuple::Tuple(out)
    }

    /// Tree with this tuple's structure and every leaf replaced by `x`
    pub fn repeat_like(&self, x: Int) -> IntTuple {
        match self {
            IntTuple::Int(_) => IntTuple::Int(x),
            IntTuple::Tuple(v) => IntTuple::Tuple(v.iter().map(|t| t.repeat_like(x)).collect()),
        }
    }
}

/// True when the two trees have identical structure (leaves ignored)
pub fn congruent(a: &IntTuple, b: &IntTuple) -> bool {
    match (a, b) {
        (IntTuple::Int(_), IntTuple::Int(_)) => true,
        (IntTuple::Tuple(x), IntTuple::Tuple(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(s, t)| congruent(s, t))
        }
        _ => false,
    }
}

/// True when `a` is congruent to a leaf-restriction of `b`: wherever `a`
/// has a leaf, `b` may carry an arbitrary subtree.
pub fn weakly_congruent(a: &IntTuple, b: &IntTuple) -> bool {
    match (a, b) {
        (IntTuple::Int(_), _) => true,
        (IntTuple::Tuple(_), IntTuple::Int(_)) => false,
        (IntTuple::Tuple(x), IntTuple::Tuple(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(s, t)| weakly_congruent(s, t))
        }
    }
}

/// Rank-preserving zip: entry `i` of the result gathers entry `i` of every
/// input. All inputs must have equal rank.
pub fn transpose(ts: &[&IntTuple]) -> IntTuple {
    let r = ts.first().map(|t| t.modes().len()).unwrap_or(0);
    assert!(
        ts.iter().all(|t| t.modes().len() == r),
        "transpose requires equal ranks"
    );
    IntTuple::Tuple(
        (0..r)
            .map(|i| IntTuple::Tuple(ts.iter().map(|t| t.modes()[i].clone()).collect()))
            .collect(),
    )
}

/// Exclusive scan over the top-level entries: entry `k` of the result is
/// `f` folded over entries `[0, k)` starting from `init`.
pub fn escan<F>(f: F, xs: &IntTuple, init: Int) -> IntTuple
where
    F: Fn(Int, &IntTuple) -> Int,
{
    let mut acc = init;
    let mut out = Vec::with_capacity(xs.modes().len());
    for x in xs.modes() {
        out.push(IntTuple::Int(acc));
        acc = f(acc, x);
    }
    IntTuple::Tuple(out)
}

impl From<i64> for IntTuple {
    fn from(v: i64) -> Self {
        IntTuple::int(v)
    }
}

impl From<Int> for IntTuple {
    fn from(v: Int) -> Self {
        IntTuple::Int(v)
    }
}

/// Construct an `IntTuple` from nested literals: `tup!(2, tup!(3, 4))`.
/// Bare integers become static leaves.
#[macro_export]
macro_rules! tup {
    ($e:expr) => { $crate::tuple::IntTuple::from($e) };
    ($($e:expr),+ $(,)?) => { $crate::tuple::IntTuple::Tuple(vec![$( $crate::tup!($e) ),+]) };
}

impl fmt::Display for IntTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntTuple::Int(v) => write!(f, "{}", v),
            IntTuple::Tuple(v) => {
                write!(f, "(")?;
                for (i, t) in v.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", t)?;
                }
                write!(f, ")")
            }
        }
    }
}
