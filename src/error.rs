use thiserror::Error;

use crate::layout::Crd;
use crate::num::Int;
use crate::tuple::IntTuple;

/// Errors produced by layout construction and the layout algebra.
///
/// Congruence and slice violations on fully static inputs are programmer
/// errors and abort via `assert!`; the algebra reports them through this
/// type where a dynamic input can make the failure a runtime condition.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("shape {shape} and stride {stride} are not congruent")]
    ShapeMismatch { shape: IntTuple, stride: IntTuple },

    #[error("{num} is not divisible by {den}")]
    Divisibility { num: Int, den: Int },

    #[error("element sizes {new_size} and {old_size} are not whole multiples of each other")]
    Recast { new_size: usize, old_size: usize },

    #[error("tiler has {tile} modes but the layout has rank {layout}")]
    RankMismatch { layout: usize, tile: usize },

    #[error("index {index} is out of bounds for a domain of size {size}")]
    OutOfBounds { index: i64, size: i64 },

    #[error("slice coordinate {crd} does not match the layout tree {shape}")]
    InvalidSlice { crd: Crd, shape: IntTuple },
}
