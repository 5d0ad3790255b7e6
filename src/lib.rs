//! Hierarchical layout algebra for tensor programming, CuTe-style.
//!
//! A [`Layout`] is a pair of congruent hierarchical integer tuples — a
//! shape and a stride — denoting a map from a coordinate space to a
//! linear index into flat memory. Layouts compose, complement, multiply
//! and divide while preserving that function, which is what lets a
//! kernel carve a tensor into tiles and per-thread fragments with no
//! runtime shape arithmetic when the inputs are static.
//!
//! Conventions, applied uniformly:
//! - coordinates and linear indices are 0-based;
//! - byte offsets are `index * size_of::<T>()`;
//! - every leaf integer is tagged [`Int::Static`] or [`Int::Dyn`], and
//!   results join the staticness of their inputs.

pub mod algebra;
pub mod array;
pub mod coord;
pub mod copy;
pub mod env;
pub mod error;
pub mod layout;
pub mod num;
pub mod tile;
pub mod tuple;

pub use crate::algebra::{
    blocked_product, coalesce, coalesce_profile, complement, complement_full, composition,
    downcast, filter, filter_zeros, flat_divide, left_inverse, logical_divide, logical_product,
    max_common_layout, max_common_vector, raked_product, recast_layout, right_inverse,
    tiled_divide, upcast, with_shape, zipped_divide, Tiler,
};
pub use crate::array::{ArrayEngine, Engine, EngineMut, MoYeArray, ViewEngine, ViewEngineMut};
pub use crate::coord::{
    compact_col_major, compact_order, compact_row_major, crd2crd, crd2idx, idx2crd,
};
pub use crate::copy::{copy, copy_async};
pub use crate::env::{ExecutionEnv, HostEnv};
pub use crate::error::LayoutError;
pub use crate::layout::{
    make_fragment_like, make_layout, make_ordered_layout, ColMajor, Crd, Layout, LayoutPolicy,
    RowMajor,
};
pub use crate::num::{shape_div, Int};
pub use crate::tile::{local_partition, local_partition_mut, local_tile, local_tile_mut};
pub use crate::tuple::{congruent, escan, transpose, weakly_congruent, IntTuple};
