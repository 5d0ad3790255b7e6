//! Thread-level partitioning: carving a tensor into per-block tiles and
//! per-thread element sets, driven entirely by the divide algebra.

use crate::algebra::{zipped_divide, Tiler};
use crate::array::{Engine, EngineMut, MoYeArray, ViewEngine, ViewEngineMut};
use crate::error::LayoutError;
use crate::layout::{Crd, Layout};
use crate::num::Int;
use crate::tuple::IntTuple;

/// View of one `tile_shape`-sized block of `a`, selected by `tile_coord`
/// along the across-tiles mode. Divisibility of the outer shape by the
/// tile shape is the caller's obligation.
pub fn local_tile<'a, E: Engine>(
    a: &'a MoYeArray<E>,
    tile_shape: &IntTuple,
    tile_coord: &IntTuple,
) -> Result<MoYeArray<ViewEngine<'a, E::Elem>>, LayoutError> {
    let zipped = zipped_divide(a.layout(), &Tiler::from_shape(tile_shape))?;
    let crd = Crd::Tuple(vec![Crd::Wild, Crd::from_tuple(tile_coord)]);
    let (layout, offset) = zipped.slice_and_offset(&crd);
    Ok(a.raw_view(layout, offset))
}

/// Mutable variant of [`local_tile`]
pub fn local_tile_mut<'a, E: EngineMut>(
    a: &'a mut MoYeArray<E>,
    tile_shape: &IntTuple,
    tile_coord: &IntTuple,
) -> Result<MoYeArray<ViewEngineMut<'a, E::Elem>>, LayoutError> {
    let zipped = zipped_divide(a.layout(), &Tiler::from_shape(tile_shape))?;
    let crd = Crd::Tuple(vec![Crd::Wild, Crd::from_tuple(tile_coord)]);
    let (layout, offset) = zipped.slice_and_offset(&crd);
    Ok(a.raw_view_mut(layout, offset))
}

/// Per-thread view: `thread_layout` maps a thread id to its position
/// inside one tile; the result walks that position across every tile.
pub fn local_partition<'a, E: Engine>(
    a: &'a MoYeArray<E>,
    thread_layout: &Layout,
    thread_id: i64,
) -> Result<MoYeArray<ViewEngine<'a, E::Elem>>, LayoutError> {
    let zipped = zipped_divide(a.layout(), &Tiler::from_shape(thread_layout.shape()))?;
    let pos = thread_layout.call_1d(thread_id);
    let crd = Crd::Tuple(vec![Crd::Idx(Int::dy(pos)), Crd::Wild]);
    let (layout, offset) = zipped.slice_and_offset(&crd);
    Ok(a.raw_view(layout, offset))
}

/// Mutable variant of [`local_partition`]
pub fn local_partition_mut<'a, E: EngineMut>(
    a: &'a mut MoYeArray<E>,
    thread_layout: &Layout,
    thread_id: i64,
) -> Result<MoYeArray<ViewEngineMut<'a, E::Elem>>, LayoutError> {
    let zipped = zipped_divide(a.layout(), &Tiler::from_shape(thread_layout.shape()))?;
    let pos = thread_layout.call_1d(thread_id);
    let crd = Crd::Tuple(vec![Crd::Idx(Int::dy(pos)), Crd::Wild]);
    let (layout, offset) = zipped.slice_and_offset(&crd);
    Ok(a.raw_view_mut(layout, offset))
}
