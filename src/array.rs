use std::marker::PhantomData;
use std::mem::size_of;
use std::ptr::NonNull;

use crate::algebra::recast_layout;
use crate::error::LayoutError;
use crate::layout::{make_fragment_like, Crd, Layout};
use crate::tuple::IntTuple;

/* ========================= Engines ========================= */

/// Element storage behind a `MoYeArray`
pub trait Engine {
    type Elem;
    fn as_ptr(&self) -> *const Self::Elem;
}

/// Mutable element storage
pub trait EngineMut: Engine {
    fn as_mut_ptr(&mut self) -> *mut Self::Elem;
}

/// Exclusively owned, stack-allocated buffer of exactly `N` elements
pub struct ArrayEngine<T, const N: usize> {
    data: [T; N],
}

impl<T, const N: usize> Engine for ArrayEngine<T, N> {
    type Elem = T;
    fn as_ptr(&self) -> *const T {
        self.data.as_ptr()
    }
}

impl<T, const N: usize> EngineMut for ArrayEngine<T, N> {
    fn as_mut_ptr(&mut self) -> *mut T {
        self.data.as_mut_ptr()
    }
}

/// Non-owning pointer into a buffer that outlives `'a`.
///
/// The lifetime is the scoped acquisition that pins the owning buffer:
/// a view cannot outlive the borrow it was created from.
pub struct ViewEngine<'a, T> {
    ptr: NonNull<T>,
    _marker: PhantomData<&'a T>,
}

impl<'a, T> Engine for ViewEngine<'a, T> {
    type Elem = T;
    fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }
}

/// Mutable non-owning pointer; holds the owner's unique borrow for `'a`
pub struct ViewEngineMut<'a, T> {
    ptr: NonNull<T>,
    _marker: PhantomData<&'a mut T>,
}

impl<'a, T> Engine for ViewEngineMut<'a, T> {
    type Elem = T;
    fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }
}

impl<'a, T> EngineMut for ViewEngineMut<'a, T> {
    fn as_mut_ptr(&mut self) -> *mut T {
        self.ptr.as_ptr()
    }
}

/* ========================= MoYeArray ========================= */

/// An engine paired with the layout that addresses it.
///
/// `a.get(c)` evaluates `layout(c)` to a 0-based linear index and reads
/// the element at `base + index`.
pub struct MoYeArray<E: Engine> {
    engine: E,
    layout: Layout,
}

impl<T: Copy + Default, const N: usize> MoYeArray<ArrayEngine<T, N>> {
    /// Owning array of `N` default elements.
    ///
    /// The layout must address exactly this buffer: `size == N` and
    /// `cosize ≤ N`.
    pub fn new(layout: Layout) -> Self {
        assert_eq!(
            layout.size().value() as usize,
            N,
            "layout size {} does not fill an owning buffer of {} elements",
            layout.size().value(),
            N
        );
        assert!(
            layout.cosize().value() as usize <= N,
            "layout cosize {} escapes an owning buffer of {} elements",
            layout.cosize().value(),
            N
        );
        Self {
            engine: ArrayEngine {
                data: [T::default(); N],
            },
            layout,
        }
    }

    /// Owning array over existing data
    pub fn from_data(data: [T; N], layout: Layout) -> Self {
        let mut a = Self::new(layout);
        a.engine.data = data;
        a
    }

    /// Fresh owning array with the same layout and element type `U`
    pub fn similar<U: Copy + Default>(&self) -> MoYeArray<ArrayEngine<U, N>> {
        MoYeArray::new(self.layout.clone())
    }

    /// Compact owning array shaped like this one: mode 0 column-major,
    /// remaining modes ordered by this layout's strides
    pub fn make_fragment_like(&self) -> MoYeArray<ArrayEngine<T, N>> {
        MoYeArray::new(make_fragment_like(&self.layout))
    }

    pub fn data(&self) -> &[T] {
        &self.engine.data
    }
}

impl<E: Engine> MoYeArray<E> {
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Read the element at a coordinate (1-D, R-D or hierarchical)
    pub fn get(&self, crd: &IntTuple) -> &E::Elem {
        let idx = self.layout.call(crd).value();
        debug_assert!(idx >= 0 && idx < self.layout.cosize().value());
        unsafe { &*self.engine.as_ptr().add(idx as usize) }
    }

    /// Non-owning view of the whole array
    pub fn view(&self) -> MoYeArray<ViewEngine<'_, E::Elem>> {
        MoYeArray {
            engine: ViewEngine {
                ptr: unsafe { NonNull::new_unchecked(self.engine.as_ptr() as *mut E::Elem) },
                _marker: PhantomData,
            },
            layout: self.layout.clone(),
        }
    }

    /// Keep the wildcard modes of `crd`; the returned view is rebased to
    /// the sliced origin
    pub fn slice(&self, crd: &Crd) -> MoYeArray<ViewEngine<'_, E::Elem>> {
        let (layout, offset) = self.layout.slice_and_offset(crd);
        MoYeArray {
            engine: ViewEngine {
                ptr: unsafe {
                    NonNull::new_unchecked(self.engine.as_ptr().add(offset as usize) as *mut E::Elem)
                },
                _marker: PhantomData,
            },
            layout,
        }
    }

    /// View the same bytes as elements of type `U`.
    ///
    /// The layout is recast by the element-size ratio; when the element
    /// grows, the base moves by the start-of-last-tile correction
    /// `Σ min(Δsᵢ·dᵢ, 0)` (a no-op for the non-negative strides this
    /// crate constructs).
    pub fn recast<U>(&self) -> Result<MoYeArray<ViewEngine<'_, U>>, LayoutError> {
        let old_size = size_of::<E::Elem>();
        let new_size = size_of::<U>();
        let layout = recast_layout(&self.layout, new_size, old_size)?;

        let mut byte_adjust: i64 = 0;
        if new_size > old_size {
            let old_shape = self.layout.shape().flatten();
            let new_shape = layout.shape().flatten();
            let strides = self.layout.stride().flatten();
            for ((os, ns), d) in old_shape.iter().zip(&new_shape).zip(&strides) {
                let diff = (os.value() - ns.value()) * d.value();
                byte_adjust += diff.min(0) * old_size as i64;
            }
        }

        let base = self.engine.as_ptr() as *const u8;
        let ptr = unsafe { base.offset(byte_adjust as isize) as *mut U };
        Ok(MoYeArray {
            engine: ViewEngine {
                ptr: unsafe { NonNull::new_unchecked(ptr) },
                _marker: PhantomData,
            },
            layout,
        })
    }

    pub(crate) fn raw_view(&self, layout: Layout, offset: i64) -> MoYeArray<ViewEngine<'_, E::Elem>> {
        MoYeArray {
            engine: ViewEngine {
                ptr: unsafe {
                    NonNull::new_unchecked(self.engine.as_ptr().add(offset as usize) as *mut E::Elem)
                },
                _marker: PhantomData,
            },
            layout,
        }
    }
}

impl<E: EngineMut> MoYeArray<E> {
    /// Write access to the element at a coordinate
    pub fn get_mut(&mut self, crd: &IntTuple) -> &mut E::Elem {
        let idx = self.layout.call(crd).value();
        debug_assert!(idx >= 0 && idx < self.layout.cosize().value());
        unsafe { &mut *self.engine.as_mut_ptr().add(idx as usize) }
    }

    /// Mutable non-owning view of the whole array
    pub fn view_mut(&mut self) -> MoYeArray<ViewEngineMut<'_, E::Elem>> {
        let layout = self.layout.clone();
        MoYeArray {
            engine: ViewEngineMut {
                ptr: unsafe { NonNull::new_unchecked(self.engine.as_mut_ptr()) },
                _marker: PhantomData,
            },
            layout,
        }
    }

    /// Mutable slice keeping the wildcard modes of `crd`
    pub fn slice_mut(&mut self, crd: &Crd) -> MoYeArray<ViewEngineMut<'_, E::Elem>> {
        let (layout, offset) = self.layout.slice_and_offset(crd);
        MoYeArray {
            engine: ViewEngineMut {
                ptr: unsafe { NonNull::new_unchecked(self.engine.as_mut_ptr().add(offset as usize)) },
                _marker: PhantomData,
            },
            layout,
        }
    }

    pub(crate) fn raw_view_mut(
        &mut self,
        layout: Layout,
        offset: i64,
    ) -> MoYeArray<ViewEngineMut<'_, E::Elem>> {
        MoYeArray {
            engine: ViewEngineMut {
                ptr: unsafe { NonNull::new_unchecked(self.engine.as_mut_ptr().add(offset as usize)) },
                _marker: PhantomData,
            },
            layout,
        }
    }
}

impl<'a, T> MoYeArray<ViewEngineMut<'a, T>> {
    /// View over raw storage, e.g. shared memory handed out by the
    /// execution environment.
    ///
    /// # Safety
    /// `ptr` must stay valid for `'a` and address at least
    /// `layout.cosize()` elements.
    pub unsafe fn from_raw_parts(ptr: NonNull<T>, layout: Layout) -> Self {
        MoYeArray {
            engine: ViewEngineMut {
                ptr,
                _marker: PhantomData,
            },
            layout,
        }
    }
}

impl<E: Engine> std::ops::Index<usize> for MoYeArray<E> {
    type Output = E::Elem;

    fn index(&self, i: usize) -> &E::Elem {
        let idx = self.layout.call_1d(i as i64);
        unsafe { &*self.engine.as_ptr().add(idx as usize) }
    }
}

impl<E: EngineMut> std::ops::IndexMut<usize> for MoYeArray<E> {
    fn index_mut(&mut self, i: usize) -> &mut E::Elem {
        let idx = self.layout.call_1d(i as i64);
        unsafe { &mut *self.engine.as_mut_ptr().add(idx as usize) }
    }
}

/* ========================= Tests ========================= */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Crd;
    use crate::tup;

    #[test]
    fn owning_array_create_and_index() {
        let layout = Layout::col_major(tup!(2, 3));
        let a = MoYeArray::<ArrayEngine<i32, 6>>::from_data([0, 1, 2, 3, 4, 5], layout);
        assert_eq!(a.layout().size(), 6);
        for i in 0..6 {
            assert_eq!(a[i], i as i32);
        }
        assert_eq!(*a.get(&tup!(1, 2)), 5);
    }

    #[test]
    fn strided_layout_permutes_access() {
        let layout = Layout::row_major(tup!(2, 3));
        let a = MoYeArray::<ArrayEngine<i32, 6>>::from_data([0, 1, 2, 3, 4, 5], layout);
        // colexicographic index walks columns first; storage is row-major
        assert_eq!(a[0], 0);
        assert_eq!(a[1], 3);
        assert_eq!(a[2], 1);
    }

    #[test]
    fn view_and_write_through() {
        let layout = Layout::col_major(tup!(3, 3));
        let mut a = MoYeArray::<ArrayEngine<i32, 9>>::new(layout);
        {
            let mut v = a.view_mut();
            *v.get_mut(&tup!(1, 1)) = 42;
            v[0] = 7;
        }
        assert_eq!(*a.get(&tup!(1, 1)), 42);
        assert_eq!(a[0], 7);
    }

    #[test]
    fn slice_rebases_view() {
        let layout = Layout::col_major(tup!(4, 4));
        let data: [i32; 16] = std::array::from_fn(|i| i as i32);
        let a = MoYeArray::<ArrayEngine<i32, 16>>::from_data(data, layout);

        // column 2
        let col = a.slice(&Crd::Tuple(vec![Crd::Wild, Crd::idx(2)]));
        assert_eq!(col.layout().to_string(), "_4:_1");
        assert_eq!(col[0], 8);
        assert_eq!(col[3], 11);

        // row 1
        let row = a.slice(&Crd::Tuple(vec![Crd::idx(1), Crd::Wild]));
        assert_eq!(row.layout().to_string(), "_4:_4");
        assert_eq!(row[0], 1);
        assert_eq!(row[3], 13);
    }

    #[test]
    fn recast_halves_and_doubles() {
        let layout = Layout::col_major(tup!(2, 3));
        let data: [i32; 6] = [0x00010000, 0x00030002, 0x00050004, 0x00070006, 0x00090008, 0x000b000a];
        let a = MoYeArray::<ArrayEngine<i32, 6>>::from_data(data, layout);

        let half = a.recast::<i16>().unwrap();
        assert_eq!(half.layout().to_string(), "(_4,_3):(_1,_4)");
        for i in 0..12 {
            assert_eq!(half[i], i as i16);
        }

        let back = half.recast::<i32>().unwrap();
        assert_eq!(back.layout(), a.layout());
        assert_eq!(back[0], a[0]);
    }

    #[test]
    fn similar_and_fragment_like() {
        let layout = Layout::row_major(tup!(4, 5));
        let a = MoYeArray::<ArrayEngine<f32, 20>>::new(layout);
        let b = a.similar::<i64>();
        assert_eq!(b.layout(), a.layout());

        let f = a.make_fragment_like();
        assert_eq!(f.layout().to_string(), "(_4,_5):(_1,_4)");
    }
}
