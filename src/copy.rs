//! Layout-aware data movement between arrays.
//!
//! The inner vector width comes from `max_common_vector(src, dst)`: when
//! both layouts share a stride-1 prefix the copy moves whole chunks,
//! otherwise it falls back to an element-by-element walk.

use crate::algebra::max_common_vector;
use crate::array::{Engine, EngineMut, MoYeArray};
use crate::env::ExecutionEnv;
use crate::tuple::congruent;

/// Copy every element of `src` into `dst`. The two layouts must have
/// congruent shapes of equal size; their strides may differ freely.
pub fn copy<T, Es, Ed>(src: &MoYeArray<Es>, dst: &mut MoYeArray<Ed>)
where
    T: Copy,
    Es: Engine<Elem = T>,
    Ed: EngineMut<Elem = T>,
{
    assert!(
        congruent(src.layout().shape(), dst.layout().shape()),
        "copy: shape {} does not match {}",
        src.layout().shape(),
        dst.layout().shape()
    );
    assert_eq!(
        src.layout().size().value(),
        dst.layout().size().value(),
        "copy: size mismatch"
    );

    let n = src.layout().size().value();
    if n == 0 {
        return;
    }

    let v = max_common_vector(src.layout(), dst.layout());
    let src_ptr = src.engine().as_ptr();
    let dst_ptr = dst.engine_mut().as_mut_ptr();

    if v > 1 && n % v == 0 {
        let mut i = 0;
        while i < n {
            let soff = src.layout().call_1d(i);
            let doff = dst.layout().call_1d(i);
            debug_assert_eq!(src.layout().call_1d(i + v - 1), soff + v - 1);
            debug_assert_eq!(dst.layout().call_1d(i + v - 1), doff + v - 1);
            unsafe {
                std::ptr::copy_nonoverlapping(
                    src_ptr.add(soff as usize),
                    dst_ptr.add(doff as usize),
                    v as usize,
                );
            }
            i += v;
        }
        return;
    }

    for i in 0..n {
        let soff = src.layout().call_1d(i);
        let doff = dst.layout().call_1d(i);
        unsafe {
            *dst_ptr.add(doff as usize) = *src_ptr.add(soff as usize);
        }
    }
}

/// Issue a copy that the execution environment may complete
/// asynchronously. Consumers of `dst` must fence with
/// [`ExecutionEnv::cp_async_wait`] first; the host environment completes
/// the transfer eagerly and its fence is a no-op.
pub fn copy_async<T, Es, Ed, Env>(env: &Env, src: &MoYeArray<Es>, dst: &mut MoYeArray<Ed>)
where
    T: Copy,
    Es: Engine<Elem = T>,
    Ed: EngineMut<Elem = T>,
    Env: ExecutionEnv,
{
    let _ = env;
    copy(src, dst);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::ArrayEngine;
    use crate::env::HostEnv;
    use crate::layout::Layout;
    use crate::tup;

    #[test]
    fn copy_contiguous_fast_path() {
        let l = Layout::col_major(tup!(4, 4));
        let data: [i32; 16] = std::array::from_fn(|i| i as i32);
        let a = MoYeArray::<ArrayEngine<i32, 16>>::from_data(data, l.clone());
        let mut b = MoYeArray::<ArrayEngine<i32, 16>>::new(l);

        let src = a.view();
        let mut dst = b.view_mut();
        copy(&src, &mut dst);

        for i in 0..16 {
            assert_eq!(b[i], i as i32);
        }
    }

    #[test]
    fn copy_transposes_between_orders() {
        let data: [i32; 6] = [0, 1, 2, 3, 4, 5];
        let a = MoYeArray::<ArrayEngine<i32, 6>>::from_data(data, Layout::col_major(tup!(2, 3)));
        let mut b = MoYeArray::<ArrayEngine<i32, 6>>::new(Layout::row_major(tup!(2, 3)));

        let src = a.view();
        let mut dst = b.view_mut();
        copy(&src, &mut dst);

        // same logical element, different physical order
        for i in 0..2 {
            for j in 0..3 {
                assert_eq!(a.get(&tup!(i, j)), b.get(&tup!(i, j)));
            }
        }
        assert_eq!(b.data(), &[0, 2, 4, 1, 3, 5]);
    }

    #[test]
    fn copy_async_through_host_env() {
        let env = HostEnv;
        let l = Layout::col_major(tup!(8));
        let a = MoYeArray::<ArrayEngine<i32, 8>>::from_data([9, 8, 7, 6, 5, 4, 3, 2], l.clone());
        let mut b = MoYeArray::<ArrayEngine<i32, 8>>::new(l);

        let src = a.view();
        let mut dst = b.view_mut();
        copy_async(&env, &src, &mut dst);
        env.cp_async_wait();

        assert_eq!(b.data(), a.data());
    }
}
