//! Naive batched GEMM on strided views.
//!
//! Operands must be pre-permuted into batch-first canonical order:
//! - A: `[batch..., lo..., sum...]`
//! - B: `[batch..., sum..., ro...]`
//! - C: `[batch..., lo..., ro...]`
//!
//! Computes `C = alpha * A * B + beta * C`. This is the reference kernel:
//! correctness oracle only, no blocking or vectorization.

use num_traits::{One, Zero};

use crate::dtype::Element;
use crate::error::StridedError;
use crate::kernel::MultiIndex;
use crate::view::{StridedView, StridedViewMut};

#[allow(clippy::too_many_arguments)]
pub fn bgemm_strided<T: Element>(
    c: &mut StridedViewMut<T>,
    a: &StridedView<T>,
    b: &StridedView<T>,
    n_batch: usize,
    n_lo: usize,
    n_ro: usize,
    n_sum: usize,
    alpha: T,
    beta: T,
) -> Result<(), StridedError> {
    let a_shape = a.shape();
    let b_shape = b.shape();
    let c_shape = c.shape();
    let a_strides = a.strides();
    let b_strides = b.strides();
    let c_strides = c.strides();

    let batch_shape = &a_shape[..n_batch];
    let lo_shape = &a_shape[n_batch..n_batch + n_lo];
    let sum_shape = &a_shape[n_batch + n_lo..];
    let ro_shape = &b_shape[n_batch + n_sum..];

    debug_assert_eq!(&b_shape[..n_batch], batch_shape);
    debug_assert_eq!(&b_shape[n_batch..n_batch + n_sum], sum_shape);
    debug_assert_eq!(&c_shape[..n_batch], batch_shape);
    debug_assert_eq!(&c_shape[n_batch..n_batch + n_lo], lo_shape);
    debug_assert_eq!(&c_shape[n_batch + n_lo..], ro_shape);
    debug_assert_eq!(n_batch + n_lo + n_ro, c_shape.len());

    let a_batch_strides = &a_strides[..n_batch];
    let a_lo_strides = &a_strides[n_batch..n_batch + n_lo];
    let a_sum_strides = &a_strides[n_batch + n_lo..];

    let b_batch_strides = &b_strides[..n_batch];
    let b_sum_strides = &b_strides[n_batch..n_batch + n_sum];
    let b_ro_strides = &b_strides[n_batch + n_sum..];

    let c_batch_strides = &c_strides[..n_batch];
    let c_lo_strides = &c_strides[n_batch..n_batch + n_lo];
    let c_ro_strides = &c_strides[n_batch + n_lo..];

    let a_ptr = a.ptr();
    let b_ptr = b.ptr();
    let c_ptr = c.as_mut_ptr();

    let beta_zero = beta == T::zero();
    let alpha_one = alpha == T::one();

    let mut batch_iter = MultiIndex::new(batch_shape);
    let mut lo_iter = MultiIndex::new(lo_shape);
    let mut ro_iter = MultiIndex::new(ro_shape);
    let mut sum_iter = MultiIndex::new(sum_shape);
    while batch_iter.next().is_some() {
        let a_batch = batch_iter.offset(a_batch_strides);
        let b_batch = batch_iter.offset(b_batch_strides);
        let c_batch = batch_iter.offset(c_batch_strides);

        lo_iter.reset();
        while lo_iter.next().is_some() {
            let a_lo = lo_iter.offset(a_lo_strides);
            let c_lo = lo_iter.offset(c_lo_strides);

            ro_iter.reset();
            while ro_iter.next().is_some() {
                let b_ro = ro_iter.offset(b_ro_strides);
                let c_ro = ro_iter.offset(c_ro_strides);

                let mut acc = T::zero();
                sum_iter.reset();
                while sum_iter.next().is_some() {
                    let a_off = a_batch + a_lo + sum_iter.offset(a_sum_strides);
                    let b_off = b_batch + b_ro + sum_iter.offset(b_sum_strides);
                    let a_val = unsafe { *a_ptr.offset(a_off) };
                    let b_val = unsafe { *b_ptr.offset(b_off) };
                    acc = acc + a_val * b_val;
                }

                let c_off = c_batch + c_lo + c_ro;
                unsafe {
                    let c_elem = c_ptr.offset(c_off);
                    *c_elem = match (beta_zero, alpha_one) {
                        (true, true) => acc,
                        (true, false) => alpha * acc,
                        (false, true) => acc + beta * *c_elem,
                        (false, false) => alpha * acc + beta * *c_elem,
                    };
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{Layout, StridedArray};

    #[test]
    fn test_matmul_2x2() {
        // C = A * B with A = [[1,2],[3,4]], B = [[5,6],[7,8]]
        let a = StridedArray::<f64>::from_fn(&[2, 2], |idx| {
            [[1.0, 2.0], [3.0, 4.0]][idx[0]][idx[1]]
        });
        let b = StridedArray::<f64>::from_fn(&[2, 2], |idx| {
            [[5.0, 6.0], [7.0, 8.0]][idx[0]][idx[1]]
        });
        let mut c = StridedArray::<f64>::zeros(&[2, 2], Layout::RowMajor);

        bgemm_strided(&mut c.view_mut(), &a.view(), &b.view(), 0, 1, 1, 1, 1.0, 0.0).unwrap();

        assert_eq!(c.get(&[0, 0]), 19.0);
        assert_eq!(c.get(&[0, 1]), 22.0);
        assert_eq!(c.get(&[1, 0]), 43.0);
        assert_eq!(c.get(&[1, 1]), 50.0);
    }

    #[test]
    fn test_batched() {
        // Batch-first: A [batch, lo, sum] = [2,2,3], B [batch, sum, ro] = [2,3,2]
        let a = StridedArray::<f64>::from_fn(&[2, 2, 3], |idx| {
            (idx[0] * 6 + idx[1] * 3 + idx[2] + 1) as f64
        });
        let b = StridedArray::<f64>::from_fn(&[2, 3, 2], |idx| {
            (idx[0] * 6 + idx[1] * 2 + idx[2] + 1) as f64
        });
        let mut c = StridedArray::<f64>::zeros(&[2, 2, 2], Layout::RowMajor);

        bgemm_strided(&mut c.view_mut(), &a.view(), &b.view(), 1, 1, 1, 1, 1.0, 0.0).unwrap();

        // Batch 0: A0 = [[1,2,3],[4,5,6]], B0 = [[1,2],[3,4],[5,6]]
        assert_eq!(c.get(&[0, 0, 0]), 22.0);
        assert_eq!(c.get(&[0, 1, 1]), 64.0);
    }

    #[test]
    fn test_alpha_beta() {
        // C = 2*I*B + 3*C_old
        let a = StridedArray::<f64>::from_fn(&[2, 2], |idx| {
            if idx[0] == idx[1] { 1.0 } else { 0.0 }
        });
        let b = StridedArray::<f64>::from_fn(&[2, 2], |idx| {
            [[1.0, 2.0], [3.0, 4.0]][idx[0]][idx[1]]
        });
        let mut c = StridedArray::<f64>::from_fn(&[2, 2], |idx| {
            [[10.0, 20.0], [30.0, 40.0]][idx[0]][idx[1]]
        });

        bgemm_strided(&mut c.view_mut(), &a.view(), &b.view(), 0, 1, 1, 1, 2.0, 3.0).unwrap();

        assert_eq!(c.get(&[0, 0]), 32.0);
        assert_eq!(c.get(&[1, 1]), 128.0);
    }

    #[test]
    fn test_outer_product() {
        let a = StridedArray::<f64>::from_fn(&[3], |idx| (idx[0] + 1) as f64);
        let b = StridedArray::<f64>::from_fn(&[4], |idx| (idx[0] + 1) as f64);
        let mut c = StridedArray::<f64>::zeros(&[3, 4], Layout::RowMajor);

        bgemm_strided(&mut c.view_mut(), &a.view(), &b.view(), 0, 1, 1, 0, 1.0, 0.0).unwrap();

        assert_eq!(c.get(&[0, 0]), 1.0);
        assert_eq!(c.get(&[2, 3]), 12.0);
    }

    #[test]
    fn test_dot_product_scalar_output() {
        let a = StridedArray::<f64>::from_fn(&[3], |idx| (idx[0] + 1) as f64);
        let b = StridedArray::<f64>::from_fn(&[3], |idx| (idx[0] + 1) as f64);
        let mut c = StridedArray::<f64>::zeros(&[], Layout::RowMajor);

        bgemm_strided(&mut c.view_mut(), &a.view(), &b.view(), 0, 0, 0, 1, 1.0, 0.0).unwrap();

        assert_eq!(c.get(&[]), 14.0);
    }

    #[test]
    fn test_empty_sum_dim_writes_beta() {
        // k has extent 0: C = alpha*0 + beta*C_old
        let a = StridedArray::<f64>::zeros(&[2, 0], Layout::RowMajor);
        let b = StridedArray::<f64>::zeros(&[0, 2], Layout::RowMajor);
        let mut c = StridedArray::<f64>::from_fn(&[2, 2], |_| 5.0);

        bgemm_strided(&mut c.view_mut(), &a.view(), &b.view(), 0, 1, 1, 1, 1.0, 2.0).unwrap();

        assert_eq!(c.get(&[0, 0]), 10.0);
        assert_eq!(c.get(&[1, 1]), 10.0);
    }
}
