//! The contraction dispatcher.
//!
//! Parses a subscript descriptor, negotiates the target element type,
//! routes between the native primitive and the reference evaluator, and
//! issues one scaled binary contraction
//! `C = alpha * contract(A, B) + beta * C`.

use crate::backend::{ActivePrimitive, ContractPrimitive, RawOperand, RawOperandMut};
use crate::dtype::{DType, Element, Scalar};
use crate::error::{ContractError, Result};
use crate::parse::{parse_subscripts, Subscripts};
use crate::plan::ContractionPlan;
use crate::reference;
use crate::route::{self, Route};
use crate::tensor::{with_element_type, Tensor, TensorElement};
use crate::view::{Layout, StridedArray};

/// Keyword configuration for [`contract_with`] and [`contract_into`].
///
/// Defaults reproduce a bare call: natural dtype promotion, `alpha = 1`,
/// `beta = 0`, row-major allocation. Supplying options at all disables the
/// small-tensor shortcut, mirroring the keyword-presence check of the
/// routing contract.
#[derive(Debug, Clone, Copy)]
pub struct ContractOptions {
    /// Force the computation dtype instead of promoting from the operands.
    pub dtype: Option<DType>,
    /// Scale on the contraction term.
    pub alpha: Scalar,
    /// Scale on the prior content of the output buffer.
    pub beta: Scalar,
    /// Memory order of a freshly allocated result.
    pub order: Layout,
}

impl Default for ContractOptions {
    fn default() -> Self {
        Self {
            dtype: None,
            alpha: Scalar::Real(1.0),
            beta: Scalar::Real(0.0),
            order: Layout::RowMajor,
        }
    }
}

/// Contract two tensors: `contract("ij,jk->ik", &a, &b)`.
///
/// Unconfigured form; small operands take the reference evaluator
/// directly since native dispatch overhead dominates below the
/// [threshold](crate::config::einsum_max_size).
pub fn contract(descriptor: &str, a: &Tensor, b: &Tensor) -> Result<Tensor> {
    dispatch(descriptor, a, b, None, OutputSpec::Alloc(Layout::RowMajor))
        .map(|t| t.expect("allocating dispatch returns a tensor"))
}

/// Contract with explicit configuration, allocating the result.
pub fn contract_with(
    descriptor: &str,
    a: &Tensor,
    b: &Tensor,
    options: &ContractOptions,
) -> Result<Tensor> {
    dispatch(descriptor, a, b, Some(options), OutputSpec::Alloc(options.order))
        .map(|t| t.expect("allocating dispatch returns a tensor"))
}

/// Contract into a caller-supplied buffer:
/// `out = alpha * contract(a, b) + beta * out`.
///
/// `out` must already have the exact target dtype and shape; a mismatch is
/// a contract violation, never a reshape. The buffer is written in place
/// (it may be arbitrarily strided) and no copy is made.
pub fn contract_into(
    descriptor: &str,
    a: &Tensor,
    b: &Tensor,
    out: &mut Tensor,
    options: &ContractOptions,
) -> Result<()> {
    dispatch(descriptor, a, b, Some(options), OutputSpec::Into(out)).map(|_| ())
}

enum OutputSpec<'o> {
    Alloc(Layout),
    Into(&'o mut Tensor),
}

fn dispatch(
    descriptor: &str,
    a: &Tensor,
    b: &Tensor,
    options: Option<&ContractOptions>,
    out: OutputSpec<'_>,
) -> Result<Option<Tensor>> {
    let subs = parse_subscripts(descriptor)?;

    if subs.a.len() != a.rank() {
        return Err(ContractError::RankMismatch {
            operand: 'A',
            labels: subs.a.len(),
            rank: a.rank(),
        });
    }
    if subs.b.len() != b.rank() {
        return Err(ContractError::RankMismatch {
            operand: 'B',
            labels: subs.b.len(),
            rank: b.rank(),
        });
    }

    let opts = options.copied().unwrap_or_default();

    // Target dtype: explicit request or natural promotion, then lifted by
    // complex coefficients.
    let mut target = opts.dtype.unwrap_or_else(|| a.dtype().promote(b.dtype()));
    target = opts.alpha.promote_dtype(target);
    target = opts.beta.promote_dtype(target);

    match route::decide(&subs, a, b, options.is_some()) {
        Route::Native => native_dispatch(descriptor, &subs, a, b, target, &opts, out),
        Route::Reference(_) => reference_dispatch(descriptor, &subs, a, b, target, &opts, out),
    }
}

/// Native path: validate, resolve the output buffer, cast operands, and
/// hand the raw argument pack to the active primitive.
fn native_dispatch(
    descriptor: &str,
    subs: &Subscripts,
    a: &Tensor,
    b: &Tensor,
    target: DType,
    opts: &ContractOptions,
    out: OutputSpec<'_>,
) -> Result<Option<Tensor>> {
    let ic = subs.out.as_ref().expect("native route has explicit output");

    // Validates shared extents and derives the result shape; dimension
    // errors surface before any output allocation.
    let plan = ContractionPlan::new(descriptor, &subs.a, &subs.b, ic, a.shape(), b.shape())?;

    let mut allocated: Option<Tensor> = None;
    let out_t: &mut Tensor = match out {
        OutputSpec::Into(out) => {
            if out.dtype() != target {
                return Err(ContractError::OutputDtypeMismatch {
                    expected: target,
                    got: out.dtype(),
                });
            }
            if out.shape() != plan.out_shape.as_slice() {
                return Err(ContractError::OutputShapeMismatch {
                    expected: plan.out_shape.clone(),
                    got: out.shape().to_vec(),
                });
            }
            out
        }
        OutputSpec::Alloc(order) => {
            allocated.insert(Tensor::zeros(target, &plan.out_shape, order))
        }
    };

    // Cast to the target dtype where needed. Same-dtype operands pass
    // through with their original (arbitrary) strides; differing dtypes
    // get fresh contiguous temporaries, never aliasing caller storage.
    let a_cast = a.cast(target);
    let b_cast = b.cast(target);

    let ascii = |labels: &[char]| labels.iter().map(|&c| c as u8).collect::<Vec<u8>>();

    with_element_type!(target, T, {
        let av = a_cast.typed_view::<T>().expect("operand cast to target dtype");
        let bv = b_cast.typed_view::<T>().expect("operand cast to target dtype");
        let cv = out_t.typed_view_mut::<T>().expect("output dtype checked");

        let ra = RawOperand {
            ptr: av.ptr() as *const u8,
            shape: av.shape().to_vec(),
            strides: av.strides().to_vec(),
            labels: ascii(&subs.a),
        };
        let rb = RawOperand {
            ptr: bv.ptr() as *const u8,
            shape: bv.shape().to_vec(),
            strides: bv.strides().to_vec(),
            labels: ascii(&subs.b),
        };
        let rc = RawOperandMut {
            ptr: cv.as_mut_ptr() as *mut u8,
            shape: cv.shape().to_vec(),
            strides: cv.strides().to_vec(),
            labels: ascii(ic),
        };

        unsafe { ActivePrimitive::contract_into(&ra, &rb, &rc, target, opts.alpha, opts.beta) };
    });

    Ok(allocated)
}

/// Reference path: evaluate with the generic evaluator at the target
/// dtype, honoring `out`, `alpha`, `beta`, and `order` identically to the
/// native path.
fn reference_dispatch(
    descriptor: &str,
    subs: &Subscripts,
    a: &Tensor,
    b: &Tensor,
    target: DType,
    opts: &ContractOptions,
    out: OutputSpec<'_>,
) -> Result<Option<Tensor>> {
    let ic = subs.output_labels();

    with_element_type!(target, T, {
        let a_cast = a.cast(target);
        let b_cast = b.cast(target);
        let av = a_cast.typed_view::<T>().expect("operand cast to target dtype");
        let bv = b_cast.typed_view::<T>().expect("operand cast to target dtype");
        let alpha = T::from_scalar(opts.alpha);
        let beta = T::from_scalar(opts.beta);

        match out {
            OutputSpec::Into(out) => {
                if out.dtype() != target {
                    return Err(ContractError::OutputDtypeMismatch {
                        expected: target,
                        got: out.dtype(),
                    });
                }
                let ov = out.typed_view_mut::<T>().expect("output dtype checked");
                reference::einsum2_into(
                    ov, &av, &bv, &subs.a, &subs.b, &ic, alpha, beta, descriptor,
                )?;
                Ok(None)
            }
            OutputSpec::Alloc(order) => {
                let shape =
                    reference::output_shape(&subs.a, &subs.b, &ic, av.shape(), bv.shape())?;
                let mut c = StridedArray::<T>::zeros(&shape, order);
                reference::einsum2_into(
                    c.view_mut(),
                    &av,
                    &bv,
                    &subs.a,
                    &subs.b,
                    &ic,
                    alpha,
                    beta,
                    descriptor,
                )?;
                Ok(Some(T::wrap(c)))
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn tensor_f64(shape: &[usize], f: impl FnMut(&[usize]) -> f64) -> Tensor {
        StridedArray::<f64>::from_fn(shape, f).into()
    }

    #[test]
    fn test_contract_matmul() {
        let a = tensor_f64(&[2, 3], |idx| (idx[0] * 3 + idx[1] + 1) as f64);
        let b = tensor_f64(&[3, 2], |idx| (idx[0] * 2 + idx[1] + 1) as f64);
        let c = contract("ij,jk->ik", &a, &b).unwrap();
        assert_eq!(c.shape(), &[2, 2]);
        assert_abs_diff_eq!(c.get_c64(&[0, 0]).re, 22.0);
        assert_abs_diff_eq!(c.get_c64(&[1, 1]).re, 64.0);
    }

    #[test]
    fn test_contract_promotes_dtype() {
        let a: Tensor = StridedArray::<f32>::from_fn(&[2, 2], |_| 1.0).into();
        let b = tensor_f64(&[2, 2], |_| 1.0);
        let c = contract("ij,jk->ik", &a, &b).unwrap();
        assert_eq!(c.dtype(), DType::F64);
    }

    #[test]
    fn test_explicit_dtype() {
        let a = tensor_f64(&[2, 2], |_| 1.0);
        let b = tensor_f64(&[2, 2], |_| 1.0);
        let opts = ContractOptions {
            dtype: Some(DType::Complex64),
            ..Default::default()
        };
        let c = contract_with("ij,jk->ik", &a, &b, &opts).unwrap();
        assert_eq!(c.dtype(), DType::Complex64);
        assert_abs_diff_eq!(c.get_c64(&[0, 0]).re, 2.0);
    }

    #[test]
    fn test_complex_alpha_lifts_dtype() {
        let a = tensor_f64(&[2, 2], |_| 1.0);
        let b = tensor_f64(&[2, 2], |_| 1.0);
        let opts = ContractOptions {
            alpha: Scalar::Complex(num_complex::Complex64::new(0.0, 1.0)),
            ..Default::default()
        };
        let c = contract_with("ij,jk->ik", &a, &b, &opts).unwrap();
        assert_eq!(c.dtype(), DType::Complex64);
        assert_abs_diff_eq!(c.get_c64(&[0, 0]).im, 2.0);
        assert_abs_diff_eq!(c.get_c64(&[0, 0]).re, 0.0);
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = tensor_f64(&[2, 3], |_| 1.0);
        let b = tensor_f64(&[4, 2], |_| 1.0);
        let err = contract("ij,jk->ik", &a, &b).unwrap_err();
        assert!(matches!(err, ContractError::DimensionMismatch { label: 'j', .. }));
    }

    #[test]
    fn test_rank_mismatch() {
        let a = tensor_f64(&[2, 3, 4], |_| 1.0);
        let b = tensor_f64(&[3, 2], |_| 1.0);
        let err = contract("ij,jk->ik", &a, &b).unwrap_err();
        assert!(matches!(
            err,
            ContractError::RankMismatch { operand: 'A', labels: 2, rank: 3 }
        ));
    }

    #[test]
    fn test_contract_into_dtype_guard() {
        let a = tensor_f64(&[2, 2], |_| 1.0);
        let b = tensor_f64(&[2, 2], |_| 1.0);
        let mut out = Tensor::zeros(DType::F32, &[2, 2], Layout::RowMajor);
        let err = contract_into("ij,jk->ik", &a, &b, &mut out, &ContractOptions::default())
            .unwrap_err();
        assert!(matches!(err, ContractError::OutputDtypeMismatch { .. }));
    }

    #[test]
    fn test_contract_into_shape_guard() {
        let a = tensor_f64(&[2, 2], |_| 1.0);
        let b = tensor_f64(&[2, 2], |_| 1.0);
        let mut out = Tensor::zeros(DType::F64, &[2, 3], Layout::RowMajor);
        let err = contract_into("ij,jk->ik", &a, &b, &mut out, &ContractOptions::default())
            .unwrap_err();
        assert!(matches!(err, ContractError::OutputShapeMismatch { .. }));
    }

    #[test]
    fn test_contract_into_accumulates() {
        let a = tensor_f64(&[2, 2], |idx| if idx[0] == idx[1] { 1.0 } else { 0.0 });
        let b = tensor_f64(&[2, 2], |idx| (idx[0] * 2 + idx[1] + 1) as f64);
        let mut out = tensor_f64(&[2, 2], |_| 10.0);
        let opts = ContractOptions {
            alpha: Scalar::Real(2.0),
            beta: Scalar::Real(3.0),
            ..Default::default()
        };
        contract_into("ij,jk->ik", &a, &b, &mut out, &opts).unwrap();
        // out = 2*B + 3*10
        assert_abs_diff_eq!(out.get_c64(&[0, 0]).re, 32.0);
        assert_abs_diff_eq!(out.get_c64(&[1, 1]).re, 38.0);
    }

    #[test]
    fn test_col_major_result() {
        let a = tensor_f64(&[2, 3], |idx| (idx[0] * 3 + idx[1]) as f64);
        let b = tensor_f64(&[3, 4], |idx| (idx[0] * 4 + idx[1]) as f64);
        let opts = ContractOptions {
            order: Layout::ColMajor,
            ..Default::default()
        };
        let c = contract_with("ij,jk->ik", &a, &b, &opts).unwrap();
        assert_eq!(c.strides(), &[1, 2]);
        let r = contract("ij,jk->ik", &a, &b).unwrap();
        for i in 0..2 {
            for k in 0..4 {
                assert_abs_diff_eq!(c.get_c64(&[i, k]).re, r.get_c64(&[i, k]).re);
            }
        }
    }

    #[test]
    fn test_outer_product_fallback() {
        let a = tensor_f64(&[3], |idx| (idx[0] + 1) as f64);
        let b = tensor_f64(&[4], |idx| (idx[0] + 1) as f64);
        let c = contract("i,j->ij", &a, &b).unwrap();
        assert_eq!(c.shape(), &[3, 4]);
        assert_abs_diff_eq!(c.get_c64(&[2, 3]).re, 12.0);
    }

    #[test]
    fn test_implicit_descriptor() {
        let a = tensor_f64(&[2, 3], |idx| (idx[0] * 3 + idx[1] + 1) as f64);
        let b = tensor_f64(&[3, 2], |idx| (idx[0] * 2 + idx[1] + 1) as f64);
        let c = contract("ij,jk", &a, &b).unwrap();
        let explicit = contract("ij,jk->ik", &a, &b).unwrap();
        assert_eq!(c.shape(), explicit.shape());
        for i in 0..2 {
            for k in 0..2 {
                assert_abs_diff_eq!(c.get_c64(&[i, k]).re, explicit.get_c64(&[i, k]).re);
            }
        }
    }
}
