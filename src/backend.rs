//! The native contraction-primitive boundary.
//!
//! The dispatcher hands the primitive one argument pack per operand: base
//! pointer, rank, shape vector, signed element-stride vector, and an ASCII
//! label string of exactly `rank` bytes (no NUL terminator), plus a type
//! code and the two scale coefficients. The primitive executes
//! `C = alpha * contract(A, B) + beta * C` in place.
//!
//! With the `tblis` feature the pack crosses into `libtblis_einsum`
//! ([`TblisPrimitive`]). The default build routes the identical pack to
//! [`LoopPrimitive`], an in-process interpreter, so the dispatch plumbing
//! is exercised without the native library.

use crate::dtype::{DType, Element, Scalar};
use crate::tensor::with_element_type;

/// Raw description of an input operand at the primitive boundary.
#[derive(Debug)]
pub struct RawOperand {
    pub ptr: *const u8,
    pub shape: Vec<usize>,
    pub strides: Vec<isize>,
    /// One ASCII byte per axis.
    pub labels: Vec<u8>,
}

/// Raw description of the output operand.
#[derive(Debug)]
pub struct RawOperandMut {
    pub ptr: *mut u8,
    pub shape: Vec<usize>,
    pub strides: Vec<isize>,
    pub labels: Vec<u8>,
}

/// A scaled binary-contraction primitive.
pub trait ContractPrimitive {
    /// Execute `c = alpha * contract(a, b) + beta * c`.
    ///
    /// # Safety
    /// Every pointer must address valid storage of `dtype` elements
    /// covering all offsets reachable through the paired shape/strides,
    /// and `c` must not overlap `a` or `b`.
    unsafe fn contract_into(
        a: &RawOperand,
        b: &RawOperand,
        c: &RawOperandMut,
        dtype: DType,
        alpha: Scalar,
        beta: Scalar,
    );
}

/// In-process stand-in for the native primitive.
///
/// Interprets the label strings directly: iterates the output index space
/// and accumulates over the contracted labels. Assumes the dispatcher's
/// guards already hold (every label occurs exactly twice across the three
/// groups, no in-operand repeats).
pub struct LoopPrimitive;

impl ContractPrimitive for LoopPrimitive {
    unsafe fn contract_into(
        a: &RawOperand,
        b: &RawOperand,
        c: &RawOperandMut,
        dtype: DType,
        alpha: Scalar,
        beta: Scalar,
    ) {
        with_element_type!(dtype, T, {
            loop_contract::<T>(a, b, c, T::from_scalar(alpha), T::from_scalar(beta))
        })
    }
}

/// Per-axis stride of `operand` against an index tuple over `labels`.
fn strides_for_labels(labels: &[u8], operand_labels: &[u8], operand_strides: &[isize]) -> Vec<isize> {
    labels
        .iter()
        .map(|&l| {
            operand_labels
                .iter()
                .position(|&x| x == l)
                .map(|i| operand_strides[i])
                .unwrap_or(0)
        })
        .collect()
}

unsafe fn loop_contract<T: Element>(
    a: &RawOperand,
    b: &RawOperand,
    c: &RawOperandMut,
    alpha: T,
    beta: T,
) {
    let a_ptr = a.ptr as *const T;
    let b_ptr = b.ptr as *const T;
    let c_ptr = c.ptr as *mut T;

    // Labels summed over: in an input but not in the output.
    let mut sum_labels: Vec<u8> = Vec::new();
    let mut sum_shape: Vec<usize> = Vec::new();
    for (ops, shapes) in [(&a.labels, &a.shape), (&b.labels, &b.shape)] {
        for (&l, &d) in ops.iter().zip(shapes.iter()) {
            if !c.labels.contains(&l) && !sum_labels.contains(&l) {
                sum_labels.push(l);
                sum_shape.push(d);
            }
        }
    }

    let a_out_strides = strides_for_labels(&c.labels, &a.labels, &a.strides);
    let b_out_strides = strides_for_labels(&c.labels, &b.labels, &b.strides);
    let a_sum_strides = strides_for_labels(&sum_labels, &a.labels, &a.strides);
    let b_sum_strides = strides_for_labels(&sum_labels, &b.labels, &b.strides);

    let mut out_iter = crate::kernel::MultiIndex::new(&c.shape);
    let mut sum_iter = crate::kernel::MultiIndex::new(&sum_shape);
    while out_iter.next().is_some() {
        let a_base = out_iter.offset(&a_out_strides);
        let b_base = out_iter.offset(&b_out_strides);
        let c_off = out_iter.offset(&c.strides);

        let mut acc = T::zero();
        sum_iter.reset();
        while sum_iter.next().is_some() {
            let a_val = *a_ptr.offset(a_base + sum_iter.offset(&a_sum_strides));
            let b_val = *b_ptr.offset(b_base + sum_iter.offset(&b_sum_strides));
            acc = acc + a_val * b_val;
        }

        let c_elem = c_ptr.offset(c_off);
        if beta == T::zero() {
            *c_elem = alpha * acc;
        } else {
            *c_elem = alpha * acc + beta * *c_elem;
        }
    }
}

/// Primitive backed by `libtblis_einsum` through FFI.
#[cfg(feature = "tblis")]
pub struct TblisPrimitive;

#[cfg(feature = "tblis")]
impl ContractPrimitive for TblisPrimitive {
    unsafe fn contract_into(
        a: &RawOperand,
        b: &RawOperand,
        c: &RawOperandMut,
        dtype: DType,
        alpha: Scalar,
        beta: Scalar,
    ) {
        use libc::{c_char, c_int, c_void};

        with_element_type!(dtype, T, {
            let alpha_t = T::from_scalar(alpha);
            let beta_t = T::from_scalar(beta);
            crate::ffi::as_einsum(
                a.ptr as *const c_void,
                a.shape.len() as c_int,
                a.shape.as_ptr(),
                a.strides.as_ptr(),
                a.labels.as_ptr() as *const c_char,
                b.ptr as *const c_void,
                b.shape.len() as c_int,
                b.shape.as_ptr(),
                b.strides.as_ptr(),
                b.labels.as_ptr() as *const c_char,
                c.ptr as *mut c_void,
                c.shape.len() as c_int,
                c.shape.as_ptr(),
                c.strides.as_ptr(),
                c.labels.as_ptr() as *const c_char,
                dtype.native_code() as c_int,
                &alpha_t as *const T as *const c_void,
                &beta_t as *const T as *const c_void,
            );
        })
    }
}

/// The primitive the dispatcher targets, selected by Cargo features.
#[cfg(feature = "tblis")]
pub type ActivePrimitive = TblisPrimitive;

#[cfg(not(feature = "tblis"))]
pub type ActivePrimitive = LoopPrimitive;
