//! Einsum dispatch for the TBLIS tensor-contraction library.
//!
//! Routes two-operand Einstein-summation expressions between an optimized
//! native contraction primitive and a generic reference evaluator:
//!
//! - parses `"ij,jk->ik"`-style subscript descriptors,
//! - negotiates a floating-point target element type per call,
//! - derives output shape and strides, honoring caller-supplied buffers,
//! - issues one scaled contraction `C = alpha * contract(A, B) + beta * C`.
//!
//! Expressions the native primitive cannot express (implicit outputs,
//! in-operand diagonals, pure outer products, small operands) silently
//! fall back to the reference evaluator, which implements full einsum
//! semantics and doubles as the correctness oracle.
//!
//! # Example
//!
//! ```
//! use tblis_einsum::{contract, StridedArray, Tensor};
//!
//! let a: Tensor = StridedArray::<f64>::from_fn(&[2, 3], |idx| {
//!     (idx[0] * 3 + idx[1] + 1) as f64
//! })
//! .into();
//! let b: Tensor = StridedArray::<f64>::from_fn(&[3, 2], |idx| {
//!     (idx[0] * 2 + idx[1] + 1) as f64
//! })
//! .into();
//!
//! let c = contract("ij,jk->ik", &a, &b).unwrap();
//! assert_eq!(c.shape(), &[2, 2]);
//! assert_eq!(c.get_c64(&[0, 0]).re, 22.0);
//! ```
//!
//! The `tblis` feature links `libtblis_einsum` for the native path; the
//! default build substitutes an in-process primitive at the same call
//! boundary, so routing and dispatch behave identically either way.

/// The native contraction-primitive boundary and its implementations.
pub mod backend;
/// Naive batched GEMM kernel for the reference pipeline.
pub mod bgemm;
/// Process-wide routing threshold.
pub mod config;
mod contract;
/// Element type tags, promotion rules, and native type codes.
pub mod dtype;
mod error;
#[cfg(feature = "tblis")]
mod ffi;
/// Strided iteration helpers.
pub mod kernel;
/// Subscript descriptor parsing.
pub mod parse;
/// Label classification and canonical permutations.
pub mod plan;
/// Generic Einstein-summation reference evaluator.
pub mod reference;
/// Routing guards between native dispatch and the reference evaluator.
pub mod route;
mod tensor;
mod view;

pub use contract::{contract, contract_into, contract_with, ContractOptions};
pub use dtype::{DType, Element, Scalar};
pub use error::{ContractError, Result, StridedError};
pub use route::{FallbackReason, Route};
pub use tensor::{Tensor, TensorElement};
pub use view::{
    col_major_strides, row_major_strides, Layout, StridedArray, StridedView, StridedViewMut,
};
