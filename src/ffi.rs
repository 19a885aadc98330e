//! Raw binding to the `libtblis_einsum` shim.
//!
//! One entry point: a scaled binary contraction over strided operands.
//! Shape vectors are unsigned element counts; stride vectors are signed
//! element steps; label strings are exactly `ndim` bytes, not
//! NUL-terminated. `alpha`/`beta` point at scalars of the coded type.

use libc::{c_char, c_int, c_void};

#[link(name = "tblis_einsum")]
extern "C" {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn as_einsum(
        a: *const c_void,
        a_ndim: c_int,
        a_shape: *const usize,
        a_strides: *const isize,
        a_labels: *const c_char,
        b: *const c_void,
        b_ndim: c_int,
        b_shape: *const usize,
        b_strides: *const isize,
        b_labels: *const c_char,
        c: *mut c_void,
        c_ndim: c_int,
        c_shape: *const usize,
        c_strides: *const isize,
        c_labels: *const c_char,
        dtype: c_int,
        alpha: *const c_void,
        beta: *const c_void,
    );
}
