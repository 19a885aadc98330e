//! Runtime-typed dense tensors.
//!
//! [`Tensor`] erases the element type of a [`StridedArray`] behind the
//! [`DType`] tag so the dispatcher can negotiate element types per call.
//! Generic code re-enters the typed world through [`TensorElement`] or the
//! `with_element_type!` dispatch macro.

use std::borrow::Cow;

use num_complex::{Complex32, Complex64};

use crate::dtype::{DType, Element};
use crate::error::Result;
use crate::kernel;
use crate::view::{Layout, StridedArray, StridedView, StridedViewMut};

/// Expand `$body` once per supported element type, with `$T` bound to the
/// concrete type selected by the runtime `$dtype` tag.
macro_rules! with_element_type {
    ($dtype:expr, $T:ident, $body:block) => {
        match $dtype {
            $crate::DType::F32 => {
                type $T = f32;
                $body
            }
            $crate::DType::F64 => {
                type $T = f64;
                $body
            }
            $crate::DType::Complex32 => {
                type $T = ::num_complex::Complex32;
                $body
            }
            $crate::DType::Complex64 => {
                type $T = ::num_complex::Complex64;
                $body
            }
        }
    };
}
pub(crate) use with_element_type;

macro_rules! each_variant {
    ($t:expr, $arr:ident => $body:expr) => {
        match $t {
            Tensor::F32($arr) => $body,
            Tensor::F64($arr) => $body,
            Tensor::Complex32($arr) => $body,
            Tensor::Complex64($arr) => $body,
        }
    };
}

/// Dense strided tensor with a runtime element type.
#[derive(Debug, Clone)]
pub enum Tensor {
    F32(StridedArray<f32>),
    F64(StridedArray<f64>),
    Complex32(StridedArray<Complex32>),
    Complex64(StridedArray<Complex64>),
}

impl Tensor {
    /// Allocate a zero-filled tensor of the given dtype and order.
    pub fn zeros(dtype: DType, shape: &[usize], layout: Layout) -> Tensor {
        with_element_type!(dtype, T, { T::wrap(StridedArray::<T>::zeros(shape, layout)) })
    }

    pub fn dtype(&self) -> DType {
        match self {
            Tensor::F32(_) => DType::F32,
            Tensor::F64(_) => DType::F64,
            Tensor::Complex32(_) => DType::Complex32,
            Tensor::Complex64(_) => DType::Complex64,
        }
    }

    pub fn shape(&self) -> &[usize] {
        each_variant!(self, arr => arr.shape())
    }

    pub fn strides(&self) -> &[isize] {
        each_variant!(self, arr => arr.strides())
    }

    pub fn rank(&self) -> usize {
        self.shape().len()
    }

    /// Total element count (1 for rank 0).
    pub fn len(&self) -> usize {
        each_variant!(self, arr => arr.len())
    }

    pub fn is_empty(&self) -> bool {
        each_variant!(self, arr => arr.is_empty())
    }

    /// Read one element, widened to `Complex64`.
    pub fn get_c64(&self, indices: &[usize]) -> Complex64 {
        each_variant!(self, arr => arr.get(indices).to_c64())
    }

    /// Reorder axes (metadata only).
    pub fn permuted(self, perm: &[usize]) -> Result<Tensor> {
        Ok(each_variant!(self, arr => TensorElement::wrap(arr.permuted(perm)?)))
    }

    /// Typed view of the underlying array, if `T` matches the tag.
    pub fn typed_view<T: TensorElement>(&self) -> Option<StridedView<'_, T>> {
        T::unwrap(self).map(|arr| arr.view())
    }

    /// Typed mutable view of the underlying array, if `T` matches the tag.
    pub fn typed_view_mut<T: TensorElement>(&mut self) -> Option<StridedViewMut<'_, T>> {
        T::unwrap_mut(self).map(|arr| arr.view_mut())
    }

    /// Convert to the requested dtype.
    ///
    /// Same dtype borrows the original unchanged (arbitrary strides
    /// included); a differing dtype materializes a fresh contiguous
    /// row-major copy, never aliasing the source storage. Complex-to-real
    /// keeps the real component.
    pub fn cast(&self, dtype: DType) -> Cow<'_, Tensor> {
        if self.dtype() == dtype {
            return Cow::Borrowed(self);
        }
        Cow::Owned(with_element_type!(dtype, T, {
            T::wrap(self.cast_array::<T>())
        }))
    }

    fn cast_array<T: TensorElement>(&self) -> StridedArray<T> {
        each_variant!(self, arr => {
            let mut out = StridedArray::<T>::zeros(arr.shape(), Layout::RowMajor);
            kernel::map_into(&mut out.view_mut(), &arr.view(), |x| T::from_c64(x.to_c64()))
                .expect("shapes match by construction");
            out
        })
    }
}

/// Element types that have a [`Tensor`] variant.
pub trait TensorElement: Element {
    fn wrap(arr: StridedArray<Self>) -> Tensor;
    fn unwrap(t: &Tensor) -> Option<&StridedArray<Self>>;
    fn unwrap_mut(t: &mut Tensor) -> Option<&mut StridedArray<Self>>;
}

macro_rules! impl_tensor_element {
    ($ty:ty, $variant:ident) => {
        impl TensorElement for $ty {
            fn wrap(arr: StridedArray<Self>) -> Tensor {
                Tensor::$variant(arr)
            }
            fn unwrap(t: &Tensor) -> Option<&StridedArray<Self>> {
                match t {
                    Tensor::$variant(arr) => Some(arr),
                    _ => None,
                }
            }
            fn unwrap_mut(t: &mut Tensor) -> Option<&mut StridedArray<Self>> {
                match t {
                    Tensor::$variant(arr) => Some(arr),
                    _ => None,
                }
            }
        }

        impl From<StridedArray<$ty>> for Tensor {
            fn from(arr: StridedArray<$ty>) -> Tensor {
                Tensor::$variant(arr)
            }
        }
    };
}

impl_tensor_element!(f32, F32);
impl_tensor_element!(f64, F64);
impl_tensor_element!(Complex32, Complex32);
impl_tensor_element!(Complex64, Complex64);
