//! Element type tags, promotion, and native type codes.
//!
//! The dispatcher negotiates a single target element type per call. Tensors
//! carry an explicit [`DType`] tag; the native primitive identifies types by
//! an integer code from a fixed table. Only real and complex floating types
//! exist here, so the "native path supports floating types only" rule holds
//! by construction.

use num_complex::{Complex32, Complex64};

/// Element type tag for runtime-typed tensors.
///
/// `Complex32`/`Complex64` follow the `num_complex` naming (component
/// width), not the total-width convention some environments use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    F32,
    F64,
    Complex32,
    Complex64,
}

impl DType {
    /// Native type code understood by the contraction primitive.
    pub const fn native_code(self) -> i32 {
        match self {
            DType::F32 => 0,
            DType::F64 => 1,
            DType::Complex32 => 2,
            DType::Complex64 => 3,
        }
    }

    /// Size of one element in bytes.
    pub const fn size_of(self) -> usize {
        match self {
            DType::F32 => 4,
            DType::F64 => 8,
            DType::Complex32 => 8,
            DType::Complex64 => 16,
        }
    }

    pub const fn is_complex(self) -> bool {
        matches!(self, DType::Complex32 | DType::Complex64)
    }

    /// Component precision in bits (32 or 64).
    const fn width(self) -> u8 {
        match self {
            DType::F32 | DType::Complex32 => 32,
            DType::F64 | DType::Complex64 => 64,
        }
    }

    const fn from_parts(complex: bool, width: u8) -> DType {
        match (complex, width) {
            (false, 32) => DType::F32,
            (false, _) => DType::F64,
            (true, 32) => DType::Complex32,
            (true, _) => DType::Complex64,
        }
    }

    /// Complex counterpart at the same precision; identity for complex tags.
    pub const fn to_complex(self) -> DType {
        DType::from_parts(true, self.width())
    }

    /// Natural promoted type of two operands: complex wins, wider
    /// precision wins.
    pub const fn promote(self, other: DType) -> DType {
        let complex = self.is_complex() || other.is_complex();
        let width = if self.width() > other.width() {
            self.width()
        } else {
            other.width()
        };
        DType::from_parts(complex, width)
    }
}

/// Runtime scale coefficient for `alpha` / `beta`.
///
/// Scalars are "weak" in promotion: a real scalar never widens the target
/// dtype, while a complex scalar lifts a real target to its complex
/// counterpart at the same precision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Real(f64),
    Complex(Complex64),
}

impl Scalar {
    pub fn is_complex(self) -> bool {
        matches!(self, Scalar::Complex(c) if c.im != 0.0)
    }

    /// Value as a `Complex64`, the widest representation.
    pub fn as_c64(self) -> Complex64 {
        match self {
            Scalar::Real(x) => Complex64::new(x, 0.0),
            Scalar::Complex(c) => c,
        }
    }

    /// Apply weak-scalar promotion to a target dtype.
    pub fn promote_dtype(self, dtype: DType) -> DType {
        if self.is_complex() {
            dtype.to_complex()
        } else {
            dtype
        }
    }
}

impl From<f64> for Scalar {
    fn from(x: f64) -> Self {
        Scalar::Real(x)
    }
}

impl From<f32> for Scalar {
    fn from(x: f32) -> Self {
        Scalar::Real(x as f64)
    }
}

impl From<Complex64> for Scalar {
    fn from(c: Complex64) -> Self {
        Scalar::Complex(c)
    }
}

/// Element types usable with the strided kernels and the reference
/// evaluator.
///
/// `from_c64`/`to_c64` route cross-dtype casts through the widest type;
/// a complex-to-real cast keeps the real component.
pub trait Element:
    Copy
    + Send
    + Sync
    + Default
    + std::fmt::Debug
    + std::ops::Add<Output = Self>
    + std::ops::Mul<Output = Self>
    + num_traits::Zero
    + num_traits::One
    + PartialEq
    + 'static
{
    const DTYPE: DType;

    fn from_c64(c: Complex64) -> Self;
    fn to_c64(self) -> Complex64;

    fn from_scalar(s: Scalar) -> Self {
        Self::from_c64(s.as_c64())
    }
}

impl Element for f32 {
    const DTYPE: DType = DType::F32;

    fn from_c64(c: Complex64) -> Self {
        c.re as f32
    }
    fn to_c64(self) -> Complex64 {
        Complex64::new(self as f64, 0.0)
    }
}

impl Element for f64 {
    const DTYPE: DType = DType::F64;

    fn from_c64(c: Complex64) -> Self {
        c.re
    }
    fn to_c64(self) -> Complex64 {
        Complex64::new(self, 0.0)
    }
}

impl Element for Complex32 {
    const DTYPE: DType = DType::Complex32;

    fn from_c64(c: Complex64) -> Self {
        Complex32::new(c.re as f32, c.im as f32)
    }
    fn to_c64(self) -> Complex64 {
        Complex64::new(self.re as f64, self.im as f64)
    }
}

impl Element for Complex64 {
    const DTYPE: DType = DType::Complex64;

    fn from_c64(c: Complex64) -> Self {
        c
    }
    fn to_c64(self) -> Complex64 {
        self
    }
}
