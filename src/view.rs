//! Dynamic-rank strided views and owned arrays.
//!
//! The data model the dispatcher operates on: a tensor is a base pointer
//! plus a shape vector and a signed element-stride vector. Strides may be
//! negative, out of order, or overlapping; all reachable offsets are
//! validated against the backing buffer at construction time.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::StridedError;

type Result<T> = std::result::Result<T, StridedError>;

/// Memory order for freshly allocated arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    /// C order: last index varies fastest.
    #[default]
    RowMajor,
    /// Fortran order: first index varies fastest.
    ColMajor,
}

impl Layout {
    /// Contiguous element strides for `shape` in this order.
    pub fn strides_for(self, shape: &[usize]) -> Vec<isize> {
        match self {
            Layout::RowMajor => row_major_strides(shape),
            Layout::ColMajor => col_major_strides(shape),
        }
    }
}

/// Compute row-major (C order) strides.
pub fn row_major_strides(shape: &[usize]) -> Vec<isize> {
    let rank = shape.len();
    if rank == 0 {
        return vec![];
    }
    let mut strides = vec![1isize; rank];
    for i in (0..rank - 1).rev() {
        strides[i] = strides[i + 1] * shape[i + 1] as isize;
    }
    strides
}

/// Compute column-major (Fortran order) strides.
pub fn col_major_strides(shape: &[usize]) -> Vec<isize> {
    let rank = shape.len();
    if rank == 0 {
        return vec![];
    }
    let mut strides = vec![1isize; rank];
    for i in 1..rank {
        strides[i] = strides[i - 1] * shape[i - 1] as isize;
    }
    strides
}

/// Validate that every reachable offset stays within `[0, len)`.
fn validate_bounds(len: usize, shape: &[usize], strides: &[isize], offset: isize) -> Result<()> {
    if shape.len() != strides.len() {
        return Err(StridedError::StrideLengthMismatch);
    }
    // Empty tensors access nothing.
    if shape.iter().any(|&d| d == 0) {
        return Ok(());
    }
    let mut min_offset = offset;
    let mut max_offset = offset;
    for (&dim, &stride) in shape.iter().zip(strides.iter()) {
        if dim > 1 {
            let end = stride
                .checked_mul(dim as isize - 1)
                .ok_or(StridedError::OffsetOverflow)?;
            if end >= 0 {
                max_offset = max_offset
                    .checked_add(end)
                    .ok_or(StridedError::OffsetOverflow)?;
            } else {
                min_offset = min_offset
                    .checked_add(end)
                    .ok_or(StridedError::OffsetOverflow)?;
            }
        }
    }
    if min_offset < 0 || max_offset < 0 || max_offset as usize >= len {
        return Err(StridedError::OffsetOverflow);
    }
    Ok(())
}

fn validated_perm(perm: &[usize], rank: usize) -> Result<()> {
    if perm.len() != rank {
        return Err(StridedError::RankMismatch(perm.len(), rank));
    }
    let mut seen = vec![false; rank];
    for &p in perm {
        if p >= rank || seen[p] {
            return Err(StridedError::InvalidAxis { axis: p, rank });
        }
        seen[p] = true;
    }
    Ok(())
}

// ============================================================================
// StridedView
// ============================================================================

/// Immutable dynamic-rank strided view.
pub struct StridedView<'a, T> {
    ptr: *const T,
    shape: Arc<[usize]>,
    strides: Arc<[isize]>,
    _marker: PhantomData<&'a [T]>,
}

unsafe impl<T: Sync> Send for StridedView<'_, T> {}
unsafe impl<T: Sync> Sync for StridedView<'_, T> {}

impl<T> Clone for StridedView<'_, T> {
    fn clone(&self) -> Self {
        Self {
            ptr: self.ptr,
            shape: self.shape.clone(),
            strides: self.strides.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for StridedView<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StridedView")
            .field("shape", &self.shape)
            .field("strides", &self.strides)
            .finish()
    }
}

impl<'a, T> StridedView<'a, T> {
    /// Create a view over a borrowed buffer with bounds checking.
    pub fn new(data: &'a [T], shape: &[usize], strides: &[isize], offset: isize) -> Result<Self> {
        validate_bounds(data.len(), shape, strides, offset)?;
        let ptr = unsafe { data.as_ptr().offset(offset) };
        Ok(Self {
            ptr,
            shape: Arc::from(shape),
            strides: Arc::from(strides),
            _marker: PhantomData,
        })
    }

    /// Create a view from a raw base pointer.
    ///
    /// # Safety
    /// `ptr` must stay valid for `'a` and every offset reachable through
    /// `shape`/`strides` must lie inside the allocation.
    pub unsafe fn from_raw(ptr: *const T, shape: &[usize], strides: &[isize]) -> Self {
        Self {
            ptr,
            shape: Arc::from(shape),
            strides: Arc::from(strides),
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[inline]
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    #[inline]
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Total element count (1 for rank 0).
    #[inline]
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.shape.iter().any(|&d| d == 0)
    }

    /// Base pointer of the view.
    #[inline]
    pub fn ptr(&self) -> *const T {
        self.ptr
    }

    /// Reorder axes (metadata only).
    pub fn permute(&self, perm: &[usize]) -> Result<StridedView<'a, T>> {
        validated_perm(perm, self.rank())?;
        let shape: Vec<usize> = perm.iter().map(|&p| self.shape[p]).collect();
        let strides: Vec<isize> = perm.iter().map(|&p| self.strides[p]).collect();
        Ok(StridedView {
            ptr: self.ptr,
            shape: Arc::from(shape),
            strides: Arc::from(strides),
            _marker: PhantomData,
        })
    }

    /// Fuse repeated axis pairs into diagonals via the stride trick
    /// (zero-copy).
    ///
    /// For each pair `(a, b)` (original axis numbering) the surviving axis
    /// gets stride `strides[a] + strides[b]` and extent
    /// `min(shape[a], shape[b])`; the higher-numbered axis is removed.
    pub fn diagonal(&self, axis_pairs: &[(usize, usize)]) -> Result<StridedView<'a, T>> {
        let rank = self.rank();
        let mut shape: Vec<usize> = self.shape.to_vec();
        let mut strides: Vec<isize> = self.strides.to_vec();

        let mut removed = Vec::new();
        for &(a, b) in axis_pairs {
            let (lo, hi) = if a < b { (a, b) } else { (b, a) };
            if hi >= rank || lo == hi {
                return Err(StridedError::InvalidAxis { axis: hi, rank });
            }
            strides[lo] += strides[hi];
            shape[lo] = shape[lo].min(shape[hi]);
            removed.push(hi);
        }

        removed.sort_unstable();
        removed.dedup();
        for &ax in removed.iter().rev() {
            shape.remove(ax);
            strides.remove(ax);
        }

        Ok(StridedView {
            ptr: self.ptr,
            shape: Arc::from(shape),
            strides: Arc::from(strides),
            _marker: PhantomData,
        })
    }
}

impl<T: Copy> StridedView<'_, T> {
    /// Read one element.
    pub fn get(&self, indices: &[usize]) -> T {
        assert_eq!(indices.len(), self.rank(), "wrong number of indices");
        let mut off = 0isize;
        for (i, &index) in indices.iter().enumerate() {
            assert!(index < self.shape[i], "index out of bounds");
            off += index as isize * self.strides[i];
        }
        unsafe { *self.ptr.offset(off) }
    }
}

// ============================================================================
// StridedViewMut
// ============================================================================

/// Mutable dynamic-rank strided view.
pub struct StridedViewMut<'a, T> {
    ptr: *mut T,
    shape: Arc<[usize]>,
    strides: Arc<[isize]>,
    _marker: PhantomData<&'a mut [T]>,
}

unsafe impl<T: Send> Send for StridedViewMut<'_, T> {}

impl<T: std::fmt::Debug> std::fmt::Debug for StridedViewMut<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StridedViewMut")
            .field("shape", &self.shape)
            .field("strides", &self.strides)
            .finish()
    }
}

impl<'a, T> StridedViewMut<'a, T> {
    /// Create a mutable view with bounds checking.
    pub fn new(
        data: &'a mut [T],
        shape: &[usize],
        strides: &[isize],
        offset: isize,
    ) -> Result<Self> {
        validate_bounds(data.len(), shape, strides, offset)?;
        let ptr = unsafe { data.as_mut_ptr().offset(offset) };
        Ok(Self {
            ptr,
            shape: Arc::from(shape),
            strides: Arc::from(strides),
            _marker: PhantomData,
        })
    }

    /// Create a mutable view from a raw base pointer.
    ///
    /// # Safety
    /// Same contract as [`StridedView::from_raw`], plus exclusive access.
    pub unsafe fn from_raw(ptr: *mut T, shape: &[usize], strides: &[isize]) -> Self {
        Self {
            ptr,
            shape: Arc::from(shape),
            strides: Arc::from(strides),
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[inline]
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    #[inline]
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.shape.iter().any(|&d| d == 0)
    }

    #[inline]
    pub fn as_mut_ptr(&self) -> *mut T {
        self.ptr
    }

    /// Reorder axes, consuming the view to keep mutable access unique.
    pub fn permute(self, perm: &[usize]) -> Result<StridedViewMut<'a, T>> {
        validated_perm(perm, self.rank())?;
        let shape: Vec<usize> = perm.iter().map(|&p| self.shape[p]).collect();
        let strides: Vec<isize> = perm.iter().map(|&p| self.strides[p]).collect();
        Ok(StridedViewMut {
            ptr: self.ptr,
            shape: Arc::from(shape),
            strides: Arc::from(strides),
            _marker: PhantomData,
        })
    }

    /// Reborrow as an immutable view.
    pub fn as_view(&self) -> StridedView<'_, T> {
        StridedView {
            ptr: self.ptr,
            shape: self.shape.clone(),
            strides: self.strides.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Copy> StridedViewMut<'_, T> {
    pub fn get(&self, indices: &[usize]) -> T {
        self.as_view().get(indices)
    }

    pub fn set(&mut self, indices: &[usize], value: T) {
        assert_eq!(indices.len(), self.rank(), "wrong number of indices");
        let mut off = 0isize;
        for (i, &index) in indices.iter().enumerate() {
            assert!(index < self.shape[i], "index out of bounds");
            off += index as isize * self.strides[i];
        }
        unsafe { *self.ptr.offset(off) = value }
    }
}

// ============================================================================
// StridedArray
// ============================================================================

/// Owned strided array. The backing buffer may be viewed through arbitrary
/// strides, so slices, transposes, and reversed axes of a larger buffer are
/// all representable without copying.
pub struct StridedArray<T> {
    data: Vec<T>,
    shape: Arc<[usize]>,
    strides: Arc<[isize]>,
    offset: isize,
}

impl<T: std::fmt::Debug> std::fmt::Debug for StridedArray<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StridedArray")
            .field("shape", &self.shape)
            .field("strides", &self.strides)
            .field("offset", &self.offset)
            .finish()
    }
}

impl<T: Clone> Clone for StridedArray<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            shape: self.shape.clone(),
            strides: self.strides.clone(),
            offset: self.offset,
        }
    }
}

impl<T: Clone + Default> StridedArray<T> {
    /// Allocate a contiguous array of default values in the given order.
    pub fn zeros(shape: &[usize], layout: Layout) -> Self {
        let total: usize = shape.iter().product();
        Self {
            data: vec![T::default(); total],
            shape: Arc::from(shape),
            strides: Arc::from(layout.strides_for(shape)),
            offset: 0,
        }
    }

    /// Build a row-major array from a function of the index tuple.
    pub fn from_fn(shape: &[usize], mut f: impl FnMut(&[usize]) -> T) -> Self {
        let total: usize = shape.iter().product();
        let rank = shape.len();
        let mut data = Vec::with_capacity(total);
        let mut idx = vec![0usize; rank];
        for _ in 0..total {
            data.push(f(&idx));
            for d in (0..rank).rev() {
                idx[d] += 1;
                if idx[d] < shape[d] {
                    break;
                }
                idx[d] = 0;
            }
        }
        Self {
            data,
            shape: Arc::from(shape),
            strides: Arc::from(row_major_strides(shape)),
            offset: 0,
        }
    }
}

impl<T> StridedArray<T> {
    /// Assemble an array from a buffer and explicit layout metadata.
    pub fn from_parts(
        data: Vec<T>,
        shape: &[usize],
        strides: &[isize],
        offset: isize,
    ) -> Result<Self> {
        validate_bounds(data.len(), shape, strides, offset)?;
        Ok(Self {
            data,
            shape: Arc::from(shape),
            strides: Arc::from(strides),
            offset,
        })
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[inline]
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    #[inline]
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.shape.iter().any(|&d| d == 0)
    }

    /// The raw backing buffer.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn view(&self) -> StridedView<'_, T> {
        let ptr = unsafe { self.data.as_ptr().offset(self.offset) };
        StridedView {
            ptr,
            shape: self.shape.clone(),
            strides: self.strides.clone(),
            _marker: PhantomData,
        }
    }

    pub fn view_mut(&mut self) -> StridedViewMut<'_, T> {
        let ptr = unsafe { self.data.as_mut_ptr().offset(self.offset) };
        StridedViewMut {
            ptr,
            shape: self.shape.clone(),
            strides: self.strides.clone(),
            _marker: PhantomData,
        }
    }

    /// Reorder axes (metadata only), keeping ownership of the buffer.
    pub fn permuted(self, perm: &[usize]) -> Result<StridedArray<T>> {
        validated_perm(perm, self.rank())?;
        let shape: Vec<usize> = perm.iter().map(|&p| self.shape[p]).collect();
        let strides: Vec<isize> = perm.iter().map(|&p| self.strides[p]).collect();
        Ok(StridedArray {
            data: self.data,
            shape: Arc::from(shape),
            strides: Arc::from(strides),
            offset: self.offset,
        })
    }
}

impl<T: Copy> StridedArray<T> {
    pub fn get(&self, indices: &[usize]) -> T {
        self.view().get(indices)
    }

    pub fn set(&mut self, indices: &[usize], value: T) {
        self.view_mut().set(indices, value)
    }
}
