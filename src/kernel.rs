//! Strided iteration helpers shared by the reference evaluator and the
//! in-process contraction primitive.

use crate::dtype::Element;
use crate::error::StridedError;
use crate::view::{StridedArray, StridedView, StridedViewMut};

type Result<T> = std::result::Result<T, StridedError>;

/// Invert a permutation: if `perm[i] = j`, then `result[j] = i`.
pub fn invert_perm(perm: &[usize]) -> Vec<usize> {
    let mut inv = vec![0usize; perm.len()];
    for (i, &p) in perm.iter().enumerate() {
        inv[p] = i;
    }
    inv
}

/// Iterator over index tuples of a shape, row-major order (last index
/// varies fastest). A rank-0 shape yields exactly one (empty) tuple.
pub struct MultiIndex {
    shape: Vec<usize>,
    current: Vec<usize>,
    total: usize,
    count: usize,
}

impl MultiIndex {
    pub fn new(shape: &[usize]) -> Self {
        Self {
            shape: shape.to_vec(),
            current: vec![0; shape.len()],
            total: shape.iter().product(),
            count: 0,
        }
    }

    /// Element offset of the current tuple under the given strides.
    pub fn offset(&self, strides: &[isize]) -> isize {
        self.current
            .iter()
            .zip(strides.iter())
            .map(|(&i, &s)| i as isize * s)
            .sum()
    }

    pub fn indices(&self) -> &[usize] {
        &self.current
    }

    pub fn reset(&mut self) {
        self.current.fill(0);
        self.count = 0;
    }
}

impl Iterator for MultiIndex {
    type Item = ();

    fn next(&mut self) -> Option<()> {
        if self.count >= self.total {
            return None;
        }
        if self.count > 0 {
            for i in (0..self.shape.len()).rev() {
                self.current[i] += 1;
                if self.current[i] < self.shape[i] {
                    break;
                }
                self.current[i] = 0;
            }
        }
        self.count += 1;
        Some(())
    }
}

/// Element-wise `dest[idx] = f(src[idx])` over identically shaped views.
pub fn map_into<S: Copy, D: Copy>(
    dest: &mut StridedViewMut<D>,
    src: &StridedView<S>,
    f: impl Fn(S) -> D,
) -> Result<()> {
    if dest.shape() != src.shape() {
        return Err(StridedError::ShapeMismatch(
            dest.shape().to_vec(),
            src.shape().to_vec(),
        ));
    }
    let dst_ptr = dest.as_mut_ptr();
    let src_ptr = src.ptr();
    let dst_strides = dest.strides().to_vec();
    let src_strides = src.strides().to_vec();
    let mut iter = MultiIndex::new(src.shape());
    while iter.next().is_some() {
        let d = iter.offset(&dst_strides);
        let s = iter.offset(&src_strides);
        unsafe { *dst_ptr.offset(d) = f(*src_ptr.offset(s)) };
    }
    Ok(())
}

/// Strided copy between identically shaped views.
pub fn copy_into<T: Copy>(dest: &mut StridedViewMut<T>, src: &StridedView<T>) -> Result<()> {
    map_into(dest, src, |x| x)
}

/// Materialize a view into a fresh contiguous row-major array.
pub fn to_row_major<T: Element>(src: &StridedView<T>) -> StridedArray<T> {
    let mut out = StridedArray::<T>::zeros(src.shape(), crate::Layout::RowMajor);
    copy_into(&mut out.view_mut(), src).expect("shapes match by construction");
    out
}

/// Sum out the listed axes, producing a row-major array over the
/// remaining axes (in their original relative order).
pub fn sum_axes<T: Element>(src: &StridedView<T>, axes: &[usize]) -> Result<StridedArray<T>> {
    let rank = src.rank();
    for &ax in axes {
        if ax >= rank {
            return Err(StridedError::InvalidAxis { axis: ax, rank });
        }
    }

    let mut keep: Vec<usize> = Vec::with_capacity(rank - axes.len());
    for i in 0..rank {
        if !axes.contains(&i) {
            keep.push(i);
        }
    }

    let out_shape: Vec<usize> = keep.iter().map(|&i| src.shape()[i]).collect();
    let keep_strides: Vec<isize> = keep.iter().map(|&i| src.strides()[i]).collect();
    let red_shape: Vec<usize> = axes.iter().map(|&i| src.shape()[i]).collect();
    let red_strides: Vec<isize> = axes.iter().map(|&i| src.strides()[i]).collect();

    let mut out = StridedArray::<T>::zeros(&out_shape, crate::Layout::RowMajor);
    let out_strides = out.strides().to_vec();
    let out_ptr = out.view_mut().as_mut_ptr();
    let src_ptr = src.ptr();

    let mut outer = MultiIndex::new(&out_shape);
    let mut inner = MultiIndex::new(&red_shape);
    while outer.next().is_some() {
        let src_base = outer.offset(&keep_strides);
        let mut acc = T::zero();
        inner.reset();
        while inner.next().is_some() {
            let off = src_base + inner.offset(&red_strides);
            acc = acc + unsafe { *src_ptr.offset(off) };
        }
        unsafe { *out_ptr.offset(outer.offset(&out_strides)) = acc };
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::StridedArray;

    #[test]
    fn test_invert_perm() {
        assert_eq!(invert_perm(&[2, 0, 1]), vec![1, 2, 0]);
        assert_eq!(invert_perm(&[0, 1, 2]), vec![0, 1, 2]);
    }

    #[test]
    fn test_multi_index_order() {
        let mut iter = MultiIndex::new(&[2, 3]);
        let mut seen = vec![];
        while iter.next().is_some() {
            seen.push(iter.indices().to_vec());
        }
        assert_eq!(seen.len(), 6);
        assert_eq!(seen[0], vec![0, 0]);
        assert_eq!(seen[1], vec![0, 1]);
        assert_eq!(seen[5], vec![1, 2]);
    }

    #[test]
    fn test_multi_index_rank0() {
        let mut iter = MultiIndex::new(&[]);
        assert!(iter.next().is_some());
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_copy_into_transposed() {
        let a = StridedArray::<f64>::from_fn(&[2, 3], |idx| (idx[0] * 3 + idx[1]) as f64);
        let t = a.view().permute(&[1, 0]).unwrap();
        let mut out = StridedArray::<f64>::zeros(&[3, 2], crate::Layout::RowMajor);
        copy_into(&mut out.view_mut(), &t).unwrap();
        assert_eq!(out.get(&[2, 1]), 5.0);
        assert_eq!(out.get(&[0, 1]), 3.0);
    }

    #[test]
    fn test_copy_shape_mismatch() {
        let a = StridedArray::<f64>::zeros(&[2, 3], crate::Layout::RowMajor);
        let mut out = StridedArray::<f64>::zeros(&[3, 3], crate::Layout::RowMajor);
        assert!(copy_into(&mut out.view_mut(), &a.view()).is_err());
    }

    #[test]
    fn test_sum_axes() {
        // A[i,j] = i*3 + j; sum over j -> [3, 12]
        let a = StridedArray::<f64>::from_fn(&[2, 3], |idx| (idx[0] * 3 + idx[1]) as f64);
        let s = sum_axes(&a.view(), &[1]).unwrap();
        assert_eq!(s.shape(), &[2]);
        assert_eq!(s.get(&[0]), 3.0);
        assert_eq!(s.get(&[1]), 12.0);
    }

    #[test]
    fn test_sum_all_axes() {
        let a = StridedArray::<f64>::from_fn(&[2, 3], |idx| (idx[0] * 3 + idx[1]) as f64);
        let s = sum_axes(&a.view(), &[0, 1]).unwrap();
        assert_eq!(s.rank(), 0);
        assert_eq!(s.get(&[]), 15.0);
    }

    #[test]
    fn test_map_into_cast() {
        let a = StridedArray::<f32>::from_fn(&[2, 2], |idx| (idx[0] * 2 + idx[1]) as f32);
        let mut out = StridedArray::<f64>::zeros(&[2, 2], crate::Layout::RowMajor);
        map_into(&mut out.view_mut(), &a.view(), |x| x as f64).unwrap();
        assert_eq!(out.get(&[1, 1]), 3.0);
    }
}
