//! Generic Einstein-summation reference evaluator.
//!
//! Handles every syntactically valid two-operand descriptor, including the
//! patterns the native path declines: in-operand repeated labels (collapsed
//! to diagonals by the stride trick), labels appearing in only one operand
//! (summed out), and pure outer products. Used both as the fallback path
//! and as the correctness oracle the native path is tested against.
//!
//! Pipeline per operand: diagonal-collapse repeats, sum out single-operand
//! labels, permute to canonical order, then one naive batched GEMM.

use crate::bgemm::bgemm_strided;
use crate::dtype::Element;
use crate::error::{ContractError, Result};
use crate::kernel::sum_axes;
use crate::plan::ContractionPlan;
use crate::view::{StridedArray, StridedView, StridedViewMut};

/// Repeated-label pairs for diagonal collapsing, plus the surviving labels.
///
/// Pairs use original axis numbering, `(first occurrence, later occurrence)`;
/// chains like `"iii"` accumulate onto the first axis.
fn duplicate_pairs(ids: &[char]) -> (Vec<(usize, usize)>, Vec<char>) {
    let mut pairs = Vec::new();
    let mut unique = Vec::new();
    let mut first_pos: Vec<(char, usize)> = Vec::new();
    for (i, &c) in ids.iter().enumerate() {
        if let Some(&(_, first)) = first_pos.iter().find(|(x, _)| *x == c) {
            pairs.push((first, i));
        } else {
            first_pos.push((c, i));
            unique.push(c);
        }
    }
    (pairs, unique)
}

/// Extent of each output label, before any validation of shared labels.
///
/// A defines the extent when both operands carry the label; repeated labels
/// within one operand contribute the minimum of their extents (the diagonal
/// length).
pub fn output_shape(
    ia: &[char],
    ib: &[char],
    ic: &[char],
    a_shape: &[usize],
    b_shape: &[usize],
) -> Result<Vec<usize>> {
    let extent_in = |ids: &[char], shape: &[usize], c: char| -> Option<usize> {
        ids.iter()
            .zip(shape)
            .filter(|(&x, _)| x == c)
            .map(|(_, &d)| d)
            .min()
    };
    ic.iter()
        .map(|&c| {
            extent_in(ia, a_shape, c)
                .or_else(|| extent_in(ib, b_shape, c))
                .ok_or(ContractError::OrphanOutputLabel(c))
        })
        .collect()
}

/// Evaluate `c = alpha * einsum(ia, ib -> ic)(a, b) + beta * c`.
///
/// `c` may be arbitrarily strided; its shape must match the derived output
/// shape exactly. `descriptor` is only used in error messages.
#[allow(clippy::too_many_arguments)]
pub fn einsum2_into<T: Element>(
    c: StridedViewMut<'_, T>,
    a: &StridedView<'_, T>,
    b: &StridedView<'_, T>,
    ia: &[char],
    ib: &[char],
    ic: &[char],
    alpha: T,
    beta: T,
    descriptor: &str,
) -> Result<()> {
    if ia.len() != a.rank() {
        return Err(ContractError::RankMismatch {
            operand: 'A',
            labels: ia.len(),
            rank: a.rank(),
        });
    }
    if ib.len() != b.rank() {
        return Err(ContractError::RankMismatch {
            operand: 'B',
            labels: ib.len(),
            rank: b.rank(),
        });
    }

    // Collapse in-operand repeats to diagonal views (zero-copy).
    let (a_pairs, ua) = duplicate_pairs(ia);
    let (b_pairs, ub) = duplicate_pairs(ib);
    let a_diag = if a_pairs.is_empty() {
        a.clone()
    } else {
        a.diagonal(&a_pairs)?
    };
    let b_diag = if b_pairs.is_empty() {
        b.clone()
    } else {
        b.diagonal(&b_pairs)?
    };

    let plan = ContractionPlan::new(descriptor, &ua, &ub, ic, a_diag.shape(), b_diag.shape())?;

    if c.shape() != plan.out_shape.as_slice() {
        return Err(ContractError::OutputShapeMismatch {
            expected: plan.out_shape.clone(),
            got: c.shape().to_vec(),
        });
    }

    // Sum out labels confined to a single operand.
    let a_reduced: Option<StridedArray<T>> = if plan.left_sum.is_empty() {
        None
    } else {
        Some(sum_axes(&a_diag, &plan.left_sum_axes(&ua))?)
    };
    let a_work = match &a_reduced {
        Some(arr) => arr.view(),
        None => a_diag,
    };

    let b_reduced: Option<StridedArray<T>> = if plan.right_sum.is_empty() {
        None
    } else {
        Some(sum_axes(&b_diag, &plan.right_sum_axes(&ub))?)
    };
    let b_work = match &b_reduced {
        Some(arr) => arr.view(),
        None => b_diag,
    };

    let a_perm = a_work.permute(&plan.left_perm)?;
    let b_perm = b_work.permute(&plan.right_perm)?;
    let mut c_perm = c.permute(&plan.out_perm)?;

    bgemm_strided(
        &mut c_perm,
        &a_perm,
        &b_perm,
        plan.batch.len(),
        plan.left_out.len(),
        plan.right_out.len(),
        plan.contracted.len(),
        alpha,
        beta,
    )?;

    Ok(())
}
