//! Routing between native dispatch and the reference evaluator.
//!
//! An ordered sequence of conservative guard predicates, short-circuiting
//! on the first match. Falling back is never an error: any descriptor the
//! native primitive cannot express is handed to the reference evaluator,
//! which is authoritative. The guards deliberately over-reject (label
//! occurrence counting rather than a precise classification of the
//! contraction pattern).
//!
//! The element-type guard of the dispatch contract is structural here:
//! [`DType`](crate::DType) only has real- and complex-floating tags, so a
//! non-floating target type cannot reach routing in the first place.

use crate::config::einsum_max_size;
use crate::parse::Subscripts;
use crate::tensor::Tensor;

/// Where a call is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Hand the contraction to the native primitive.
    Native,
    /// Evaluate with the generic reference evaluator.
    Reference(FallbackReason),
}

/// Why a call was routed to the reference evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// Unconfigured call with an operand below the size threshold.
    SmallOperands,
    /// Descriptor has no explicit `->`.
    ImplicitOutput,
    /// Some label does not occur exactly twice across the three groups.
    LabelMultiset,
    /// No label shared between the operands (pure outer product).
    NoSharedLabels,
    /// A label repeats within one operand (in-operand diagonal/trace).
    RepeatedOperandLabel,
    /// A label does not fit the one-byte-per-axis native encoding.
    NonAsciiLabel,
}

fn has_duplicate(labels: &[char]) -> bool {
    labels
        .iter()
        .enumerate()
        .any(|(i, c)| labels[..i].contains(c))
}

/// Decide the route for a parsed descriptor, first matching guard wins.
///
/// `configured` is true when any keyword configuration (`out`, `dtype`,
/// `alpha`, `beta`, `order`) accompanied the call; the small-tensor
/// shortcut only applies to bare calls.
pub fn decide(subs: &Subscripts, a: &Tensor, b: &Tensor, configured: bool) -> Route {
    let threshold = einsum_max_size();
    if !configured && (a.len() < threshold || b.len() < threshold) {
        return Route::Reference(FallbackReason::SmallOperands);
    }

    let out = match &subs.out {
        Some(out) => out,
        None => return Route::Reference(FallbackReason::ImplicitOutput),
    };

    // Every label must occur exactly twice across A, B, and C combined:
    // once produced and once consumed, or shared-and-summed.
    let all: Vec<char> = subs
        .a
        .iter()
        .chain(subs.b.iter())
        .chain(out.iter())
        .copied()
        .collect();
    for &c in &all {
        if all.iter().filter(|&&x| x == c).count() != 2 {
            return Route::Reference(FallbackReason::LabelMultiset);
        }
    }

    if subs.shared_labels().is_empty() {
        return Route::Reference(FallbackReason::NoSharedLabels);
    }

    if has_duplicate(&subs.a) || has_duplicate(&subs.b) {
        return Route::Reference(FallbackReason::RepeatedOperandLabel);
    }

    if all.iter().any(|c| !c.is_ascii()) {
        return Route::Reference(FallbackReason::NonAsciiLabel);
    }

    Route::Native
}
