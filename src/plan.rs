//! Contraction planning: label classification and canonical permutations.
//!
//! A plan is built fresh per call from the (duplicate-free) label groups and
//! the operand shapes. Each label gets a validated extent and a role:
//!
//! - **batch**: in A, B, and C (broadcast, not summed)
//! - **left/right output**: in one operand and C
//! - **contracted**: in A and B, absent from C (summed)
//! - **left/right sum**: in one operand only, absent from C (summed out
//!   before the pairwise contraction)
//!
//! The permutations arrange operands into batch-first canonical order:
//! A → `[batch, lo, sum]`, B → `[batch, sum, ro]`, C → `[batch, lo, ro]`.

use std::collections::HashMap;

use crate::error::{ContractError, Result};

#[derive(Debug, Clone)]
pub struct ContractionPlan {
    pub batch: Vec<char>,
    pub left_out: Vec<char>,
    pub right_out: Vec<char>,
    pub contracted: Vec<char>,
    pub left_sum: Vec<char>,
    pub right_sum: Vec<char>,

    /// Validated extent of every label.
    pub extents: HashMap<char, usize>,

    /// Permutation of A's axes (after `left_sum` removal) into
    /// `[batch, lo, sum]` order.
    pub left_perm: Vec<usize>,
    /// Permutation of B's axes (after `right_sum` removal) into
    /// `[batch, sum, ro]` order.
    pub right_perm: Vec<usize>,
    /// Permutation of C's axes from descriptor order into
    /// `[batch, lo, ro]` order.
    pub out_perm: Vec<usize>,

    /// Result shape in descriptor order.
    pub out_shape: Vec<usize>,
}

impl ContractionPlan {
    /// Classify labels and compute permutations.
    ///
    /// `ia`/`ib` must be duplicate-free (in-operand repeats are collapsed
    /// to diagonals before planning). `descriptor` is only used in error
    /// messages.
    pub fn new(
        descriptor: &str,
        ia: &[char],
        ib: &[char],
        ic: &[char],
        a_shape: &[usize],
        b_shape: &[usize],
    ) -> Result<Self> {
        debug_assert_eq!(ia.len(), a_shape.len());
        debug_assert_eq!(ib.len(), b_shape.len());

        for (i, &c) in ia.iter().enumerate() {
            if ia[..i].contains(&c) {
                return Err(ContractError::Parse(format!(
                    "duplicate label '{}' in left operand plan",
                    c
                )));
            }
        }
        for (i, &c) in ib.iter().enumerate() {
            if ib[..i].contains(&c) {
                return Err(ContractError::Parse(format!(
                    "duplicate label '{}' in right operand plan",
                    c
                )));
            }
        }
        for (i, &c) in ic.iter().enumerate() {
            if ic[..i].contains(&c) {
                return Err(ContractError::RepeatedOutputLabel(c));
            }
            if !ia.contains(&c) && !ib.contains(&c) {
                return Err(ContractError::OrphanOutputLabel(c));
            }
        }

        // Extents: A first, then B; shared labels must agree exactly.
        let mut extents: HashMap<char, usize> = HashMap::new();
        for (&c, &d) in ia.iter().zip(a_shape) {
            extents.insert(c, d);
        }
        for (&c, &d) in ib.iter().zip(b_shape) {
            if let Some(&prev) = extents.get(&c) {
                if prev != d {
                    return Err(ContractError::DimensionMismatch {
                        descriptor: descriptor.to_string(),
                        label: c,
                        a_shape: a_shape.to_vec(),
                        b_shape: b_shape.to_vec(),
                    });
                }
            } else {
                extents.insert(c, d);
            }
        }

        let mut batch = Vec::new();
        let mut left_out = Vec::new();
        let mut contracted = Vec::new();
        let mut left_sum = Vec::new();
        for &c in ia {
            match (ib.contains(&c), ic.contains(&c)) {
                (true, true) => batch.push(c),
                (true, false) => contracted.push(c),
                (false, true) => left_out.push(c),
                (false, false) => left_sum.push(c),
            }
        }

        let mut right_out = Vec::new();
        let mut right_sum = Vec::new();
        for &c in ib {
            if !ia.contains(&c) {
                if ic.contains(&c) {
                    right_out.push(c);
                } else {
                    right_sum.push(c);
                }
            }
        }

        let position =
            |labels: &[char], c: char| labels.iter().position(|&x| x == c).expect("label present");

        let ia_kept: Vec<char> = ia.iter().copied().filter(|c| !left_sum.contains(c)).collect();
        let left_perm: Vec<usize> = batch
            .iter()
            .chain(left_out.iter())
            .chain(contracted.iter())
            .map(|&c| position(&ia_kept, c))
            .collect();

        let ib_kept: Vec<char> = ib.iter().copied().filter(|c| !right_sum.contains(c)).collect();
        let right_perm: Vec<usize> = batch
            .iter()
            .chain(contracted.iter())
            .chain(right_out.iter())
            .map(|&c| position(&ib_kept, c))
            .collect();

        let out_perm: Vec<usize> = batch
            .iter()
            .chain(left_out.iter())
            .chain(right_out.iter())
            .map(|&c| position(ic, c))
            .collect();

        let out_shape: Vec<usize> = ic.iter().map(|c| extents[c]).collect();

        Ok(ContractionPlan {
            batch,
            left_out,
            right_out,
            contracted,
            left_sum,
            right_sum,
            extents,
            left_perm,
            right_perm,
            out_perm,
            out_shape,
        })
    }

    /// Axis positions of `left_sum` labels in the original `ia`.
    pub fn left_sum_axes(&self, ia: &[char]) -> Vec<usize> {
        self.left_sum
            .iter()
            .filter_map(|c| ia.iter().position(|x| x == c))
            .collect()
    }

    /// Axis positions of `right_sum` labels in the original `ib`.
    pub fn right_sum_axes(&self, ib: &[char]) -> Vec<usize> {
        self.right_sum
            .iter()
            .filter_map(|c| ib.iter().position(|x| x == c))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_matmul_roles() {
        let p = ContractionPlan::new(
            "ij,jk->ik",
            &chars("ij"),
            &chars("jk"),
            &chars("ik"),
            &[2, 3],
            &[3, 4],
        )
        .unwrap();
        assert!(p.batch.is_empty());
        assert_eq!(p.left_out, vec!['i']);
        assert_eq!(p.right_out, vec!['k']);
        assert_eq!(p.contracted, vec!['j']);
        assert_eq!(p.out_shape, vec![2, 4]);
    }

    #[test]
    fn test_batched_roles() {
        let p = ContractionPlan::new(
            "bij,bjk->bik",
            &chars("bij"),
            &chars("bjk"),
            &chars("bik"),
            &[5, 2, 3],
            &[5, 3, 4],
        )
        .unwrap();
        assert_eq!(p.batch, vec!['b']);
        assert_eq!(p.contracted, vec!['j']);
        assert_eq!(p.out_shape, vec![5, 2, 4]);
        assert_eq!(p.left_perm, vec![0, 1, 2]);
        assert_eq!(p.right_perm, vec![0, 1, 2]);
        assert_eq!(p.out_perm, vec![0, 1, 2]);
    }

    #[test]
    fn test_transposed_output_perm() {
        // bij,bjk->bki: C internal order [b, i, k], descriptor [b, k, i].
        let p = ContractionPlan::new(
            "bij,bjk->bki",
            &chars("bij"),
            &chars("bjk"),
            &chars("bki"),
            &[5, 2, 3],
            &[5, 3, 4],
        )
        .unwrap();
        assert_eq!(p.out_perm, vec![0, 2, 1]);
        assert_eq!(p.out_shape, vec![5, 4, 2]);
    }

    #[test]
    fn test_single_operand_sums() {
        // ij,jk->k: i only appears in A and not in C.
        let p = ContractionPlan::new(
            "ij,jk->k",
            &chars("ij"),
            &chars("jk"),
            &chars("k"),
            &[2, 3],
            &[3, 4],
        )
        .unwrap();
        assert_eq!(p.left_sum, vec!['i']);
        assert_eq!(p.contracted, vec!['j']);
        assert_eq!(p.left_sum_axes(&chars("ij")), vec![0]);
    }

    #[test]
    fn test_spec_example_shape() {
        // abcd,fdea->cebf with A (7,1,3,4), B (2,4,5,7) -> (3,5,1,2)
        let p = ContractionPlan::new(
            "abcd,fdea->cebf",
            &chars("abcd"),
            &chars("fdea"),
            &chars("cebf"),
            &[7, 1, 3, 4],
            &[2, 4, 5, 7],
        )
        .unwrap();
        assert_eq!(p.out_shape, vec![3, 5, 1, 2]);
        assert_eq!(p.contracted, vec!['a', 'd']);
        assert_eq!(p.left_out, vec!['b', 'c']);
        assert_eq!(p.right_out, vec!['f', 'e']);
        assert!(p.left_sum.is_empty());
        assert!(p.right_sum.is_empty());
    }

    #[test]
    fn test_dimension_mismatch() {
        let err = ContractionPlan::new(
            "ij,jk->ik",
            &chars("ij"),
            &chars("jk"),
            &chars("ik"),
            &[2, 3],
            &[4, 5],
        )
        .unwrap_err();
        match err {
            ContractError::DimensionMismatch {
                label,
                a_shape,
                b_shape,
                ..
            } => {
                assert_eq!(label, 'j');
                assert_eq!(a_shape, vec![2, 3]);
                assert_eq!(b_shape, vec![4, 5]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_orphan_and_repeat_rejected() {
        assert!(ContractionPlan::new(
            "ij,jk->iz",
            &chars("ij"),
            &chars("jk"),
            &chars("iz"),
            &[2, 3],
            &[3, 4],
        )
        .is_err());
        assert!(ContractionPlan::new(
            "ij,jk->ii",
            &chars("ij"),
            &chars("jk"),
            &chars("ii"),
            &[2, 3],
            &[3, 4],
        )
        .is_err());
    }
}
