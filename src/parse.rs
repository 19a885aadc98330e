//! Subscript descriptor parsing.
//!
//! A descriptor names the axes of both operands and the result:
//! `"<A-labels>,<B-labels>-><C-labels>"`, e.g. `"abcd,fdea->cebf"`.
//! Whitespace is ignored. A descriptor without `->` is *implicit mode*:
//! the output labels are the labels occurring exactly once, in sorted
//! order. Implicit descriptors are valid but never reach native dispatch.

use crate::error::{ContractError, Result};

/// Parsed label groups of a two-operand descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscripts {
    pub a: Vec<char>,
    pub b: Vec<char>,
    /// Explicit output labels; `None` for implicit mode.
    pub out: Option<Vec<char>>,
}

impl Subscripts {
    /// Resolve the output label group.
    ///
    /// Implicit mode follows the usual einsum convention: every label with
    /// a total occurrence count of one across both operands, sorted.
    pub fn output_labels(&self) -> Vec<char> {
        match &self.out {
            Some(out) => out.clone(),
            None => {
                let all: Vec<char> = self.a.iter().chain(self.b.iter()).copied().collect();
                let mut once: Vec<char> = all
                    .iter()
                    .copied()
                    .filter(|&c| all.iter().filter(|&&x| x == c).count() == 1)
                    .collect();
                once.sort_unstable();
                once
            }
        }
    }

    /// Labels present in both operand groups.
    pub fn shared_labels(&self) -> Vec<char> {
        self.a
            .iter()
            .copied()
            .filter(|c| self.b.contains(c))
            .collect()
    }
}

fn label_group(part: &str) -> Result<Vec<char>> {
    for c in part.chars() {
        if !c.is_alphabetic() {
            return Err(ContractError::Parse(format!(
                "invalid character '{}' in subscript labels",
                c
            )));
        }
    }
    Ok(part.chars().collect())
}

/// Parse a descriptor into its label groups.
///
/// Malformed descriptors (wrong operand count, non-alphabetic labels,
/// repeated or orphan output labels) are hard errors on every path;
/// merely *unsupported* descriptors are not (routing handles those).
pub fn parse_subscripts(descriptor: &str) -> Result<Subscripts> {
    let stripped: String = descriptor.chars().filter(|c| !c.is_whitespace()).collect();

    let (lhs, rhs) = match stripped.find("->") {
        Some(pos) => {
            let rhs = &stripped[pos + 2..];
            if rhs.contains("->") {
                return Err(ContractError::Parse(
                    "more than one '->' in descriptor".into(),
                ));
            }
            (&stripped[..pos], Some(rhs))
        }
        None => (stripped.as_str(), None),
    };

    let parts: Vec<&str> = lhs.split(',').collect();
    if parts.len() != 2 {
        return Err(ContractError::OperandCount { found: parts.len() });
    }

    let a = label_group(parts[0])?;
    let b = label_group(parts[1])?;

    let out = match rhs {
        None => None,
        Some(rhs) => {
            let out = label_group(rhs)?;
            for (i, &c) in out.iter().enumerate() {
                if out[..i].contains(&c) {
                    return Err(ContractError::RepeatedOutputLabel(c));
                }
                if !a.contains(&c) && !b.contains(&c) {
                    return Err(ContractError::OrphanOutputLabel(c));
                }
            }
            Some(out)
        }
    };

    Ok(Subscripts { a, b, out })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_explicit() {
        let s = parse_subscripts("ij,jk->ik").unwrap();
        assert_eq!(s.a, vec!['i', 'j']);
        assert_eq!(s.b, vec!['j', 'k']);
        assert_eq!(s.out, Some(vec!['i', 'k']));
    }

    #[test]
    fn test_parse_whitespace() {
        let s = parse_subscripts(" ij , jk -> ik ").unwrap();
        assert_eq!(s.output_labels(), vec!['i', 'k']);
    }

    #[test]
    fn test_parse_scalar_output() {
        let s = parse_subscripts("i,j->").unwrap();
        assert_eq!(s.out, Some(vec![]));
        assert!(s.output_labels().is_empty());
    }

    #[test]
    fn test_parse_implicit() {
        let s = parse_subscripts("ij,jk").unwrap();
        assert_eq!(s.out, None);
        // j occurs twice, i and k once each.
        assert_eq!(s.output_labels(), vec!['i', 'k']);
    }

    #[test]
    fn test_parse_implicit_repeated_in_operand() {
        // 'i' occurs twice within A, so it is summed; only 'j' survives.
        let s = parse_subscripts("iij,j").unwrap();
        assert_eq!(s.output_labels(), Vec::<char>::new());
        let s = parse_subscripts("iik,k").unwrap();
        assert_eq!(s.output_labels(), Vec::<char>::new());
    }

    #[test]
    fn test_parse_implicit_sorted() {
        let s = parse_subscripts("ba,cb").unwrap();
        assert_eq!(s.output_labels(), vec!['a', 'c']);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse_subscripts("ij->ij"),
            Err(ContractError::OperandCount { found: 1 })
        ));
        assert!(matches!(
            parse_subscripts("ij,jk,kl->il"),
            Err(ContractError::OperandCount { found: 3 })
        ));
        assert!(matches!(
            parse_subscripts("i2,jk->ik"),
            Err(ContractError::Parse(_))
        ));
        assert!(matches!(
            parse_subscripts("ij,jk->ik->i"),
            Err(ContractError::Parse(_))
        ));
    }

    #[test]
    fn test_parse_output_label_errors() {
        assert!(matches!(
            parse_subscripts("ij,jk->ii"),
            Err(ContractError::RepeatedOutputLabel('i'))
        ));
        assert!(matches!(
            parse_subscripts("ij,jk->iz"),
            Err(ContractError::OrphanOutputLabel('z'))
        ));
    }

    #[test]
    fn test_shared_labels() {
        let s = parse_subscripts("abcd,fdea->cebf").unwrap();
        assert_eq!(s.shared_labels(), vec!['a', 'd']);
        let s = parse_subscripts("i,j->").unwrap();
        assert!(s.shared_labels().is_empty());
    }
}
