//! Process-wide routing configuration.
//!
//! The size cutoff below which an unconfigured [`contract`](crate::contract)
//! call always takes the reference evaluator. Native dispatch overhead
//! dominates for small tensors.

use std::sync::OnceLock;

const DEFAULT_EINSUM_MAX_SIZE: usize = 2000;

static EINSUM_MAX_SIZE: OnceLock<usize> = OnceLock::new();

/// Routing threshold in elements, read once per process.
///
/// Override with the `TBLIS_EINSUM_MAX_SIZE` environment variable; the value
/// is captured on first use and immutable afterwards.
pub fn einsum_max_size() -> usize {
    *EINSUM_MAX_SIZE.get_or_init(|| {
        std::env::var("TBLIS_EINSUM_MAX_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_EINSUM_MAX_SIZE)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_default() {
        // The env var is not set under `cargo test`, so the default applies.
        assert_eq!(einsum_max_size(), DEFAULT_EINSUM_MAX_SIZE);
    }

    #[test]
    fn test_threshold_stable_across_calls() {
        assert_eq!(einsum_max_size(), einsum_max_size());
    }
}
