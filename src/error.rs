//! Error types for the strided layer and the contraction dispatcher.

/// Errors from strided view/array construction and metadata operations.
#[derive(Debug, thiserror::Error)]
pub enum StridedError {
    #[error("shape and stride vectors have different lengths")]
    StrideLengthMismatch,

    #[error("strided access escapes the underlying buffer")]
    OffsetOverflow,

    #[error("rank mismatch: {0} vs {1}")]
    RankMismatch(usize, usize),

    #[error("invalid axis {axis} for rank {rank}")]
    InvalidAxis { axis: usize, rank: usize },

    #[error("shape mismatch: {0:?} vs {1:?}")]
    ShapeMismatch(Vec<usize>, Vec<usize>),
}

/// Errors raised by [`contract`](crate::contract) and the reference evaluator.
///
/// Unsupported-but-valid expressions are never errors; they silently route to
/// the reference evaluator. Everything here is a caller contract violation.
#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("descriptor names {found} operands, expected 2")]
    OperandCount { found: usize },

    #[error("operand {operand} has {labels} subscript labels but rank {rank}")]
    RankMismatch {
        operand: char,
        labels: usize,
        rank: usize,
    },

    #[error("operands dimension error for \"{descriptor}\": {a_shape:?} {b_shape:?} (label '{label}')")]
    DimensionMismatch {
        descriptor: String,
        label: char,
        a_shape: Vec<usize>,
        b_shape: Vec<usize>,
    },

    #[error("output buffer has dtype {got:?}, computation requires {expected:?}")]
    OutputDtypeMismatch {
        expected: crate::DType,
        got: crate::DType,
    },

    #[error("output buffer has shape {got:?}, computation requires {expected:?}")]
    OutputShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("output label '{0}' not found in any operand")]
    OrphanOutputLabel(char),

    #[error("output label '{0}' appears more than once")]
    RepeatedOutputLabel(char),

    #[error(transparent)]
    Strided(#[from] StridedError),
}

/// Convenience alias for `Result<T, ContractError>`.
pub type Result<T> = std::result::Result<T, ContractError>;
