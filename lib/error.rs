//! Error type shared by every module of the crate.

use thiserror::Error;

/// Result alias for fallible operations in this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The sweep is not a single name-to-range mapping, or cannot be expanded.
    #[error("invalid range specification: {0}")]
    InvalidRangeSpec(String),

    /// Expanded sweep sequences do not all have the same length.
    #[error("range '{name}' expands to {found} values; expected {expected}")]
    RangeLengthMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    /// A state operator was handed a state shape its capability flags do not
    /// cover.
    #[error("{operator} cannot act on a state with {ndim} dimension(s)")]
    UnsupportedStateShape {
        operator: &'static str,
        ndim: usize,
    },

    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        expected: usize,
        found: usize,
    },

    #[error("index {index} out of bounds for dimension {dim}")]
    IndexOutOfBounds {
        index: usize,
        dim: usize,
    },

    #[error("unknown Hamiltonian component '{0}'")]
    UnknownComponent(String),

    #[error("unknown basis '{0}'")]
    UnknownBasis(String),

    #[error("unknown parameter '{0}'")]
    UnknownParameter(String),

    #[error("basis '{0}' is not unitary")]
    NonUnitaryBasis(String),

    #[error("linear algebra error: {0}")]
    Linalg(#[from] ndarray_linalg::error::LinalgError),

    #[error("array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}
