//! Error types.

use thiserror::Error;

/// Errors raised before any optimization work starts.
///
/// Timeouts, cancellation and degenerate inputs are not errors; they
/// produce a normal result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A stroke has fewer than two points.
    #[error("stroke {index} has {points} point(s), at least 2 are required")]
    InvalidInput {
        /// Position of the offending stroke in the input.
        index: usize,
        /// Number of points it carries.
        points: usize,
    },

    /// A stroke contains a NaN or infinite coordinate.
    #[error("stroke {index} has a non-finite coordinate")]
    NonFinite {
        /// Position of the offending stroke in the input.
        index: usize,
    },

    /// An annealing parameter is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
