//! Error types for the filter, aggregation and clustering pipeline

use thiserror::Error;

/// Failures raised by the analysis core.
///
/// Empty-but-valid inputs (an empty allowed set, an inverted age range, an
/// empty view handed to a summing aggregate) are not errors; they produce
/// empty or zero results instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// An aggregate that needs at least one record was given none
    #[error("Empty input: {operation} requires at least one record")]
    EmptyInput {
        /// The aggregate that was attempted
        operation: &'static str,
    },

    /// Not enough records (or distinct feature points) to form the requested clusters
    #[error("Insufficient data: {available} points available, {required} clusters requested")]
    InsufficientData {
        /// Number of usable points in the view
        available: usize,
        /// Number of clusters requested
        required: usize,
    },

    /// Predicate input could not be interpreted
    #[error("Invalid predicate: {reason}")]
    InvalidPredicate {
        /// What was wrong with the input
        reason: String,
    },

    /// A numeric parameter is out of its valid domain
    #[error("Invalid parameter: {reason}")]
    InvalidParameter {
        /// What was wrong with the parameter
        reason: String,
    },

    /// The K-Means fit itself failed
    #[error("Clustering failed: {0}")]
    Clustering(String),
}

impl AnalysisError {
    pub(crate) fn invalid_predicate(reason: impl Into<String>) -> Self {
        Self::InvalidPredicate {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_parameter(reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            reason: reason.into(),
        }
    }
}
