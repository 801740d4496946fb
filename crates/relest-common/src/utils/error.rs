//! Error types for Relest.
//!
//! Every fitting-time failure is fatal to the model being built and is
//! surfaced through [`Error`]. Looking up a value outside a histogram's
//! coverage is *not* an error: lookups return `None` or a zero probability.

use thiserror::Error;

/// The main error type for Relest operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A histogram was fitted on an empty value sequence.
    #[error("cannot fit a histogram on an empty value sequence")]
    EmptyInput,

    /// A conditioning bucket ended up with no observations.
    #[error("conditioning bucket {bucket} received no observations")]
    InvalidHistogramParams {
        /// Index of the empty bucket in the conditioning histogram.
        bucket: usize,
    },

    /// An operand had the wrong kind.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// The expected kind.
        expected: String,
        /// The kind that was supplied.
        found: String,
    },

    /// The foreign-key graph contains a cycle, so fitting made no progress.
    #[error("foreign keys form a cycle among relations: {}", pending.join(", "))]
    CyclicForeignKeys {
        /// Relations still waiting for their referenced networks.
        pending: Vec<String>,
    },

    /// Extensions could not be spliced because they depend on each other.
    #[error("extensions cannot be resolved for relations: {}", pending.join(", "))]
    UnresolvableExtensions {
        /// Relations whose extensions are still pending.
        pending: Vec<String>,
    },

    /// An operation required at least one node.
    #[error("attribute network has no nodes")]
    EmptyNetwork,

    /// A node has no distribution attached yet.
    #[error("attribute '{0}' has no fitted distribution")]
    NotFitted(String),

    /// An attribute name is not known.
    #[error("unknown attribute '{0}'")]
    UnknownAttribute(String),

    /// A relation name is not known.
    #[error("unknown relation '{0}'")]
    UnknownRelation(String),

    /// Two sequences that must be aligned have different lengths.
    #[error("length mismatch: expected {expected} values, found {found}")]
    LengthMismatch {
        /// The expected length.
        expected: usize,
        /// The actual length.
        found: usize,
    },

    /// A value or argument is invalid.
    #[error("invalid value: {0}")]
    InvalidValue(String),
}

/// Result type alias for Relest operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_lists_relations() {
        let err = Error::CyclicForeignKeys {
            pending: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "foreign keys form a cycle among relations: a, b"
        );
    }

    #[test]
    fn test_type_mismatch_message() {
        let err = Error::TypeMismatch {
            expected: "Histogram".to_string(),
            found: "ConditionalDistribution".to_string(),
        };
        assert!(err.to_string().contains("expected Histogram"));
    }
}
