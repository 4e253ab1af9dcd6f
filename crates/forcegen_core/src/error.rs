//! Error types for force generation.
//!
//! Only programmer errors and data-loading failures are errors. A table
//! that comes back empty or a formation that cannot be satisfied is a
//! normal outcome and is reported as an empty result instead.

use thiserror::Error;

/// Result type alias using [`GenerationError`].
pub type Result<T> = std::result::Result<T, GenerationError>;

/// Top-level error type for the generation core.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Parameter sets and unit counts passed to the formation solver differ in length.
    #[error("Mismatched formation arguments: {params} parameter sets but {counts} unit counts")]
    MismatchedArguments {
        /// Number of parameter sets supplied.
        params: usize,
        /// Number of unit counts supplied.
        counts: usize,
    },

    /// An argument violated a documented precondition.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A force descriptor could not be resolved because a required field
    /// is unset on the node and all of its ancestors.
    #[error("Force descriptor '{name}' has no {field} (not set on the node or any parent)")]
    IncompleteDescriptor {
        /// Name of the offending node.
        name: String,
        /// The missing field.
        field: &'static str,
    },

    /// Faction data failed validation.
    #[error("Faction data is inconsistent: {0:?}")]
    InvalidFactionData(Vec<String>),

    /// Duplicate faction key in the faction graph.
    #[error("Duplicate faction key: {0}")]
    DuplicateFaction(String),

    /// Failed to parse an in-memory data document.
    #[error("Failed to parse {what}: {message}")]
    DataParseError {
        /// What was being parsed.
        what: String,
        /// Error message.
        message: String,
    },

    /// The background catalog load failed or was dropped before finishing.
    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(String),
}
