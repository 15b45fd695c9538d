//! Error types for the engine

use crate::types::EntryId;
use thiserror::Error;

/// Errors raised by the underlying stream store collaborator.
///
/// These are propagated to the caller verbatim: the engine never retries and
/// never rolls back, because a command executes as one atomic script at the
/// collaborator level.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Appending an entry whose id is not strictly greater than the last id
    /// already present in the stream.
    #[error("entry id {attempted} is not greater than the last id {last} of '{key}'")]
    IdRegression {
        /// Key of the stream that rejected the append
        key: String,
        /// Current maximum id of the stream
        last: EntryId,
        /// The id the caller tried to append
        attempted: EntryId,
    },

    /// Any other backend failure (connection loss, script abort, ...).
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Main error type for engine commands
#[derive(Error, Debug)]
pub enum EngineError {
    /// Invalid arguments: wrong arity, malformed ids, unparseable options,
    /// conflicting or unknown query options, malformed filter expressions.
    #[error("invalid argument: {0}")]
    Argument(String),

    /// The dispatched command name did not resolve, even after case folding.
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    /// A query without a LIMIT materialised more entries than the configured
    /// cap allows.
    #[error("result set exceeds the configured limit of {0} entries")]
    ResourceLimit(usize),

    /// Collaborator failure, propagated verbatim.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// JSON encoding or decoding failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The store returned an impossible shape (e.g. a point lookup yielding
    /// more than one entry for a unique id).
    #[error("storage corruption: {0}")]
    Corruption(String),
}

impl EngineError {
    /// Shorthand for an [`EngineError::Argument`] with a formatted message.
    pub fn argument(message: impl Into<String>) -> Self {
        EngineError::Argument(message.into())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_regression_display() {
        let err = StoreError::IdRegression {
            key: "metrics".to_string(),
            last: EntryId::new(1000, 2),
            attempted: EntryId::new(1000, 2),
        };
        let msg = err.to_string();
        assert!(msg.contains("1000-2"));
        assert!(msg.contains("metrics"));
    }

    #[test]
    fn test_store_error_wraps_into_engine_error() {
        let err: EngineError = StoreError::Backend("script aborted".to_string()).into();
        assert!(matches!(err, EngineError::Store(_)));
        assert!(err.to_string().contains("script aborted"));
    }

    #[test]
    fn test_argument_shorthand() {
        let err = EngineError::argument("field count must be even");
        assert_eq!(
            err.to_string(),
            "invalid argument: field count must be even"
        );
    }
}
