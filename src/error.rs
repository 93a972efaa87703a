//! Error types for the query engine

use crate::statement::Diagnostics;
use thiserror::Error;

/// Result type alias for query engine operations
pub type Result<T> = std::result::Result<T, QueryError>;

/// Main error type for the query engine
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Bind error: {0}")]
    Bind(String),

    /// One or more fatal diagnostics were reported by `Statement::check`.
    #[error("Check failed: {0}")]
    Check(Diagnostics),

    /// Stored data contradicts declared metadata (e.g. a duplicate in a unique column).
    #[error("Integrity error: {0}")]
    Integrity(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Failure reported by the backing store. Never retried.
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Execution error: {0}")]
    Execution(String),
}

impl QueryError {
    /// True for errors raised by `Statement::check` before execution starts.
    pub fn is_check(&self) -> bool {
        matches!(self, QueryError::Check(_))
    }
}

impl From<sqlparser::parser::ParserError> for QueryError {
    fn from(e: sqlparser::parser::ParserError) -> Self {
        QueryError::Parse(e.to_string())
    }
}
