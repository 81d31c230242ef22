//! Error types for pgsetop

use crate::setop::SetOperator;
use thiserror::Error;

/// Result type alias for pgsetop operations
pub type SqlResult<T> = Result<T, SqlError>;

/// Errors raised while building, rendering or executing queries.
#[derive(Debug, Error)]
pub enum SqlError {
    /// The two sides of a set operator do not select the same fields in the same order.
    #[error(
        "Set operator error ({operator}): selected fields are not the same or are in a different order (left: {left:?}, right: {right:?})"
    )]
    ShapeMismatch {
        operator: SetOperator,
        left: Vec<String>,
        right: Vec<String>,
    },

    /// A chained operand was absent.
    #[error("Set operator error ({operator}): operand at position {position} is missing")]
    MissingOperand {
        operator: SetOperator,
        position: usize,
    },

    /// Prepare/execute was called on a query that is not bound to a session.
    #[error("Cannot execute a query on a query builder. Please use a database instance instead.")]
    SessionMissing,

    /// Query execution error, passed through from the driver
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),

    /// Query timeout error
    #[error("Query timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl SqlError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn is_shape_mismatch(&self) -> bool {
        matches!(self, Self::ShapeMismatch { .. })
    }

    pub fn is_missing_operand(&self) -> bool {
        matches!(self, Self::MissingOperand { .. })
    }

    pub fn is_session_missing(&self) -> bool {
        matches!(self, Self::SessionMissing)
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for SqlError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}
