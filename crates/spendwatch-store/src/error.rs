//! Error types for spendwatch storage.

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The database could not be reached (open, pool or I/O failure).
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// A statement failed.
    #[error("database error: {0}")]
    Database(String),

    /// A uniqueness constraint rejected the write.
    #[error("{entity} already exists: {id}")]
    Conflict {
        /// The kind of record.
        entity: &'static str,
        /// The conflicting key.
        id: String,
    },

    /// A stored value could not be decoded into a domain type.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// An aggregate left the representable decimal range.
    #[error("aggregate overflow: {0}")]
    Overflow(String),
}

impl StoreError {
    /// Classify a `sqlx` error.
    ///
    /// Pool, I/O, TLS and configuration failures mean the store cannot be
    /// reached; everything else is a statement failure.
    #[must_use]
    pub fn from_sqlx(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(_)
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => Self::Unavailable(err.to_string()),
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                Self::Serialization(err.to_string())
            }
            _ => Self::Database(err.to_string()),
        }
    }

    /// Classify an insert error, mapping uniqueness violations to `StoreError::Conflict`.
    pub(crate) fn unique_violation(err: sqlx::Error, entity: &'static str, id: String) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => Self::Conflict { entity, id },
            _ => Self::from_sqlx(err),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::from_sqlx(err)
    }
}
