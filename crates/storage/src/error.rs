//! Typed error enum for the storage layer.
//!
//! Callers match on specific failure modes (corrupt row, write conflict,
//! maintenance contention) instead of downcasting opaque boxes. "No
//! results" is never an error: query functions return an empty `Vec`.

use thiserror::Error;

/// Storage-layer error with variants covering every expected failure mode.
#[derive(Debug, Error)]
pub enum InsightError {
    /// Payload decode failure on a specific row. Isolated to that row:
    /// batch reads log and skip, single-row reads surface this.
    #[error("corrupt record {id}: {reason}")]
    CorruptRecord { id: String, reason: String },

    /// Durable-store upsert failure (constraint violation).
    #[error("write conflict: {0}")]
    WriteConflict(String),

    /// Optimize/rebuild invoked while another maintenance pass is running.
    /// Rejected immediately, never queued.
    #[error("maintenance already in progress")]
    MaintenanceBusy,

    /// SQL / connection / pool failure.
    #[error("database error: {0}")]
    Database(String),

    /// Payload could not be serialized for storage.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Migration failure.
    #[error("migration error: {0}")]
    Migration(String),
}

/// Custom `From<rusqlite::Error>` — NOT blanket `#[from]`.
///
/// Constraint violations become `WriteConflict`; everything else is a
/// generic `Database` failure.
impl From<rusqlite::Error> for InsightError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, msg)
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Self::WriteConflict(msg.clone().unwrap_or_else(|| e.to_string()))
            },
            _ => Self::Database(err.to_string()),
        }
    }
}

impl From<r2d2::Error> for InsightError {
    fn from(err: r2d2::Error) -> Self {
        Self::Database(format!("connection pool: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, InsightError>;
