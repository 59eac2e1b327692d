use thiserror::Error;

/// Failure kinds surfaced by the engine's public operations.
///
/// Document-store errors are caught at the operation boundary and wrapped as
/// `Store` with the underlying message; they are not retried. Callers match
/// on the variant to build their responses.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("document store failure: {0}")]
    Store(String),

    #[error("device {0} not found")]
    DeviceNotFound(String),

    #[error("session {0} not found")]
    SessionNotFound(String),

    #[error("accuracy backfill already running")]
    BackfillInProgress,

    #[error("invalid report query: {0}")]
    InvalidQuery(String),
}

impl From<anyhow::Error> for EngineError {
    fn from(err: anyhow::Error) -> Self {
        EngineError::Store(format!("{err:#}"))
    }
}
