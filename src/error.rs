use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    // Carries the portal's error message verbatim so the caller can
    // surface it unchanged.
    #[error("{0}")]
    RemoteUpdate(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}
