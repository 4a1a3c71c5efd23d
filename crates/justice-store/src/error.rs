use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid slot name: {0:?}")]
    InvalidKey(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to persist slot: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no entry with id {0}")]
    NotFound(String),
}
