use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("stats file I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("stats file JSON: {0}")]
    Json(#[from] serde_json::Error),
}
