#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("store io error: {0}")]
    Io(String),
}
