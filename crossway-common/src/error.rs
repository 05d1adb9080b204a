// src/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CrosswayError {
    #[error("Unknown direction code: {0}")]
    UnknownDirection(String),

    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Invalid config: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CrosswayError>;

#[cfg(feature = "grpc")]
impl From<CrosswayError> for tonic::Status {
    fn from(err: CrosswayError) -> Self {
        match err {
            CrosswayError::UnknownDirection(_) | CrosswayError::MalformedRequest(_) => {
                tonic::Status::invalid_argument(err.to_string())
            }
            _ => tonic::Status::internal(err.to_string()),
        }
    }
}
