use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Peer {0} not found")]
    PeerNotFound(i32),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("RPC failed: {0}")]
    Rpc(#[from] tonic::Status),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Peer returned an empty response")]
    EmptyResponse,

    #[error("Failed to bind port {0}: {1}")]
    Bind(u16, String),
}
