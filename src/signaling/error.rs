use thiserror::Error;

pub type Result<T> = std::result::Result<T, SignalingError>;

#[derive(Debug, Error)]
pub enum SignalingError {
    #[error("signaling channel is not connected")]
    NotConnected,

    #[error("signaling channel is already connected")]
    AlreadyConnected,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("parse error: {0}")]
    Parse(String),
}
