//! Call-related error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CallError {
    #[error("another call is already in progress")]
    AlreadyInCall,

    #[error("no active call")]
    NoActiveCall,

    #[error("invalid call state transition: {0}")]
    InvalidTransition(#[from] super::state::InvalidTransition),

    #[error("media unavailable: {0}")]
    MediaUnavailable(String),

    #[error("peer connection error: {0}")]
    Peer(String),
}

impl From<super::media::MediaError> for CallError {
    fn from(e: super::media::MediaError) -> Self {
        match e {
            super::media::MediaError::Unavailable(msg) => CallError::MediaUnavailable(msg),
            super::media::MediaError::Peer(msg) => CallError::Peer(msg),
        }
    }
}
