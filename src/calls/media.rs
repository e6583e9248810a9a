//! Media and peer-connection seams.
//!
//! The crate coordinates call signaling; capture hardware and the actual
//! peer connection live in the platform shells, which plug in through these
//! traits. Session descriptions stay opaque on this side of the boundary.

use crate::types::{IceCandidate, SessionDescription};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("media capture unavailable: {0}")]
    Unavailable(String),

    #[error("peer connection error: {0}")]
    Peer(String),
}

/// Handle to the local capture stream. Owned exclusively by the call
/// manager and released deterministically on every exit from a live phase.
#[derive(Debug, Default)]
pub struct LocalMedia {
    muted: AtomicBool,
    speaker_on: AtomicBool,
    released: AtomicBool,
}

impl LocalMedia {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle_mute(&self) -> bool {
        !self.muted.fetch_xor(true, Ordering::SeqCst)
    }

    pub fn toggle_speaker(&self) -> bool {
        !self.speaker_on.fetch_xor(true, Ordering::SeqCst)
    }

    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    pub fn is_speaker_on(&self) -> bool {
        self.speaker_on.load(Ordering::SeqCst)
    }

    /// Stop capture. Idempotent.
    pub fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
    }

    /// Whether the stream is still producing frames.
    pub fn is_readable(&self) -> bool {
        !self.released.load(Ordering::SeqCst)
    }
}

/// Acquires the local capture stream (microphone). Acquisition is deferred
/// until the user answers, so declining a call never triggers a permission
/// prompt.
#[async_trait]
pub trait MediaController: Send + Sync {
    async fn acquire(&self) -> Result<Arc<LocalMedia>, MediaError>;
}

/// Drives the platform peer connection through opaque offer/answer payloads.
#[async_trait]
pub trait PeerConnector: Send + Sync {
    /// Build a local offer for an outgoing call.
    async fn create_offer(&self) -> Result<SessionDescription, MediaError>;

    /// Apply a remote offer and produce the local answer.
    async fn accept_offer(&self, offer: &SessionDescription)
        -> Result<SessionDescription, MediaError>;

    /// Apply the remote answer to our outstanding offer.
    async fn apply_answer(&self, answer: &SessionDescription) -> Result<(), MediaError>;

    /// Feed a remote ICE candidate into the connection.
    async fn add_remote_candidate(&self, candidate: &IceCandidate) -> Result<(), MediaError>;

    /// Tear down the connection. Idempotent; also used for partially-built
    /// connections on decline.
    async fn close(&self);
}

/// Permanent degraded mode for devices without call capability: every
/// acquisition fails with the caller-facing status message.
pub struct UnsupportedMediaController {
    reason: String,
}

impl UnsupportedMediaController {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Default for UnsupportedMediaController {
    fn default() -> Self {
        Self::new("calls require a microphone-capable device")
    }
}

#[async_trait]
impl MediaController for UnsupportedMediaController {
    async fn acquire(&self) -> Result<Arc<LocalMedia>, MediaError> {
        Err(MediaError::Unavailable(self.reason.clone()))
    }
}
