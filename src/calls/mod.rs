pub mod error;
pub mod handler;
pub mod manager;
pub mod media;
pub mod state;

pub use error::CallError;
pub use manager::{CallConfig, CallManager};
pub use media::{LocalMedia, MediaController, MediaError, PeerConnector, UnsupportedMediaController};
pub use state::{CallEnded, CallPhase, CallSession, CallSnapshot, CallTransition, EndReason};
