//! OS notification seam for incoming calls.
//!
//! The platform shells implement [`NotificationSurface`]; this crate decides
//! when to show, dismiss, and what the channel and actions look like, so the
//! incoming-call experience is identical whether the event arrived over the
//! live socket or as a push while the process was dead.

use crate::types::{RemoteParty, SessionDescription};
use async_trait::async_trait;
use thiserror::Error;

/// Notification channel for incoming calls. High importance, full-screen
/// capable, with the ringtone and vibration owned by the channel so the OS
/// keeps ringing after the posting process dies.
pub const CALL_CHANNEL_ID: &str = "qafila.calls.incoming";

/// Vibration cadence in milliseconds (delay, vibrate, pause, ...), repeated
/// by the OS while the notification is up.
pub const VIBRATION_PATTERN_MS: &[u64] = &[0, 1000, 500, 1000];

/// Action identifier the Answer button reports back.
pub const ACTION_ANSWER: &str = "answer";

/// Action identifier the Decline button reports back.
pub const ACTION_DECLINE: &str = "decline";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification surface error: {0}")]
    Surface(String),
}

/// What the user pressed on an incoming-call notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationAction {
    /// The Answer button.
    Answer,
    /// The Decline button.
    Decline,
    /// The notification body itself.
    Tap,
}

impl NotificationAction {
    /// Map a platform action identifier back to the action. An absent or
    /// unknown identifier is a body tap.
    pub fn from_action_id(id: Option<&str>) -> Self {
        match id {
            Some(ACTION_ANSWER) => Self::Answer,
            Some(ACTION_DECLINE) => Self::Decline,
            _ => Self::Tap,
        }
    }
}

/// Whether the OS lets the incoming-call notification take over the screen
/// while the device is locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Granted,
    Denied,
    /// Platform has no such permission concept; treat as granted.
    NotApplicable,
}

/// Everything the surface needs to render the incoming-call notification.
#[derive(Debug, Clone)]
pub struct CallAlert {
    pub caller: RemoteParty,
    pub offer: SessionDescription,
}

/// Platform notification integration. One incoming-call notification exists
/// at a time; showing a new one replaces any previous one.
#[async_trait]
pub trait NotificationSurface: Send + Sync {
    /// Post (or replace) the incoming-call notification on the call
    /// channel, with Answer/Decline actions and full-screen intent.
    async fn show_incoming_call(&self, alert: &CallAlert) -> Result<(), NotifyError>;

    /// Remove the incoming-call notification. Idempotent.
    async fn dismiss_incoming_call(&self);

    /// Current state of the full-screen notification permission.
    async fn full_screen_permission(&self) -> PermissionState;

    /// Ask the user to grant the full-screen permission. The caller
    /// rate-limits this to once per cold start.
    async fn prompt_full_screen_permission(&self) -> Result<(), NotifyError>;
}
