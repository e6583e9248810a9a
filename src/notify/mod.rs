pub mod actions;
pub mod payload;
pub mod surface;

pub use actions::DetachedContext;
pub use payload::{IncomingCallPush, PUSH_TYPE_INCOMING_CALL};
pub use surface::{
    ACTION_ANSWER, ACTION_DECLINE, CALL_CHANNEL_ID, CallAlert, NotificationAction,
    NotificationSurface, NotifyError, PermissionState, VIBRATION_PATTERN_MS,
};
