use crate::calls::state::{CallEnded, CallSnapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

// The size of the broadcast channel buffer.
const CHANNEL_CAPACITY: usize = 100;

/// The signaling channel came up (initial connect or reconnect).
#[derive(Debug, Clone)]
pub struct ChannelConnected {
    pub reconnect: bool,
}

/// The signaling channel went down.
#[derive(Debug, Clone)]
pub struct ChannelDisconnected;

/// Presence change for another group member, multiplexed on the channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceUpdate {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub online: bool,
}

/// Live location report for a group member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationUpdate {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Chat message relayed over the channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(rename = "senderId")]
    pub sender_id: String,
    pub body: String,
    #[serde(default)]
    pub sent_at: Option<DateTime<Utc>>,
}

// Macro to generate EventBus fields and constructor
macro_rules! define_event_bus {
    ($(($field:ident, $type:ty)),* $(,)?) => {
        /// Typed event bus with a separate broadcast channel per event type.
        /// The Call UI subscribes to `call_snapshot` and renders purely from
        /// the observed state; nothing else flows back from it.
        #[derive(Debug)]
        pub struct EventBus {
            $(
                pub $field: broadcast::Sender<$type>,
            )*
        }

        impl EventBus {
            pub fn new() -> Self {
                Self {
                    $(
                        $field: broadcast::channel(CHANNEL_CAPACITY).0,
                    )*
                }
            }
        }
    };
}

define_event_bus! {
    // Call lifecycle
    (call_snapshot, Arc<CallSnapshot>),
    (call_ended, Arc<CallEnded>),

    // Channel connectivity
    (connected, Arc<ChannelConnected>),
    (disconnected, Arc<ChannelDisconnected>),

    // Non-call traffic multiplexed on the same connection
    (presence, Arc<PresenceUpdate>),
    (location, Arc<LocationUpdate>),
    (chat, Arc<ChatMessage>),
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
