//! Push payload for an incoming call delivered while no process runs.

use super::surface::CallAlert;
use crate::types::{PartyRole, RemoteParty, SessionDescription};
use log::warn;
use std::collections::HashMap;

/// Data-message type tag identifying an incoming-call push.
pub const PUSH_TYPE_INCOMING_CALL: &str = "incoming_call";

/// Parsed incoming-call push. Push data arrives as a flat string map; this
/// is the structured view the detached handler works with.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingCallPush {
    pub caller: RemoteParty,
    pub offer: SessionDescription,
}

impl IncomingCallPush {
    /// Parse the push data map. Returns `None` for pushes that are not
    /// incoming calls or that lack a required field; the detached handler
    /// ignores those rather than crash a headless process.
    pub fn from_data(data: &HashMap<String, String>) -> Option<Self> {
        if data.get("type").map(String::as_str) != Some(PUSH_TYPE_INCOMING_CALL) {
            return None;
        }

        let caller_id = data.get("callerId")?;
        let caller_name = data.get("callerName")?;
        let Some(offer) = data.get("offer") else {
            warn!("Incoming-call push from '{caller_id}' is missing an offer, ignoring");
            return None;
        };

        let role = data
            .get("callerRole")
            .and_then(|r| serde_json::from_value(serde_json::Value::String(r.clone())).ok())
            .unwrap_or(PartyRole::Pilgrim);

        Some(Self {
            caller: RemoteParty::new(caller_id, caller_name, role),
            offer: offer.as_str().into(),
        })
    }

    pub fn alert(&self) -> CallAlert {
        CallAlert {
            caller: self.caller.clone(),
            offer: self.offer.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parses_a_complete_push() {
        let push = IncomingCallPush::from_data(&data(&[
            ("type", "incoming_call"),
            ("callerId", "u2"),
            ("callerName", "Aisha"),
            ("callerRole", "guide"),
            ("offer", "sdp-offer"),
        ]))
        .unwrap();

        assert_eq!(push.caller.id, "u2");
        assert_eq!(push.caller.role, PartyRole::Guide);
        assert_eq!(push.offer.as_str(), "sdp-offer");
    }

    #[test]
    fn role_defaults_to_pilgrim() {
        let push = IncomingCallPush::from_data(&data(&[
            ("type", "incoming_call"),
            ("callerId", "u2"),
            ("callerName", "Aisha"),
            ("offer", "sdp"),
        ]))
        .unwrap();
        assert_eq!(push.caller.role, PartyRole::Pilgrim);
    }

    #[test]
    fn other_push_types_are_ignored() {
        assert!(
            IncomingCallPush::from_data(&data(&[
                ("type", "chat_message"),
                ("callerId", "u2"),
                ("callerName", "Aisha"),
                ("offer", "sdp"),
            ]))
            .is_none()
        );
    }

    #[test]
    fn missing_offer_is_ignored() {
        assert!(
            IncomingCallPush::from_data(&data(&[
                ("type", "incoming_call"),
                ("callerId", "u2"),
                ("callerName", "Aisha"),
            ]))
            .is_none()
        );
    }
}
