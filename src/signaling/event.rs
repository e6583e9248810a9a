//! Wire events multiplexed on the signaling channel.
//!
//! One tagged union covers everything the socket carries: the four call
//! signaling messages, the unrelated presence/location/chat traffic, and the
//! client-to-server register/subscribe frames. Parsing happens once at the
//! boundary; malformed payloads fail here instead of leaking into the state
//! machine.

use crate::calls::state::EndReason;
use crate::types::events::{ChatMessage, LocationUpdate, PresenceUpdate};
use crate::types::{IceCandidate, RemoteParty, SessionDescription};
use serde::{Deserialize, Serialize};

use super::error::SignalingError;

/// Offer or answer signal: `{remoteParty, payload}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallSignal {
    #[serde(rename = "remoteParty")]
    pub remote_party: RemoteParty,
    pub payload: SessionDescription,
}

/// ICE candidate signal: `{remoteParty, payload}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IceSignal {
    #[serde(rename = "remoteParty")]
    pub remote_party: RemoteParty,
    pub payload: IceCandidate,
}

/// Call-end signal; the payload carries the end reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallEndSignal {
    #[serde(rename = "remoteParty")]
    pub remote_party: RemoteParty,
    #[serde(rename = "payload", default)]
    pub reason: EndReason,
}

/// Identity registration, sent on every connect and reconnect; the server
/// does not remember registrations across connections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterFrame {
    #[serde(rename = "userId")]
    pub user_id: String,
}

/// Server-side listen request, queued locally until the connection is live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscribeFrame {
    pub event: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum SignalEvent {
    Register(RegisterFrame),
    Subscribe(SubscribeFrame),
    CallOffer(CallSignal),
    CallAnswer(CallSignal),
    IceCandidate(IceSignal),
    CallEnd(CallEndSignal),
    Presence(PresenceUpdate),
    Location(LocationUpdate),
    Chat(ChatMessage),
}

/// Kind tag used for routing and for subscribe frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    Register,
    Subscribe,
    CallOffer,
    CallAnswer,
    IceCandidate,
    CallEnd,
    Presence,
    Location,
    Chat,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::Subscribe => "subscribe",
            Self::CallOffer => "call-offer",
            Self::CallAnswer => "call-answer",
            Self::IceCandidate => "ice-candidate",
            Self::CallEnd => "call-end",
            Self::Presence => "presence",
            Self::Location => "location",
            Self::Chat => "chat",
        }
    }
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SignalEvent {
    pub fn kind(&self) -> SignalKind {
        match self {
            Self::Register(_) => SignalKind::Register,
            Self::Subscribe(_) => SignalKind::Subscribe,
            Self::CallOffer(_) => SignalKind::CallOffer,
            Self::CallAnswer(_) => SignalKind::CallAnswer,
            Self::IceCandidate(_) => SignalKind::IceCandidate,
            Self::CallEnd(_) => SignalKind::CallEnd,
            Self::Presence(_) => SignalKind::Presence,
            Self::Location(_) => SignalKind::Location,
            Self::Chat(_) => SignalKind::Chat,
        }
    }

    pub fn from_json(text: &str) -> Result<Self, SignalingError> {
        serde_json::from_str(text).map_err(|e| SignalingError::Parse(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, SignalingError> {
        serde_json::to_string(self).map_err(|e| SignalingError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PartyRole;

    #[test]
    fn call_offer_round_trips_with_kebab_tag() {
        let event = SignalEvent::CallOffer(CallSignal {
            remote_party: RemoteParty::new("u2", "Aisha", PartyRole::Guide),
            payload: "sdp-offer".into(),
        });

        let json = event.to_json().unwrap();
        assert!(json.contains(r#""event":"call-offer""#));
        assert!(json.contains(r#""remoteParty""#));

        let parsed = SignalEvent::from_json(&json).unwrap();
        assert_eq!(parsed, event);
        assert_eq!(parsed.kind(), SignalKind::CallOffer);
    }

    #[test]
    fn call_end_defaults_reason() {
        let json = r#"{"event":"call-end","data":{"remoteParty":{"id":"u2","displayName":"Aisha","role":"guide"}}}"#;
        let parsed = SignalEvent::from_json(json).unwrap();
        match parsed {
            SignalEvent::CallEnd(end) => {
                assert_eq!(end.reason, crate::calls::state::EndReason::Hangup)
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn relay_variants_round_trip_and_compare() {
        use crate::types::events::{ChatMessage, LocationUpdate, PresenceUpdate};

        let events = [
            SignalEvent::Presence(PresenceUpdate {
                user_id: "u2".into(),
                online: true,
            }),
            SignalEvent::Location(LocationUpdate {
                user_id: "u2".into(),
                lat: 21.4225,
                lng: 39.8262,
                timestamp: None,
            }),
            SignalEvent::Chat(ChatMessage {
                sender_id: "u2".into(),
                body: "we are at the gate".into(),
                sent_at: None,
            }),
        ];
        for event in events {
            let parsed = SignalEvent::from_json(&event.to_json().unwrap()).unwrap();
            assert_eq!(parsed, event);
        }
    }

    #[test]
    fn malformed_payload_fails_at_the_boundary() {
        let json = r#"{"event":"call-offer","data":{"payload":"sdp"}}"#;
        assert!(SignalEvent::from_json(json).is_err());
    }
}
