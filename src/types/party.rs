use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a call participant within their pilgrim group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PartyRole {
    Guide,
    #[default]
    Pilgrim,
}

/// Identity of the other participant in a call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteParty {
    pub id: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(default)]
    pub role: PartyRole,
}

impl RemoteParty {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, role: PartyRole) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            role,
        }
    }
}

impl fmt::Display for RemoteParty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.display_name, self.id)
    }
}

/// Which side initiated the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallDirection {
    Outgoing,
    Incoming,
}

/// Opaque session-description payload exchanged during peer negotiation.
/// The crate never looks inside; platform peer connectors produce and
/// consume the contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionDescription(pub String);

impl SessionDescription {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionDescription {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionDescription {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Network-path descriptor exchanged during peer-connection negotiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(rename = "sdpMid", skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(rename = "sdpMLineIndex", skip_serializing_if = "Option::is_none")]
    pub sdp_mline_index: Option<u32>,
}
