use super::traits::{Mailbox, MailboxError, Result};
use crate::types::{PartyRole, RemoteParty, SessionDescription};
use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

/// Mailbox key for an answer/tap decision awaiting the next cold start.
pub const PENDING_CALL: &str = "PENDING_CALL";

/// Mailbox key for a decline whose backend notification still needs delivery.
pub const DECLINED_CALL: &str = "DECLINED_CALL";

/// What the user did on the notification while no live process existed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PendingDecision {
    /// Pressed Answer: replay rings and auto-answers.
    #[default]
    Answer,
    /// Tapped the notification body: replay rings and waits for the user.
    Tap,
}

/// Durable snapshot of a call decision made outside the live process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingCallRecord {
    #[serde(default)]
    pub decision: PendingDecision,
    #[serde(rename = "callerId")]
    pub caller_id: String,
    #[serde(rename = "callerName")]
    pub caller_name: String,
    #[serde(rename = "callerRole", default)]
    pub caller_role: PartyRole,
    pub offer: SessionDescription,
    #[serde(rename = "writtenAt", default)]
    pub written_at: Option<DateTime<Utc>>,
}

impl PendingCallRecord {
    pub fn new(
        decision: PendingDecision,
        caller: &RemoteParty,
        offer: SessionDescription,
    ) -> Self {
        Self {
            decision,
            caller_id: caller.id.clone(),
            caller_name: caller.display_name.clone(),
            caller_role: caller.role,
            offer,
            written_at: Some(Utc::now()),
        }
    }

    pub fn remote_party(&self) -> RemoteParty {
        RemoteParty::new(&self.caller_id, &self.caller_name, self.caller_role)
    }
}

pub async fn write_pending_call(mailbox: &dyn Mailbox, record: &PendingCallRecord) -> Result<()> {
    let data = serde_json::to_vec(record).map_err(|e| MailboxError::Serialization(e.to_string()))?;
    mailbox.put(PENDING_CALL, &data).await
}

/// Take the pending-call record, if any. A record that fails to parse is
/// already deleted by the take and gets discarded with a warning instead of
/// crashing startup.
pub async fn take_pending_call(mailbox: &dyn Mailbox) -> Result<Option<PendingCallRecord>> {
    match mailbox.take(PENDING_CALL).await? {
        Some(data) => match serde_json::from_slice(&data) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!("Discarding corrupt {PENDING_CALL} record: {e}");
                Ok(None)
            }
        },
        None => Ok(None),
    }
}

pub async fn write_declined_call(mailbox: &dyn Mailbox, caller_id: &str) -> Result<()> {
    mailbox.put(DECLINED_CALL, caller_id.as_bytes()).await
}

pub async fn take_declined_call(mailbox: &dyn Mailbox) -> Result<Option<String>> {
    match mailbox.take(DECLINED_CALL).await? {
        Some(data) => match String::from_utf8(data) {
            Ok(id) => Ok(Some(id)),
            Err(e) => {
                warn!("Discarding corrupt {DECLINED_CALL} record: {e}");
                Ok(None)
            }
        },
        None => Ok(None),
    }
}
