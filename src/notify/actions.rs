//! Detached notification handling.
//!
//! Push receipt and notification button presses can run in a short-lived
//! headless process with no call manager, no socket, and no shared memory
//! with the app. Everything here therefore works only against the durable
//! mailbox, the history backend, and the notification surface, and swallows
//! errors after logging them; there is no user to show them to.

use super::payload::IncomingCallPush;
use super::surface::{NotificationAction, NotificationSurface};
use crate::history::CallHistoryApi;
use crate::mailbox::{self, Mailbox, PendingCallRecord, PendingDecision};
use log::{info, warn};
use std::collections::HashMap;
use std::sync::Arc;

/// The dependencies available to a detached process.
pub struct DetachedContext {
    pub mailbox: Arc<dyn Mailbox>,
    pub history: Arc<dyn CallHistoryApi>,
    pub surface: Arc<dyn NotificationSurface>,
}

impl DetachedContext {
    pub fn new(
        mailbox: Arc<dyn Mailbox>,
        history: Arc<dyn CallHistoryApi>,
        surface: Arc<dyn NotificationSurface>,
    ) -> Self {
        Self {
            mailbox,
            history,
            surface,
        }
    }

    /// Handle a raw push data map. Non-call pushes are ignored; a valid
    /// incoming-call push posts the ringing notification.
    pub async fn handle_push(&self, data: &HashMap<String, String>) -> Option<IncomingCallPush> {
        let push = IncomingCallPush::from_data(data)?;
        info!("Incoming-call push from {}", push.caller);
        if let Err(e) = self.surface.show_incoming_call(&push.alert()).await {
            warn!("Failed to post incoming-call notification: {e}");
        }
        Some(push)
    }

    /// Handle a notification press for the given push. Every path dismisses
    /// the notification; the mailbox carries the decision across to the
    /// next app start.
    pub async fn handle_action(&self, action: NotificationAction, push: &IncomingCallPush) {
        self.surface.dismiss_incoming_call().await;
        match action {
            NotificationAction::Decline => self.decline(push).await,
            NotificationAction::Answer => {
                self.record_pending(PendingDecision::Answer, push).await;
            }
            NotificationAction::Tap => {
                self.record_pending(PendingDecision::Tap, push).await;
            }
        }
    }

    /// Decline from the notification. The backend call is attempted right
    /// here; only if it fails does the decline go into the mailbox for the
    /// next startup to retry. The endpoint is idempotent per caller, so a
    /// rare double delivery is harmless.
    async fn decline(&self, push: &IncomingCallPush) {
        info!("Declined call from {} via notification", push.caller);
        if let Err(e) = self.history.report_decline(&push.caller.id).await {
            warn!("Decline report failed, parking it in the mailbox: {e}");
            if let Err(e) =
                mailbox::write_declined_call(self.mailbox.as_ref(), &push.caller.id).await
            {
                warn!("Failed to park declined call: {e}");
            }
        }
    }

    async fn record_pending(&self, decision: PendingDecision, push: &IncomingCallPush) {
        let record = PendingCallRecord::new(decision, &push.caller, push.offer.clone());
        if let Err(e) = mailbox::write_pending_call(self.mailbox.as_ref(), &record).await {
            warn!("Failed to record pending call decision: {e}");
        }
    }
}
