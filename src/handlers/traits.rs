use crate::client::CallClient;
use crate::signaling::{SignalEvent, SignalKind};
use async_trait::async_trait;
use std::sync::Arc;

/// A handler for one or more signaling event kinds.
#[async_trait]
pub trait SignalHandler: Send + Sync {
    /// The event kinds this handler consumes.
    fn kinds(&self) -> &'static [SignalKind];

    /// Handle the event. Returns `true` if the event was consumed and
    /// should not be offered to any further handler.
    async fn handle(&self, client: Arc<CallClient>, event: &SignalEvent) -> bool;
}
