use super::traits::SignalHandler;
use crate::client::CallClient;
use crate::signaling::{SignalEvent, SignalKind};
use async_trait::async_trait;
use std::sync::Arc;

/// Forwards non-call events (presence, location, chat) straight onto the
/// event bus. These share the socket with call signaling but carry no state
/// on this side; the UI layers consume them directly.
pub struct RelayHandler;

#[async_trait]
impl SignalHandler for RelayHandler {
    fn kinds(&self) -> &'static [SignalKind] {
        &[SignalKind::Presence, SignalKind::Location, SignalKind::Chat]
    }

    async fn handle(&self, client: Arc<CallClient>, event: &SignalEvent) -> bool {
        match event {
            SignalEvent::Presence(update) => {
                let _ = client.event_bus.presence.send(Arc::new(update.clone()));
            }
            SignalEvent::Location(update) => {
                let _ = client.event_bus.location.send(Arc::new(update.clone()));
            }
            SignalEvent::Chat(message) => {
                let _ = client.event_bus.chat.send(Arc::new(message.clone()));
            }
            _ => return false,
        }
        true
    }
}
