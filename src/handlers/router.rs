use super::traits::SignalHandler;
use crate::client::CallClient;
use crate::signaling::{SignalEvent, SignalKind};
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

/// Dispatches decoded signaling events to the handler registered for their
/// kind. Registration happens once at client construction; the map is
/// immutable afterwards.
#[derive(Default)]
pub struct SignalRouter {
    handlers: HashMap<SignalKind, Arc<dyn SignalHandler>>,
}

impl SignalRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for every kind it declares.
    ///
    /// # Panics
    /// Panics if another handler is already registered for one of the
    /// kinds. Routing is first-match-only, so a duplicate registration is a
    /// wiring bug caught at startup.
    pub fn register(&mut self, handler: Arc<dyn SignalHandler>) {
        for kind in handler.kinds() {
            if self.handlers.insert(*kind, handler.clone()).is_some() {
                panic!("duplicate signal handler registered for kind '{kind}'");
            }
        }
    }

    /// Route one event. Returns `true` if a handler consumed it.
    pub async fn dispatch(&self, client: Arc<CallClient>, event: &SignalEvent) -> bool {
        let kind = event.kind();
        match self.handlers.get(&kind) {
            Some(handler) => handler.handle(client, event).await,
            None => {
                debug!("No handler for signal kind '{kind}', dropping");
                false
            }
        }
    }
}
