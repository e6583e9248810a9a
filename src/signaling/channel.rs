//! Reconnecting signaling channel.

use log::{debug, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, mpsc};

use super::error::{Result, SignalingError};
use super::event::{SignalEvent, SignalKind, SubscribeFrame};
use super::transport::{SignalTransport, SignalTransportFactory, TransportEvent};
use crate::signaling::event::RegisterFrame;

/// Long-lived bidirectional connection to the coordination server.
///
/// The server forgets who we are on every disconnect, so identity
/// registration and the queued listen requests are replayed on each
/// (re)connect. `publish` fails fast while the socket is down; callers treat
/// that as the signaling-unreachable condition and keep their phase.
pub struct SignalingChannel {
    factory: Arc<dyn SignalTransportFactory>,
    user_id: String,
    transport: Mutex<Option<Arc<dyn SignalTransport>>>,
    /// Listen requests accepted before (and across) connections; flushed
    /// after every successful register.
    subscriptions: Mutex<Vec<SignalKind>>,
    is_connected: AtomicBool,
}

impl SignalingChannel {
    pub fn new(factory: Arc<dyn SignalTransportFactory>, user_id: impl Into<String>) -> Self {
        Self {
            factory,
            user_id: user_id.into(),
            transport: Mutex::new(None),
            subscriptions: Mutex::new(Vec::new()),
            is_connected: AtomicBool::new(false),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.is_connected.load(Ordering::SeqCst)
    }

    /// Request delivery of `kind` events. Safe to call before the first
    /// connect: the request is queued and flushed once the connection is
    /// live, so nothing is missed during the handshake window.
    pub async fn subscribe(&self, kind: SignalKind) {
        {
            let mut subs = self.subscriptions.lock().await;
            if !subs.contains(&kind) {
                subs.push(kind);
            }
        }
        if self.is_connected() {
            let frame = SignalEvent::Subscribe(SubscribeFrame {
                event: kind.as_str().to_string(),
            });
            if let Err(e) = self.publish(&frame).await {
                warn!("Failed to send subscribe frame for {kind}: {e}");
            }
        }
    }

    /// Establish the connection and perform registration. Returns the event
    /// stream the caller drives the dispatch loop from.
    pub async fn connect(&self) -> Result<mpsc::Receiver<TransportEvent>> {
        if self.is_connected() {
            return Err(SignalingError::AlreadyConnected);
        }

        let (transport, events) = self.factory.create().await?;
        *self.transport.lock().await = Some(transport);
        self.is_connected.store(true, Ordering::SeqCst);

        // A handshake failure must leave the channel disconnected, or every
        // later connect attempt would see AlreadyConnected.
        if let Err(e) = self.register_and_flush().await {
            self.mark_disconnected().await;
            return Err(e);
        }

        info!("Signaling channel registered as {}", self.user_id);
        Ok(events)
    }

    async fn register_and_flush(&self) -> Result<()> {
        // Registration does not survive a reconnect; do it every time.
        self.publish(&SignalEvent::Register(RegisterFrame {
            user_id: self.user_id.clone(),
        }))
        .await?;

        let pending: Vec<SignalKind> = self.subscriptions.lock().await.clone();
        for kind in pending {
            let frame = SignalEvent::Subscribe(SubscribeFrame {
                event: kind.as_str().to_string(),
            });
            self.publish(&frame).await?;
            debug!("Flushed queued subscription: {kind}");
        }
        Ok(())
    }

    /// Send one event. Fails with [`SignalingError::NotConnected`] when the
    /// socket is down; the caller decides whether that is fatal.
    pub async fn publish(&self, event: &SignalEvent) -> Result<()> {
        let transport = {
            let guard = self.transport.lock().await;
            guard.clone().ok_or(SignalingError::NotConnected)?
        };
        transport.send_text(&event.to_json()?).await
    }

    /// Record that the connection is gone (read pump saw EOF or an error).
    pub async fn mark_disconnected(&self) {
        self.is_connected.store(false, Ordering::SeqCst);
        *self.transport.lock().await = None;
    }

    /// Intentional shutdown.
    pub async fn disconnect(&self) {
        if let Some(transport) = self.transport.lock().await.take() {
            transport.disconnect().await;
        }
        self.is_connected.store(false, Ordering::SeqCst);
    }
}
