//! The live-process client: owns the call manager, the signaling channel,
//! startup replay, and the reconnect loop.

use crate::calls::handler::CallSignalHandler;
use crate::calls::state::EndReason;
use crate::calls::{CallConfig, CallError, CallManager, MediaController, PeerConnector};
use crate::handlers::{RelayHandler, SignalRouter};
use crate::history::CallHistoryApi;
use crate::mailbox::{self, Mailbox, PendingDecision};
use crate::notify::{CallAlert, NotificationAction, NotificationSurface, PermissionState};
use crate::signaling::{
    CallEndSignal, SignalEvent, SignalKind, SignalTransportFactory, SignalingChannel,
    SignalingError, TransportEvent,
};
use crate::types::events::{ChannelConnected, ChannelDisconnected, EventBus};
use crate::types::{RemoteParty, SessionDescription};
use log::{debug, error, info, warn};
use scopeguard::defer;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, Notify};

/// Client-level configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Identity registered with the signaling server on every connect.
    pub user_id: String,
    pub call: CallConfig,
    /// Cap on the reconnect backoff.
    pub reconnect_cap_secs: u64,
}

impl ClientConfig {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            call: CallConfig::default(),
            reconnect_cap_secs: 30,
        }
    }
}

/// Platform seams the client is wired with at construction.
pub struct ClientDeps {
    pub transport_factory: Arc<dyn SignalTransportFactory>,
    pub media: Arc<dyn MediaController>,
    pub peer: Arc<dyn PeerConnector>,
    pub mailbox: Arc<dyn Mailbox>,
    pub surface: Arc<dyn NotificationSurface>,
    pub history: Arc<dyn CallHistoryApi>,
}

/// The long-lived client for one signed-in user.
///
/// Construction wires the seams together; [`CallClient::bootstrap`] drains
/// the mailbox (always before anything renders), and [`CallClient::run`]
/// drives the connect/dispatch/reconnect loop until shutdown.
pub struct CallClient {
    config: ClientConfig,
    pub event_bus: Arc<EventBus>,
    pub manager: Arc<CallManager>,
    pub channel: Arc<SignalingChannel>,
    mailbox: Arc<dyn Mailbox>,
    surface: Arc<dyn NotificationSurface>,
    history: Arc<dyn CallHistoryApi>,
    router: SignalRouter,

    is_running: AtomicBool,
    shutdown: Notify,
    error_count: AtomicU32,
    replay_done: AtomicBool,
    permission_prompted: AtomicBool,
    /// Events produced while the socket was down (startup replay answers),
    /// flushed in order on the next connect.
    outbound_backlog: Mutex<Vec<SignalEvent>>,
}

impl CallClient {
    pub fn new(config: ClientConfig, deps: ClientDeps) -> Arc<Self> {
        let event_bus = Arc::new(EventBus::new());
        let manager = CallManager::new(
            config.call.clone(),
            deps.media,
            deps.peer,
            event_bus.clone(),
        );
        let channel = Arc::new(SignalingChannel::new(
            deps.transport_factory,
            config.user_id.clone(),
        ));

        let mut router = SignalRouter::new();
        router.register(Arc::new(CallSignalHandler));
        router.register(Arc::new(RelayHandler));

        Arc::new(Self {
            config,
            event_bus,
            manager,
            channel,
            mailbox: deps.mailbox,
            surface: deps.surface,
            history: deps.history,
            router,
            is_running: AtomicBool::new(false),
            shutdown: Notify::new(),
            error_count: AtomicU32::new(0),
            replay_done: AtomicBool::new(false),
            permission_prompted: AtomicBool::new(false),
            outbound_backlog: Mutex::new(Vec::new()),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.channel.is_connected()
    }

    /// Cold-start work that must complete before the first screen renders:
    /// drain the mailbox so a parked call rings (or a parked decline is
    /// delivered), then check the full-screen permission once.
    pub async fn bootstrap(self: &Arc<Self>) {
        if self.replay_done.swap(true, Ordering::SeqCst) {
            return;
        }
        self.replay_mailbox().await;
        self.check_full_screen_permission().await;
    }

    /// Drive the connection until [`CallClient::disconnect`] is called.
    /// Reconnects with linear backoff capped at the configured maximum.
    pub async fn run(self: Arc<Self>) {
        if self.is_running.swap(true, Ordering::SeqCst) {
            warn!("run() called while already running");
            return;
        }
        defer! {
            self.is_running.store(false, Ordering::SeqCst);
        }

        self.bootstrap().await;
        for kind in [SignalKind::Presence, SignalKind::Location, SignalKind::Chat] {
            self.channel.subscribe(kind).await;
        }

        let mut first_connect = true;
        loop {
            let events = tokio::select! {
                result = self.channel.connect() => match result {
                    Ok(events) => events,
                    Err(e) => {
                        let delay = self.next_backoff();
                        warn!("Connect failed ({e}), retrying in {delay:?}");
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => continue,
                            _ = self.shutdown.notified() => return,
                        }
                    }
                },
                _ = self.shutdown.notified() => return,
            };

            self.error_count.store(0, Ordering::SeqCst);
            self.on_connected(!first_connect).await;
            first_connect = false;

            let finished = self.dispatch_loop(events).await;
            self.on_disconnected().await;
            if finished {
                return;
            }

            let delay = self.next_backoff();
            debug!("Reconnecting in {delay:?}");
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.shutdown.notified() => return,
            }
        }
    }

    /// Stop the run loop and close the socket.
    pub async fn disconnect(&self) {
        self.shutdown.notify_waiters();
        self.channel.disconnect().await;
    }

    // ---- Outgoing operations -------------------------------------------

    /// Dial `remote`. Publishes the offer and arms the dial deadline.
    ///
    /// A down socket does not end the call: the offer is backlogged for the
    /// next connect and the session stays `dialing` until the deadline, so a
    /// brief outage during dial-out rides on the same timer as an unanswered
    /// ring.
    pub async fn start_call(self: &Arc<Self>, remote: RemoteParty) -> Result<(), CallError> {
        let (offer_event, generation) = self.manager.start_call(remote).await?;
        self.publish_or_backlog(offer_event).await;

        let client = self.clone();
        let deadline = Duration::from_secs(self.config.call.dial_timeout_secs);
        tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            if let Some(cancel_event) = client.manager.cancel_dialing(generation).await {
                info!("Dial deadline hit, cancelling outgoing call");
                client.publish_or_backlog(cancel_event).await;
            }
        });
        Ok(())
    }

    /// Answer the ringing call (from the in-app UI or a live notification).
    pub async fn answer_call(self: &Arc<Self>) -> Result<(), CallError> {
        match self.manager.answer_call().await? {
            Some(answer_event) => {
                self.publish_or_backlog(answer_event).await;
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Decline the ringing call. The backend is told directly; the caller
    /// is told over signaling.
    pub async fn decline_call(self: &Arc<Self>) -> Result<(), CallError> {
        let end_event = self.manager.decline_call().await?;
        let caller_id = match &end_event {
            SignalEvent::CallEnd(signal) => signal.remote_party.id.clone(),
            _ => String::new(),
        };
        self.publish_or_backlog(end_event).await;
        self.report_decline_detached(caller_id);
        Ok(())
    }

    /// Hang up whatever call exists. Safe from idle.
    pub async fn hangup(self: &Arc<Self>) -> Result<(), CallError> {
        if let Some(end_event) = self.manager.hangup().await? {
            self.publish_or_backlog(end_event).await;
        }
        Ok(())
    }

    pub async fn toggle_mute(&self) -> Result<bool, CallError> {
        self.manager.toggle_mute().await
    }

    pub async fn toggle_speaker(&self) -> Result<bool, CallError> {
        self.manager.toggle_speaker().await
    }

    /// Notification press while this process is alive: route straight into
    /// the live session instead of the mailbox.
    pub async fn handle_notification_action(self: &Arc<Self>, action: NotificationAction) {
        self.surface.dismiss_incoming_call().await;
        let result = match action {
            NotificationAction::Answer => self.answer_call().await,
            NotificationAction::Decline => self.decline_call().await,
            // The tap opens the app; the ringing snapshot is already on the
            // bus and the call screen renders from it.
            NotificationAction::Tap => Ok(()),
        };
        if let Err(e) = result {
            warn!("Notification {action:?} had no live call to act on: {e}");
        }
    }

    // ---- Incoming signal paths (called by handlers) --------------------

    /// A live `call-offer` arrived over the socket.
    pub async fn handle_incoming_offer(
        self: &Arc<Self>,
        remote: RemoteParty,
        offer: SessionDescription,
    ) {
        match self.manager.handle_incoming_offer(remote.clone(), offer.clone()).await {
            Ok(()) => {
                let alert = CallAlert {
                    caller: remote,
                    offer,
                };
                if let Err(e) = self.surface.show_incoming_call(&alert).await {
                    warn!("Could not post incoming-call notification: {e}");
                }
            }
            Err(CallError::AlreadyInCall) => {
                // Tell the caller we are busy so they stop dialing.
                info!("Rejecting offer from {remote}: already in a call");
                self.publish_or_backlog(SignalEvent::CallEnd(CallEndSignal {
                    remote_party: remote,
                    reason: EndReason::Busy,
                }))
                .await;
            }
            Err(e) => warn!("Dropping call offer: {e}"),
        }
    }

    /// A live `call-end` arrived over the socket.
    pub async fn handle_remote_end(self: &Arc<Self>, reason: EndReason) {
        self.surface.dismiss_incoming_call().await;
        if let Err(e) = self.manager.handle_remote_end(reason).await {
            warn!("Dropping call-end: {e}");
        }
    }

    // ---- Internals -----------------------------------------------------

    /// Linear backoff capped at the configured maximum, with up to half a
    /// second of jitter so a fleet of devices does not reconnect in step.
    fn next_backoff(&self) -> Duration {
        use rand::Rng;
        let errors = self.error_count.fetch_add(1, Ordering::SeqCst) as u64 + 1;
        let base = (errors * 2).min(self.config.reconnect_cap_secs);
        Duration::from_secs(base) + Duration::from_millis(rand::rng().random_range(0..500))
    }

    async fn on_connected(&self, reconnect: bool) {
        info!("Signaling channel up (reconnect: {reconnect})");
        let _ = self
            .event_bus
            .connected
            .send(Arc::new(ChannelConnected { reconnect }));

        let backlog: Vec<SignalEvent> = std::mem::take(&mut *self.outbound_backlog.lock().await);
        for event in backlog {
            if let Err(e) = self.channel.publish(&event).await {
                warn!("Failed to flush backlogged event: {e}");
            }
        }
    }

    async fn on_disconnected(self: &Arc<Self>) {
        self.channel.mark_disconnected().await;
        let _ = self
            .event_bus
            .disconnected
            .send(Arc::new(ChannelDisconnected));

        // A connected call survives a brief outage; past the grace period
        // it ends. Reconnection never resurrects a call.
        if self.manager.phase().await.is_connected() {
            let client = self.clone();
            let generation = self.manager.generation();
            let grace = Duration::from_secs(self.config.call.disconnect_grace_secs);
            tokio::spawn(async move {
                tokio::time::sleep(grace).await;
                if !client.channel.is_connected() {
                    client.manager.fail_disconnected(generation).await;
                }
            });
        }
    }

    /// Drain transport events until the socket drops (returns `false`) or
    /// shutdown is requested (returns `true`).
    async fn dispatch_loop(
        self: &Arc<Self>,
        mut events: tokio::sync::mpsc::Receiver<TransportEvent>,
    ) -> bool {
        loop {
            let event = tokio::select! {
                event = events.recv() => event,
                _ = self.shutdown.notified() => return true,
            };
            match event {
                Some(TransportEvent::TextReceived(text)) => {
                    let signal = match SignalEvent::from_json(&text) {
                        Ok(signal) => signal,
                        Err(e) => {
                            warn!("Ignoring undecodable frame: {e}");
                            continue;
                        }
                    };
                    if !self.router.dispatch(self.clone(), &signal).await {
                        debug!("Unhandled signal kind '{}'", signal.kind());
                    }
                }
                Some(TransportEvent::Connected) => {}
                Some(TransportEvent::Disconnected) | None => return false,
            }
        }
    }

    /// Publish now, or park the event for the next connect. Call-flow
    /// events produced during startup replay land here before the first
    /// connect completes.
    async fn publish_or_backlog(&self, event: SignalEvent) {
        match self.channel.publish(&event).await {
            Ok(()) => {}
            Err(SignalingError::NotConnected) => {
                debug!("Socket down, backlogging {} event", event.kind());
                self.outbound_backlog.lock().await.push(event);
            }
            Err(e) => warn!("Failed to publish {} event: {e}", event.kind()),
        }
    }

    /// Fire-and-forget decline report to the call-history backend. The
    /// endpoint is idempotent per caller, so retry semantics stay simple.
    fn report_decline_detached(self: &Arc<Self>, caller_id: String) {
        if caller_id.is_empty() {
            return;
        }
        let history = self.history.clone();
        tokio::spawn(async move {
            if let Err(e) = history.report_decline(&caller_id).await {
                warn!("Decline report for '{caller_id}' failed: {e:#}");
            }
        });
    }

    /// Replay mailbox records parked by a detached process. Runs exactly
    /// once per process, before the first connect and before anything
    /// renders, so the user lands directly on the ringing screen.
    async fn replay_mailbox(self: &Arc<Self>) {
        match mailbox::take_declined_call(self.mailbox.as_ref()).await {
            Ok(Some(caller_id)) => {
                info!("Replaying parked decline for '{caller_id}'");
                if let Err(e) = self.history.report_decline(&caller_id).await {
                    // One retry per parked decline; the backend endpoint is
                    // idempotent and the history entry is cosmetic.
                    error!("Parked decline for '{caller_id}' lost: {e:#}");
                }
            }
            Ok(None) => {}
            Err(e) => warn!("Could not read parked decline: {e}"),
        }

        match mailbox::take_pending_call(self.mailbox.as_ref()).await {
            Ok(Some(record)) => {
                let remote = record.remote_party();
                info!(
                    "Replaying parked {:?} decision for call from {remote}",
                    record.decision
                );
                if let Err(e) = self
                    .manager
                    .handle_incoming_offer(remote, record.offer.clone())
                    .await
                {
                    warn!("Parked call could not ring: {e}");
                    return;
                }
                if record.decision == PendingDecision::Answer
                    && let Err(e) = self.answer_call().await
                {
                    warn!("Parked answer failed: {e}");
                }
            }
            Ok(None) => {}
            Err(e) => warn!("Could not read parked call: {e}"),
        }
    }

    /// Prompt for the full-screen notification permission at most once per
    /// cold start, and only when the platform reports it denied.
    async fn check_full_screen_permission(&self) {
        if self.permission_prompted.swap(true, Ordering::SeqCst) {
            return;
        }
        if self.surface.full_screen_permission().await == PermissionState::Denied {
            info!("Full-screen notification permission denied, prompting");
            if let Err(e) = self.surface.prompt_full_screen_permission().await {
                warn!("Permission prompt failed: {e}");
            }
        }
    }
}
