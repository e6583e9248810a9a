//! Shared fakes: an in-memory signaling pipe plus recording seams.

#![allow(dead_code)]

use async_trait::async_trait;
use qafila_call::calls::media::MediaError;
use qafila_call::calls::{LocalMedia, MediaController, PeerConnector};
use qafila_call::client::{CallClient, ClientConfig, ClientDeps};
use qafila_call::history::CallHistoryApi;
use qafila_call::mailbox::MemoryMailbox;
use qafila_call::notify::{CallAlert, NotificationSurface, NotifyError, PermissionState};
use qafila_call::signaling::{
    SignalEvent, SignalTransport, SignalTransportFactory, SignalingError, TransportEvent,
};
use qafila_call::types::{IceCandidate, SessionDescription};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};

/// One end of an in-memory signaling connection. Tests read the frames the
/// client sent and inject frames as if the server spoke.
pub struct PipeTransport {
    sent: Mutex<Vec<String>>,
    events: mpsc::Sender<TransportEvent>,
    down: AtomicBool,
}

impl PipeTransport {
    /// Frames the client published, decoded.
    pub async fn sent_events(&self) -> Vec<SignalEvent> {
        self.sent
            .lock()
            .await
            .iter()
            .map(|text| SignalEvent::from_json(text).expect("client sent undecodable frame"))
            .collect()
    }

    /// Inject a frame as if it arrived from the server.
    pub async fn inject(&self, event: &SignalEvent) {
        let text = event.to_json().unwrap();
        self.events
            .send(TransportEvent::TextReceived(text))
            .await
            .expect("client dispatch loop is gone");
    }

    /// Simulate the server dropping the connection.
    pub async fn drop_connection(&self) {
        self.down.store(true, Ordering::SeqCst);
        let _ = self.events.send(TransportEvent::Disconnected).await;
    }
}

#[async_trait]
impl SignalTransport for PipeTransport {
    async fn send_text(&self, text: &str) -> Result<(), SignalingError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(SignalingError::Transport("pipe closed".into()));
        }
        self.sent.lock().await.push(text.to_string());
        Ok(())
    }

    async fn disconnect(&self) {
        self.down.store(true, Ordering::SeqCst);
    }
}

/// Hands out pipe transports and remembers the most recent one.
#[derive(Default)]
pub struct PipeFactory {
    current: std::sync::Mutex<Option<Arc<PipeTransport>>>,
    pub connects: AtomicUsize,
}

impl PipeFactory {
    pub fn current(&self) -> Option<Arc<PipeTransport>> {
        self.current.lock().unwrap().clone()
    }
}

#[async_trait]
impl SignalTransportFactory for PipeFactory {
    async fn create(
        &self,
    ) -> Result<(Arc<dyn SignalTransport>, mpsc::Receiver<TransportEvent>), SignalingError> {
        let (tx, rx) = mpsc::channel(64);
        let _ = tx.send(TransportEvent::Connected).await;
        let transport = Arc::new(PipeTransport {
            sent: Mutex::new(Vec::new()),
            events: tx,
            down: AtomicBool::new(false),
        });
        *self.current.lock().unwrap() = Some(transport.clone());
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok((transport, rx))
    }
}

#[derive(Default)]
pub struct RecordingSurface {
    pub shown: AtomicUsize,
    pub dismissed: AtomicUsize,
    pub prompted: AtomicUsize,
    pub deny_full_screen: AtomicBool,
    last_alert: std::sync::Mutex<Option<CallAlert>>,
}

impl RecordingSurface {
    pub fn last_alert(&self) -> Option<CallAlert> {
        self.last_alert.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSurface for RecordingSurface {
    async fn show_incoming_call(&self, alert: &CallAlert) -> Result<(), NotifyError> {
        self.shown.fetch_add(1, Ordering::SeqCst);
        *self.last_alert.lock().unwrap() = Some(alert.clone());
        Ok(())
    }

    async fn dismiss_incoming_call(&self) {
        self.dismissed.fetch_add(1, Ordering::SeqCst);
    }

    async fn full_screen_permission(&self) -> PermissionState {
        if self.deny_full_screen.load(Ordering::SeqCst) {
            PermissionState::Denied
        } else {
            PermissionState::Granted
        }
    }

    async fn prompt_full_screen_permission(&self) -> Result<(), NotifyError> {
        self.prompted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct CountingHistory {
    pub declines: std::sync::Mutex<Vec<String>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl CallHistoryApi for CountingHistory {
    async fn report_decline(&self, caller_id: &str) -> anyhow::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("backend unreachable");
        }
        self.declines.lock().unwrap().push(caller_id.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeMedia {
    pub handles: std::sync::Mutex<Vec<Arc<LocalMedia>>>,
}

impl FakeMedia {
    pub fn acquired(&self) -> usize {
        self.handles.lock().unwrap().len()
    }
}

#[async_trait]
impl MediaController for FakeMedia {
    async fn acquire(&self) -> Result<Arc<LocalMedia>, MediaError> {
        let handle = Arc::new(LocalMedia::new());
        self.handles.lock().unwrap().push(handle.clone());
        Ok(handle)
    }
}

#[derive(Default)]
pub struct FakePeer {
    pub closes: AtomicUsize,
}

#[async_trait]
impl PeerConnector for FakePeer {
    async fn create_offer(&self) -> Result<SessionDescription, MediaError> {
        Ok("local-offer".into())
    }

    async fn accept_offer(
        &self,
        _offer: &SessionDescription,
    ) -> Result<SessionDescription, MediaError> {
        Ok("local-answer".into())
    }

    async fn apply_answer(&self, _answer: &SessionDescription) -> Result<(), MediaError> {
        Ok(())
    }

    async fn add_remote_candidate(&self, _candidate: &IceCandidate) -> Result<(), MediaError> {
        Ok(())
    }

    async fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct TestHarness {
    pub client: Arc<CallClient>,
    pub factory: Arc<PipeFactory>,
    pub mailbox: Arc<MemoryMailbox>,
    pub surface: Arc<RecordingSurface>,
    pub history: Arc<CountingHistory>,
    pub media: Arc<FakeMedia>,
    pub peer: Arc<FakePeer>,
}

pub fn harness() -> TestHarness {
    harness_with(ClientConfig::new("u1"))
}

pub fn harness_with(config: ClientConfig) -> TestHarness {
    let _ = env_logger::builder().is_test(true).try_init();
    let factory = Arc::new(PipeFactory::default());
    let mailbox = Arc::new(MemoryMailbox::new());
    let surface = Arc::new(RecordingSurface::default());
    let history = Arc::new(CountingHistory::default());
    let media = Arc::new(FakeMedia::default());
    let peer = Arc::new(FakePeer::default());

    let client = CallClient::new(
        config,
        ClientDeps {
            transport_factory: factory.clone(),
            media: media.clone(),
            peer: peer.clone(),
            mailbox: mailbox.clone(),
            surface: surface.clone(),
            history: history.clone(),
        },
    );

    TestHarness {
        client,
        factory,
        mailbox,
        surface,
        history,
        media,
        peer,
    }
}

impl TestHarness {
    /// Start the run loop and wait for the pipe to come up.
    pub async fn start(&self) -> Arc<PipeTransport> {
        tokio::spawn(self.client.clone().run());
        wait_until(|| async { self.client.is_connected() }).await;
        self.factory.current().expect("factory never created a pipe")
    }
}

/// Poll `condition` until it holds or five seconds pass. Long enough to
/// cover one reconnect backoff cycle.
pub async fn wait_until<F, Fut>(condition: F)
where
    F: Fn() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..500 {
        if condition().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met within 5s");
}
