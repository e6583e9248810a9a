//! Transport seam for the signaling channel.
//!
//! The coordination server speaks JSON text frames over a WebSocket. The
//! trait split keeps the channel logic testable against an in-memory pipe.

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, trace, warn};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use super::error::{Result, SignalingError};

type RawWs = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<RawWs, Message>;
type WsStream = SplitStream<RawWs>;

/// An event produced by the transport layer.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// The transport has successfully connected.
    Connected,
    /// A text frame has been received from the server.
    TextReceived(String),
    /// The connection was lost.
    Disconnected,
}

/// An active connection to the coordination server.
#[async_trait]
pub trait SignalTransport: Send + Sync {
    /// Sends one text frame to the server.
    async fn send_text(&self, text: &str) -> Result<()>;

    /// Closes the connection.
    async fn disconnect(&self);
}

/// Creates new transport instances; one per (re)connect attempt.
#[async_trait]
pub trait SignalTransportFactory: Send + Sync {
    async fn create(&self) -> Result<(Arc<dyn SignalTransport>, mpsc::Receiver<TransportEvent>)>;
}

/// WebSocket transport over `tokio-tungstenite`.
pub struct WsTransport {
    ws_sink: Mutex<Option<WsSink>>,
}

#[async_trait]
impl SignalTransport for WsTransport {
    async fn send_text(&self, text: &str) -> Result<()> {
        let mut sink_guard = self.ws_sink.lock().await;
        let sink = sink_guard.as_mut().ok_or(SignalingError::NotConnected)?;

        debug!("--> Sending frame: {} bytes", text.len());
        sink.send(Message::Text(text.to_string().into()))
            .await
            .map_err(|e| SignalingError::Transport(e.to_string()))
    }

    async fn disconnect(&self) {
        if let Some(mut sink) = self.ws_sink.lock().await.take() {
            let _ = sink.close().await;
        }
    }
}

/// Factory dialing the configured server URL.
pub struct WsTransportFactory {
    url: String,
}

impl WsTransportFactory {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl SignalTransportFactory for WsTransportFactory {
    async fn create(&self) -> Result<(Arc<dyn SignalTransport>, mpsc::Receiver<TransportEvent>)> {
        info!("Dialing {}", self.url);
        let (client, _response) = connect_async(&self.url)
            .await
            .map_err(|e| SignalingError::Transport(e.to_string()))?;

        let (sink, stream) = client.split();
        let (event_tx, event_rx) = mpsc::channel(100);

        let transport = Arc::new(WsTransport {
            ws_sink: Mutex::new(Some(sink)),
        });

        tokio::task::spawn(read_pump(stream, event_tx.clone()));

        let _ = event_tx.send(TransportEvent::Connected).await;

        Ok((transport, event_rx))
    }
}

async fn read_pump(mut stream: WsStream, event_tx: mpsc::Sender<TransportEvent>) {
    loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => {
                trace!("<-- Received frame: {} bytes", text.len());
                if event_tx
                    .send(TransportEvent::TextReceived(text.to_string()))
                    .await
                    .is_err()
                {
                    warn!("Event receiver dropped, closing read pump");
                    break;
                }
            }
            Some(Ok(Message::Close(_))) => {
                trace!("Received close frame");
                break;
            }
            Some(Ok(_)) => {
                // Binary/ping/pong frames are not part of the protocol.
            }
            Some(Err(e)) => {
                error!("Error reading from websocket: {e}");
                break;
            }
            None => {
                trace!("Websocket stream ended");
                break;
            }
        }
    }

    let _ = event_tx.send(TransportEvent::Disconnected).await;
}
