use crate::client::CallClient;
use crate::handlers::SignalHandler;
use crate::signaling::{SignalEvent, SignalKind};
use async_trait::async_trait;
use log::warn;
use std::sync::Arc;

/// Routes the four call signal kinds into the call manager. Stale signals
/// for sessions that no longer exist are logged and dropped; the state
/// machine is the authority on what applies.
pub struct CallSignalHandler;

#[async_trait]
impl SignalHandler for CallSignalHandler {
    fn kinds(&self) -> &'static [SignalKind] {
        &[
            SignalKind::CallOffer,
            SignalKind::CallAnswer,
            SignalKind::IceCandidate,
            SignalKind::CallEnd,
        ]
    }

    async fn handle(&self, client: Arc<CallClient>, event: &SignalEvent) -> bool {
        match event {
            SignalEvent::CallOffer(signal) => {
                client
                    .handle_incoming_offer(signal.remote_party.clone(), signal.payload.clone())
                    .await;
            }
            SignalEvent::CallAnswer(signal) => {
                if let Err(e) = client
                    .manager
                    .handle_remote_answer(signal.payload.clone())
                    .await
                {
                    warn!("Dropping call-answer: {e}");
                }
            }
            SignalEvent::IceCandidate(signal) => {
                if let Err(e) = client
                    .manager
                    .handle_remote_candidate(&signal.payload)
                    .await
                {
                    warn!("Dropping ice-candidate: {e}");
                }
            }
            SignalEvent::CallEnd(signal) => {
                client.handle_remote_end(signal.reason).await;
            }
            _ => return false,
        }
        true
    }
}
