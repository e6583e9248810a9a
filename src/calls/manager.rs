//! Call manager: the in-process authority over the single call session.

use super::error::CallError;
use super::media::{LocalMedia, MediaController, PeerConnector};
use super::state::{CallEnded, CallPhase, CallSession, CallSnapshot, CallTransition, EndReason};
use crate::signaling::{CallEndSignal, CallSignal, SignalEvent};
use crate::types::events::EventBus;
use crate::types::{IceCandidate, RemoteParty, SessionDescription};
use log::{debug, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

/// Timer tunables for the call lifecycle.
#[derive(Debug, Clone)]
pub struct CallConfig {
    /// Deadline for `dialing` before the call is marked unreachable.
    pub dial_timeout_secs: u64,
    /// Grace period after a channel drop before a connected call is ended.
    pub disconnect_grace_secs: u64,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            dial_timeout_secs: 45,
            disconnect_grace_secs: 10,
        }
    }
}

/// The session plus the local media stream it exclusively owns.
struct SessionSlot {
    session: CallSession,
    media: Option<Arc<LocalMedia>>,
}

/// Owns the one [`CallSession`] a device may hold and reconciles events
/// arriving from the signaling channel, the notification surface's live
/// handler, and the startup mailbox replay. The `Option` is the at-most-one
/// invariant: `None` is idle, and state-creating operations require it.
pub struct CallManager {
    config: CallConfig,
    media: Arc<dyn MediaController>,
    peer: Arc<dyn PeerConnector>,
    event_bus: Arc<EventBus>,
    slot: Mutex<Option<SessionSlot>>,
    /// Bumped on every session create/destroy; deadline timers capture it so
    /// a stale timer can never touch a newer call.
    generation: AtomicU64,
    /// Last user-visible status line ("remote busy", degraded-mode notice).
    status: Mutex<Option<String>>,
}

impl CallManager {
    pub fn new(
        config: CallConfig,
        media: Arc<dyn MediaController>,
        peer: Arc<dyn PeerConnector>,
        event_bus: Arc<EventBus>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            media,
            peer,
            event_bus,
            slot: Mutex::new(None),
            generation: AtomicU64::new(0),
            status: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &CallConfig {
        &self.config
    }

    pub async fn phase(&self) -> CallPhase {
        self.slot
            .lock()
            .await
            .as_ref()
            .map(|s| s.session.phase.clone())
            .unwrap_or_default()
    }

    pub async fn is_idle(&self) -> bool {
        self.slot.lock().await.is_none()
    }

    pub async fn snapshot(&self) -> CallSnapshot {
        self.slot
            .lock()
            .await
            .as_ref()
            .map(|s| s.session.snapshot())
            .unwrap_or_default()
    }

    pub async fn status(&self) -> Option<String> {
        self.status.lock().await.clone()
    }

    pub async fn current_duration_secs(&self) -> Option<i64> {
        self.slot
            .lock()
            .await
            .as_ref()
            .and_then(|s| s.session.current_duration_secs())
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Start an outgoing call. Acquires local media, builds the offer, and
    /// returns the `call-offer` event for the caller to publish together
    /// with the session generation for the dial-deadline timer.
    pub async fn start_call(
        &self,
        remote: RemoteParty,
    ) -> Result<(SignalEvent, u64), CallError> {
        if self.slot.lock().await.is_some() {
            return Err(CallError::AlreadyInCall);
        }

        let media = match self.media.acquire().await {
            Ok(m) => m,
            Err(e) => {
                // Permanent degraded mode: the status line is what the
                // dial screen renders instead of a call.
                *self.status.lock().await = Some(e.to_string());
                return Err(e.into());
            }
        };

        let offer = match self.peer.create_offer().await {
            Ok(o) => o,
            Err(e) => {
                media.release();
                return Err(e.into());
            }
        };

        let mut slot = self.slot.lock().await;
        if slot.is_some() {
            // Lost the race against an incoming offer.
            media.release();
            self.peer.close().await;
            return Err(CallError::AlreadyInCall);
        }

        let session = CallSession::new_outgoing(remote.clone(), offer.clone());
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.emit_snapshot(session.snapshot());
        *slot = Some(SessionSlot {
            session,
            media: Some(media),
        });
        *self.status.lock().await = None;

        info!("Dialing {remote}");
        Ok((
            SignalEvent::CallOffer(CallSignal {
                remote_party: remote,
                payload: offer,
            }),
            generation,
        ))
    }

    /// Register an incoming offer and start ringing. Local media stays
    /// untouched until the user answers, so declining never prompts for the
    /// microphone. A device already in a call rejects the offer outright.
    pub async fn handle_incoming_offer(
        &self,
        remote: RemoteParty,
        offer: SessionDescription,
    ) -> Result<(), CallError> {
        let mut slot = self.slot.lock().await;
        if slot.is_some() {
            return Err(CallError::AlreadyInCall);
        }

        let session = CallSession::new_incoming(remote.clone(), offer);
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.emit_snapshot(session.snapshot());
        *slot = Some(SessionSlot {
            session,
            media: None,
        });

        info!("Incoming call from {remote}, ringing");
        Ok(())
    }

    /// Answer the ringing call: acquire media, build the answer, go
    /// connected. A second call while already connected is a no-op and
    /// returns `None` instead of a duplicate answer to publish.
    pub async fn answer_call(&self) -> Result<Option<SignalEvent>, CallError> {
        let mut guard = self.slot.lock().await;
        let slot = guard.as_mut().ok_or(CallError::NoActiveCall)?;

        if slot.session.phase.is_connected() {
            debug!("answer_call while already connected; ignoring");
            return Ok(None);
        }

        // Check the phase before any side effects so a failed answer
        // leaves the session ringing.
        if !slot.session.phase.can_answer() {
            return Err(crate::calls::state::InvalidTransition {
                current_phase: format!("{:?}", slot.session.phase),
                attempted: "LocalAnswered".to_string(),
            }
            .into());
        }

        let offer = slot
            .session
            .offer
            .clone()
            .ok_or_else(|| CallError::Peer("ringing session has no offer".into()))?;

        let media = self.media.acquire().await.map_err(|e| {
            warn!("Media acquisition failed while answering: {e}");
            CallError::from(e)
        })?;

        let answer = match self.peer.accept_offer(&offer).await {
            Ok(a) => a,
            Err(e) => {
                media.release();
                return Err(e.into());
            }
        };

        slot.session.answer = Some(answer.clone());
        slot.session.apply_transition(CallTransition::LocalAnswered)?;
        slot.media = Some(media);
        self.emit_snapshot(slot.session.snapshot());

        info!("Call with {} connected", slot.session.remote_party);
        Ok(Some(SignalEvent::CallAnswer(CallSignal {
            remote_party: slot.session.remote_party.clone(),
            payload: answer,
        })))
    }

    /// Decline the ringing call. Tears down the partially-built peer
    /// connection and resets straight to idle; returns the `call-end`
    /// event to publish so the caller stops ringing.
    pub async fn decline_call(&self) -> Result<SignalEvent, CallError> {
        let mut guard = self.slot.lock().await;
        let slot = guard.as_mut().ok_or(CallError::NoActiveCall)?;

        slot.session.apply_transition(CallTransition::LocalDeclined)?;
        self.emit_snapshot(slot.session.snapshot());

        let finished = guard.take().expect("slot checked above");
        drop(guard);
        let remote = finished.session.remote_party.clone();
        self.finish(finished, EndReason::Decline).await;

        info!("Declined call from {remote}");
        Ok(SignalEvent::CallEnd(CallEndSignal {
            remote_party: remote,
            reason: EndReason::Decline,
        }))
    }

    /// End the call from any non-idle phase. Unconditional: media is
    /// released and the peer connection closed no matter what phase the
    /// session was in; calling from idle is a harmless no-op.
    pub async fn hangup(&self) -> Result<Option<SignalEvent>, CallError> {
        let mut guard = self.slot.lock().await;
        let Some(mut slot) = guard.take() else {
            return Ok(None);
        };
        drop(guard);

        if slot.session.phase.can_hang_up() {
            slot.session.apply_transition(CallTransition::HungUp)?;
        }
        self.emit_snapshot(slot.session.snapshot());

        let remote = slot.session.remote_party.clone();
        self.finish(slot, EndReason::Hangup).await;

        Ok(Some(SignalEvent::CallEnd(CallEndSignal {
            remote_party: remote,
            reason: EndReason::Hangup,
        })))
    }

    /// Remote side answered our offer.
    pub async fn handle_remote_answer(
        &self,
        answer: SessionDescription,
    ) -> Result<(), CallError> {
        let mut guard = self.slot.lock().await;
        let slot = guard.as_mut().ok_or(CallError::NoActiveCall)?;

        slot.session.apply_transition(CallTransition::RemoteAnswered)?;
        slot.session.answer = Some(answer.clone());
        self.emit_snapshot(slot.session.snapshot());
        drop(guard);

        if let Err(e) = self.peer.apply_answer(&answer).await {
            warn!("Failed to apply remote answer: {e}");
            self.fail_call("peer negotiation failed").await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Remote side ended the call, whatever phase we were in.
    pub async fn handle_remote_end(&self, reason: EndReason) -> Result<(), CallError> {
        let mut guard = self.slot.lock().await;
        let Some(mut slot) = guard.take() else {
            // Late call-end for a session we already tore down.
            return Ok(());
        };
        drop(guard);

        let transition = match slot.session.phase {
            CallPhase::Ringing { .. } => CallTransition::RemoteCancelled,
            CallPhase::Dialing { .. } => CallTransition::DialFailed,
            _ => CallTransition::HungUp,
        };
        if !slot.session.phase.is_terminal() {
            slot.session.apply_transition(transition)?;
        }
        self.emit_snapshot(slot.session.snapshot());

        if matches!(slot.session.phase, CallPhase::Unreachable { .. }) {
            *self.status.lock().await = Some(match reason {
                EndReason::Busy => "remote party is busy".to_string(),
                _ => "remote party is unreachable".to_string(),
            });
        }

        self.finish(slot, reason).await;
        Ok(())
    }

    /// Feed a remote ICE candidate into the peer connection.
    pub async fn handle_remote_candidate(
        &self,
        candidate: &IceCandidate,
    ) -> Result<(), CallError> {
        if self.slot.lock().await.is_none() {
            return Err(CallError::NoActiveCall);
        }
        self.peer.add_remote_candidate(candidate).await?;
        Ok(())
    }

    /// Dial-deadline timer fired. Only acts if the session it was armed for
    /// is still dialing; returns the cancel event to publish so the callee
    /// stops ringing.
    pub async fn cancel_dialing(&self, generation: u64) -> Option<SignalEvent> {
        let mut guard = self.slot.lock().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            return None;
        }
        let dialing = guard
            .as_ref()
            .map(|s| s.session.phase.is_dialing())
            .unwrap_or(false);
        if !dialing {
            return None;
        }

        let mut slot = guard.take().expect("checked above");
        drop(guard);

        if slot
            .session
            .apply_transition(CallTransition::DialFailed)
            .is_err()
        {
            return None;
        }
        self.emit_snapshot(slot.session.snapshot());
        *self.status.lock().await = Some("remote party is unreachable".to_string());

        let remote = slot.session.remote_party.clone();
        self.finish(slot, EndReason::Cancel).await;

        Some(SignalEvent::CallEnd(CallEndSignal {
            remote_party: remote,
            reason: EndReason::Cancel,
        }))
    }

    /// Channel stayed down past the grace period while a call was
    /// connected. Terminal `ended`; reconnection never resumes a call.
    pub async fn fail_disconnected(&self, generation: u64) {
        if self.generation.load(Ordering::SeqCst) != generation {
            return;
        }
        let connected = self
            .slot
            .lock()
            .await
            .as_ref()
            .map(|s| s.session.phase.is_connected())
            .unwrap_or(false);
        if connected {
            self.fail_call("connection to the signaling server was lost")
                .await;
        }
    }

    /// Network/peer failure path: terminal `ended` from any non-idle phase.
    pub async fn fail_call(&self, status: &str) {
        let mut guard = self.slot.lock().await;
        let Some(mut slot) = guard.take() else {
            return;
        };
        drop(guard);

        if !slot.session.phase.is_terminal()
            && let Err(e) = slot.session.apply_transition(CallTransition::Failed)
        {
            warn!("Failure transition rejected: {e}");
        }
        self.emit_snapshot(slot.session.snapshot());
        *self.status.lock().await = Some(status.to_string());

        self.finish(slot, EndReason::Failure).await;
    }

    /// Toggle the local mute state. Connected only; returns the new value.
    pub async fn toggle_mute(&self) -> Result<bool, CallError> {
        self.toggle_track(true).await
    }

    /// Toggle speakerphone. Connected only; returns the new value.
    pub async fn toggle_speaker(&self) -> Result<bool, CallError> {
        self.toggle_track(false).await
    }

    async fn toggle_track(&self, mute: bool) -> Result<bool, CallError> {
        let mut guard = self.slot.lock().await;
        let slot = guard.as_mut().ok_or(CallError::NoActiveCall)?;

        let media = slot
            .media
            .clone()
            .ok_or_else(|| CallError::Peer("no local media".into()))?;

        let new_value = if mute {
            let muted = media.toggle_mute();
            slot.session
                .apply_transition(CallTransition::MuteChanged { muted })?;
            muted
        } else {
            let on = media.toggle_speaker();
            slot.session
                .apply_transition(CallTransition::SpeakerChanged { on })?;
            on
        };
        self.emit_snapshot(slot.session.snapshot());
        Ok(new_value)
    }

    /// Common teardown: release media, close the peer connection, publish
    /// the terminal beat, reset to idle. Cleanup is idempotent and
    /// unconditional.
    async fn finish(&self, slot: SessionSlot, reason: EndReason) {
        if let Some(media) = &slot.media {
            media.release();
        }
        self.peer.close().await;
        self.generation.fetch_add(1, Ordering::SeqCst);

        let duration_secs = match slot.session.phase {
            CallPhase::Ended { duration_secs, .. } => duration_secs,
            _ => None,
        };
        let _ = self.event_bus.call_ended.send(Arc::new(CallEnded {
            remote_party: slot.session.remote_party.clone(),
            reason,
            duration_secs,
        }));
        self.emit_snapshot(CallSnapshot::default());
    }

    fn emit_snapshot(&self, snapshot: CallSnapshot) {
        let _ = self.event_bus.call_snapshot.send(Arc::new(snapshot));
    }
}
