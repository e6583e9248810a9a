//! Call state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CallDirection, RemoteParty, SessionDescription};

/// Why a call left the ringing/connected phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EndReason {
    /// Either side hung up.
    #[default]
    Hangup,
    /// The callee declined the ring.
    Decline,
    /// The remote device was already in a call.
    Busy,
    /// The caller cancelled before the callee answered.
    Cancel,
    /// Network or peer-connection failure.
    Failure,
}

/// Current phase of the single call the device can be party to.
#[derive(Debug, Clone, Serialize, Default)]
pub enum CallPhase {
    /// No call in progress.
    #[default]
    Idle,
    /// Outgoing call: offer published, waiting for the remote side.
    Dialing { started_at: DateTime<Utc> },
    /// Incoming call ringing locally; media not yet acquired.
    Ringing { received_at: DateTime<Utc> },
    /// Call active with media flowing.
    Connected {
        started_at: DateTime<Utc>,
        muted: bool,
        speaker_on: bool,
    },
    /// Local decline beat; collapses to idle immediately.
    Declined { ended_at: DateTime<Utc> },
    /// The remote party never answered or was busy.
    Unreachable { ended_at: DateTime<Utc> },
    /// Call over.
    Ended {
        reason: EndReason,
        ended_at: DateTime<Utc>,
        duration_secs: Option<i64>,
    },
}

impl CallPhase {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_dialing(&self) -> bool {
        matches!(self, Self::Dialing { .. })
    }

    pub fn is_ringing(&self) -> bool {
        matches!(self, Self::Ringing { .. })
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Declined { .. } | Self::Unreachable { .. } | Self::Ended { .. }
        )
    }

    pub fn can_answer(&self) -> bool {
        matches!(self, Self::Ringing { .. })
    }

    pub fn can_decline(&self) -> bool {
        matches!(self, Self::Ringing { .. })
    }

    pub fn can_hang_up(&self) -> bool {
        matches!(
            self,
            Self::Dialing { .. } | Self::Ringing { .. } | Self::Connected { .. }
        )
    }
}

/// State transitions for the call session.
#[derive(Debug, Clone)]
pub enum CallTransition {
    /// The remote party answered our offer.
    RemoteAnswered,
    /// The local user answered the ring.
    LocalAnswered,
    /// The local user declined the ring.
    LocalDeclined,
    /// The caller cancelled while we were ringing.
    RemoteCancelled,
    /// Dial deadline elapsed or the remote device reported busy.
    DialFailed,
    /// Local hangup from any non-idle phase.
    HungUp,
    /// Network or peer failure.
    Failed,
    MuteChanged { muted: bool },
    SpeakerChanged { on: bool },
}

/// The single call the device is party to. Created on dial-out or on receipt
/// of a valid offer; destroyed (back to idle) on every terminal phase.
#[derive(Debug, Clone, Serialize)]
pub struct CallSession {
    pub remote_party: RemoteParty,
    pub direction: CallDirection,
    pub phase: CallPhase,
    #[serde(skip)]
    pub offer: Option<SessionDescription>,
    #[serde(skip)]
    pub answer: Option<SessionDescription>,
    pub created_at: DateTime<Utc>,
}

impl CallSession {
    pub fn new_outgoing(remote_party: RemoteParty, offer: SessionDescription) -> Self {
        Self {
            remote_party,
            direction: CallDirection::Outgoing,
            phase: CallPhase::Dialing {
                started_at: Utc::now(),
            },
            offer: Some(offer),
            answer: None,
            created_at: Utc::now(),
        }
    }

    pub fn new_incoming(remote_party: RemoteParty, offer: SessionDescription) -> Self {
        Self {
            remote_party,
            direction: CallDirection::Incoming,
            phase: CallPhase::Ringing {
                received_at: Utc::now(),
            },
            offer: Some(offer),
            answer: None,
            created_at: Utc::now(),
        }
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        match self.phase {
            CallPhase::Connected { started_at, .. } => Some(started_at),
            _ => None,
        }
    }

    /// Seconds the call has been connected so far.
    pub fn current_duration_secs(&self) -> Option<i64> {
        self.started_at()
            .map(|t| Utc::now().signed_duration_since(t).num_seconds())
    }

    /// Apply a state transition. Returns an error if the transition is
    /// invalid from the current phase.
    pub fn apply_transition(&mut self, transition: CallTransition) -> Result<(), InvalidTransition> {
        let new_phase = match (&self.phase, transition) {
            (CallPhase::Dialing { .. }, CallTransition::RemoteAnswered) => CallPhase::Connected {
                started_at: Utc::now(),
                muted: false,
                speaker_on: false,
            },
            (CallPhase::Dialing { .. }, CallTransition::DialFailed) => CallPhase::Unreachable {
                ended_at: Utc::now(),
            },
            (CallPhase::Ringing { .. }, CallTransition::LocalAnswered) => CallPhase::Connected {
                started_at: Utc::now(),
                muted: false,
                speaker_on: false,
            },
            (CallPhase::Ringing { .. }, CallTransition::LocalDeclined) => CallPhase::Declined {
                ended_at: Utc::now(),
            },
            (CallPhase::Ringing { .. }, CallTransition::RemoteCancelled) => CallPhase::Ended {
                reason: EndReason::Cancel,
                ended_at: Utc::now(),
                duration_secs: None,
            },
            (
                CallPhase::Dialing { .. } | CallPhase::Ringing { .. },
                CallTransition::HungUp,
            ) => CallPhase::Ended {
                reason: EndReason::Hangup,
                ended_at: Utc::now(),
                duration_secs: None,
            },
            (CallPhase::Connected { started_at, .. }, CallTransition::HungUp) => {
                let duration = Utc::now().signed_duration_since(*started_at).num_seconds();
                CallPhase::Ended {
                    reason: EndReason::Hangup,
                    ended_at: Utc::now(),
                    duration_secs: Some(duration),
                }
            }
            (CallPhase::Connected { started_at, .. }, CallTransition::Failed) => {
                let duration = Utc::now().signed_duration_since(*started_at).num_seconds();
                CallPhase::Ended {
                    reason: EndReason::Failure,
                    ended_at: Utc::now(),
                    duration_secs: Some(duration),
                }
            }
            (
                CallPhase::Dialing { .. } | CallPhase::Ringing { .. },
                CallTransition::Failed,
            ) => CallPhase::Ended {
                reason: EndReason::Failure,
                ended_at: Utc::now(),
                duration_secs: None,
            },
            (
                CallPhase::Connected {
                    started_at,
                    speaker_on,
                    ..
                },
                CallTransition::MuteChanged { muted },
            ) => CallPhase::Connected {
                started_at: *started_at,
                muted,
                speaker_on: *speaker_on,
            },
            (
                CallPhase::Connected {
                    started_at, muted, ..
                },
                CallTransition::SpeakerChanged { on },
            ) => CallPhase::Connected {
                started_at: *started_at,
                muted: *muted,
                speaker_on: on,
            },
            (current, transition) => {
                return Err(InvalidTransition {
                    current_phase: format!("{current:?}"),
                    attempted: format!("{transition:?}"),
                });
            }
        };
        self.phase = new_phase;
        Ok(())
    }

    /// UI-facing view of this session.
    pub fn snapshot(&self) -> CallSnapshot {
        CallSnapshot {
            phase: self.phase.clone(),
            remote_party: Some(self.remote_party.clone()),
            direction: Some(self.direction),
            started_at: self.started_at(),
        }
    }
}

/// Observable state the Call UI renders from. An idle snapshot carries no
/// party or direction.
#[derive(Debug, Clone, Serialize, Default)]
pub struct CallSnapshot {
    pub phase: CallPhase,
    pub remote_party: Option<RemoteParty>,
    pub direction: Option<CallDirection>,
    pub started_at: Option<DateTime<Utc>>,
}

/// Terminal beat published once per call on exit from any non-idle phase.
#[derive(Debug, Clone, Serialize)]
pub struct CallEnded {
    pub remote_party: RemoteParty,
    pub reason: EndReason,
    pub duration_secs: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct InvalidTransition {
    pub current_phase: String,
    pub attempted: String,
}

impl std::fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid transition {} in phase {}",
            self.attempted, self.current_phase
        )
    }
}

impl std::error::Error for InvalidTransition {}
