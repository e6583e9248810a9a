//! Call invitation delivery and signaling for the Qafila group-coordination
//! app.
//!
//! One device holds at most one call session at a time. The session is
//! driven from three execution contexts: the in-app UI, the live signaling
//! socket, and a detached notification process with no shared memory. The
//! durable [`mailbox`] bridges the detached context to the next app start;
//! [`CallClient::bootstrap`] replays it before anything renders.

pub mod calls;
pub mod client;
pub mod handlers;
pub mod history;
pub mod mailbox;
pub mod notify;
pub mod signaling;
pub mod types;

pub use calls::{
    CallConfig, CallError, CallManager, CallPhase, CallSnapshot, EndReason, MediaController,
    PeerConnector,
};
pub use client::{CallClient, ClientConfig, ClientDeps};
pub use history::{CallHistoryApi, UreqCallHistoryApi};
pub use mailbox::{FileMailbox, Mailbox, MemoryMailbox};
pub use notify::{DetachedContext, IncomingCallPush, NotificationAction, NotificationSurface};
pub use signaling::{SignalEvent, SignalKind, SignalingChannel, WsTransportFactory};
pub use types::events::EventBus;
pub use types::{CallDirection, IceCandidate, PartyRole, RemoteParty, SessionDescription};
