//! Signaling channel: one reconnecting connection multiplexing call
//! signaling with presence, location and chat traffic.

mod channel;
mod error;
mod event;
mod transport;

pub use channel::SignalingChannel;
pub use error::SignalingError;
pub use event::{
    CallEndSignal, CallSignal, IceSignal, RegisterFrame, SignalEvent, SignalKind, SubscribeFrame,
};
pub use transport::{SignalTransport, SignalTransportFactory, TransportEvent, WsTransportFactory};
