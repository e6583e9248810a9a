pub mod events;
pub mod party;

pub use party::{CallDirection, IceCandidate, PartyRole, RemoteParty, SessionDescription};
