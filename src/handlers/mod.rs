pub mod relay;
pub mod router;
pub mod traits;

pub use relay::RelayHandler;
pub use router::SignalRouter;
pub use traits::SignalHandler;
