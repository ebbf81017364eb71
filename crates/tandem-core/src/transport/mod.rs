pub(crate) mod clock;
pub(crate) mod fsm;
pub(crate) mod position;
pub(crate) mod state;
pub(crate) mod sync;

// Re-export essential types
pub use clock::MasterClock;
pub use fsm::{TransitionResult, TransportEvent, TransportFsm, TransportState};
pub use position::{LoopConfig, LoopMode};
pub use state::PlaybackState;
pub use sync::{ClockSnapshot, SyncInfo};
