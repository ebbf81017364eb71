//! Player group contract shared by every backend.

use std::cell::RefCell;
use std::rc::Rc;

use crate::transport::{LoopConfig, SyncInfo};

/// A backend started and stopped in lockstep by the master clock.
///
/// None of these calls fail. A group without ready resources skips them for
/// the current start and brings them in later through its own late-join path.
pub trait PlayerGroup {
    /// Name used in logs.
    fn label(&self) -> &str;

    /// Seek media to `info.master_time` and become audible at `info.engine_clock_time`.
    fn start_synchronized(&mut self, info: &SyncInfo);

    /// Stop all native playback. Must be idempotent.
    fn stop_synchronized(&mut self);

    fn set_tempo(&mut self, bpm: f64);

    /// Volume in [0, 1], already clamped by the clock.
    fn set_master_volume(&mut self, volume: f32);

    fn set_loop(&mut self, config: &LoopConfig);

    /// Longest duration among this group's currently audible content.
    fn audible_duration(&self) -> f64 {
        0.0
    }

    /// Whether every known resource has finished loading.
    fn is_ready(&self) -> bool {
        true
    }
}

/// Shared handle the clock keeps for each registered group.
pub type SharedGroup = Rc<RefCell<dyn PlayerGroup>>;
