//! Playback state owned by the master clock.

use super::fsm::{TransportFsm, TransportState};
use super::position::LoopConfig;
use crate::fence::{Fence, Generation};

/// Authoritative playback state. Mutated only through [`MasterClock`](super::MasterClock).
#[derive(Debug)]
pub struct PlaybackState {
    pub(crate) logical_time: f64,
    pub(crate) total_duration: f64,
    pub(crate) tempo_bpm: f64,
    pub(crate) original_tempo_bpm: f64,
    pub(crate) master_volume: f32,
    pub(crate) loop_config: LoopConfig,
    pub(crate) transport: TransportFsm,
    pub(crate) generation: Fence,
}

impl PlaybackState {
    pub(crate) fn new(original_tempo_bpm: f64) -> Self {
        Self {
            logical_time: 0.0,
            total_duration: 0.0,
            tempo_bpm: original_tempo_bpm,
            original_tempo_bpm,
            master_volume: 1.0,
            loop_config: LoopConfig::default(),
            transport: TransportFsm::new(),
            generation: Fence::new(),
        }
    }

    /// Position remembered at the last anchor, pause or seek.
    pub fn logical_time(&self) -> f64 {
        self.logical_time
    }

    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    pub fn tempo_bpm(&self) -> f64 {
        self.tempo_bpm
    }

    pub fn original_tempo_bpm(&self) -> f64 {
        self.original_tempo_bpm
    }

    pub fn tempo_ratio(&self) -> f64 {
        self.tempo_bpm / self.original_tempo_bpm
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    pub fn loop_config(&self) -> LoopConfig {
        self.loop_config
    }

    pub fn transport(&self) -> TransportState {
        self.transport.state()
    }

    pub fn is_playing(&self) -> bool {
        self.transport.is_playing()
    }

    pub fn generation(&self) -> Generation {
        self.generation.current()
    }
}
