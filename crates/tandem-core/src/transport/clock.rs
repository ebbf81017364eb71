//! Master clock: the single authority for logical time and the generation fence.
//!
//! Logical time is derived from the engine clock and a remembered anchor:
//!
//! ```text
//! t = anchor.logical + (engine.now() - anchor.engine_time) * tempo / original_tempo
//! ```
//!
//! Every start, stop and restart advances the generation, so a continuation
//! holding an older [`Permit`] can tell it has been superseded.

use std::rc::Rc;

use tracing::{debug, info, warn};

use super::fsm::{TransitionResult, TransportEvent};
use super::position::{LoopConfig, LoopMode};
use super::state::PlaybackState;
use super::sync::{ClockSnapshot, SyncInfo};
use crate::config::{TandemConfig, MAX_TEMPO_BPM, MIN_TEMPO_BPM};
use crate::engine::AudioEngine;
use crate::fence::{Generation, Permit};
use crate::group::SharedGroup;

/// Pairs a logical position with the engine time at which it is audible.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Anchor {
    logical: f64,
    engine_time: f64,
}

pub struct MasterClock<E: AudioEngine> {
    engine: Rc<E>,
    state: PlaybackState,
    anchor: Option<Anchor>,
    groups: Vec<SharedGroup>,
    seek_lookahead: f64,
}

impl<E: AudioEngine> MasterClock<E> {
    pub fn new(engine: Rc<E>, config: &TandemConfig) -> Self {
        Self {
            engine,
            state: PlaybackState::new(config.original_tempo_bpm),
            anchor: None,
            groups: Vec::new(),
            seek_lookahead: config.seek_lookahead_sec,
        }
    }

    /// Add a group. All registered groups start and stop together.
    pub fn register_group(&mut self, group: SharedGroup) {
        {
            let mut g = group.borrow_mut();
            g.set_tempo(self.state.tempo_bpm);
            g.set_master_volume(self.state.master_volume);
            g.set_loop(&self.state.loop_config);
            debug!("Registered player group '{}'", g.label());
        }
        self.groups.push(group);
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn groups(&self) -> &[SharedGroup] {
        &self.groups
    }

    pub fn engine(&self) -> &Rc<E> {
        &self.engine
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing()
    }

    pub fn generation(&self) -> Generation {
        self.state.generation()
    }

    /// Capture the current generation for a continuation that is about to suspend.
    pub fn permit(&self) -> Permit {
        self.state.generation.permit()
    }

    pub fn is_current(&self, permit: &Permit) -> bool {
        self.state.generation.is_current(permit)
    }

    /// Consume `permit`, returning its generation only if nothing superseded it.
    pub fn redeem(&self, permit: Permit) -> Option<Generation> {
        self.state.generation.redeem(permit)
    }

    pub fn tempo_ratio(&self) -> f64 {
        self.state.tempo_ratio()
    }

    /// Logical playback position in seconds.
    ///
    /// While the start instant is still in the future (lookahead) the
    /// position stays at the anchor instead of running backwards.
    pub fn current_time(&self) -> f64 {
        match self.anchor {
            Some(anchor) if self.state.is_playing() => {
                let elapsed = (self.engine.now() - anchor.engine_time).max(0.0);
                anchor.logical + elapsed * self.state.tempo_ratio()
            }
            _ => self.state.logical_time,
        }
    }

    pub fn snapshot(&self) -> ClockSnapshot {
        ClockSnapshot {
            logical_time: self.current_time(),
            engine_time: self.engine.now(),
            tempo_ratio: self.state.tempo_ratio(),
            generation: self.generation(),
            is_playing: self.is_playing(),
        }
    }

    /// Start every group at `from_time`, audible `lookahead_sec` from now.
    pub fn start_playback(&mut self, from_time: f64, lookahead_sec: f64) -> Generation {
        let from_time = sanitize_time(from_time);
        if self.state.is_playing() {
            self.stop_groups();
        }

        let generation = self.state.generation.advance().generation();
        let engine_clock_time = self.engine.now() + lookahead_sec.max(0.0);
        let info = SyncInfo {
            master_time: from_time,
            engine_clock_time,
            generation,
        };

        for group in &self.groups {
            group.borrow_mut().start_synchronized(&info);
        }

        self.anchor = Some(Anchor {
            logical: from_time,
            engine_time: engine_clock_time,
        });
        self.state.logical_time = from_time;
        self.state.transport.transition(TransportEvent::Play);

        info!(
            "Playback started at {:.3}s (engine {:.3}s, generation {})",
            from_time, engine_clock_time, generation
        );
        generation
    }

    /// Stop all groups, keeping the position.
    pub fn pause_playback(&mut self) {
        if self.state.is_playing() {
            self.state.logical_time = self.current_time();
            self.stop_groups();
            info!("Playback paused at {:.3}s", self.state.logical_time);
        }
        self.anchor = None;
        self.state.transport.transition(TransportEvent::Pause);
        // Cancels a play() still waiting on resume or readiness.
        let _ = self.state.generation.advance();
    }

    /// Stop all groups and rewind to zero.
    pub fn stop_playback(&mut self) {
        if self.state.is_playing() {
            self.stop_groups();
        }
        self.anchor = None;
        self.state.logical_time = 0.0;
        if let TransitionResult::StateChanged(_) =
            self.state.transport.transition(TransportEvent::Stop)
        {
            info!("Playback stopped");
        }
        let _ = self.state.generation.advance();
    }

    /// Atomic restart: stop everything, then start again at `time` if playing.
    pub fn seek_to(&mut self, time: f64) {
        let time = sanitize_time(time);
        let transition = self.state.transport.transition(TransportEvent::Seek(time));

        self.stop_groups();
        let _ = self.state.generation.advance();

        match transition {
            TransitionResult::Restart(target) => {
                debug!("Seek restart to {:.3}s", target);
                self.start_playback(target, self.seek_lookahead);
            }
            _ => {
                self.anchor = None;
                self.state.logical_time = time;
                debug!("Seek to {:.3}s while not playing", time);
            }
        }
    }

    /// Change tempo. While playing this re-anchors through an atomic restart,
    /// because note schedules are computed for a fixed time scale.
    pub fn set_tempo(&mut self, bpm: f64) {
        if !bpm.is_finite() {
            warn!("Ignoring non-finite tempo {}", bpm);
            return;
        }
        let bpm = bpm.clamp(MIN_TEMPO_BPM, MAX_TEMPO_BPM);
        let position = self.current_time();

        self.state.tempo_bpm = bpm;
        for group in &self.groups {
            group.borrow_mut().set_tempo(bpm);
        }
        debug!("Tempo set to {:.2} BPM (ratio {:.4})", bpm, self.tempo_ratio());

        if self.state.is_playing() {
            self.seek_to(position);
        }
    }

    /// Pure state update; never restarts playback.
    pub fn set_loop_mode(&mut self, mode: LoopMode, marker_a: Option<f64>, marker_b: Option<f64>) {
        let config = LoopConfig::new(mode, marker_a, marker_b);
        if config.markers_inverted() {
            warn!(
                "Loop markers out of order (A={:?}, B={:?}); keeping them as given",
                marker_a, marker_b
            );
        }
        self.state.loop_config = config;
        for group in &self.groups {
            group.borrow_mut().set_loop(&config);
        }
    }

    pub fn set_master_volume(&mut self, volume: f32) {
        let volume = if volume.is_nan() {
            0.0
        } else {
            volume.clamp(0.0, 1.0)
        };
        self.state.master_volume = volume;
        for group in &self.groups {
            group.borrow_mut().set_master_volume(volume);
        }
    }

    /// Record the longest known duration across audible sources.
    pub fn set_total_duration(&mut self, duration: f64) {
        self.state.total_duration = duration.max(0.0);
    }

    fn stop_groups(&mut self) {
        for group in &self.groups {
            group.borrow_mut().stop_synchronized();
        }
    }
}

fn sanitize_time(time: f64) -> f64 {
    if time.is_finite() {
        time.max(0.0)
    } else {
        0.0
    }
}
