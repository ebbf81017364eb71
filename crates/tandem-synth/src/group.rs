//! Note-trigger player group.

use tandem_core::{LoopConfig, NoteOutput, PlayerGroup, SyncInfo, TandemConfig};
use tracing::debug;

use crate::schedule::{build_schedule, time_scale};
use crate::timeline::NoteTimeline;
use crate::voice::VoiceAllocator;

/// Schedules a [`NoteTimeline`] onto a synthesizer note output.
///
/// Every start rebuilds the whole schedule; a tempo change only takes effect
/// on the next start, which the clock triggers with an atomic restart.
pub struct NoteGroup<N: NoteOutput> {
    output: N,
    timeline: NoteTimeline,
    allocator: VoiceAllocator,
    tempo_bpm: f64,
    original_tempo_bpm: f64,
    master_volume: f32,
    group_gain: f32,
    muted: bool,
    loop_config: LoopConfig,
    started: bool,
    scheduled: usize,
}

impl<N: NoteOutput> NoteGroup<N> {
    pub fn new(output: N, config: &TandemConfig) -> Self {
        let mut group = Self {
            output,
            timeline: NoteTimeline::empty(),
            allocator: VoiceAllocator::new(config.max_voices),
            tempo_bpm: config.original_tempo_bpm,
            original_tempo_bpm: config.original_tempo_bpm,
            master_volume: 1.0,
            group_gain: 1.0,
            muted: false,
            loop_config: LoopConfig::default(),
            started: false,
            scheduled: 0,
        };
        group.push_gain();
        group
    }

    /// Replace the timeline. Takes effect on the next start.
    pub fn set_timeline(&mut self, timeline: NoteTimeline) {
        debug!("Note timeline replaced ({} notes)", timeline.len());
        self.timeline = timeline;
    }

    pub fn timeline(&self) -> &NoteTimeline {
        &self.timeline
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        self.push_gain();
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Balance gain against the waveform group.
    pub fn set_group_gain(&mut self, gain: f32) {
        self.group_gain = if gain.is_nan() {
            0.0
        } else {
            gain.clamp(0.0, 1.0)
        };
        self.push_gain();
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Events scheduled by the most recent start.
    pub fn scheduled_events(&self) -> usize {
        self.scheduled
    }

    pub fn time_scale(&self) -> f64 {
        time_scale(self.tempo_bpm, self.original_tempo_bpm)
    }

    pub fn loop_config(&self) -> LoopConfig {
        self.loop_config
    }

    fn push_gain(&mut self) {
        let gain = if self.muted {
            0.0
        } else {
            self.master_volume * self.group_gain
        };
        self.output.set_gain(gain);
    }
}

impl<N: NoteOutput> PlayerGroup for NoteGroup<N> {
    fn label(&self) -> &str {
        "notes"
    }

    fn start_synchronized(&mut self, sync: &SyncInfo) {
        self.output.cancel_all();
        let events = build_schedule(&self.timeline, sync, self.time_scale(), &mut self.allocator);
        self.scheduled = events.len();
        for event in events {
            self.output.schedule(event);
        }
        self.started = true;
        debug!(
            "Scheduled {} note events from {:.3}s (scale {:.4}, generation {})",
            self.scheduled,
            sync.master_time,
            self.time_scale(),
            sync.generation
        );
    }

    fn stop_synchronized(&mut self) {
        if self.started {
            self.output.cancel_all();
            self.started = false;
        }
    }

    fn set_tempo(&mut self, bpm: f64) {
        self.tempo_bpm = bpm;
    }

    fn set_master_volume(&mut self, volume: f32) {
        self.master_volume = volume;
        self.push_gain();
    }

    fn set_loop(&mut self, config: &LoopConfig) {
        self.loop_config = *config;
    }

    fn audible_duration(&self) -> f64 {
        self.timeline.duration()
    }
}
