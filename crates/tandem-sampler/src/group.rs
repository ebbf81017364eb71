//! Waveform player group: one buffer chain per registered asset.
//!
//! Tracks are started together on a synchronized start, kept running while
//! muted, and brought in mid-stream (late join) when they become visible or
//! finish decoding after transport has already started.

use std::rc::Rc;
use std::sync::Arc;

use tandem_core::{
    AudioEngine, BufferChain, ClockSnapshot, LoopConfig, PlayerGroup, SyncInfo, TandemConfig,
    TimeStretchParams,
};
use tracing::{debug, info, warn};

use crate::events::TrackEvent;
use crate::loader::{AssetLoader, DecodePoll};
use crate::registry::{AssetSource, TrackDescriptor, TrackId, TrackRepository};
use crate::track::{
    playable_offset, sanitize_pan, sanitize_volume, DecodeState, TrackEntry, TrackInfo,
};
use crate::{Error, Result};

pub struct WaveformGroup<E: AudioEngine> {
    engine: Rc<E>,
    repository: Box<dyn TrackRepository>,
    loader: Box<dyn AssetLoader>,
    tracks: Vec<TrackEntry<E::Chain>>,
    original_tempo_bpm: f64,
    stretch: TimeStretchParams,
    master_volume: f32,
    group_gain: f32,
    loop_config: LoopConfig,
    /// Set while started; cleared by a synchronized stop.
    last_sync: Option<SyncInfo>,
    join_lookahead: f64,
    join_throttle: f64,
    /// Events not yet handed to observers.
    events: Vec<TrackEvent>,
}

impl<E: AudioEngine> WaveformGroup<E> {
    pub fn new(
        engine: Rc<E>,
        repository: Box<dyn TrackRepository>,
        loader: Box<dyn AssetLoader>,
        config: &TandemConfig,
    ) -> Self {
        Self {
            engine,
            repository,
            loader,
            tracks: Vec::new(),
            original_tempo_bpm: config.original_tempo_bpm,
            stretch: TimeStretchParams::IDENTITY,
            master_volume: 1.0,
            group_gain: 1.0,
            loop_config: LoopConfig::default(),
            last_sync: None,
            join_lookahead: config.join_lookahead_sec,
            join_throttle: config.late_join_throttle_sec(),
            events: Vec::new(),
        }
    }

    // =========================================================================
    // Registry and decoding
    // =========================================================================

    /// Pick up new registry entries and registry-side visibility/mute changes.
    ///
    /// Registry flags are applied only when they changed since the previous
    /// scan, so direct control calls are not overwritten.
    pub fn rescan(&mut self) {
        for descriptor in self.repository.tracks() {
            match self.index_of(&descriptor.id) {
                Some(index) => self.apply_registry_flags(index, &descriptor),
                None => self.add_track(descriptor),
            }
        }
    }

    /// Collect finished decodes and run any start deferred until the buffer arrived.
    pub fn poll_decodes(&mut self) {
        for index in 0..self.tracks.len() {
            self.poll_decode(index);
        }
    }

    /// Rescan the registry and collect finished decodes.
    pub fn refresh(&mut self) {
        self.rescan();
        self.poll_decodes();
    }

    /// Refresh, then report whether every known asset has settled.
    pub fn poll_ready(&mut self) -> bool {
        self.refresh();
        self.is_ready()
    }

    fn add_track(&mut self, descriptor: TrackDescriptor) {
        let decode = match &descriptor.source {
            AssetSource::Decoded(buffer) => DecodeState::Ready(Arc::clone(buffer)),
            AssetSource::Path(path) => DecodeState::Loading(self.loader.load(&descriptor.id, path)),
        };
        debug!("Discovered track '{}'", descriptor.id);
        self.tracks.push(TrackEntry::new(&descriptor, decode));
        let index = self.tracks.len() - 1;
        if self.tracks[index].decode.buffer().is_some() {
            self.install_chain(index);
        }
    }

    fn apply_registry_flags(&mut self, index: usize, descriptor: &TrackDescriptor) {
        let entry = &mut self.tracks[index];
        let visible_changed = entry.seen_visible != descriptor.is_visible;
        let muted_changed = entry.seen_muted != descriptor.is_muted;
        entry.seen_visible = descriptor.is_visible;
        entry.seen_muted = descriptor.is_muted;

        if visible_changed {
            self.apply_visibility(index, descriptor.is_visible);
        }
        if muted_changed {
            self.apply_mute(index, descriptor.is_muted);
        }
    }

    fn install_chain(&mut self, index: usize) {
        let entry = &mut self.tracks[index];
        let Some(buffer) = entry.decode.buffer().map(Arc::clone) else {
            return;
        };
        let mut chain = self.engine.create_chain(entry.id.as_str(), Arc::clone(&buffer));
        chain.set_time_stretch(self.stretch);
        chain.set_pan(entry.pan);
        entry.effect_latency_sec = chain.latency();
        entry.chain = Some(chain);
        entry.push_gain(self.master_volume, self.group_gain);
        debug!(
            "Chain ready for '{}' ({:.3}s, latency {:.4}s)",
            entry.id,
            buffer.duration(),
            entry.effect_latency_sec
        );
    }

    fn poll_decode(&mut self, index: usize) {
        let DecodeState::Loading(pending) = &mut self.tracks[index].decode else {
            return;
        };
        match pending.poll() {
            DecodePoll::Pending => {}
            DecodePoll::Ready(Ok(buffer)) => {
                self.tracks[index].decode = DecodeState::Ready(Arc::new(buffer));
                self.install_chain(index);
                self.run_deferred_start(index);
            }
            DecodePoll::Ready(Err(e)) => {
                let entry = &mut self.tracks[index];
                warn!("Decode failed for '{}': {}", entry.id, e);
                entry.decode = DecodeState::Failed(e.to_string());
                entry.pending_start = None;
                let event = TrackEvent::Failed {
                    id: entry.id.clone(),
                    reason: e.to_string(),
                };
                self.events.push(event);
            }
        }
    }

    /// Start a track whose synchronized start was skipped because it was not
    /// decoded yet, unless a newer start or stop superseded that start.
    fn run_deferred_start(&mut self, index: usize) {
        let Some(permit) = self.tracks[index].pending_start.take() else {
            return;
        };
        let entry = &mut self.tracks[index];
        if entry.start_token.redeem(permit).is_none() {
            debug!("Dropping superseded start for '{}'", entry.id);
            return;
        }
        let Some(sync) = self.last_sync else {
            return;
        };
        if !entry.visible || entry.started {
            return;
        }
        let Some(duration) = entry.duration() else {
            return;
        };

        let rate = self.stretch.rate;
        let at = (self.engine.now() + self.join_lookahead).max(sync.engine_clock_time);
        let logical = sync.master_time + (at - sync.engine_clock_time) * rate;
        let Some(offset) = playable_offset(logical + entry.effect_latency_sec * rate, duration)
        else {
            debug!("'{}' ready past its end; not starting", entry.id);
            return;
        };
        entry.start_at(at, offset);
        debug!("Deferred start for '{}' at offset {:.3}s", entry.id, offset);
        let event = TrackEvent::Started {
            id: entry.id.clone(),
            offset,
        };
        self.events.push(event);
    }

    // =========================================================================
    // Late join
    // =========================================================================

    /// Start one track mid-stream if it is eligible and not throttled.
    ///
    /// Returns `true` when native playback was started.
    pub fn sync_start_if_needed(&mut self, id: &TrackId, snapshot: &ClockSnapshot) -> bool {
        match self.find_or_rescan(id) {
            Ok(index) => self.join(index, snapshot),
            Err(e) => {
                warn!("Late join skipped: {}", e);
                false
            }
        }
    }

    /// Try a late join for every eligible track. Returns the number joined.
    pub fn sync_pending_players(&mut self, snapshot: &ClockSnapshot) -> usize {
        self.refresh();
        (0..self.tracks.len())
            .filter(|&index| self.join(index, snapshot))
            .count()
    }

    fn join(&mut self, index: usize, snapshot: &ClockSnapshot) -> bool {
        if !snapshot.is_playing {
            return false;
        }
        let Some(sync) = self.last_sync else {
            return false;
        };
        if sync.generation != snapshot.generation {
            debug!(
                "Ignoring join against stale generation {} (current {})",
                snapshot.generation, sync.generation
            );
            return false;
        }
        self.poll_decode(index);

        let entry = &mut self.tracks[index];
        if !entry.visible || entry.started {
            return false;
        }
        let now = snapshot.engine_time;
        if let Some(last) = entry.last_join_attempt {
            if now - last < self.join_throttle {
                return false;
            }
        }
        entry.last_join_attempt = Some(now);

        let Some(duration) = entry.duration().filter(|_| entry.is_ready()) else {
            if !entry.not_ready_logged && entry.decode.is_loading() {
                entry.not_ready_logged = true;
                warn!("Track '{}' not decoded yet; joining once ready", entry.id);
            }
            return false;
        };

        let rate = snapshot.tempo_ratio;
        let offset = snapshot.logical_time_after(self.join_lookahead) + entry.effect_latency_sec * rate;
        let Some(offset) = playable_offset(offset, duration) else {
            debug!("'{}' has nothing left to play at {:.3}s", entry.id, offset);
            return false;
        };

        let _ = entry.start_token.advance();
        entry.pending_start = None;
        entry.start_at(now + self.join_lookahead, offset);
        debug!("Late join '{}' at offset {:.3}s", entry.id, offset);
        let event = TrackEvent::Joined {
            id: entry.id.clone(),
            offset,
        };
        self.events.push(event);
        true
    }

    // =========================================================================
    // Visibility / mute signals
    // =========================================================================

    /// Out-of-band visibility signal. Hiding stops the track; showing it
    /// triggers an immediate join attempt.
    pub fn on_visibility_changed(
        &mut self,
        id: &TrackId,
        visible: bool,
        snapshot: &ClockSnapshot,
    ) -> Result<()> {
        let index = self.find_or_rescan(id)?;
        self.apply_visibility(index, visible);
        if visible {
            self.join(index, snapshot);
        }
        Ok(())
    }

    /// Out-of-band mute signal. Unmuting triggers an immediate join attempt.
    pub fn on_mute_changed(
        &mut self,
        id: &TrackId,
        muted: bool,
        snapshot: &ClockSnapshot,
    ) -> Result<()> {
        let index = self.find_or_rescan(id)?;
        self.apply_mute(index, muted);
        if !muted {
            self.join(index, snapshot);
        }
        Ok(())
    }

    fn apply_visibility(&mut self, index: usize, visible: bool) {
        let entry = &mut self.tracks[index];
        if entry.visible == visible {
            return;
        }
        entry.visible = visible;
        if !visible && entry.halt() {
            debug!("'{}' hidden; stopped", entry.id);
            let event = TrackEvent::Stopped {
                id: entry.id.clone(),
            };
            self.events.push(event);
        }
    }

    fn apply_mute(&mut self, index: usize, muted: bool) {
        let entry = &mut self.tracks[index];
        entry.muted = muted;
        entry.push_gain(self.master_volume, self.group_gain);
    }

    // =========================================================================
    // Mixing
    // =========================================================================

    pub fn set_track_volume(&mut self, id: &TrackId, volume: f32) -> Result<()> {
        let index = self.find_or_rescan(id)?;
        let entry = &mut self.tracks[index];
        entry.volume = sanitize_volume(volume);
        entry.push_gain(self.master_volume, self.group_gain);
        Ok(())
    }

    pub fn set_track_pan(&mut self, id: &TrackId, pan: f32) -> Result<()> {
        let index = self.find_or_rescan(id)?;
        let entry = &mut self.tracks[index];
        entry.pan = sanitize_pan(pan);
        if let Some(chain) = entry.chain.as_mut() {
            chain.set_pan(entry.pan);
        }
        Ok(())
    }

    /// Mute without a join attempt; the track keeps running silently.
    pub fn set_track_mute(&mut self, id: &TrackId, muted: bool) -> Result<()> {
        let index = self.find_or_rescan(id)?;
        self.apply_mute(index, muted);
        Ok(())
    }

    /// Balance gain applied to every track of this group.
    pub fn set_group_gain(&mut self, gain: f32) {
        self.group_gain = sanitize_volume(gain);
        self.push_all_gains();
    }

    pub fn group_gain(&self) -> f32 {
        self.group_gain
    }

    fn push_all_gains(&mut self) {
        for entry in &mut self.tracks {
            entry.push_gain(self.master_volume, self.group_gain);
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn track(&self, id: &TrackId) -> Option<TrackInfo> {
        self.index_of(id).map(|index| self.tracks[index].info())
    }

    pub fn tracks(&self) -> Vec<TrackInfo> {
        self.tracks.iter().map(TrackEntry::info).collect()
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn time_stretch(&self) -> TimeStretchParams {
        self.stretch
    }

    pub fn loop_config(&self) -> LoopConfig {
        self.loop_config
    }

    /// Take every track event queued since the last call, oldest first.
    pub fn take_events(&mut self) -> Vec<TrackEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    fn index_of(&self, id: &TrackId) -> Option<usize> {
        self.tracks.iter().position(|entry| &entry.id == id)
    }

    /// Locate a track, rescanning the registry once if it is unknown.
    fn find_or_rescan(&mut self, id: &TrackId) -> Result<usize> {
        if let Some(index) = self.index_of(id) {
            return Ok(index);
        }
        self.rescan();
        self.index_of(id)
            .ok_or_else(|| Error::UnknownTrack(id.clone()))
    }
}

impl<E: AudioEngine> PlayerGroup for WaveformGroup<E> {
    fn label(&self) -> &str {
        "waveform"
    }

    fn start_synchronized(&mut self, sync: &SyncInfo) {
        self.refresh();
        self.last_sync = Some(*sync);
        let rate = self.stretch.rate;

        for index in 0..self.tracks.len() {
            let entry = &mut self.tracks[index];
            let permit = entry.start_token.advance();
            entry.last_join_attempt = None;
            if !entry.visible {
                continue;
            }

            match (entry.duration(), entry.is_ready()) {
                (Some(duration), true) => {
                    let offset = sync.master_time + entry.effect_latency_sec * rate;
                    let Some(offset) = playable_offset(offset, duration) else {
                        debug!("'{}' ends before {:.3}s; not starting", entry.id, sync.master_time);
                        continue;
                    };
                    entry.start_at(sync.engine_clock_time, offset);
                    let event = TrackEvent::Started {
                        id: entry.id.clone(),
                        offset,
                    };
                    self.events.push(event);
                }
                _ if entry.decode.is_loading() => {
                    entry.pending_start = Some(permit);
                    if !entry.not_ready_logged {
                        entry.not_ready_logged = true;
                        warn!("Track '{}' not decoded yet; starting once ready", entry.id);
                    }
                }
                _ => {}
            }
        }

        info!(
            "Waveform group started {} of {} tracks (generation {})",
            self.tracks.iter().filter(|entry| entry.started).count(),
            self.tracks.len(),
            sync.generation
        );
    }

    fn stop_synchronized(&mut self) {
        self.last_sync = None;
        for index in 0..self.tracks.len() {
            let entry = &mut self.tracks[index];
            if entry.halt() {
                let event = TrackEvent::Stopped {
                    id: entry.id.clone(),
                };
                self.events.push(event);
            }
        }
    }

    fn set_tempo(&mut self, bpm: f64) {
        self.stretch = TimeStretchParams::for_tempo(bpm, self.original_tempo_bpm);
        for entry in &mut self.tracks {
            if let Some(chain) = entry.chain.as_mut() {
                chain.set_time_stretch(self.stretch);
            }
        }
        debug!(
            "Waveform rate {:.4}, pitch correction {:+.3} st",
            self.stretch.rate, self.stretch.pitch_semitones
        );
    }

    fn set_master_volume(&mut self, volume: f32) {
        self.master_volume = volume;
        self.push_all_gains();
    }

    fn set_loop(&mut self, config: &LoopConfig) {
        self.loop_config = *config;
    }

    fn audible_duration(&self) -> f64 {
        self.tracks
            .iter()
            .filter(|entry| entry.visible && !entry.muted)
            .filter_map(TrackEntry::duration)
            .fold(0.0, f64::max)
    }

    fn is_ready(&self) -> bool {
        !self.tracks.iter().any(|entry| entry.decode.is_loading())
    }
}
