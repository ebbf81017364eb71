//! Unified controller: the public playback API and the polling loop.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tandem_core::{
    AudioEngine, EngineState, Generation, LoopConfig, LoopMode, MasterClock, PlayerGroup,
    TandemConfig, TransportState,
};
use tandem_sampler::{wait_until_ready, Observers, TrackEvent, TrackId, TrackInfo, WaveformGroup};
use tandem_synth::{NoteGroup, NoteTimeline};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::builder::ControllerBuilder;
use crate::loop_guard::{LoopAction, LoopGuard};
use crate::Result;

/// Receives the logical time once per tick while playing.
pub type VisualCallback = Box<dyn FnMut(f64)>;

/// Which player group a group-level setting applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    Waveform,
    Notes,
}

/// Result of one polling tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Transport not playing; nothing done.
    Idle,
    /// Time forwarded to the visual callback; `joined` tracks joined late.
    Advanced { time: f64, joined: usize },
    /// Reached the end without repeat; paused at `duration`.
    Ended { duration: f64 },
    /// Crossed a loop boundary; restarted at `target`.
    Looped { target: f64 },
}

/// Drives the waveform and note groups from one master clock.
///
/// Every method takes `&self` and runs on the control thread. No borrow is
/// held across an `await` or across a call into the visual callback or a
/// track observer, so both may call back into the controller.
pub struct Controller<E: AudioEngine + 'static> {
    engine: Rc<E>,
    clock: RefCell<MasterClock<E>>,
    waveform: Rc<RefCell<WaveformGroup<E>>>,
    notes: Rc<RefCell<NoteGroup<E::Notes>>>,
    config: TandemConfig,
    visual: RefCell<Option<VisualCallback>>,
    observers: RefCell<Observers>,
    dispatching: Cell<bool>,
    guard: RefCell<LoopGuard>,
    resume_warned: Cell<bool>,
}

impl<E: AudioEngine + 'static> Controller<E> {
    pub fn builder(engine: E) -> ControllerBuilder<E> {
        ControllerBuilder::new(engine)
    }

    pub(crate) fn from_parts(
        engine: Rc<E>,
        waveform: WaveformGroup<E>,
        notes: NoteGroup<E::Notes>,
        config: TandemConfig,
    ) -> Self {
        let mut clock = MasterClock::new(Rc::clone(&engine), &config);
        let waveform = Rc::new(RefCell::new(waveform));
        let notes = Rc::new(RefCell::new(notes));
        clock.register_group(waveform.clone());
        clock.register_group(notes.clone());

        Self {
            engine,
            clock: RefCell::new(clock),
            waveform,
            notes,
            config,
            visual: RefCell::new(None),
            observers: RefCell::new(Observers::new()),
            dispatching: Cell::new(false),
            guard: RefCell::new(LoopGuard::new()),
            resume_warned: Cell::new(false),
        }
    }

    // =========================================================================
    // Transport
    // =========================================================================

    /// Resume the engine, wait for decodes, then start every group together.
    ///
    /// Fails only when the engine cannot leave the suspended state. A pause,
    /// stop or newer play issued while this is waiting wins; this call then
    /// returns without starting anything.
    pub async fn play(&self) -> Result<()> {
        let permit = {
            let clock = self.clock.borrow();
            if clock.is_playing() {
                return Ok(());
            }
            clock.permit()
        };

        self.ensure_engine_running().await?;
        if !self.clock.borrow().is_current(&permit) {
            debug!("play() superseded while resuming the engine");
            return Ok(());
        }

        let waiting = wait_until_ready(&*self.waveform, self.config.ready_poll_interval());
        if tokio::time::timeout(self.config.ready_timeout(), waiting)
            .await
            .is_err()
        {
            warn!(
                "Assets still decoding after {:?}; starting without them",
                self.config.ready_timeout()
            );
        }

        let duration = self.effective_duration();
        let from = {
            let mut clock = self.clock.borrow_mut();
            if clock.redeem(permit).is_none() || clock.is_playing() {
                debug!("play() superseded while waiting for assets");
                return Ok(());
            }
            let position = clock.current_time();
            let from = if duration > 0.0 && position >= duration {
                0.0
            } else {
                position
            };
            clock.start_playback(from, self.config.start_lookahead_sec);
            from
        };

        self.guard.borrow_mut().rearm(from);
        self.notify_visual(from);
        self.dispatch_track_events();
        Ok(())
    }

    pub fn pause(&self) {
        self.clock.borrow_mut().pause_playback();
        let time = self.current_time();
        self.guard.borrow_mut().rearm(time);
        self.notify_visual(time);
        self.dispatch_track_events();
    }

    pub fn stop(&self) {
        self.clock.borrow_mut().stop_playback();
        self.guard.borrow_mut().rearm(0.0);
        self.notify_visual(0.0);
        self.dispatch_track_events();
    }

    /// Atomic restart at `time` when playing; a position change otherwise.
    pub fn seek(&self, time: f64) {
        self.clock.borrow_mut().seek_to(time);
        let time = self.current_time();
        self.guard.borrow_mut().rearm(time);
        self.notify_visual(time);
        self.dispatch_track_events();
    }

    pub fn set_tempo(&self, bpm: f64) {
        self.clock.borrow_mut().set_tempo(bpm);
        self.rearm_guard();
        self.dispatch_track_events();
    }

    pub fn set_master_volume(&self, volume: f32) {
        self.clock.borrow_mut().set_master_volume(volume);
    }

    /// Change the loop mode, keeping the current markers.
    pub fn set_loop_mode(&self, mode: LoopMode) {
        let config = self.loop_config();
        self.clock
            .borrow_mut()
            .set_loop_mode(mode, config.marker_a, config.marker_b);
    }

    pub fn set_marker_a(&self, marker: Option<f64>) {
        let config = self.loop_config();
        self.clock
            .borrow_mut()
            .set_loop_mode(config.mode, marker, config.marker_b);
        self.rearm_guard();
    }

    pub fn set_marker_b(&self, marker: Option<f64>) {
        let config = self.loop_config();
        self.clock
            .borrow_mut()
            .set_loop_mode(config.mode, config.marker_a, marker);
        self.rearm_guard();
    }

    // =========================================================================
    // Mixing and content
    // =========================================================================

    pub fn set_track_volume(&self, id: impl Into<TrackId>, volume: f32) {
        let id = id.into();
        if let Err(e) = self.waveform.borrow_mut().set_track_volume(&id, volume) {
            warn!("set_track_volume ignored: {}", e);
        }
        self.dispatch_track_events();
    }

    pub fn set_track_pan(&self, id: impl Into<TrackId>, pan: f32) {
        let id = id.into();
        if let Err(e) = self.waveform.borrow_mut().set_track_pan(&id, pan) {
            warn!("set_track_pan ignored: {}", e);
        }
        self.dispatch_track_events();
    }

    /// Mute or unmute a track. Unmuting also tries a late join.
    pub fn set_track_mute(&self, id: impl Into<TrackId>, muted: bool) {
        self.on_mute_changed(id, muted);
    }

    /// Visibility signal from the host: hide stops the track, show joins it.
    pub fn on_visibility_changed(&self, id: impl Into<TrackId>, visible: bool) {
        let id = id.into();
        let snapshot = self.clock.borrow().snapshot();
        if let Err(e) = self
            .waveform
            .borrow_mut()
            .on_visibility_changed(&id, visible, &snapshot)
        {
            warn!("Visibility change ignored: {}", e);
        }
        self.dispatch_track_events();
    }

    /// Mute signal from the host.
    pub fn on_mute_changed(&self, id: impl Into<TrackId>, muted: bool) {
        let id = id.into();
        let snapshot = self.clock.borrow().snapshot();
        if let Err(e) = self
            .waveform
            .borrow_mut()
            .on_mute_changed(&id, muted, &snapshot)
        {
            warn!("Mute change ignored: {}", e);
        }
        self.dispatch_track_events();
    }

    pub fn set_group_gain(&self, group: GroupKind, gain: f32) {
        match group {
            GroupKind::Waveform => self.waveform.borrow_mut().set_group_gain(gain),
            GroupKind::Notes => self.notes.borrow_mut().set_group_gain(gain),
        }
    }

    pub fn set_notes_muted(&self, muted: bool) {
        self.notes.borrow_mut().set_muted(muted);
    }

    /// Replace the note timeline. While playing this restarts at the current time.
    pub fn load_notes(&self, timeline: NoteTimeline) {
        info!("Loading note timeline ({} notes)", timeline.len());
        self.notes.borrow_mut().set_timeline(timeline);
        if self.is_playing() {
            let position = self.current_time();
            self.seek(position);
        }
    }

    /// Register an observer for waveform track lifecycle events.
    ///
    /// Observers run after the operation that produced the event has released
    /// every internal borrow.
    pub fn subscribe_tracks(&self, observer: impl FnMut(&TrackEvent) + 'static) {
        self.observers.borrow_mut().push(Box::new(observer));
    }

    /// Longest duration among the note timeline and every audible waveform asset.
    ///
    /// Recomputed on every call; visibility and mute changes apply immediately.
    pub fn effective_duration(&self) -> f64 {
        self.waveform.borrow_mut().refresh();
        let waveform = self.waveform.borrow().audible_duration();
        let notes = self.notes.borrow().audible_duration();
        let duration = waveform.max(notes);
        self.clock.borrow_mut().set_total_duration(duration);
        self.dispatch_track_events();
        duration
    }

    // =========================================================================
    // Visual callback and queries
    // =========================================================================

    /// Install the visual update callback and call it once with the current time.
    pub fn register_visual_callback(&self, callback: impl FnMut(f64) + 'static) {
        *self.visual.borrow_mut() = Some(Box::new(callback));
        self.notify_visual(self.current_time());
    }

    pub fn clear_visual_callback(&self) {
        self.visual.borrow_mut().take();
    }

    pub fn current_time(&self) -> f64 {
        self.clock.borrow().current_time()
    }

    pub fn is_playing(&self) -> bool {
        self.clock.borrow().is_playing()
    }

    pub fn transport_state(&self) -> TransportState {
        self.clock.borrow().state().transport()
    }

    pub fn generation(&self) -> Generation {
        self.clock.borrow().generation()
    }

    pub fn tempo_bpm(&self) -> f64 {
        self.clock.borrow().state().tempo_bpm()
    }

    pub fn master_volume(&self) -> f32 {
        self.clock.borrow().state().master_volume()
    }

    pub fn loop_config(&self) -> LoopConfig {
        self.clock.borrow().state().loop_config()
    }

    pub fn track(&self, id: impl Into<TrackId>) -> Option<TrackInfo> {
        self.waveform.borrow().track(&id.into())
    }

    pub fn tracks(&self) -> Vec<TrackInfo> {
        self.waveform.borrow().tracks()
    }

    pub fn engine(&self) -> &Rc<E> {
        &self.engine
    }

    pub fn config(&self) -> &TandemConfig {
        &self.config
    }

    // =========================================================================
    // Polling loop
    // =========================================================================

    /// One polling step: end-of-track, loop crossings, visual update, late join.
    pub fn tick(&self) -> TickOutcome {
        let (now, generation, loop_config) = {
            let clock = self.clock.borrow();
            if !clock.is_playing() {
                return TickOutcome::Idle;
            }
            (
                clock.current_time(),
                clock.generation(),
                clock.state().loop_config(),
            )
        };
        let duration = self.effective_duration();
        let action = self
            .guard
            .borrow_mut()
            .observe(now, duration, &loop_config, generation);

        let outcome = match action {
            LoopAction::EndOfTrack(duration) => {
                info!("Reached end at {:.3}s", duration);
                self.notify_visual(duration);
                let mut clock = self.clock.borrow_mut();
                clock.pause_playback();
                clock.seek_to(duration);
                drop(clock);
                self.guard.borrow_mut().rearm(duration);
                TickOutcome::Ended { duration }
            }
            LoopAction::Restart(target) => {
                debug!("Loop boundary crossed at {:.3}s; restarting at {:.3}s", now, target);
                self.clock.borrow_mut().seek_to(target);
                self.guard.borrow_mut().rearm(target);
                self.notify_visual(target);
                TickOutcome::Looped { target }
            }
            LoopAction::Continue => {
                self.notify_visual(now);
                let snapshot = self.clock.borrow().snapshot();
                let joined = self.waveform.borrow_mut().sync_pending_players(&snapshot);
                TickOutcome::Advanced { time: now, joined }
            }
        };
        self.dispatch_track_events();
        outcome
    }

    /// Run [`tick`](Self::tick) every `poll_interval_ms` on the current
    /// `LocalSet`. The task holds only a weak reference and ends once the
    /// controller is dropped.
    pub fn spawn_poll_loop(self: &Rc<Self>) -> JoinHandle<()> {
        let weak: Weak<Self> = Rc::downgrade(self);
        let period = self.config.poll_interval();
        tokio::task::spawn_local(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let Some(controller) = weak.upgrade() else {
                    debug!("Controller dropped; poll loop exiting");
                    break;
                };
                controller.tick();
            }
        })
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn ensure_engine_running(&self) -> Result<()> {
        if self.engine.state() == EngineState::Running {
            return Ok(());
        }
        let Err(e) = self.engine.resume().await else {
            return Ok(());
        };
        if !self.resume_warned.replace(true) {
            warn!("Audio engine failed to resume ({}); trying direct resume", e);
        }
        self.engine.resume_direct()?;
        Ok(())
    }

    fn rearm_guard(&self) {
        let time = self.current_time();
        self.guard.borrow_mut().rearm(time);
    }

    /// Hand queued track events to the observers. The observer list is taken
    /// out for the duration, and observers subscribed meanwhile are kept.
    fn dispatch_track_events(&self) {
        // A nested call leaves the queue to the outer loop
        if self.dispatching.replace(true) {
            return;
        }
        loop {
            let events = self.waveform.borrow_mut().take_events();
            if events.is_empty() {
                break;
            }
            let mut observers = std::mem::take(&mut *self.observers.borrow_mut());
            for event in &events {
                observers.notify(event);
            }
            let added = std::mem::replace(&mut *self.observers.borrow_mut(), observers);
            self.observers.borrow_mut().append(added);
        }
        self.dispatching.set(false);
    }

    fn notify_visual(&self, time: f64) {
        let taken = self.visual.borrow_mut().take();
        if let Some(mut callback) = taken {
            callback(time);
            let mut slot = self.visual.borrow_mut();
            if slot.is_none() {
                *slot = Some(callback);
            }
        }
    }
}
