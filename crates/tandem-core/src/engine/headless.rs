//! Deterministic in-process engine with a manually advanced clock.
//!
//! Renders nothing. Every native command is recorded so callers can inspect
//! what a real backend would have been told to do, which makes it the engine
//! of choice for offline planning and for tests.

use std::cell::RefCell;
use std::future::{ready, Future};
use std::rc::Rc;
use std::sync::Arc;

use super::{AudioEngine, BufferChain, EngineState, NoteEvent, NoteEventKind, NoteOutput};
use crate::buffer::AudioBuffer;
use crate::time_stretch::{AnalysisWindow, TimeStretchParams};
use crate::{Error, Result};

/// How [`HeadlessEngine`] answers resume requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResumeBehavior {
    #[default]
    Succeed,
    /// The async resume fails but the direct fallback works.
    FailAsync,
    /// Both resume paths fail.
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainStart {
    pub at: f64,
    pub offset: f64,
}

/// Everything a buffer chain has been told so far.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainRecord {
    pub label: String,
    pub buffer_duration: f64,
    pub started: bool,
    pub starts: Vec<ChainStart>,
    pub stops: usize,
    pub stretch: TimeStretchParams,
    pub gain: f32,
    pub pan: f32,
    pub latency: f64,
}

impl ChainRecord {
    pub fn last_start(&self) -> Option<ChainStart> {
        self.starts.last().copied()
    }
}

/// Everything a note output has been told so far.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteRecord {
    pub label: String,
    /// Events scheduled since the last cancel.
    pub pending: Vec<NoteEvent>,
    pub scheduled_total: usize,
    pub cancels: usize,
    pub gain: f32,
}

impl NoteRecord {
    pub fn note_ons(&self) -> impl Iterator<Item = &NoteEvent> {
        self.pending
            .iter()
            .filter(|event| event.kind == NoteEventKind::On)
    }
}

#[derive(Debug)]
struct Inner {
    now: f64,
    state: EngineState,
    resume: ResumeBehavior,
    window: AnalysisWindow,
    chains: Vec<ChainRecord>,
    notes: Vec<NoteRecord>,
}

/// Headless audio engine. Cloning shares the same clock and records.
#[derive(Debug, Clone)]
pub struct HeadlessEngine {
    inner: Rc<RefCell<Inner>>,
}

impl Default for HeadlessEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessEngine {
    pub fn new() -> Self {
        Self::with_analysis_window(AnalysisWindow::default())
    }

    /// Chains report the latency of `window` at their buffer's sample rate.
    pub fn with_analysis_window(window: AnalysisWindow) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                now: 0.0,
                state: EngineState::Running,
                resume: ResumeBehavior::Succeed,
                window,
                chains: Vec::new(),
                notes: Vec::new(),
            })),
        }
    }

    pub fn set_time(&self, seconds: f64) {
        self.inner.borrow_mut().now = seconds;
    }

    pub fn advance(&self, seconds: f64) {
        self.inner.borrow_mut().now += seconds;
    }

    pub fn suspend(&self) {
        self.inner.borrow_mut().state = EngineState::Suspended;
    }

    pub fn close(&self) {
        self.inner.borrow_mut().state = EngineState::Closed;
    }

    pub fn set_resume_behavior(&self, behavior: ResumeBehavior) {
        self.inner.borrow_mut().resume = behavior;
    }

    /// Snapshot of the most recently created chain with `label`.
    pub fn chain(&self, label: &str) -> Option<ChainRecord> {
        self.inner
            .borrow()
            .chains
            .iter()
            .rev()
            .find(|chain| chain.label == label)
            .cloned()
    }

    pub fn chains(&self) -> Vec<ChainRecord> {
        self.inner.borrow().chains.clone()
    }

    pub fn started_chain_count(&self) -> usize {
        self.inner
            .borrow()
            .chains
            .iter()
            .filter(|chain| chain.started)
            .count()
    }

    pub fn notes(&self, label: &str) -> Option<NoteRecord> {
        self.inner
            .borrow()
            .notes
            .iter()
            .rev()
            .find(|notes| notes.label == label)
            .cloned()
    }

    fn try_resume(&self, fallback: bool) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        match (inner.state, inner.resume) {
            (EngineState::Closed, _) => Err(Error::EngineClosed),
            (EngineState::Running, _) => Ok(()),
            (_, ResumeBehavior::Succeed) => {
                inner.state = EngineState::Running;
                Ok(())
            }
            (_, ResumeBehavior::FailAsync) if fallback => {
                inner.state = EngineState::Running;
                Ok(())
            }
            (_, _) => Err(Error::EngineNotResumable(
                "headless engine refused to resume".into(),
            )),
        }
    }
}

impl AudioEngine for HeadlessEngine {
    type Chain = HeadlessChain;
    type Notes = HeadlessNotes;

    fn now(&self) -> f64 {
        self.inner.borrow().now
    }

    fn state(&self) -> EngineState {
        self.inner.borrow().state
    }

    fn resume(&self) -> impl Future<Output = Result<()>> {
        ready(self.try_resume(false))
    }

    fn resume_direct(&self) -> Result<()> {
        self.try_resume(true)
    }

    fn create_chain(&self, label: &str, buffer: Arc<AudioBuffer>) -> HeadlessChain {
        let mut inner = self.inner.borrow_mut();
        let latency = inner
            .window
            .latency_seconds(f64::from(buffer.sample_rate().max(1)));
        inner.chains.push(ChainRecord {
            label: label.to_string(),
            buffer_duration: buffer.duration(),
            started: false,
            starts: Vec::new(),
            stops: 0,
            stretch: TimeStretchParams::IDENTITY,
            gain: 1.0,
            pan: 0.0,
            latency,
        });
        HeadlessChain {
            inner: Rc::clone(&self.inner),
            index: inner.chains.len() - 1,
        }
    }

    fn create_note_output(&self, label: &str) -> HeadlessNotes {
        let mut inner = self.inner.borrow_mut();
        inner.notes.push(NoteRecord {
            label: label.to_string(),
            pending: Vec::new(),
            scheduled_total: 0,
            cancels: 0,
            gain: 1.0,
        });
        HeadlessNotes {
            inner: Rc::clone(&self.inner),
            index: inner.notes.len() - 1,
        }
    }
}

/// Buffer chain of a [`HeadlessEngine`].
#[derive(Debug)]
pub struct HeadlessChain {
    inner: Rc<RefCell<Inner>>,
    index: usize,
}

impl HeadlessChain {
    fn with<R>(&self, f: impl FnOnce(&mut ChainRecord) -> R) -> R {
        f(&mut self.inner.borrow_mut().chains[self.index])
    }
}

impl BufferChain for HeadlessChain {
    fn start(&mut self, at: f64, offset: f64) {
        self.with(|chain| {
            chain.started = true;
            chain.starts.push(ChainStart { at, offset });
        });
    }

    fn stop(&mut self) {
        self.with(|chain| {
            if chain.started {
                chain.started = false;
                chain.stops += 1;
            }
        });
    }

    fn set_time_stretch(&mut self, params: TimeStretchParams) {
        self.with(|chain| chain.stretch = params);
    }

    fn set_gain(&mut self, gain: f32) {
        self.with(|chain| chain.gain = gain);
    }

    fn set_pan(&mut self, pan: f32) {
        self.with(|chain| chain.pan = pan);
    }

    fn latency(&self) -> f64 {
        self.with(|chain| chain.latency)
    }
}

/// Note output of a [`HeadlessEngine`].
#[derive(Debug)]
pub struct HeadlessNotes {
    inner: Rc<RefCell<Inner>>,
    index: usize,
}

impl NoteOutput for HeadlessNotes {
    fn schedule(&mut self, event: NoteEvent) {
        let notes = &mut self.inner.borrow_mut().notes[self.index];
        notes.pending.push(event);
        notes.scheduled_total += 1;
    }

    fn cancel_all(&mut self) {
        let notes = &mut self.inner.borrow_mut().notes[self.index];
        notes.pending.clear();
        notes.cancels += 1;
    }

    fn set_gain(&mut self, gain: f32) {
        self.inner.borrow_mut().notes[self.index].gain = gain;
    }
}
