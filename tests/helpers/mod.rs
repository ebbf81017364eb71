//! Test helpers and fixtures for tandem integration tests
//!
//! Every fixture runs on a [`HeadlessEngine`] whose clock only moves when a
//! test moves it, so timing assertions are exact.
//!
//! ## Tolerance Levels
//!
//! Use the appropriate tolerance from [`tolerances`] module:
//! - `TIME_EPSILON` (1e-9): logical and engine times
//! - `SEMITONE_EPSILON` (1e-9): pitch correction
//! - `GAIN_EPSILON` (1e-6): mix gains

#![allow(dead_code)]

pub mod tolerances;

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use tandem::prelude::*;
use tandem::ManualLoader;

/// Sample rate of generated fixtures
pub const TEST_SAMPLE_RATE: u32 = 48_000;

pub struct Rig {
    pub engine: HeadlessEngine,
    pub repository: InMemoryRepository,
    pub loader: ManualLoader,
    pub controller: Rc<Controller<HeadlessEngine>>,
}

impl Rig {
    /// Latency the engine reports for chains built from [`silent_track`] buffers.
    pub fn chain_latency(&self) -> f64 {
        TandemConfig::default()
            .analysis_window
            .latency_seconds(f64::from(TEST_SAMPLE_RATE))
    }

    pub fn join_lookahead(&self) -> f64 {
        self.controller.config().join_lookahead_sec
    }

    /// Set the engine clock so the master clock reads `logical` after a
    /// `play()` issued at engine time zero with the default lookahead.
    pub fn set_logical_time(&self, logical: f64) {
        let lookahead = self.controller.config().start_lookahead_sec;
        self.engine.set_time(lookahead + logical);
    }
}

/// Controller over an empty registry, manual loader and empty timeline.
pub fn rig() -> Rig {
    rig_with(TandemConfig::default(), NoteTimeline::empty())
}

pub fn rig_with(config: TandemConfig, timeline: NoteTimeline) -> Rig {
    let engine = HeadlessEngine::new();
    let repository = InMemoryRepository::new();
    let loader = ManualLoader::new();
    let controller = Controller::builder(engine.clone())
        .config(config)
        .repository(repository.clone())
        .loader(loader.clone())
        .notes(timeline)
        .build()
        .expect("Failed to build test controller");
    Rig {
        engine,
        repository,
        loader,
        controller: Rc::new(controller),
    }
}

/// Decoded stereo silence of `seconds` length.
pub fn silent_track(id: &str, seconds: f64) -> TrackDescriptor {
    TrackDescriptor::decoded(id, silent_buffer(seconds))
}

pub fn silent_buffer(seconds: f64) -> AudioBuffer {
    AudioBuffer::silence(TEST_SAMPLE_RATE, 2, seconds)
}

/// One note per second from 0 to `duration`.
pub fn metronome_notes(duration: f64) -> NoteTimeline {
    let notes = (0..duration.floor() as usize)
        .map(|i| Note::new(60 + (i % 12) as u8, 0.8, i as f64, 0.5))
        .collect();
    NoteTimeline::new(notes).expect("valid fixture notes")
}

/// Collect every value passed to the visual callback.
pub fn record_visual(controller: &Controller<HeadlessEngine>) -> Rc<RefCell<Vec<f64>>> {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let sink = calls.clone();
    controller.register_visual_callback(move |time| sink.borrow_mut().push(time));
    calls
}

/// Collect every track event.
pub fn record_events(controller: &Controller<HeadlessEngine>) -> Rc<RefCell<Vec<TrackEvent>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = events.clone();
    controller.subscribe_tracks(move |event| sink.borrow_mut().push(event.clone()));
    events
}

/// Write a 16-bit stereo sine WAV fixture.
pub fn write_wav(path: &Path, seconds: f64) {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: TEST_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).expect("create wav");
    let frames = (seconds * f64::from(TEST_SAMPLE_RATE)) as usize;
    for i in 0..frames {
        let t = i as f64 / f64::from(TEST_SAMPLE_RATE);
        let sample = ((2.0 * std::f64::consts::PI * 220.0 * t).sin() * 8_000.0) as i16;
        writer.write_sample(sample).expect("write sample");
        writer.write_sample(sample).expect("write sample");
    }
    writer.finalize().expect("finalize wav");
}

/// Install a test subscriber once; respects `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
