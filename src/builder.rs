//! Builder for configuring and constructing a [`Controller`].

use std::path::Path;
use std::rc::Rc;

use tandem_core::{AudioEngine, TandemConfig};
use tandem_sampler::{AssetLoader, InMemoryRepository, TrackRepository, WavLoader, WaveformGroup};
use tandem_synth::{NoteGroup, NoteTimeline};

use crate::{Controller, Result};

/// Anything not set falls back to a default: an empty in-memory registry,
/// the WAV loader, an empty note timeline and [`TandemConfig::default`].
///
/// # Example
///
/// ```ignore
/// use tandem::prelude::*;
///
/// let repository = InMemoryRepository::new();
/// repository.insert(TrackDescriptor::path("drums", "stems/drums.wav"));
///
/// let controller = Controller::builder(HeadlessEngine::new())
///     .config_file("tandem.toml")?
///     .repository(repository)
///     .notes(timeline)
///     .build()?;
/// ```
pub struct ControllerBuilder<E: AudioEngine + 'static> {
    engine: E,
    config: TandemConfig,
    repository: Option<Box<dyn TrackRepository>>,
    loader: Option<Box<dyn AssetLoader>>,
    timeline: NoteTimeline,
    note_output_label: String,
}

impl<E: AudioEngine + 'static> ControllerBuilder<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            config: TandemConfig::default(),
            repository: None,
            loader: None,
            timeline: NoteTimeline::empty(),
            note_output_label: "notes".to_string(),
        }
    }

    pub fn config(mut self, config: TandemConfig) -> Self {
        self.config = config;
        self
    }

    /// Load the configuration from a TOML file.
    pub fn config_file(mut self, path: impl AsRef<Path>) -> Result<Self> {
        self.config = TandemConfig::load(path)?;
        Ok(self)
    }

    pub fn repository(mut self, repository: impl TrackRepository + 'static) -> Self {
        self.repository = Some(Box::new(repository));
        self
    }

    pub fn loader(mut self, loader: impl AssetLoader + 'static) -> Self {
        self.loader = Some(Box::new(loader));
        self
    }

    pub fn notes(mut self, timeline: NoteTimeline) -> Self {
        self.timeline = timeline;
        self
    }

    /// Label of the synthesizer input created on the engine.
    pub fn note_output_label(mut self, label: impl Into<String>) -> Self {
        self.note_output_label = label.into();
        self
    }

    pub fn build(self) -> Result<Controller<E>> {
        self.config.validate()?;

        let engine = Rc::new(self.engine);
        let repository = self
            .repository
            .unwrap_or_else(|| Box::new(InMemoryRepository::new()));
        let loader = self.loader.unwrap_or_else(|| Box::new(WavLoader));

        let waveform = WaveformGroup::new(Rc::clone(&engine), repository, loader, &self.config);
        let mut notes = NoteGroup::new(
            engine.create_note_output(&self.note_output_label),
            &self.config,
        );
        notes.set_timeline(self.timeline);

        Ok(Controller::from_parts(engine, waveform, notes, self.config))
    }
}
