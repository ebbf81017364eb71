//! File registry: the external source of waveform assets.
//!
//! The group is handed a [`TrackRepository`] at construction and polls it to
//! discover new assets and to learn which ones are visible.

use std::cell::RefCell;
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tandem_core::AudioBuffer;

/// Stable identifier of a waveform asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TrackId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Where an asset's audio comes from.
#[derive(Debug, Clone)]
pub enum AssetSource {
    /// Decoded off the control thread by the group's loader.
    Path(PathBuf),
    /// Already decoded by the host.
    Decoded(Arc<AudioBuffer>),
}

/// Registry entry for one asset.
#[derive(Debug, Clone)]
pub struct TrackDescriptor {
    pub id: TrackId,
    pub is_visible: bool,
    pub is_muted: bool,
    pub source: AssetSource,
    pub pan: f32,
    pub volume: f32,
}

impl TrackDescriptor {
    /// Visible, unmuted, centered, full volume.
    pub fn new(id: impl Into<TrackId>, source: AssetSource) -> Self {
        Self {
            id: id.into(),
            is_visible: true,
            is_muted: false,
            source,
            pan: 0.0,
            volume: 1.0,
        }
    }

    pub fn decoded(id: impl Into<TrackId>, buffer: AudioBuffer) -> Self {
        Self::new(id, AssetSource::Decoded(Arc::new(buffer)))
    }

    pub fn path(id: impl Into<TrackId>, path: impl Into<PathBuf>) -> Self {
        Self::new(id, AssetSource::Path(path.into()))
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.is_visible = visible;
        self
    }

    pub fn muted(mut self, muted: bool) -> Self {
        self.is_muted = muted;
        self
    }

    pub fn volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    pub fn pan(mut self, pan: f32) -> Self {
        self.pan = pan;
        self
    }
}

/// Lookup of every asset the host knows about.
pub trait TrackRepository {
    fn tracks(&self) -> Vec<TrackDescriptor>;
}

/// Shared, mutable registry kept in memory. Clones see the same entries.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    entries: Rc<RefCell<Vec<TrackDescriptor>>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry with the same id.
    pub fn insert(&self, descriptor: TrackDescriptor) {
        let mut entries = self.entries.borrow_mut();
        match entries.iter_mut().find(|entry| entry.id == descriptor.id) {
            Some(existing) => *existing = descriptor,
            None => entries.push(descriptor),
        }
    }

    pub fn remove(&self, id: &TrackId) -> Option<TrackDescriptor> {
        let mut entries = self.entries.borrow_mut();
        let index = entries.iter().position(|entry| &entry.id == id)?;
        Some(entries.remove(index))
    }

    pub fn set_visible(&self, id: &TrackId, visible: bool) -> bool {
        self.update(id, |entry| entry.is_visible = visible)
    }

    pub fn set_muted(&self, id: &TrackId, muted: bool) -> bool {
        self.update(id, |entry| entry.is_muted = muted)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    fn update(&self, id: &TrackId, f: impl FnOnce(&mut TrackDescriptor)) -> bool {
        match self
            .entries
            .borrow_mut()
            .iter_mut()
            .find(|entry| &entry.id == id)
        {
            Some(entry) => {
                f(entry);
                true
            }
            None => false,
        }
    }
}

impl TrackRepository for InMemoryRepository {
    fn tracks(&self) -> Vec<TrackDescriptor> {
        self.entries.borrow().clone()
    }
}
