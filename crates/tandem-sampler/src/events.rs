//! Track lifecycle notifications.

use crate::registry::TrackId;

#[derive(Debug, Clone, PartialEq)]
pub enum TrackEvent {
    /// Started with a synchronized start (or as soon as its buffer arrived).
    Started { id: TrackId, offset: f64 },
    /// Joined mid-stream.
    Joined { id: TrackId, offset: f64 },
    Stopped { id: TrackId },
    /// Decode failed; the track stays silent.
    Failed { id: TrackId, reason: String },
}

impl TrackEvent {
    pub fn id(&self) -> &TrackId {
        match self {
            Self::Started { id, .. }
            | Self::Joined { id, .. }
            | Self::Stopped { id }
            | Self::Failed { id, .. } => id,
        }
    }
}

pub type TrackObserver = Box<dyn FnMut(&TrackEvent)>;

/// Observer list. The group only queues events; whoever owns the group
/// drains the queue and notifies once no borrow of the group is held, so an
/// observer may call back into its owner.
#[derive(Default)]
pub struct Observers {
    observers: Vec<TrackObserver>,
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, observer: TrackObserver) {
        self.observers.push(observer);
    }

    pub fn notify(&mut self, event: &TrackEvent) {
        for observer in &mut self.observers {
            observer(event);
        }
    }

    /// Append observers registered while this list was taken out.
    pub fn append(&mut self, mut other: Observers) {
        self.observers.append(&mut other.observers);
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}
