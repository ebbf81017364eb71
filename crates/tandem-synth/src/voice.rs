//! Voice allocation over a scheduled timeline.
//!
//! Unlike a live allocator, every note's release time is known up front, so a
//! slot frees itself once its scheduled end has passed. When all slots are
//! busy the oldest voice is stolen.

use tandem_core::VoiceId;

/// Information about an allocated voice slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceSlot {
    pub voice_id: VoiceId,
    /// MIDI note number that triggered this voice (0-127)
    pub pitch: u8,
    /// Engine time of the note-on
    pub start: f64,
    /// Engine time of the scheduled note-off
    pub end: f64,
}

/// Result of attempting to allocate a voice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AllocationResult {
    /// New voice successfully allocated
    Allocated { voice_id: VoiceId, slot_index: usize },
    /// Existing voice cut short to make room (or retriggered on the same pitch)
    Stolen {
        voice_id: VoiceId,
        slot_index: usize,
        stolen_voice_id: VoiceId,
    },
}

impl AllocationResult {
    pub fn voice_id(&self) -> VoiceId {
        match *self {
            Self::Allocated { voice_id, .. } | Self::Stolen { voice_id, .. } => voice_id,
        }
    }

    pub fn stolen(&self) -> Option<VoiceId> {
        match *self {
            Self::Stolen {
                stolen_voice_id, ..
            } => Some(stolen_voice_id),
            Self::Allocated { .. } => None,
        }
    }
}

/// Polyphonic voice allocator with oldest-voice stealing.
#[derive(Debug, Clone)]
pub struct VoiceAllocator {
    slots: Vec<Option<VoiceSlot>>,
    next_voice_id: VoiceId,
}

impl VoiceAllocator {
    /// Create an allocator with `max_voices` slots (at least one).
    pub fn new(max_voices: usize) -> Self {
        Self {
            slots: vec![None; max_voices.max(1)],
            next_voice_id: 1,
        }
    }

    pub fn max_voices(&self) -> usize {
        self.slots.len()
    }

    /// Voices still sounding at engine time `at`.
    pub fn active_count(&self, at: f64) -> usize {
        self.slots
            .iter()
            .flatten()
            .filter(|slot| slot.end > at)
            .count()
    }

    /// Free every slot and forget all voices. Ids keep increasing.
    pub fn reset(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
    }

    /// Allocate a voice for a note sounding from `start` to `end`.
    ///
    /// Calls must come in non-decreasing `start` order.
    pub fn allocate(&mut self, pitch: u8, start: f64, end: f64) -> AllocationResult {
        for slot in &mut self.slots {
            if slot.is_some_and(|s| s.end <= start) {
                *slot = None;
            }
        }

        // Same pitch still sounding: retrigger in place
        let slot_index = match self.slot_playing(pitch) {
            Some(index) => index,
            None => match self.slots.iter().position(Option::is_none) {
                Some(index) => return self.activate(index, pitch, start, end, None),
                None => self.oldest_slot(),
            },
        };

        let stolen = self.slots[slot_index].map(|slot| slot.voice_id);
        self.activate(slot_index, pitch, start, end, stolen)
    }

    fn activate(
        &mut self,
        slot_index: usize,
        pitch: u8,
        start: f64,
        end: f64,
        stolen: Option<VoiceId>,
    ) -> AllocationResult {
        let voice_id = self.next_voice_id;
        self.next_voice_id += 1;
        self.slots[slot_index] = Some(VoiceSlot {
            voice_id,
            pitch,
            start,
            end,
        });

        match stolen {
            Some(stolen_voice_id) => AllocationResult::Stolen {
                voice_id,
                slot_index,
                stolen_voice_id,
            },
            None => AllocationResult::Allocated {
                voice_id,
                slot_index,
            },
        }
    }

    fn slot_playing(&self, pitch: u8) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.is_some_and(|s| s.pitch == pitch))
    }

    fn oldest_slot(&self) -> usize {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.map(|s| (index, s.start)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map_or(0, |(index, _)| index)
    }
}
