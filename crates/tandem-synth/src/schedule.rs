//! Converting a note timeline into engine-time note events.
//!
//! Logical offsets are scaled by `original_tempo / tempo`, so a schedule is
//! valid for one tempo only. A tempo change always rebuilds it.

use tandem_core::{NoteEvent, NoteEventKind, SyncInfo};

use crate::timeline::NoteTimeline;
use crate::voice::VoiceAllocator;

/// Engine seconds per logical second at `tempo_bpm`.
#[inline]
pub fn time_scale(tempo_bpm: f64, original_tempo_bpm: f64) -> f64 {
    original_tempo_bpm / tempo_bpm
}

/// Build every note-on/note-off for playback starting at `sync`.
///
/// Notes already sounding at `sync.master_time` start at
/// `sync.engine_clock_time`, truncated. A stolen voice receives its note-off
/// at the stealing note's onset instead of its own end. Events are returned
/// in time order, note-offs before note-ons at the same instant.
pub fn build_schedule(
    timeline: &NoteTimeline,
    sync: &SyncInfo,
    scale: f64,
    allocator: &mut VoiceAllocator,
) -> Vec<NoteEvent> {
    allocator.reset();
    let mut events: Vec<NoteEvent> = Vec::with_capacity(timeline.len() * 2);

    for note in timeline.from_time(sync.master_time) {
        let on_at = sync.engine_clock_time + (note.start - sync.master_time).max(0.0) * scale;
        let off_at = sync.engine_clock_time + (note.end() - sync.master_time) * scale;

        let allocation = allocator.allocate(note.pitch, on_at, off_at);
        if let Some(stolen) = allocation.stolen() {
            if let Some(off) = events
                .iter_mut()
                .find(|event| event.voice == stolen && event.kind == NoteEventKind::Off)
            {
                off.at = off.at.min(on_at);
            }
        }

        let voice = allocation.voice_id();
        events.push(NoteEvent {
            at: on_at,
            voice,
            pitch: note.pitch,
            velocity: note.velocity,
            kind: NoteEventKind::On,
        });
        events.push(NoteEvent {
            at: off_at,
            voice,
            pitch: note.pitch,
            velocity: 0.0,
            kind: NoteEventKind::Off,
        });
    }

    events.sort_by(|a, b| {
        a.at.total_cmp(&b.at)
            .then_with(|| kind_order(a.kind).cmp(&kind_order(b.kind)))
    });
    events
}

fn kind_order(kind: NoteEventKind) -> u8 {
    match kind {
        NoteEventKind::Off => 0,
        NoteEventKind::On => 1,
    }
}
