//! Per-asset track state and mixing math.

use std::sync::Arc;

use tandem_core::{AudioBuffer, BufferChain, Fence, Permit};

use crate::loader::PendingDecode;
use crate::registry::{TrackDescriptor, TrackId};

/// Final output level of one track.
///
/// `master × group × track`, or silence when muted.
#[inline]
pub fn mix_gain(master: f32, group: f32, volume: f32, muted: bool) -> f32 {
    if muted {
        0.0
    } else {
        master * group * volume
    }
}

/// Clamp `offset` into `[0, duration)`. `None` when nothing is left to play.
pub fn playable_offset(offset: f64, duration: f64) -> Option<f64> {
    let offset = if offset.is_finite() { offset.max(0.0) } else { 0.0 };
    (offset < duration).then_some(offset)
}

/// Decode progress of a track's asset.
#[derive(Debug)]
pub(crate) enum DecodeState {
    Loading(PendingDecode),
    Ready(Arc<AudioBuffer>),
    Failed(String),
}

impl DecodeState {
    pub(crate) fn buffer(&self) -> Option<&Arc<AudioBuffer>> {
        match self {
            Self::Ready(buffer) => Some(buffer),
            _ => None,
        }
    }

    pub(crate) fn is_loading(&self) -> bool {
        matches!(self, Self::Loading(_))
    }

    pub(crate) fn failure(&self) -> Option<&str> {
        match self {
            Self::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

/// One waveform asset owned by the group.
pub(crate) struct TrackEntry<C: BufferChain> {
    pub(crate) id: TrackId,
    pub(crate) volume: f32,
    pub(crate) pan: f32,
    pub(crate) muted: bool,
    pub(crate) visible: bool,
    /// Native playback running. Independent of `muted`.
    pub(crate) started: bool,
    pub(crate) effect_latency_sec: f64,
    pub(crate) decode: DecodeState,
    pub(crate) chain: Option<C>,
    /// Invalidates a buffer-ready start that a newer start or stop has superseded.
    pub(crate) start_token: Fence,
    pub(crate) pending_start: Option<Permit>,
    /// Engine time of the last late-join attempt.
    pub(crate) last_join_attempt: Option<f64>,
    pub(crate) not_ready_logged: bool,
    /// Registry flags seen on the previous scan.
    pub(crate) seen_visible: bool,
    pub(crate) seen_muted: bool,
}

impl<C: BufferChain> TrackEntry<C> {
    pub(crate) fn new(descriptor: &TrackDescriptor, decode: DecodeState) -> Self {
        Self {
            id: descriptor.id.clone(),
            volume: sanitize_volume(descriptor.volume),
            pan: sanitize_pan(descriptor.pan),
            muted: descriptor.is_muted,
            visible: descriptor.is_visible,
            started: false,
            effect_latency_sec: 0.0,
            decode,
            chain: None,
            start_token: Fence::new(),
            pending_start: None,
            last_join_attempt: None,
            not_ready_logged: false,
            seen_visible: descriptor.is_visible,
            seen_muted: descriptor.is_muted,
        }
    }

    pub(crate) fn duration(&self) -> Option<f64> {
        self.decode.buffer().map(|buffer| buffer.duration())
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.chain.is_some()
    }

    /// Native start, reading the buffer from `offset`.
    pub(crate) fn start_at(&mut self, at: f64, offset: f64) -> bool {
        match self.chain.as_mut() {
            Some(chain) => {
                chain.start(at, offset);
                self.started = true;
                true
            }
            None => false,
        }
    }

    /// Stop native playback and invalidate any deferred start.
    pub(crate) fn halt(&mut self) -> bool {
        let _ = self.start_token.advance();
        self.pending_start = None;
        if !self.started {
            return false;
        }
        if let Some(chain) = self.chain.as_mut() {
            chain.stop();
        }
        self.started = false;
        true
    }

    pub(crate) fn push_gain(&mut self, master: f32, group: f32) {
        let gain = mix_gain(master, group, self.volume, self.muted);
        if let Some(chain) = self.chain.as_mut() {
            chain.set_gain(gain);
        }
    }

    pub(crate) fn info(&self) -> TrackInfo {
        TrackInfo {
            id: self.id.clone(),
            volume: self.volume,
            pan: self.pan,
            muted: self.muted,
            visible: self.visible,
            started: self.started,
            ready: self.is_ready(),
            failure: self.decode.failure().map(str::to_owned),
            duration: self.duration(),
            effect_latency_sec: self.effect_latency_sec,
        }
    }
}

/// Read-only view of a track.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackInfo {
    pub id: TrackId,
    pub volume: f32,
    pub pan: f32,
    pub muted: bool,
    pub visible: bool,
    pub started: bool,
    /// Buffer decoded and chain built.
    pub ready: bool,
    /// Why decoding failed. The track stays silent.
    pub failure: Option<String>,
    pub duration: Option<f64>,
    pub effect_latency_sec: f64,
}

pub(crate) fn sanitize_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

pub(crate) fn sanitize_pan(pan: f32) -> f32 {
    if pan.is_nan() {
        0.0
    } else {
        pan.clamp(-1.0, 1.0)
    }
}
