//! Asset decoding off the control thread.
//!
//! A loader returns a [`PendingDecode`] immediately; the group polls it
//! without blocking and builds the track's chain once the buffer arrives.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use tandem_core::AudioBuffer;
use tokio::sync::oneshot::{self, error::TryRecvError};
use tracing::{debug, warn};

use crate::registry::TrackId;
use crate::{Error, Result};

/// Outcome of polling a [`PendingDecode`].
#[derive(Debug)]
pub enum DecodePoll {
    Pending,
    Ready(Result<AudioBuffer>),
}

/// Receiving end of one decode job.
#[derive(Debug)]
pub struct PendingDecode {
    id: TrackId,
    rx: oneshot::Receiver<Result<AudioBuffer>>,
}

/// Sending end of one decode job.
#[derive(Debug)]
pub struct DecodeSender {
    tx: oneshot::Sender<Result<AudioBuffer>>,
}

impl DecodeSender {
    /// Deliver the result. A receiver that has gone away is ignored.
    pub fn send(self, result: Result<AudioBuffer>) {
        let _ = self.tx.send(result);
    }
}

impl PendingDecode {
    pub fn channel(id: TrackId) -> (DecodeSender, PendingDecode) {
        let (tx, rx) = oneshot::channel();
        (DecodeSender { tx }, PendingDecode { id, rx })
    }

    pub fn id(&self) -> &TrackId {
        &self.id
    }

    /// Non-blocking check for a finished decode.
    pub fn poll(&mut self) -> DecodePoll {
        match self.rx.try_recv() {
            Ok(result) => DecodePoll::Ready(result),
            Err(TryRecvError::Empty) => DecodePoll::Pending,
            Err(TryRecvError::Closed) => {
                DecodePoll::Ready(Err(Error::LoadCancelled(self.id.clone())))
            }
        }
    }
}

/// Starts decode jobs for path-backed assets.
pub trait AssetLoader {
    fn load(&self, id: &TrackId, path: &Path) -> PendingDecode;
}

/// Decodes WAV files on a dedicated worker thread per asset.
#[derive(Debug, Clone, Copy, Default)]
pub struct WavLoader;

impl AssetLoader for WavLoader {
    fn load(&self, id: &TrackId, path: &Path) -> PendingDecode {
        let (sender, pending) = PendingDecode::channel(id.clone());
        let path = path.to_path_buf();
        let spawned = std::thread::Builder::new()
            .name(format!("tandem-decode-{id}"))
            .spawn(move || sender.send(decode_wav(&path)));

        // On spawn failure the sender is dropped, so the decode reports cancelled.
        if let Err(e) = spawned {
            warn!("Failed to spawn decode worker for '{}': {}", id, e);
        } else {
            debug!("Decoding '{}'", id);
        }
        pending
    }
}

/// Loader whose jobs are completed by the host, for assets decoded elsewhere.
///
/// Clones share the same outstanding jobs.
#[derive(Debug, Clone, Default)]
pub struct ManualLoader {
    senders: Rc<RefCell<HashMap<TrackId, DecodeSender>>>,
}

impl ManualLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a decoded buffer. Returns `false` when no job is outstanding for `id`.
    pub fn complete(&self, id: &TrackId, buffer: AudioBuffer) -> bool {
        self.finish(id, Ok(buffer))
    }

    pub fn fail(&self, id: &TrackId, error: Error) -> bool {
        self.finish(id, Err(error))
    }

    pub fn outstanding(&self) -> usize {
        self.senders.borrow().len()
    }

    fn finish(&self, id: &TrackId, result: Result<AudioBuffer>) -> bool {
        match self.senders.borrow_mut().remove(id) {
            Some(sender) => {
                sender.send(result);
                true
            }
            None => false,
        }
    }
}

impl AssetLoader for ManualLoader {
    fn load(&self, id: &TrackId, _path: &Path) -> PendingDecode {
        let (sender, pending) = PendingDecode::channel(id.clone());
        self.senders.borrow_mut().insert(id.clone(), sender);
        pending
    }
}

/// Decode a WAV file into planar f32.
pub fn decode_wav(path: &Path) -> Result<AudioBuffer> {
    let is_wav = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wav") || ext.eq_ignore_ascii_case("wave"));
    if !is_wav {
        return Err(Error::UnsupportedFormat(path.display().to_string()));
    }

    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, hound::Error>>()?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1_i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|sample| sample.map(|s| s as f32 * scale))
                .collect::<std::result::Result<Vec<f32>, hound::Error>>()?
        }
    };

    Ok(AudioBuffer::from_interleaved(
        spec.sample_rate,
        spec.channels as usize,
        &samples,
    ))
}
