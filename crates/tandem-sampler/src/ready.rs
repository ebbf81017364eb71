//! Readiness gating.

use std::cell::RefCell;
use std::time::Duration;

use tandem_core::AudioEngine;

use crate::group::WaveformGroup;

/// Resolve once every known asset has finished decoding (or failed).
///
/// Polls every `interval` and never holds the borrow across an await, so
/// control calls on the group stay possible while this is pending.
pub async fn wait_until_ready<E: AudioEngine>(
    group: &RefCell<WaveformGroup<E>>,
    interval: Duration,
) {
    loop {
        let ready = group.borrow_mut().poll_ready();
        if ready {
            return;
        }
        tokio::time::sleep(interval).await;
    }
}
