//! Loop-boundary and end-of-track detection for the polling loop.
//!
//! Boundaries are detected as edge crossings between two consecutive ticks,
//! and each generation fires at most one restart. Repeat mode also wraps when
//! two ticks in a row sit at or past the end, which happens after seeking to
//! the end or when the longest track drops out.

use tandem_core::{Generation, LoopConfig, LoopMode};

/// What the polling loop must do after a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoopAction {
    /// Keep playing; forward the time to the visual callback.
    Continue,
    /// Not repeating and past the end: clamp to this duration and pause.
    EndOfTrack(f64),
    /// Crossed a loop boundary: atomic restart at this position.
    Restart(f64),
}

#[derive(Debug, Clone, Default)]
pub struct LoopGuard {
    last_time: Option<f64>,
    fired: Option<Generation>,
}

impl LoopGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the previous tick, e.g. after a seek, tempo or marker change.
    pub fn rearm(&mut self, time: f64) {
        self.last_time = Some(time);
    }

    pub fn last_time(&self) -> Option<f64> {
        self.last_time
    }

    /// Evaluate one tick at logical time `now`.
    pub fn observe(
        &mut self,
        now: f64,
        duration: f64,
        config: &LoopConfig,
        generation: Generation,
    ) -> LoopAction {
        let previous = self.last_time.replace(now);

        if config.mode != LoopMode::Repeat && duration > 0.0 && now >= duration {
            return LoopAction::EndOfTrack(duration);
        }

        let wraps = config.repeats()
            && duration > 0.0
            && (crossed(previous, now, duration) || stuck_past(previous, now, duration));
        let target = if wraps {
            Some(0.0)
        } else {
            config
                .ab_range()
                .filter(|&(_, b)| crossed(previous, now, b))
                .map(|(a, _)| a)
        };

        match target {
            Some(_) if self.fired == Some(generation) => LoopAction::Continue,
            Some(target) => {
                self.fired = Some(generation);
                LoopAction::Restart(target)
            }
            None => LoopAction::Continue,
        }
    }
}

fn crossed(previous: Option<f64>, now: f64, boundary: f64) -> bool {
    previous.is_some_and(|previous| previous < boundary) && now >= boundary
}

fn stuck_past(previous: Option<f64>, now: f64, end: f64) -> bool {
    previous.is_some_and(|previous| previous >= end) && now >= end
}
