//! Transport state machine.
//!
//! `Idle → Playing ⇄ Paused`. `Idle` is only reachable through `Stop`; a
//! seek leaves the state where it found it.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    /// Stopped with the position reset to zero.
    #[default]
    Idle,
    Playing,
    /// Stopped with the position preserved.
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransportEvent {
    Play,
    Pause,
    Stop,
    Seek(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransitionResult {
    None,
    StateChanged(TransportState),
    /// Seek while playing: stop everything, then start again at the target.
    Restart(f64),
    /// Seek while not playing: move the position only.
    Relocate(f64),
}

#[derive(Debug, Default)]
pub struct TransportFsm {
    state: TransportState,
}

impl TransportFsm {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn state(&self) -> TransportState {
        self.state
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    pub fn transition(&mut self, event: TransportEvent) -> TransitionResult {
        use TransportEvent::*;

        match event {
            Play => match self.state {
                TransportState::Idle | TransportState::Paused => {
                    self.state = TransportState::Playing;
                    TransitionResult::StateChanged(TransportState::Playing)
                }
                TransportState::Playing => TransitionResult::None,
            },

            Pause => match self.state {
                TransportState::Playing => {
                    self.state = TransportState::Paused;
                    TransitionResult::StateChanged(TransportState::Paused)
                }
                TransportState::Idle | TransportState::Paused => TransitionResult::None,
            },

            Stop => match self.state {
                TransportState::Playing | TransportState::Paused => {
                    self.state = TransportState::Idle;
                    TransitionResult::StateChanged(TransportState::Idle)
                }
                TransportState::Idle => TransitionResult::None,
            },

            Seek(target) => match self.state {
                TransportState::Playing => TransitionResult::Restart(target),
                TransportState::Idle | TransportState::Paused => TransitionResult::Relocate(target),
            },
        }
    }
}
