//! Fencing tokens for cooperative cancellation.
//!
//! All state transitions happen on one control thread, but some of them are
//! split by an `await` (engine resume, decode readiness). A continuation
//! captures a [`Permit`] before it suspends and checks it against the owning
//! [`Fence`] afterwards. Any newer transition advances the fence, so the stale
//! continuation observes a mismatch and performs no native operation.
//!
//! The master clock's generation and every track's start token are fences.

use core::fmt;

/// Monotonically increasing generation number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(u64);

impl Generation {
    pub const ZERO: Self = Self(0);

    #[inline]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Owner of a generation counter.
#[derive(Debug, Default)]
pub struct Fence {
    current: Generation,
}

impl Fence {
    pub const fn new() -> Self {
        Self {
            current: Generation::ZERO,
        }
    }

    #[inline]
    pub fn current(&self) -> Generation {
        self.current
    }

    /// Invalidate every outstanding permit and issue one for the new generation.
    pub fn advance(&mut self) -> Permit {
        self.current = Generation(self.current.0 + 1);
        Permit {
            generation: self.current,
        }
    }

    /// Issue a permit for the current generation without advancing.
    pub fn permit(&self) -> Permit {
        Permit {
            generation: self.current,
        }
    }

    #[inline]
    pub fn is_current(&self, permit: &Permit) -> bool {
        permit.generation == self.current
    }

    /// Consume `permit`, returning its generation only if it is still current.
    pub fn redeem(&self, permit: Permit) -> Option<Generation> {
        self.is_current(&permit).then_some(permit.generation)
    }
}

/// Move-only proof that a continuation was scheduled under a given generation.
///
/// Deliberately neither `Clone` nor `Copy`: a permit is captured once and
/// either redeemed or dropped.
#[must_use = "a permit does nothing unless it is checked against its fence"]
#[derive(Debug, PartialEq, Eq)]
pub struct Permit {
    generation: Generation,
}

impl Permit {
    #[inline]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Whether this permit was issued for `generation`.
    #[inline]
    pub fn matches(&self, generation: Generation) -> bool {
        self.generation == generation
    }
}
