//! Revision identifiers and the clock that mints them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// A time-ordered revision token.
///
/// Stores microseconds since the Unix epoch. Revisions of one edition are
/// totally ordered by this value; the greatest one is the latest revision.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[repr(transparent)]
pub struct RevisionId(pub u64);

impl RevisionId {
    /// The smallest possible revision.
    pub const MIN: Self = Self(0);

    /// Creates a revision id from raw microseconds.
    #[inline]
    #[must_use]
    pub const fn new(micros: u64) -> Self {
        Self(micros)
    }

    /// Returns the raw microsecond value.
    #[inline]
    #[must_use]
    pub const fn as_micros(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RevisionId({})", self.0)
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

impl From<u64> for RevisionId {
    fn from(micros: u64) -> Self {
        Self(micros)
    }
}

/// Mints strictly increasing [`RevisionId`]s from the wall clock.
///
/// Two calls never return the same id, even when the system clock stalls or
/// steps backwards: the clock hands out `max(now, last + 1)`.
#[derive(Debug, Default)]
pub struct RevisionClock {
    last: AtomicU64,
}

impl RevisionClock {
    /// Creates a clock that has not issued any revision yet.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last: AtomicU64::new(0),
        }
    }

    /// Issues the next revision id.
    pub fn next(&self) -> RevisionId {
        let now = now_micros();
        let mut last = self.last.load(Ordering::Acquire);
        loop {
            let candidate = now.max(last.saturating_add(1));
            match self
                .last
                .compare_exchange_weak(last, candidate, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return RevisionId(candidate),
                Err(actual) => last = actual,
            }
        }
    }

    /// Issues a revision id strictly greater than `floor`.
    ///
    /// Used when a new revision must sort after an existing one that may
    /// have been written with an explicit, future-dated id.
    pub fn next_after(&self, floor: RevisionId) -> RevisionId {
        self.observe(floor);
        self.next()
    }

    /// Makes sure later ids sort after `seen`.
    pub fn observe(&self, seen: RevisionId) {
        self.last.fetch_max(seen.0, Ordering::AcqRel);
    }
}

fn now_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}
