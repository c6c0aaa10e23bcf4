//! Two-phase startup shared by the store and the index manager.
//!
//! `initialize` wires a component without touching disk. `load` reads
//! persisted state and may depend on other components being initialized.
//! Both phases run exactly once, in that order.

use revgraph_common::types::AccessContext;
use revgraph_common::utils::error::{LifecycleError, Result};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Startup phase of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Phase {
    /// Constructed, nothing wired yet.
    Created = 0,
    /// Wired, persisted state not read yet.
    Initialized = 1,
    /// Persisted state read; serving requests.
    Loaded = 2,
}

impl Phase {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Phase::Created,
            1 => Phase::Initialized,
            _ => Phase::Loaded,
        }
    }

    /// Lower-case name used in error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Phase::Created => "created",
            Phase::Initialized => "initialized",
            Phase::Loaded => "loaded",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Atomic phase cell with strict forward transitions.
#[derive(Debug)]
pub struct PhaseTracker {
    component: &'static str,
    phase: AtomicU8,
}

impl PhaseTracker {
    /// Creates a tracker in [`Phase::Created`].
    #[must_use]
    pub const fn new(component: &'static str) -> Self {
        Self {
            component,
            phase: AtomicU8::new(Phase::Created as u8),
        }
    }

    /// Returns the current phase.
    #[must_use]
    pub fn get(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// Moves from `from` to `to`, failing if the component is elsewhere.
    pub fn advance(&self, from: Phase, to: Phase, action: &'static str) -> Result<()> {
        self.phase
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|actual| {
                LifecycleError::InvalidTransition {
                    component: self.component,
                    action,
                    phase: Phase::from_u8(actual).name(),
                }
                .into()
            })
    }

    /// Fails unless the component is loaded.
    pub fn ensure_loaded(&self) -> Result<()> {
        if self.get() == Phase::Loaded {
            Ok(())
        } else {
            Err(LifecycleError::NotReady(self.component).into())
        }
    }

    /// Fails unless the component is at least `phase`.
    pub fn ensure_at_least(&self, phase: Phase, action: &'static str) -> Result<()> {
        let current = self.get();
        if current >= phase {
            Ok(())
        } else {
            Err(LifecycleError::InvalidTransition {
                component: self.component,
                action,
                phase: current.name(),
            }
            .into())
        }
    }
}

/// A component with two-phase startup.
pub trait Lifecycle {
    /// Wires the component. Must not perform I/O.
    fn initialize(&self) -> Result<()>;

    /// Reads persisted state. Called once every component is initialized.
    fn load(&self, ctx: &AccessContext) -> Result<()>;

    /// Writes state back, if the component is persistent.
    fn flush(&self, ctx: &AccessContext) -> Result<()>;

    /// Returns the current phase.
    fn phase(&self) -> Phase;
}
