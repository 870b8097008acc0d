//! Work-unit timing.
//!
//! [`TimingController`] tracks at most one open work unit. A start while a
//! unit is open is ignored, so nested executions are folded into the
//! outermost one. A stop while idle returns nothing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic time source.
pub trait Clock: Send + Sync {
    /// Time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;
}

/// Clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Create a clock whose origin is now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    millis: Arc<AtomicU64>,
}

impl ManualClock {
    /// Create a clock at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let millis = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }

    /// Set the clock to an absolute offset from its origin.
    pub fn set(&self, at: Duration) {
        let millis = u64::try_from(at.as_millis()).unwrap_or(u64::MAX);
        self.millis.store(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_millis(self.millis.load(Ordering::SeqCst))
    }
}

/// An open work unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkUnit {
    /// Caller-supplied identifier.
    pub identifier: String,
    /// Clock reading when the unit opened.
    pub start_time: Duration,
}

/// A closed work unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedUnit {
    /// Identifier the unit was opened with.
    pub identifier: String,
    /// Elapsed time, floored to whole seconds.
    pub duration_secs: u64,
}

/// Controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    /// No unit open.
    Idle,
    /// A unit is open.
    Running,
}

/// Brackets one work unit at a time.
pub struct TimingController {
    clock: Arc<dyn Clock>,
    open: Option<WorkUnit>,
}

impl TimingController {
    /// Create an idle controller reading `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock, open: None }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> TimerState {
        if self.open.is_some() {
            TimerState::Running
        } else {
            TimerState::Idle
        }
    }

    /// The open unit, if any.
    #[must_use]
    pub const fn current(&self) -> Option<&WorkUnit> {
        self.open.as_ref()
    }

    /// Open a unit. Returns `false` and keeps the existing unit if one is
    /// already open.
    pub fn start(&mut self, identifier: impl Into<String>) -> bool {
        if self.open.is_some() {
            return false;
        }
        self.open = Some(WorkUnit {
            identifier: identifier.into(),
            start_time: self.clock.now(),
        });
        true
    }

    /// Close the open unit and report its duration, or `None` when idle.
    pub fn stop(&mut self) -> Option<CompletedUnit> {
        let unit = self.open.take()?;
        let elapsed = self.clock.now().saturating_sub(unit.start_time);
        Some(CompletedUnit {
            identifier: unit.identifier,
            duration_secs: elapsed.as_secs(),
        })
    }
}

impl Default for TimingController {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock::new()))
    }
}

impl std::fmt::Debug for TimingController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimingController")
            .field("open", &self.open)
            .finish_non_exhaustive()
    }
}
