//! Host-framework adapters.
//!
//! Agent frameworks expose lifecycle events under their own names. The
//! adapters here translate two common shapes onto [`WorkLifecycle`]:
//!
//! - [`CallbackAdapter`] for callback handlers that receive run ids and
//!   parent run ids for every chain and agent event.
//! - [`MiddlewareAdapter`] for middleware wrapped around a whole agent
//!   invocation.
//!
//! [`run_work_unit`] brackets a plain closure.

use crate::client::LedgerClient;
use crate::engine::{SettlementEngine, SettlementResult};
use uuid::Uuid;

/// Entry points a host framework drives.
pub trait WorkLifecycle {
    /// A unit of work began. Returns whether a new unit was opened.
    fn on_work_start(&mut self, identifier: &str) -> bool;

    /// The unit finished normally.
    fn on_work_end(&mut self) -> SettlementResult;

    /// The unit failed. Settles like [`WorkLifecycle::on_work_end`].
    fn on_work_error(&mut self) -> SettlementResult;
}

impl<L: LedgerClient> WorkLifecycle for SettlementEngine<L> {
    fn on_work_start(&mut self, identifier: &str) -> bool {
        Self::on_work_start(self, identifier)
    }

    fn on_work_end(&mut self) -> SettlementResult {
        Self::on_work_end(self)
    }

    fn on_work_error(&mut self) -> SettlementResult {
        Self::on_work_error(self)
    }
}

/// Adapter for callback-style hooks.
///
/// Only top-level chains (no parent run) open and settle units. Agent
/// actions open a unit when none is open; agent finish settles whatever is
/// open.
#[derive(Debug)]
pub struct CallbackAdapter<W> {
    inner: W,
}

impl<W: WorkLifecycle> CallbackAdapter<W> {
    /// Wrap a lifecycle.
    pub const fn new(inner: W) -> Self {
        Self { inner }
    }

    /// The wrapped lifecycle.
    pub const fn inner(&self) -> &W {
        &self.inner
    }

    /// Unwrap.
    pub fn into_inner(self) -> W {
        self.inner
    }

    /// A chain started.
    pub fn on_chain_start(&mut self, run_id: Uuid, parent_run_id: Option<Uuid>) {
        if parent_run_id.is_none() {
            self.inner.on_work_start(&run_id.to_string());
        }
    }

    /// A chain finished. Settles top-level chains.
    pub fn on_chain_end(&mut self, _run_id: Uuid, parent_run_id: Option<Uuid>) -> Option<SettlementResult> {
        parent_run_id.is_none().then(|| self.inner.on_work_end())
    }

    /// A chain failed. Settles top-level chains, since the work was done.
    pub fn on_chain_error(&mut self, _run_id: Uuid, parent_run_id: Option<Uuid>) -> Option<SettlementResult> {
        parent_run_id.is_none().then(|| self.inner.on_work_error())
    }

    /// An agent took an action. Opens a unit if none is open.
    pub fn on_agent_action(&mut self, run_id: Uuid) {
        self.inner.on_work_start(&run_id.to_string());
    }

    /// An agent finished.
    pub fn on_agent_finish(&mut self, _run_id: Uuid) -> SettlementResult {
        self.inner.on_work_end()
    }
}

/// Adapter for middleware-style hooks around a whole agent invocation.
#[derive(Debug)]
pub struct MiddlewareAdapter<W> {
    inner: W,
    last: Option<SettlementResult>,
}

impl<W: WorkLifecycle> MiddlewareAdapter<W> {
    /// Wrap a lifecycle.
    pub const fn new(inner: W) -> Self {
        Self { inner, last: None }
    }

    /// The wrapped lifecycle.
    pub const fn inner(&self) -> &W {
        &self.inner
    }

    /// Result of the most recent `after_agent`.
    pub const fn last_result(&self) -> Option<&SettlementResult> {
        self.last.as_ref()
    }

    /// Called before the agent runs. Opens a unit and passes the input through.
    pub fn before_agent<T>(&mut self, input: T) -> T {
        self.inner.on_work_start(&Uuid::new_v4().to_string());
        input
    }

    /// Called after the agent runs. Settles and passes the output through.
    pub fn after_agent<T>(&mut self, output: T) -> T {
        self.last = Some(self.inner.on_work_end());
        output
    }
}

/// Run `f` as one work unit, settling on `Ok` as a normal completion and on
/// `Err` as an error completion. The closure's result is returned untouched.
pub fn run_work_unit<W, T, E, F>(lifecycle: &mut W, identifier: &str, f: F) -> (Result<T, E>, SettlementResult)
where
    W: WorkLifecycle + ?Sized,
    F: FnOnce() -> Result<T, E>,
{
    lifecycle.on_work_start(identifier);
    let outcome = f();
    let settlement = match outcome {
        Ok(_) => lifecycle.on_work_end(),
        Err(_) => lifecycle.on_work_error(),
    };
    (outcome, settlement)
}
