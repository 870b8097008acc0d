//! Settlement engine.
//!
//! The engine owns the caller's keypair, a ledger client and one
//! [`TimingController`]. When a work unit ends it measures the unit, applies
//! the minimum-duration policy, and submits a single `record_job`
//! transaction. Failures become a [`SettlementOutcome::Failed`] result and
//! never reach the host's work loop.
//!
//! One engine tracks one unit at a time. Hosts running units concurrently
//! need one engine per unit.

use crate::client::{explorer_url, LedgerClient, RpcLedgerClient};
use crate::config::SettlementConfig;
use crate::error::{MintError, Result};
use crate::instruction::JobRecord;
use crate::job_hash::job_hash;
use crate::keypair::{Keypair, Pubkey};
use crate::reward::Reward;
use crate::timing::{Clock, CompletedUnit, TimerState, TimingController};
use crate::transaction::TransactionBuilder;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

macro_rules! report {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            tracing::info!($($arg)+);
        } else {
            tracing::debug!($($arg)+);
        }
    };
}

/// How the host's work unit finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Completion {
    /// The work finished normally.
    Succeeded,
    /// The work raised an error. Compute was still spent, so it still settles.
    Errored,
}

impl Completion {
    /// Status mark used in reports.
    #[must_use]
    pub const fn mark(&self) -> &'static str {
        match self {
            Self::Succeeded => "✓",
            Self::Errored => "⚠",
        }
    }
}

/// What happened to a work unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SettlementOutcome {
    /// No unit was open; nothing to settle.
    Idle,
    /// The unit was shorter than the configured minimum.
    Skipped {
        /// Minimum duration in force.
        min_duration_secs: u64,
    },
    /// The ledger accepted the transaction.
    Settled {
        /// Transaction signature.
        signature: String,
    },
    /// Building or submitting the transaction failed.
    Failed {
        /// Error description.
        error: String,
    },
}

/// Report of one settlement attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementResult {
    /// Outcome.
    pub outcome: SettlementOutcome,
    /// How the work unit finished.
    pub completion: Completion,
    /// Identifier of the unit, when one was open.
    pub identifier: Option<String>,
    /// Measured duration in whole seconds.
    pub duration_secs: u64,
    /// Job hash, when a transaction was built.
    pub job_hash: Option<String>,
    /// Advisory reward for the unit, zero unless a submission was attempted.
    pub estimated_reward: Reward,
}

impl SettlementResult {
    fn idle(completion: Completion) -> Self {
        Self {
            outcome: SettlementOutcome::Idle,
            completion,
            identifier: None,
            duration_secs: 0,
            job_hash: None,
            estimated_reward: Reward::ZERO,
        }
    }

    /// Whether the ledger accepted the record.
    #[must_use]
    pub const fn accepted(&self) -> bool {
        matches!(self.outcome, SettlementOutcome::Settled { .. })
    }

    /// Transaction signature on success.
    #[must_use]
    pub fn signature(&self) -> Option<&str> {
        match &self.outcome {
            SettlementOutcome::Settled { signature } => Some(signature),
            _ => None,
        }
    }

    /// Error description on failure.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            SettlementOutcome::Failed { error } => Some(error),
            _ => None,
        }
    }

    /// Explorer link on success.
    #[must_use]
    pub fn explorer_url(&self) -> Option<String> {
        self.signature().map(explorer_url)
    }
}

/// Measures work units and settles them on the ledger.
pub struct SettlementEngine<L> {
    keypair: Keypair,
    ledger: L,
    builder: TransactionBuilder,
    timer: TimingController,
    complexity: u32,
    job_name: Option<String>,
    min_duration_secs: u64,
    verbose: bool,
}

impl SettlementEngine<RpcLedgerClient> {
    /// Build an engine from configuration, loading the keypair file and
    /// connecting an RPC client.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid or no usable keypair is
    /// configured.
    pub fn from_config(config: &SettlementConfig) -> Result<Self> {
        let path = config
            .keypair_path
            .as_ref()
            .ok_or_else(|| MintError::keypair("no keypair configured"))?;
        let keypair = Keypair::from_file(path)?;
        let ledger = RpcLedgerClient::new(&config.rpc_endpoint, config.rpc_timeout())?;
        Self::new(keypair, ledger, config)
    }
}

impl<L: LedgerClient> SettlementEngine<L> {
    /// Create an engine. The configuration is validated; `keypair_path`,
    /// `rpc_endpoint` and `rpc_timeout_secs` are ignored since the key and
    /// client are supplied directly.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid.
    pub fn new(keypair: Keypair, ledger: L, config: &SettlementConfig) -> Result<Self> {
        config.validate()?;

        report!(config.verbose, pubkey = %keypair.pubkey(), "settlement engine initialized");
        Ok(Self {
            keypair,
            ledger,
            builder: TransactionBuilder::new(config.ledger_program()),
            timer: TimingController::default(),
            complexity: config.complexity,
            job_name: config.job_name.clone(),
            min_duration_secs: config.min_duration_secs,
            verbose: config.verbose,
        })
    }

    /// Replace the clock. Any open unit is discarded.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.timer = TimingController::new(clock);
        self
    }

    /// The caller's public key.
    #[must_use]
    pub const fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    /// The ledger client.
    #[must_use]
    pub const fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Whether a unit is open.
    #[must_use]
    pub const fn timer_state(&self) -> TimerState {
        self.timer.state()
    }

    /// Open a work unit. Ignored, returning `false`, if one is already open.
    pub fn on_work_start(&mut self, identifier: &str) -> bool {
        let started = self.timer.start(identifier);
        if started {
            report!(self.verbose, identifier, "work started");
        }
        started
    }

    /// Close the open unit after normal completion and settle it.
    pub fn on_work_end(&mut self) -> SettlementResult {
        self.finish(Completion::Succeeded)
    }

    /// Close the open unit after a failed execution and settle it anyway.
    pub fn on_work_error(&mut self) -> SettlementResult {
        self.finish(Completion::Errored)
    }

    fn finish(&mut self, completion: Completion) -> SettlementResult {
        match self.timer.stop() {
            Some(unit) => self.settle(unit, completion),
            None => SettlementResult::idle(completion),
        }
    }

    fn settle(&self, unit: CompletedUnit, completion: Completion) -> SettlementResult {
        let CompletedUnit {
            identifier,
            duration_secs,
        } = unit;

        if duration_secs < self.min_duration_secs {
            report!(
                self.verbose,
                duration_secs,
                min_duration_secs = self.min_duration_secs,
                "skipping settlement, unit below minimum duration"
            );
            return SettlementResult {
                outcome: SettlementOutcome::Skipped {
                    min_duration_secs: self.min_duration_secs,
                },
                completion,
                identifier: Some(identifier),
                duration_secs,
                job_hash: None,
                estimated_reward: Reward::ZERO,
            };
        }

        let name = self.job_name_for(&identifier);
        let record = JobRecord::new(job_hash(&name, duration_secs), duration_secs, self.complexity);
        let estimated_reward = Reward::estimate(duration_secs, self.complexity);

        let outcome = match self.submit(&record) {
            Ok(signature) => {
                report!(
                    self.verbose,
                    status = completion.mark(),
                    reward = %estimated_reward,
                    duration_secs,
                    signature = %signature,
                    explorer = %explorer_url(&signature),
                    "settled"
                );
                SettlementOutcome::Settled { signature }
            }
            Err(e) => {
                warn!(
                    error = %e,
                    job_hash = %record.job_hash,
                    duration_secs,
                    "settlement failed"
                );
                SettlementOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };

        SettlementResult {
            outcome,
            completion,
            identifier: Some(identifier),
            duration_secs,
            job_hash: Some(record.job_hash),
            estimated_reward,
        }
    }

    fn submit(&self, record: &JobRecord) -> Result<String> {
        let tx = self.builder.build(record, &self.keypair, &self.ledger)?;
        self.ledger.send_transaction(&tx.serialize())
    }

    fn job_name_for(&self, identifier: &str) -> String {
        self.job_name.clone().unwrap_or_else(|| {
            let short: String = identifier.chars().take(8).collect();
            format!("agent-{short}")
        })
    }
}

impl<L> std::fmt::Debug for SettlementEngine<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettlementEngine")
            .field("pubkey", &self.keypair.pubkey())
            .field("program", self.builder.program())
            .field("complexity", &self.complexity)
            .field("min_duration_secs", &self.min_duration_secs)
            .field("timer", &self.timer)
            .finish_non_exhaustive()
    }
}
