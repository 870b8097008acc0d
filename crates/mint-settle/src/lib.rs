//! # mint-settle
//!
//! Proof-of-work settlement for autonomous task runners.
//!
//! A host framework brackets each unit of work with start and end hooks. When
//! a unit ends, its wall-clock duration is recorded on the ledger through a
//! single `record_job` transaction, earning MINT in proportion to duration and
//! a complexity weight.
//!
//! This crate provides:
//! - Keypair loading and ledger addresses ([`keypair`])
//! - Program-derived machine and job addresses ([`address`])
//! - Job identifiers ([`job_hash`])
//! - The `record_job` wire encoding ([`instruction`])
//! - Transaction compilation and signing ([`transaction`])
//! - JSON-RPC and simulated ledger clients ([`client`])
//! - Work-unit timing ([`timing`]) and the settlement engine ([`engine`])
//! - Adapters for callback- and middleware-style hooks ([`hooks`])
//!
//! ## Example
//!
//! ```rust,no_run
//! use mint_settle::{SettlementConfig, SettlementEngine};
//!
//! # fn example() -> mint_settle::Result<()> {
//! let config = SettlementConfig {
//!     keypair_path: Some("~/.config/solana/id.json".into()),
//!     ..Default::default()
//! };
//! let mut engine = SettlementEngine::from_config(&config)?;
//!
//! engine.on_work_start("run-42");
//! // ... the agent does its work ...
//! let result = engine.on_work_end();
//! if let Some(url) = result.explorer_url() {
//!     println!("settled {}: {url}", result.estimated_reward);
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod address;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod hooks;
pub mod instruction;
pub mod job_hash;
pub mod keypair;
pub mod reward;
pub mod timing;
pub mod transaction;

pub use address::{job_address, machine_address, DerivedAddress};
pub use client::{LedgerClient, RpcLedgerClient, SimulatedLedger};
pub use config::SettlementConfig;
pub use engine::{Completion, SettlementEngine, SettlementOutcome, SettlementResult};
pub use error::{MintError, Result};
pub use hooks::{run_work_unit, CallbackAdapter, MiddlewareAdapter, WorkLifecycle};
pub use instruction::JobRecord;
pub use keypair::{Keypair, Pubkey};
pub use reward::Reward;
pub use timing::{Clock, ManualClock, SystemClock, TimerState, TimingController};
pub use transaction::{LedgerProgram, Transaction, TransactionBuilder};

/// Ledger program that accepts `record_job`.
pub const MINT_PROGRAM_ID: &str = "4ZvTZ3skfeMF3ZGyABoazPa9tiudw2QSwuVKn45t2AKL";

/// Global state account of the ledger program.
pub const STATE_ACCOUNT_ID: &str = "2Lm7hrtqK9W5tykVu4U37nUNJiiFh6WQ1rD8ZJWXomr2";

/// System program.
pub const SYSTEM_PROGRAM_ID: &str = "11111111111111111111111111111111";
