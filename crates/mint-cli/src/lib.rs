//! # mint-cli
//!
//! The `mint` command-line tool.
//!
//! Provides commands for:
//! - Running a command as one work unit and settling it (`mint run`)
//! - Showing the caller's ledger addresses (`mint address`)
//! - Writing a starter configuration (`mint init-config`)
//!
//! `mint run --dry-run` settles against an in-memory ledger, so the full
//! path from timing to signed transaction can be exercised offline.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod error;

pub use cli::{Cli, Commands, Format, RunArgs};
pub use error::CliError;
