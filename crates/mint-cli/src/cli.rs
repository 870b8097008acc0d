//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use mint_settle::SettlementConfig;

use crate::error::CliError;

/// Earn MINT for the compute your commands spend.
#[derive(Parser, Debug, Clone)]
#[command(name = "mint")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// JSON configuration file.
    #[arg(short, long, env = "MINT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Keypair file (Solana CLI format).
    #[arg(short, long, env = "MINT_KEYPAIR")]
    pub keypair: Option<PathBuf>,

    /// Ledger RPC endpoint.
    #[arg(long, env = "MINT_RPC_URL")]
    pub rpc_url: Option<String>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    pub format: Format,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// Human-readable lines.
    #[default]
    Text,
    /// JSON for scripting.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run a command as one work unit and settle it.
    Run(RunArgs),

    /// Show the caller's public key and derived machine address.
    Address,

    /// Write a default configuration file.
    InitConfig {
        /// Where to write the file.
        #[arg(short, long, default_value = "mint.json")]
        output: PathBuf,

        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

/// Arguments for `mint run`.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Complexity weight (1000 = 1.0x).
    #[arg(long)]
    pub complexity: Option<u32>,

    /// Job name recorded in the job hash.
    #[arg(long)]
    pub job_name: Option<String>,

    /// Minimum duration in seconds worth settling.
    #[arg(long)]
    pub min_duration: Option<u64>,

    /// Report settlements at debug level only.
    #[arg(short, long)]
    pub quiet: bool,

    /// Settle against an in-memory ledger instead of the network.
    #[arg(long)]
    pub dry_run: bool,

    /// Command to run, with its arguments.
    #[arg(required = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

impl Cli {
    /// Resolve the effective configuration: file values, then global flags.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be loaded or the result is invalid.
    pub fn settlement_config(&self) -> Result<SettlementConfig, CliError> {
        let mut config = match &self.config {
            Some(path) => SettlementConfig::load(path)?,
            None => SettlementConfig::default(),
        };
        if let Some(keypair) = &self.keypair {
            config.keypair_path = Some(keypair.clone());
        }
        if let Some(rpc_url) = &self.rpc_url {
            config.rpc_endpoint.clone_from(rpc_url);
        }
        if let Commands::Run(args) = &self.command {
            args.apply(&mut config);
        }
        config.validate()?;
        Ok(config)
    }
}

impl RunArgs {
    fn apply(&self, config: &mut SettlementConfig) {
        if let Some(complexity) = self.complexity {
            config.complexity = complexity;
        }
        if let Some(job_name) = &self.job_name {
            config.job_name = Some(job_name.clone());
        }
        if let Some(min_duration) = self.min_duration {
            config.min_duration_secs = min_duration;
        }
        if self.quiet {
            config.verbose = false;
        }
    }
}
