//! Settlement configuration.

use crate::client::DEFAULT_RPC_ENDPOINT;
use crate::error::{MintError, Result};
use crate::keypair::Pubkey;
use crate::reward::REFERENCE_COMPLEXITY;
use crate::transaction::{LedgerProgram, MINT_PROGRAM, STATE_ACCOUNT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Options controlling how work units are settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlementConfig {
    /// Ledger RPC endpoint.
    pub rpc_endpoint: String,
    /// Keypair file in Solana CLI format.
    pub keypair_path: Option<PathBuf>,
    /// Complexity weight, 1000 meaning 1.0x.
    pub complexity: u32,
    /// Fixed job name. Derived from the work-unit identifier when unset.
    pub job_name: Option<String>,
    /// Units shorter than this are not settled.
    pub min_duration_secs: u64,
    /// Report settlements at info level rather than debug.
    pub verbose: bool,
    /// Per-request timeout of the RPC client.
    pub rpc_timeout_secs: u64,
    /// Program executing `record_job`.
    pub program_id: Pubkey,
    /// Global state account of the program.
    pub state_account: Pubkey,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            rpc_endpoint: DEFAULT_RPC_ENDPOINT.to_string(),
            keypair_path: None,
            complexity: REFERENCE_COMPLEXITY,
            job_name: None,
            min_duration_secs: 1,
            verbose: true,
            rpc_timeout_secs: 30,
            program_id: MINT_PROGRAM,
            state_account: STATE_ACCOUNT,
        }
    }
}

impl SettlementConfig {
    /// Load and validate a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, parsed, or fails validation.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            MintError::config(format!("failed to read config file '{}': {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| MintError::config(format!("invalid config '{}': {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns error describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.rpc_endpoint.trim().is_empty() {
            return Err(MintError::config("rpc_endpoint cannot be empty"));
        }
        if self.complexity == 0 {
            return Err(MintError::config("complexity must be positive"));
        }
        if self.rpc_timeout_secs == 0 {
            return Err(MintError::config("rpc_timeout_secs must be positive"));
        }
        if self.job_name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(MintError::config("job_name cannot be blank"));
        }
        Ok(())
    }

    /// RPC timeout as a [`Duration`].
    #[must_use]
    pub const fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    /// Program identities to settle against.
    #[must_use]
    pub const fn ledger_program(&self) -> LedgerProgram {
        LedgerProgram {
            program_id: self.program_id,
            state_account: self.state_account,
        }
    }
}
