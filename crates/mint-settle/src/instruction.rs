//! The `record_job` instruction.
//!
//! Instruction data layout, integers little-endian:
//!
//! | bytes   | field                          |
//! |---------|--------------------------------|
//! | 8       | method discriminator           |
//! | 4       | job hash length `n` (`u32`)    |
//! | n       | job hash, ASCII                |
//! | 8       | duration in seconds (`u64`)    |
//! | 4       | complexity weight (`u32`)      |

use crate::error::{MintError, Result};
use crate::keypair::Pubkey;
use serde::{Deserialize, Serialize};

/// Discriminator selecting the `record_job` method.
pub const RECORD_JOB_DISCRIMINATOR: [u8; 8] = [0x36, 0x7c, 0xa8, 0x9e, 0xec, 0xed, 0x6b, 0xce];

/// One account referenced by an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountMeta {
    /// Account address.
    pub pubkey: Pubkey,
    /// Whether the transaction must carry this account's signature.
    pub is_signer: bool,
    /// Whether the instruction may modify this account.
    pub is_writable: bool,
}

impl AccountMeta {
    /// A writable account.
    #[must_use]
    pub const fn writable(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: true,
        }
    }

    /// A read-only account.
    #[must_use]
    pub const fn readonly(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: false,
        }
    }
}

/// A call into an on-chain program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// Program to invoke.
    pub program_id: Pubkey,
    /// Accounts in the order the program expects them.
    pub accounts: Vec<AccountMeta>,
    /// Encoded arguments.
    pub data: Vec<u8>,
}

/// Arguments of a `record_job` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Job identifier, 32 lowercase hex characters.
    pub job_hash: String,
    /// Measured duration in whole seconds.
    pub duration_secs: u64,
    /// Complexity weight, 1000 meaning 1.0x.
    pub complexity: u32,
}

impl JobRecord {
    /// Create a record.
    #[must_use]
    pub fn new(job_hash: impl Into<String>, duration_secs: u64, complexity: u32) -> Self {
        Self {
            job_hash: job_hash.into(),
            duration_secs,
            complexity,
        }
    }

    /// Size of the encoded instruction data.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        8 + 4 + self.job_hash.len() + 8 + 4
    }

    /// Encode the instruction data.
    ///
    /// # Errors
    ///
    /// Returns error if the job hash is not ASCII or its length does not fit
    /// the `u32` prefix. Hashes produced by [`crate::job_hash`] always pass.
    pub fn encode(&self) -> Result<Vec<u8>> {
        if !self.job_hash.is_ascii() {
            return Err(MintError::encoding("job hash must be ASCII"));
        }
        let len = u32::try_from(self.job_hash.len())
            .map_err(|_| MintError::encoding("job hash longer than u32::MAX"))?;

        let mut data = Vec::with_capacity(self.encoded_len());
        data.extend_from_slice(&RECORD_JOB_DISCRIMINATOR);
        data.extend_from_slice(&len.to_le_bytes());
        data.extend_from_slice(self.job_hash.as_bytes());
        data.extend_from_slice(&self.duration_secs.to_le_bytes());
        data.extend_from_slice(&self.complexity.to_le_bytes());
        Ok(data)
    }
}
