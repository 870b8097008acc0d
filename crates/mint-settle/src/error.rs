//! Error types for settlement operations.

use thiserror::Error;

/// Result type alias for settlement operations.
pub type Result<T> = std::result::Result<T, MintError>;

/// Errors that can occur while deriving, building, or submitting a settlement.
#[derive(Debug, Error)]
pub enum MintError {
    /// Invalid address format.
    #[error("invalid address: {message}")]
    InvalidAddress {
        /// Description of the address error.
        message: String,
    },

    /// Key material is missing or malformed.
    #[error("keypair error: {message}")]
    Keypair {
        /// Description of the keypair error.
        message: String,
    },

    /// Configuration is invalid.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// A derivation seed exceeds the maximum seed length.
    #[error("seed {index} is {len} bytes, maximum is {max}")]
    SeedTooLong {
        /// Position of the offending seed.
        index: usize,
        /// Length of the offending seed.
        len: usize,
        /// Maximum allowed seed length.
        max: usize,
    },

    /// Too many seeds were supplied for derivation.
    #[error("{count} seeds supplied, maximum is {max}")]
    TooManySeeds {
        /// Number of seeds supplied.
        count: usize,
        /// Maximum number of seeds.
        max: usize,
    },

    /// No bump in the search range produced an off-curve address.
    #[error("no viable bump seed found")]
    NoViableBump,

    /// Instruction data could not be encoded.
    #[error("encoding error: {message}")]
    Encoding {
        /// Description of the encoding error.
        message: String,
    },

    /// Signing failed.
    #[error("signing error: {message}")]
    Signing {
        /// Description of the signing error.
        message: String,
    },

    /// Network error talking to the ledger.
    #[error("network error: {message}")]
    Network {
        /// Description of the network error.
        message: String,
    },

    /// The ledger RPC endpoint rejected a request.
    #[error("RPC error: {message}")]
    Rpc {
        /// RPC error message.
        message: String,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MintError {
    /// Create an invalid address error.
    #[must_use]
    pub fn invalid_address(message: impl Into<String>) -> Self {
        Self::InvalidAddress {
            message: message.into(),
        }
    }

    /// Create a keypair error.
    #[must_use]
    pub fn keypair(message: impl Into<String>) -> Self {
        Self::Keypair {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an encoding error.
    #[must_use]
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    /// Create a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create an RPC error.
    #[must_use]
    pub fn rpc(message: impl Into<String>) -> Self {
        Self::Rpc {
            message: message.into(),
        }
    }

    /// Whether this error came from talking to the ledger rather than from
    /// local configuration or encoding.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Rpc { .. } | Self::Signing { .. })
    }
}
