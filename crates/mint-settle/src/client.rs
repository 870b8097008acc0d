//! Ledger clients.
//!
//! The settlement core only needs two round-trips: fetch a recent blockhash
//! and submit a signed transaction. [`RpcLedgerClient`] performs them over
//! JSON-RPC; [`SimulatedLedger`] keeps everything in memory for tests and dry
//! runs.

use crate::error::{MintError, Result};
use crate::transaction::{Blockhash, SIGNATURE_BYTES};
use base64::Engine as _;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// Mainnet RPC endpoint.
pub const DEFAULT_RPC_ENDPOINT: &str = "https://api.mainnet-beta.solana.com";

/// Block explorer link for a transaction signature.
#[must_use]
pub fn explorer_url(signature: &str) -> String {
    format!("https://solscan.io/tx/{signature}")
}

/// Blocking access to the ledger.
pub trait LedgerClient {
    /// Fetch a recent blockhash to stamp a transaction with.
    ///
    /// # Errors
    ///
    /// Returns error if the ledger cannot be reached or rejects the request.
    fn latest_blockhash(&self) -> Result<Blockhash>;

    /// Submit a signed, serialized transaction and return its signature.
    ///
    /// # Errors
    ///
    /// Returns error if the ledger cannot be reached or rejects the transaction.
    fn send_transaction(&self, tx: &[u8]) -> Result<String>;
}

impl<L: LedgerClient + ?Sized> LedgerClient for &L {
    fn latest_blockhash(&self) -> Result<Blockhash> {
        (**self).latest_blockhash()
    }

    fn send_transaction(&self, tx: &[u8]) -> Result<String> {
        (**self).send_transaction(tx)
    }
}

impl<L: LedgerClient + ?Sized> LedgerClient for Box<L> {
    fn latest_blockhash(&self) -> Result<Blockhash> {
        (**self).latest_blockhash()
    }

    fn send_transaction(&self, tx: &[u8]) -> Result<String> {
        (**self).send_transaction(tx)
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct BlockhashValue {
    blockhash: String,
}

#[derive(Debug, Deserialize)]
struct Contextual<T> {
    value: T,
}

/// JSON-RPC ledger client.
pub struct RpcLedgerClient {
    endpoint: String,
    http: reqwest::blocking::Client,
}

impl RpcLedgerClient {
    /// Create a client for `endpoint` with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be constructed.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MintError::network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            endpoint: endpoint.into(),
            http,
        })
    }

    /// The RPC endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn call(&self, method: &str, params: Value) -> Result<Value> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        debug!(endpoint = %self.endpoint, method, "rpc request");
        let response: RpcResponse = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|e| MintError::network(format!("{method}: {e}")))?
            .json()
            .map_err(|e| MintError::network(format!("{method}: invalid response: {e}")))?;

        if let Some(err) = response.error {
            return Err(MintError::rpc(format!("{method} failed ({}): {}", err.code, err.message)));
        }
        response
            .result
            .ok_or_else(|| MintError::rpc(format!("{method}: response has no result")))
    }
}

impl LedgerClient for RpcLedgerClient {
    fn latest_blockhash(&self) -> Result<Blockhash> {
        let result = self.call("getLatestBlockhash", json!([{ "commitment": "finalized" }]))?;
        let parsed: Contextual<BlockhashValue> = serde_json::from_value(result)?;
        Blockhash::from_base58(&parsed.value.blockhash)
    }

    fn send_transaction(&self, tx: &[u8]) -> Result<String> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(tx);
        let result = self.call(
            "sendTransaction",
            json!([encoded, { "encoding": "base64", "preflightCommitment": "confirmed" }]),
        )?;
        match result {
            Value::String(signature) => Ok(signature),
            other => Err(MintError::rpc(format!("sendTransaction: unexpected result {other}"))),
        }
    }
}

impl std::fmt::Debug for RpcLedgerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcLedgerClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
struct SimulatedState {
    submitted: Vec<Vec<u8>>,
    blockhash_requests: usize,
    fail_blockhash: bool,
    fail_submit: bool,
}

/// In-memory ledger that accepts every well-formed transaction.
#[derive(Debug, Default)]
pub struct SimulatedLedger {
    blockhash: Blockhash,
    state: Mutex<SimulatedState>,
}

impl SimulatedLedger {
    /// Create a ledger with a fixed blockhash.
    #[must_use]
    pub fn new() -> Self {
        Self::with_blockhash(Blockhash::new([7; 32]))
    }

    /// Create a ledger that hands out `blockhash`.
    #[must_use]
    pub fn with_blockhash(blockhash: Blockhash) -> Self {
        Self {
            blockhash,
            state: Mutex::new(SimulatedState::default()),
        }
    }

    /// The blockhash this ledger hands out.
    #[must_use]
    pub const fn blockhash(&self) -> Blockhash {
        self.blockhash
    }

    /// Make blockhash fetches fail with a network error.
    pub fn fail_blockhash(&self, fail: bool) {
        self.state.lock().fail_blockhash = fail;
    }

    /// Make submissions fail with an RPC error.
    pub fn fail_submissions(&self, fail: bool) {
        self.state.lock().fail_submit = fail;
    }

    /// Every transaction submitted so far, in order, including rejected ones.
    #[must_use]
    pub fn submissions(&self) -> Vec<Vec<u8>> {
        self.state.lock().submitted.clone()
    }

    /// Number of submission attempts.
    #[must_use]
    pub fn submission_count(&self) -> usize {
        self.state.lock().submitted.len()
    }

    /// Number of blockhash fetches.
    #[must_use]
    pub fn blockhash_requests(&self) -> usize {
        self.state.lock().blockhash_requests
    }
}

impl LedgerClient for SimulatedLedger {
    fn latest_blockhash(&self) -> Result<Blockhash> {
        let mut state = self.state.lock();
        state.blockhash_requests += 1;
        if state.fail_blockhash {
            return Err(MintError::network("simulated blockhash fetch failure"));
        }
        Ok(self.blockhash)
    }

    fn send_transaction(&self, tx: &[u8]) -> Result<String> {
        let mut state = self.state.lock();
        state.submitted.push(tx.to_vec());
        if state.fail_submit {
            return Err(MintError::rpc("simulated submission failure"));
        }
        // Wire layout: compact-u16 signature count, then the first signature.
        match tx.get(1..=SIGNATURE_BYTES) {
            Some(sig) if tx.first().is_some_and(|&n| n > 0) => Ok(bs58::encode(sig).into_string()),
            _ => Err(MintError::rpc("transaction carries no signature")),
        }
    }
}
