//! Key material for the settling machine.
//!
//! Keypairs are Ed25519 and use the same on-disk layout as the Solana CLI:
//! a JSON array of 64 bytes, secret half first.

use crate::error::{MintError, Result};
use ed25519_dalek::{Signature, Signer, SigningKey};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Length of a public key in bytes.
pub const PUBKEY_BYTES: usize = 32;

/// Length of a serialized keypair (`secret || public`).
pub const KEYPAIR_BYTES: usize = 64;

/// A 32-byte ledger address, displayed as base58.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Pubkey([u8; PUBKEY_BYTES]);

impl Pubkey {
    /// Wrap raw bytes.
    #[must_use]
    pub const fn new(bytes: [u8; PUBKEY_BYTES]) -> Self {
        Self(bytes)
    }

    /// Create a pubkey from a byte slice.
    ///
    /// # Errors
    ///
    /// Returns error if the slice is not 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; PUBKEY_BYTES] = bytes.try_into().map_err(|_| {
            MintError::invalid_address(format!(
                "address must be {PUBKEY_BYTES} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    /// Parse a base58-encoded address.
    ///
    /// # Errors
    ///
    /// Returns error if the string is not valid base58 or decodes to the wrong length.
    pub fn from_base58(s: &str) -> Result<Self> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| MintError::invalid_address(format!("invalid base58: {e}")))?;
        Self::from_slice(&bytes)
    }

    /// Raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; PUBKEY_BYTES] {
        &self.0
    }

    /// Base58 representation.
    #[must_use]
    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }
}

impl AsRef<[u8]> for Pubkey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pubkey({})", self.to_base58())
    }
}

impl FromStr for Pubkey {
    type Err = MintError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_base58(s)
    }
}

impl Serialize for Pubkey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base58())
    }
}

impl<'de> Deserialize<'de> for Pubkey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_base58(&s).map_err(serde::de::Error::custom)
    }
}

/// The caller's signing keypair.
pub struct Keypair {
    signing_key: SigningKey,
    pubkey: Pubkey,
}

impl Keypair {
    /// Generate a new random keypair from the OS CSPRNG.
    #[must_use]
    pub fn generate() -> Self {
        let mut secret = [0u8; 32];
        OsRng.fill_bytes(&mut secret);
        Self::from_signing_key(SigningKey::from_bytes(&secret))
    }

    /// Create a keypair from a 32-byte secret seed.
    ///
    /// # Errors
    ///
    /// Returns error if the secret is not 32 bytes.
    pub fn from_secret(secret: &[u8]) -> Result<Self> {
        let secret: [u8; 32] = secret.try_into().map_err(|_| {
            MintError::keypair(format!("secret key must be 32 bytes, got {}", secret.len()))
        })?;
        Ok(Self::from_signing_key(SigningKey::from_bytes(&secret)))
    }

    /// Create a keypair from the 64-byte `secret || public` layout.
    ///
    /// # Errors
    ///
    /// Returns error if the length is wrong or the public half does not
    /// belong to the secret half.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KEYPAIR_BYTES {
            return Err(MintError::keypair(format!(
                "keypair must be {KEYPAIR_BYTES} bytes, got {}",
                bytes.len()
            )));
        }

        let keypair = Self::from_secret(&bytes[..32])?;
        if keypair.pubkey.as_bytes()[..] != bytes[32..] {
            return Err(MintError::keypair("public key does not match secret key"));
        }
        Ok(keypair)
    }

    /// Load a keypair from a Solana CLI JSON file. A leading `~` is expanded
    /// to the home directory.
    ///
    /// # Errors
    ///
    /// Returns error if the file is missing, is not a JSON byte array, or
    /// holds an invalid keypair.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = expand_home(path.as_ref());
        let contents = std::fs::read_to_string(&path).map_err(|e| {
            MintError::keypair(format!("failed to read '{}': {e}", path.display()))
        })?;
        let bytes: Vec<u8> = serde_json::from_str(&contents)?;
        Self::from_bytes(&bytes)
    }

    /// Write the keypair in Solana CLI JSON format.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string(&self.to_bytes().to_vec())?;
        std::fs::write(path, json)?;
        Ok(())
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let pubkey = Pubkey::new(signing_key.verifying_key().to_bytes());
        Self { signing_key, pubkey }
    }

    /// The public key.
    #[must_use]
    pub const fn pubkey(&self) -> Pubkey {
        self.pubkey
    }

    /// Serialize as `secret || public`.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; KEYPAIR_BYTES] {
        self.signing_key.to_keypair_bytes()
    }

    /// Sign a message.
    #[must_use]
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }

    /// Sign a message, reporting failure instead of panicking.
    ///
    /// # Errors
    ///
    /// Returns error if the signer rejects the message.
    pub fn try_sign(&self, message: &[u8]) -> Result<Signature> {
        self.signing_key
            .try_sign(message)
            .map_err(|e| MintError::Signing {
                message: e.to_string(),
            })
    }
}

#[allow(clippy::missing_fields_in_debug)]
impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("pubkey", &self.pubkey)
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

fn expand_home(path: &Path) -> std::path::PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}
