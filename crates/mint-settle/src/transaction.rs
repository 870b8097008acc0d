//! Transaction assembly and signing.
//!
//! Transactions use the legacy ledger message format: a three-byte header,
//! the deduplicated account keys, the recent blockhash and the compiled
//! instructions. Every variable-length list is prefixed with a compact-u16
//! length.

use crate::address::{job_address, machine_address};
use crate::client::LedgerClient;
use crate::error::{MintError, Result};
use crate::instruction::{AccountMeta, Instruction, JobRecord};
use crate::keypair::{Keypair, Pubkey};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// The ledger program that accepts `record_job`.
pub const MINT_PROGRAM: Pubkey = Pubkey::new([
    53, 2, 23, 115, 26, 193, 122, 134, 214, 173, 96, 100, 127, 186, 63, 78, 156, 190, 5, 31, 213,
    164, 93, 18, 21, 86, 241, 111, 196, 158, 202, 131,
]);

/// The program's global state account.
pub const STATE_ACCOUNT: Pubkey = Pubkey::new([
    19, 235, 154, 157, 41, 191, 17, 254, 237, 230, 194, 13, 42, 33, 245, 74, 208, 171, 103, 168,
    205, 135, 204, 182, 1, 242, 23, 221, 92, 89, 200, 187,
]);

/// The system program.
pub const SYSTEM_PROGRAM: Pubkey = Pubkey::new([0; 32]);

/// Length of an Ed25519 signature.
pub const SIGNATURE_BYTES: usize = 64;

/// Recent blockhash proving a transaction was assembled recently.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Blockhash([u8; 32]);

impl Blockhash {
    /// Wrap raw bytes.
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse a base58 blockhash as returned by RPC.
    ///
    /// # Errors
    ///
    /// Returns error if the string is not 32 bytes of base58.
    pub fn from_base58(s: &str) -> Result<Self> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| MintError::rpc(format!("invalid blockhash: {e}")))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| MintError::rpc("blockhash must be 32 bytes"))?;
        Ok(Self(arr))
    }

    /// Raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Blockhash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Blockhash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Blockhash({self})")
    }
}

/// Program identities a settlement is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerProgram {
    /// Program that executes `record_job`.
    pub program_id: Pubkey,
    /// Global state account of that program.
    pub state_account: Pubkey,
}

impl Default for LedgerProgram {
    fn default() -> Self {
        Self {
            program_id: MINT_PROGRAM,
            state_account: STATE_ACCOUNT,
        }
    }
}

/// Message header counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MessageHeader {
    /// Number of signatures the transaction must carry.
    pub num_required_signatures: u8,
    /// Signed accounts that are read-only.
    pub num_readonly_signed_accounts: u8,
    /// Unsigned accounts that are read-only.
    pub num_readonly_unsigned_accounts: u8,
}

/// An instruction with accounts replaced by indices into the key list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledInstruction {
    /// Index of the program id in the key list.
    pub program_id_index: u8,
    /// Indices of the instruction's accounts.
    pub accounts: Vec<u8>,
    /// Instruction data.
    pub data: Vec<u8>,
}

/// The signed portion of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Header counts.
    pub header: MessageHeader,
    /// Unique account keys, fee payer first.
    pub account_keys: Vec<Pubkey>,
    /// Freshness token.
    pub recent_blockhash: Blockhash,
    /// Compiled instructions.
    pub instructions: Vec<CompiledInstruction>,
}

impl Message {
    /// Compile instructions into a message paid for by `payer`.
    ///
    /// Keys are ordered writable signers, read-only signers, writable
    /// non-signers, read-only non-signers. Repeated keys are merged, keeping
    /// the strongest flags.
    ///
    /// # Errors
    ///
    /// Returns error if more than 256 distinct accounts are referenced.
    pub fn new(instructions: &[Instruction], payer: &Pubkey, recent_blockhash: Blockhash) -> Result<Self> {
        let mut metas: Vec<AccountMeta> = vec![AccountMeta::writable(*payer, true)];
        let mut merge = |meta: AccountMeta| {
            if let Some(existing) = metas.iter_mut().find(|m| m.pubkey == meta.pubkey) {
                existing.is_signer |= meta.is_signer;
                existing.is_writable |= meta.is_writable;
            } else {
                metas.push(meta);
            }
        };
        for ix in instructions {
            for meta in &ix.accounts {
                merge(*meta);
            }
            merge(AccountMeta::readonly(ix.program_id, false));
        }

        metas.sort_by_key(|m| (!m.is_signer, !m.is_writable));

        let count = |f: fn(&AccountMeta) -> bool| -> Result<u8> {
            u8::try_from(metas.iter().filter(|m| f(m)).count())
                .map_err(|_| MintError::encoding("too many accounts"))
        };
        let header = MessageHeader {
            num_required_signatures: count(|m| m.is_signer)?,
            num_readonly_signed_accounts: count(|m| m.is_signer && !m.is_writable)?,
            num_readonly_unsigned_accounts: count(|m| !m.is_signer && !m.is_writable)?,
        };
        let account_keys: Vec<Pubkey> = metas.iter().map(|m| m.pubkey).collect();

        let index_of = |key: &Pubkey| -> Result<u8> {
            let pos = account_keys
                .iter()
                .position(|k| k == key)
                .ok_or_else(|| MintError::encoding(format!("account {key} missing from message")))?;
            u8::try_from(pos).map_err(|_| MintError::encoding("account index exceeds 255"))
        };
        let instructions = instructions
            .iter()
            .map(|ix| {
                Ok(CompiledInstruction {
                    program_id_index: index_of(&ix.program_id)?,
                    accounts: ix
                        .accounts
                        .iter()
                        .map(|m| index_of(&m.pubkey))
                        .collect::<Result<_>>()?,
                    data: ix.data.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            header,
            account_keys,
            recent_blockhash,
            instructions,
        })
    }

    /// The fee payer.
    #[must_use]
    pub fn payer(&self) -> Option<&Pubkey> {
        self.account_keys.first()
    }

    /// Serialize for signing and submission.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(256);
        out.push(self.header.num_required_signatures);
        out.push(self.header.num_readonly_signed_accounts);
        out.push(self.header.num_readonly_unsigned_accounts);

        encode_length(&mut out, self.account_keys.len());
        for key in &self.account_keys {
            out.extend_from_slice(key.as_bytes());
        }
        out.extend_from_slice(self.recent_blockhash.as_bytes());

        encode_length(&mut out, self.instructions.len());
        for ix in &self.instructions {
            out.push(ix.program_id_index);
            encode_length(&mut out, ix.accounts.len());
            out.extend_from_slice(&ix.accounts);
            encode_length(&mut out, ix.data.len());
            out.extend_from_slice(&ix.data);
        }
        out
    }
}

/// A signed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// Signatures, in the order of the message's signer keys.
    pub signatures: Vec<[u8; SIGNATURE_BYTES]>,
    /// The signed message.
    pub message: Message,
}

impl Transaction {
    /// Sign a single-signer message.
    ///
    /// # Errors
    ///
    /// Returns error if the message needs a signer other than `keypair` or
    /// signing fails.
    pub fn new_signed(message: Message, keypair: &Keypair) -> Result<Self> {
        if message.header.num_required_signatures != 1 || message.payer() != Some(&keypair.pubkey()) {
            return Err(MintError::Signing {
                message: "message must have the keypair as its only signer".to_string(),
            });
        }
        let signature = keypair.try_sign(&message.serialize())?;
        Ok(Self {
            signatures: vec![signature.to_bytes()],
            message,
        })
    }

    /// The transaction id: base58 of the first signature.
    #[must_use]
    pub fn signature(&self) -> Option<String> {
        self.signatures
            .first()
            .map(|s| bs58::encode(s).into_string())
    }

    /// Serialize to wire bytes.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let message = self.message.serialize();
        let mut out = Vec::with_capacity(3 + self.signatures.len() * SIGNATURE_BYTES + message.len());
        encode_length(&mut out, self.signatures.len());
        for sig in &self.signatures {
            out.extend_from_slice(sig);
        }
        out.extend_from_slice(&message);
        out
    }
}

/// Append a compact-u16 length: seven bits per byte, high bit set on all
/// but the last byte.
pub fn encode_length(out: &mut Vec<u8>, len: usize) {
    let mut rem = len;
    loop {
        let mut byte = (rem & 0x7f) as u8;
        rem >>= 7;
        if rem == 0 {
            out.push(byte);
            break;
        }
        byte |= 0x80;
        out.push(byte);
    }
}

/// Builds signed `record_job` transactions.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionBuilder {
    program: LedgerProgram,
}

impl TransactionBuilder {
    /// Create a builder targeting `program`.
    #[must_use]
    pub const fn new(program: LedgerProgram) -> Self {
        Self { program }
    }

    /// The targeted program.
    #[must_use]
    pub const fn program(&self) -> &LedgerProgram {
        &self.program
    }

    /// Build the `record_job` instruction for `caller`.
    ///
    /// The account list is fixed: state, machine, job, caller as read-only
    /// signer, caller as writable signer, system program.
    ///
    /// # Errors
    ///
    /// Returns error if address derivation or encoding fails.
    pub fn record_job_instruction(&self, record: &JobRecord, caller: &Pubkey) -> Result<Instruction> {
        let machine = machine_address(caller, &self.program.program_id)?;
        let job = job_address(&record.job_hash, &self.program.program_id)?;

        Ok(Instruction {
            program_id: self.program.program_id,
            accounts: vec![
                AccountMeta::writable(self.program.state_account, false),
                AccountMeta::writable(machine.address, false),
                AccountMeta::writable(job.address, false),
                AccountMeta::readonly(*caller, true),
                AccountMeta::writable(*caller, true),
                AccountMeta::readonly(SYSTEM_PROGRAM, false),
            ],
            data: record.encode()?,
        })
    }

    /// Build and sign a `record_job` transaction, fetching a fresh blockhash
    /// from `ledger`. Nothing is retried.
    ///
    /// # Errors
    ///
    /// Returns error if derivation, the blockhash fetch, or signing fails.
    pub fn build<L: LedgerClient + ?Sized>(
        &self,
        record: &JobRecord,
        keypair: &Keypair,
        ledger: &L,
    ) -> Result<Transaction> {
        let payer = keypair.pubkey();
        let ix = self.record_job_instruction(record, &payer)?;
        let blockhash = ledger.latest_blockhash()?;
        let message = Message::new(&[ix], &payer, blockhash)?;
        let tx = Transaction::new_signed(message, keypair)?;

        debug!(
            job_hash = %record.job_hash,
            blockhash = %blockhash,
            "record_job transaction signed"
        );
        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::SimulatedLedger;
    use crate::{MINT_PROGRAM_ID, STATE_ACCOUNT_ID, SYSTEM_PROGRAM_ID};
    use ed25519_dalek::{Signature, VerifyingKey};
    use test_case::test_case;

    const HASH: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_program_constants_match_base58() {
        assert_eq!(MINT_PROGRAM.to_base58(), MINT_PROGRAM_ID);
        assert_eq!(STATE_ACCOUNT.to_base58(), STATE_ACCOUNT_ID);
        assert_eq!(SYSTEM_PROGRAM.to_base58(), SYSTEM_PROGRAM_ID);
    }

    #[test_case(0, &[0x00]; "zero")]
    #[test_case(0x7f, &[0x7f]; "one byte max")]
    #[test_case(0x80, &[0x80, 0x01]; "two bytes min")]
    #[test_case(0x3fff, &[0xff, 0x7f]; "two bytes max")]
    #[test_case(0x4000, &[0x80, 0x80, 0x01]; "three bytes")]
    fn test_compact_length(len: usize, expected: &[u8]) {
        let mut out = Vec::new();
        encode_length(&mut out, len);
        assert_eq!(out, expected);
    }

    #[test]
    fn test_record_job_accounts_fixed_order() {
        let keypair = Keypair::generate();
        let caller = keypair.pubkey();
        let builder = TransactionBuilder::default();
        let ix = builder
            .record_job_instruction(&JobRecord::new(HASH, 10, 1000), &caller)
            .expect("instruction");

        let flags: Vec<(bool, bool)> = ix.accounts.iter().map(|m| (m.is_signer, m.is_writable)).collect();
        assert_eq!(
            flags,
            vec![
                (false, true),
                (false, true),
                (false, true),
                (true, false),
                (true, true),
                (false, false),
            ]
        );
        assert_eq!(ix.accounts[0].pubkey, STATE_ACCOUNT);
        assert_eq!(
            ix.accounts[1].pubkey,
            machine_address(&caller, &MINT_PROGRAM).expect("machine").address
        );
        assert_eq!(ix.accounts[2].pubkey, job_address(HASH, &MINT_PROGRAM).expect("job").address);
        assert_eq!(ix.accounts[3].pubkey, caller);
        assert_eq!(ix.accounts[4].pubkey, caller);
        assert_eq!(ix.accounts[5].pubkey, SYSTEM_PROGRAM);
        assert_eq!(ix.program_id, MINT_PROGRAM);
    }

    #[test]
    fn test_message_merges_caller_and_orders_keys() {
        let keypair = Keypair::generate();
        let caller = keypair.pubkey();
        let ix = TransactionBuilder::default()
            .record_job_instruction(&JobRecord::new(HASH, 10, 1000), &caller)
            .expect("instruction");
        let message = Message::new(&[ix], &caller, Blockhash::new([9; 32])).expect("compile");

        assert_eq!(message.account_keys.len(), 6);
        assert_eq!(message.account_keys[0], caller);
        assert_eq!(message.account_keys[1], STATE_ACCOUNT);
        assert_eq!(message.account_keys[4], SYSTEM_PROGRAM);
        assert_eq!(message.account_keys[5], MINT_PROGRAM);
        assert_eq!(
            message.header,
            MessageHeader {
                num_required_signatures: 1,
                num_readonly_signed_accounts: 0,
                num_readonly_unsigned_accounts: 2,
            }
        );

        let compiled = &message.instructions[0];
        assert_eq!(compiled.program_id_index, 5);
        assert_eq!(compiled.accounts, vec![1, 2, 3, 0, 0, 4]);
    }

    #[test]
    fn test_signed_transaction_verifies() {
        let keypair = Keypair::generate();
        let ledger = SimulatedLedger::new();
        let tx = TransactionBuilder::default()
            .build(&JobRecord::new(HASH, 10, 1000), &keypair, &ledger)
            .expect("build");

        let vk = VerifyingKey::from_bytes(keypair.pubkey().as_bytes()).expect("key");
        let sig = Signature::from_bytes(&tx.signatures[0]);
        assert!(vk.verify_strict(&tx.message.serialize(), &sig).is_ok());
        assert_eq!(tx.message.recent_blockhash, ledger.blockhash());
    }

    #[test]
    fn test_wire_layout() {
        let keypair = Keypair::generate();
        let ledger = SimulatedLedger::new();
        let tx = TransactionBuilder::default()
            .build(&JobRecord::new(HASH, 10, 1000), &keypair, &ledger)
            .expect("build");
        let bytes = tx.serialize();

        assert_eq!(bytes[0], 1);
        assert_eq!(&bytes[1..65], &tx.signatures[0]);
        assert_eq!(&bytes[65..68], &[1, 0, 2]);
        assert_eq!(bytes[68], 6);
        assert_eq!(&bytes[69..101], keypair.pubkey().as_bytes());
        // 1 + 64 sigs, 3 header, 1 + 6 * 32 keys, 32 blockhash,
        // 1 ix count, 1 program index, 1 + 6 accounts, 1 + 56 data
        assert_eq!(bytes.len(), 65 + 3 + 193 + 32 + 1 + 1 + 7 + 57);
    }

    #[test]
    fn test_blockhash_failure_propagates() {
        let keypair = Keypair::generate();
        let ledger = SimulatedLedger::new();
        ledger.fail_blockhash(true);
        let result = TransactionBuilder::default().build(&JobRecord::new(HASH, 10, 1000), &keypair, &ledger);
        assert!(matches!(result, Err(MintError::Network { .. })));
    }

    #[test]
    fn test_sign_rejects_foreign_payer() {
        let keypair = Keypair::generate();
        let other = Keypair::generate();
        let message = Message::new(&[], &other.pubkey(), Blockhash::default()).expect("compile");
        assert!(matches!(
            Transaction::new_signed(message, &keypair),
            Err(MintError::Signing { .. })
        ));
    }
}
