//! Program-derived addresses.
//!
//! An address derived here is a SHA-256 digest of the seeds, a bump byte,
//! the owning program id and a fixed marker. Only digests that do not
//! decompress to an Ed25519 point are accepted, so no private key can ever
//! sign for them.

use crate::error::{MintError, Result};
use crate::keypair::Pubkey;
use curve25519_dalek::edwards::CompressedEdwardsY;
use sha2::{Digest, Sha256};

/// Maximum length of a single seed.
pub const MAX_SEED_LEN: usize = 32;

/// Maximum number of seeds, including the bump.
pub const MAX_SEEDS: usize = 16;

/// Seed prefix for the per-machine account.
pub const MACHINE_SEED: &[u8] = b"machine";

/// Seed prefix for the per-job account.
pub const JOB_SEED: &[u8] = b"job";

const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// An address derived from seeds, with the bump that made it off-curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedAddress {
    /// The derived address.
    pub address: Pubkey,
    /// The bump byte appended to the seeds.
    pub bump: u8,
}

/// Whether the bytes decode to a point on the Ed25519 curve.
#[must_use]
pub fn is_on_curve(bytes: &[u8; 32]) -> bool {
    CompressedEdwardsY(*bytes).decompress().is_some()
}

/// Compute the address for an exact seed list (bump included).
///
/// # Errors
///
/// Returns error if a seed is too long, there are too many seeds, or the
/// resulting digest lies on the curve.
pub fn create_program_address(seeds: &[&[u8]], program_id: &Pubkey) -> Result<Pubkey> {
    if seeds.len() > MAX_SEEDS {
        return Err(MintError::TooManySeeds {
            count: seeds.len(),
            max: MAX_SEEDS,
        });
    }
    check_seed_lengths(seeds)?;

    let mut hasher = Sha256::new();
    for seed in seeds {
        hasher.update(seed);
    }
    hasher.update(program_id.as_bytes());
    hasher.update(PDA_MARKER);
    let digest: [u8; 32] = hasher.finalize().into();

    if is_on_curve(&digest) {
        return Err(MintError::invalid_address("derived address is on curve"));
    }
    Ok(Pubkey::new(digest))
}

/// Find the first off-curve address for the seeds, trying bumps from 255 down.
///
/// # Errors
///
/// Returns error if the seeds are malformed or no bump yields an off-curve
/// address.
pub fn find_program_address(seeds: &[&[u8]], program_id: &Pubkey) -> Result<DerivedAddress> {
    if seeds.len() >= MAX_SEEDS {
        return Err(MintError::TooManySeeds {
            count: seeds.len() + 1,
            max: MAX_SEEDS,
        });
    }
    check_seed_lengths(seeds)?;

    for bump in (0..=u8::MAX).rev() {
        let bump_seed = [bump];
        let mut with_bump: Vec<&[u8]> = Vec::with_capacity(seeds.len() + 1);
        with_bump.extend_from_slice(seeds);
        with_bump.push(&bump_seed);

        match create_program_address(&with_bump, program_id) {
            Ok(address) => return Ok(DerivedAddress { address, bump }),
            Err(MintError::InvalidAddress { .. }) => {}
            Err(e) => return Err(e),
        }
    }
    Err(MintError::NoViableBump)
}

/// Address of the account tracking a machine's settled work.
///
/// # Errors
///
/// Returns error if derivation fails.
pub fn machine_address(caller: &Pubkey, program_id: &Pubkey) -> Result<DerivedAddress> {
    find_program_address(&[MACHINE_SEED, caller.as_bytes()], program_id)
}

/// Address of the account recording one job.
///
/// # Errors
///
/// Returns error if the job hash is longer than a seed or no bump works.
pub fn job_address(job_hash: &str, program_id: &Pubkey) -> Result<DerivedAddress> {
    find_program_address(&[JOB_SEED, job_hash.as_bytes()], program_id)
}

fn check_seed_lengths(seeds: &[&[u8]]) -> Result<()> {
    for (index, seed) in seeds.iter().enumerate() {
        if seed.len() > MAX_SEED_LEN {
            return Err(MintError::SeedTooLong {
                index,
                len: seed.len(),
                max: MAX_SEED_LEN,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypair::Keypair;
    use crate::MINT_PROGRAM_ID;
    use proptest::prelude::*;

    fn program() -> Pubkey {
        Pubkey::from_base58(MINT_PROGRAM_ID).expect("valid program id")
    }

    #[test]
    fn test_machine_address_is_deterministic() {
        let caller = Keypair::generate().pubkey();
        let a = machine_address(&caller, &program()).expect("derive");
        let b = machine_address(&caller, &program()).expect("derive");
        assert_eq!(a, b);
    }

    #[test]
    fn test_derived_address_is_off_curve() {
        let derived = job_address("0123456789abcdef0123456789abcdef", &program()).expect("derive");
        assert!(!is_on_curve(derived.address.as_bytes()));
    }

    #[test]
    fn test_bump_reproduces_address() {
        let caller = Keypair::generate().pubkey();
        let derived = machine_address(&caller, &program()).expect("derive");
        let recreated = create_program_address(
            &[MACHINE_SEED, caller.as_bytes(), &[derived.bump]],
            &program(),
        )
        .expect("recreate");
        assert_eq!(recreated, derived.address);
    }

    #[test]
    fn test_program_id_changes_address() {
        let caller = Keypair::generate().pubkey();
        let other = Keypair::generate().pubkey();
        let a = machine_address(&caller, &program()).expect("derive");
        let b = machine_address(&caller, &other).expect("derive");
        assert_ne!(a.address, b.address);
    }

    #[test]
    fn test_machine_and_job_namespaces_differ() {
        let hash = "0123456789abcdef0123456789abcdef";
        let as_job = find_program_address(&[JOB_SEED, hash.as_bytes()], &program()).expect("job");
        let as_machine =
            find_program_address(&[MACHINE_SEED, hash.as_bytes()], &program()).expect("machine");
        assert_ne!(as_job.address, as_machine.address);
    }

    #[test]
    fn test_seed_too_long() {
        let long = [7u8; 33];
        let result = find_program_address(&[JOB_SEED, &long], &program());
        assert!(matches!(
            result,
            Err(MintError::SeedTooLong { index: 1, len: 33, .. })
        ));
    }

    #[test]
    fn test_too_many_seeds() {
        let seeds: Vec<&[u8]> = vec![&b"x"[..]; MAX_SEEDS];
        assert!(matches!(
            find_program_address(&seeds, &program()),
            Err(MintError::TooManySeeds { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_distinct_hashes_give_distinct_job_addresses(
            a in "[0-9a-f]{32}",
            b in "[0-9a-f]{32}",
        ) {
            prop_assume!(a != b);
            let da = job_address(&a, &program()).expect("derive a");
            let db = job_address(&b, &program()).expect("derive b");
            prop_assert_ne!(da.address, db.address);
        }

        #[test]
        fn prop_derivation_is_pure(seed in proptest::collection::vec(any::<u8>(), 0..=32)) {
            let first = find_program_address(&[JOB_SEED, &seed], &program()).expect("derive");
            let second = find_program_address(&[JOB_SEED, &seed], &program()).expect("derive");
            prop_assert_eq!(first, second);
        }
    }
}
