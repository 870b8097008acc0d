//! Job identifiers.
//!
//! A job hash commits to a job name, its duration and the wall-clock time at
//! which it was produced. The timestamp makes every call unique: hashing the
//! same name and duration twice yields two different identifiers.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Length of a job hash in hex characters.
pub const JOB_HASH_LEN: usize = 32;

/// Hash a job at the current wall-clock time.
#[must_use]
pub fn job_hash(name: &str, duration_secs: u64) -> String {
    job_hash_at(name, duration_secs, Utc::now())
}

/// Hash a job at a given instant.
///
/// The digest input is `"{name}-{unix_seconds}.{micros}-{duration}"`; the
/// first 16 bytes of its SHA-256 are returned as lowercase hex.
#[must_use]
pub fn job_hash_at(name: &str, duration_secs: u64, at: DateTime<Utc>) -> String {
    let data = format!(
        "{name}-{}.{:06}-{duration_secs}",
        at.timestamp(),
        at.timestamp_subsec_micros()
    );
    let digest = Sha256::digest(data.as_bytes());
    hex::encode(&digest[..JOB_HASH_LEN / 2])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn is_lower_hex(s: &str) -> bool {
        s.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f'))
    }

    #[test]
    fn test_length_and_alphabet() {
        let hash = job_hash("agent-1a2b3c4d", 42);
        assert_eq!(hash.len(), JOB_HASH_LEN);
        assert!(is_lower_hex(&hash));
    }

    #[test]
    fn test_fixed_instant_is_reproducible() {
        let at = Utc.timestamp_opt(1_700_000_000, 123_456_000).single().expect("valid time");
        assert_eq!(job_hash_at("job", 10, at), job_hash_at("job", 10, at));
    }

    #[test]
    fn test_known_digest() {
        let at = Utc.timestamp_opt(1_700_000_000, 500_000_000).single().expect("valid time");
        let expected = Sha256::digest(b"job-1700000000.500000-10");
        assert_eq!(job_hash_at("job", 10, at), hex::encode(&expected[..16]));
    }

    #[test]
    fn test_inputs_change_hash() {
        let at = Utc.timestamp_opt(1_700_000_000, 0).single().expect("valid time");
        let base = job_hash_at("job", 10, at);
        assert_ne!(base, job_hash_at("job", 11, at));
        assert_ne!(base, job_hash_at("other", 10, at));
        let later = at + chrono::Duration::microseconds(1);
        assert_ne!(base, job_hash_at("job", 10, later));
    }

    #[test]
    fn test_calls_separated_in_time_differ() {
        let first = job_hash("job", 5);
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = job_hash("job", 5);
        assert_ne!(first, second);
    }
}
