//! End-to-end settlement against the simulated ledger.

use mint_settle::address::{job_address, machine_address};
use mint_settle::instruction::RECORD_JOB_DISCRIMINATOR;
use mint_settle::transaction::{MINT_PROGRAM, STATE_ACCOUNT, SYSTEM_PROGRAM};
use mint_settle::{
    Keypair, ManualClock, SettlementConfig, SettlementEngine, SettlementOutcome, SimulatedLedger,
    TimerState,
};
use std::sync::Arc;
use std::time::Duration;

const SIG_LEN: usize = 64;

struct Parsed {
    header: [u8; 3],
    keys: Vec<[u8; 32]>,
    program_index: u8,
    accounts: Vec<u8>,
    data: Vec<u8>,
}

// Only handles the single-byte compact lengths a record_job transaction uses.
fn parse(tx: &[u8]) -> Parsed {
    assert_eq!(tx[0], 1, "one signature");
    let msg = &tx[1 + SIG_LEN..];
    let header = [msg[0], msg[1], msg[2]];
    let n_keys = msg[3] as usize;
    let mut pos = 4;
    let keys = (0..n_keys)
        .map(|i| {
            let start = pos + i * 32;
            msg[start..start + 32].try_into().expect("32 bytes")
        })
        .collect();
    pos += n_keys * 32 + 32;
    assert_eq!(msg[pos], 1, "one instruction");
    let program_index = msg[pos + 1];
    let n_accounts = msg[pos + 2] as usize;
    let accounts = msg[pos + 3..pos + 3 + n_accounts].to_vec();
    pos += 3 + n_accounts;
    let n_data = msg[pos] as usize;
    let data = msg[pos + 1..pos + 1 + n_data].to_vec();
    assert_eq!(pos + 1 + n_data, msg.len());
    Parsed {
        header,
        keys,
        program_index,
        accounts,
        data,
    }
}

fn engine(config: &SettlementConfig) -> (SettlementEngine<SimulatedLedger>, ManualClock) {
    let clock = ManualClock::new();
    let engine = SettlementEngine::new(Keypair::generate(), SimulatedLedger::new(), config)
        .expect("engine")
        .with_clock(Arc::new(clock.clone()));
    (engine, clock)
}

#[test]
fn ten_second_unit_settles_once_with_exact_wire_format() {
    let (mut engine, clock) = engine(&SettlementConfig::default());
    let caller = engine.pubkey();

    engine.on_work_start("7d1c0e44-9a0b-4c55-8f7e-0b6c2f1a9e33");
    clock.advance(Duration::from_secs(10));
    let result = engine.on_work_end();

    assert!(result.accepted());
    assert_eq!(result.duration_secs, 10);
    assert!((result.estimated_reward.as_mint() - 0.05).abs() < 1e-12);

    let submissions = engine.ledger().submissions();
    assert_eq!(submissions.len(), 1);
    let parsed = parse(&submissions[0]);

    assert_eq!(parsed.header, [1, 0, 2]);
    assert_eq!(parsed.keys[0], *caller.as_bytes());
    assert_eq!(parsed.keys[parsed.program_index as usize], *MINT_PROGRAM.as_bytes());

    let job_hash = result.job_hash.as_deref().expect("job hash");
    let expected_accounts = [
        STATE_ACCOUNT,
        machine_address(&caller, &MINT_PROGRAM).expect("machine").address,
        job_address(job_hash, &MINT_PROGRAM).expect("job").address,
        caller,
        caller,
        SYSTEM_PROGRAM,
    ];
    let resolved: Vec<[u8; 32]> = parsed.accounts.iter().map(|&i| parsed.keys[i as usize]).collect();
    let expected: Vec<[u8; 32]> = expected_accounts.iter().map(|k| *k.as_bytes()).collect();
    assert_eq!(resolved, expected);

    let mut data = RECORD_JOB_DISCRIMINATOR.to_vec();
    data.extend_from_slice(&32u32.to_le_bytes());
    data.extend_from_slice(job_hash.as_bytes());
    data.extend_from_slice(&10u64.to_le_bytes());
    data.extend_from_slice(&1000u32.to_le_bytes());
    assert_eq!(parsed.data, data);
}

#[test]
fn failed_submission_consumes_the_unit() {
    let (mut engine, clock) = engine(&SettlementConfig::default());
    engine.ledger().fail_submissions(true);

    engine.on_work_start("unit");
    clock.advance(Duration::from_secs(10));
    let result = engine.on_work_end();

    assert!(matches!(result.outcome, SettlementOutcome::Failed { .. }));
    assert_eq!(engine.timer_state(), TimerState::Idle);
    assert_eq!(engine.ledger().submission_count(), 1);
}

#[test]
fn sequential_units_get_distinct_job_accounts() {
    let (mut engine, clock) = engine(&SettlementConfig::default());
    let mut hashes = Vec::new();

    for _ in 0..3 {
        engine.on_work_start("same-id");
        clock.advance(Duration::from_secs(2));
        let result = engine.on_work_end();
        assert!(result.accepted());
        hashes.push(result.job_hash.expect("hash"));
        std::thread::sleep(Duration::from_millis(2));
    }

    hashes.sort();
    hashes.dedup();
    assert_eq!(hashes.len(), 3);
    assert_eq!(engine.ledger().submission_count(), 3);
}

#[test]
fn sub_second_units_are_skipped_by_default() {
    let (mut engine, clock) = engine(&SettlementConfig::default());
    engine.on_work_start("quick");
    clock.advance(Duration::from_millis(900));
    let result = engine.on_work_end();

    assert_eq!(result.outcome, SettlementOutcome::Skipped { min_duration_secs: 1 });
    assert_eq!(result.duration_secs, 0);
    assert_eq!(engine.ledger().submission_count(), 0);
}
