//! Subcommand implementations.

use std::io::Write;
use std::path::Path;
use std::process::Command;

use mint_settle::{
    machine_address, run_work_unit, Keypair, LedgerClient, SettlementConfig, SettlementEngine,
    SettlementOutcome, SettlementResult, SimulatedLedger, WorkLifecycle,
};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::cli::{Format, RunArgs};
use crate::error::CliError;

/// Run `args.command` as one work unit and settle it. Returns the exit code
/// to report: the child's own code, 127 if it could not start.
///
/// # Errors
///
/// Returns error if the engine cannot be built or output cannot be written.
/// Settlement failures are reported, not returned.
pub fn run<W: Write>(
    config: &SettlementConfig,
    args: &RunArgs,
    format: Format,
    out: &mut W,
) -> Result<i32, CliError> {
    if args.dry_run {
        let keypair = match &config.keypair_path {
            Some(path) => Keypair::from_file(path)?,
            None => Keypair::generate(),
        };
        let mut engine = SettlementEngine::new(keypair, SimulatedLedger::new(), config)?;
        execute(&mut engine, args, format, out)
    } else {
        let mut engine = SettlementEngine::from_config(config)?;
        execute(&mut engine, args, format, out)
    }
}

fn execute<L: LedgerClient, W: Write>(
    engine: &mut SettlementEngine<L>,
    args: &RunArgs,
    format: Format,
    out: &mut W,
) -> Result<i32, CliError> {
    let (status, settlement) = run_command(engine, &args.command);
    let exit_code = match &status {
        Ok(()) => 0,
        Err(e) => {
            warn!(error = %e, "command failed");
            e.exit_code()
        }
    };
    write_settlement(out, format, &settlement)?;
    Ok(exit_code)
}

/// Run a command under `lifecycle`, settling it as an error completion when
/// it cannot start or exits unsuccessfully.
pub fn run_command<W: WorkLifecycle + ?Sized>(
    lifecycle: &mut W,
    command: &[String],
) -> (Result<(), CliError>, SettlementResult) {
    let identifier = Uuid::new_v4().to_string();
    run_work_unit(lifecycle, &identifier, || {
        let (program, rest) = command
            .split_first()
            .ok_or_else(|| CliError::Config("no command given".to_string()))?;
        info!(program, "running command");
        let status = Command::new(program)
            .args(rest)
            .status()
            .map_err(|source| CliError::Spawn {
                program: program.clone(),
                source,
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(CliError::ChildFailed {
                code: status.code(),
            })
        }
    })
}

/// Render a settlement result.
///
/// # Errors
///
/// Returns error if writing fails.
pub fn write_settlement<W: Write>(
    out: &mut W,
    format: Format,
    result: &SettlementResult,
) -> Result<(), CliError> {
    if format == Format::Json {
        serde_json::to_writer_pretty(&mut *out, result)?;
        writeln!(out)?;
        return Ok(());
    }

    match &result.outcome {
        SettlementOutcome::Idle => writeln!(out, "nothing to settle")?,
        SettlementOutcome::Skipped { min_duration_secs } => writeln!(
            out,
            "skipped (duration {}s < {min_duration_secs}s min)",
            result.duration_secs
        )?,
        SettlementOutcome::Settled { signature } => {
            writeln!(
                out,
                "{} settled ~{} ({}s)",
                result.completion.mark(),
                result.estimated_reward,
                result.duration_secs
            )?;
            writeln!(out, "  tx: {}", mint_settle::client::explorer_url(signature))?;
        }
        SettlementOutcome::Failed { error } => writeln!(out, "settlement failed: {error}")?,
    }
    Ok(())
}

/// Print the caller's public key and machine address.
///
/// # Errors
///
/// Returns error if no keypair is configured or derivation fails.
pub fn address<W: Write>(config: &SettlementConfig, format: Format, out: &mut W) -> Result<(), CliError> {
    let path = config
        .keypair_path
        .as_ref()
        .ok_or_else(|| CliError::Config("no keypair configured (use --keypair)".to_string()))?;
    let keypair = Keypair::from_file(path)?;
    let pubkey = keypair.pubkey();
    let machine = machine_address(&pubkey, &config.program_id)?;

    match format {
        Format::Json => {
            let value = json!({
                "pubkey": pubkey,
                "machine_address": machine.address,
                "bump": machine.bump,
                "program_id": config.program_id,
            });
            serde_json::to_writer_pretty(&mut *out, &value)?;
            writeln!(out)?;
        }
        Format::Text => {
            writeln!(out, "pubkey:  {pubkey}")?;
            writeln!(out, "machine: {} (bump {})", machine.address, machine.bump)?;
            writeln!(out, "program: {}", config.program_id)?;
        }
    }
    Ok(())
}

/// Write a default configuration file.
///
/// # Errors
///
/// Returns error if the file exists and `force` is unset, or writing fails.
pub fn init_config(output: &Path, force: bool) -> Result<(), CliError> {
    if output.exists() && !force {
        return Err(CliError::Config(format!(
            "{} already exists (use --force to overwrite)",
            output.display()
        )));
    }
    let config = SettlementConfig {
        keypair_path: Some("~/.config/solana/id.json".into()),
        ..Default::default()
    };
    config.save(output)?;
    info!(path = %output.display(), "wrote config");
    Ok(())
}
