//! `mint` binary entrypoint.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use mint_cli::cli::{Cli, Commands};
use mint_cli::{commands, CliError};

const DEFAULT_FILTER: &str = "mint=info,mint_settle=info";

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        }
    }
}

fn run(cli: &Cli) -> Result<i32, CliError> {
    let mut stdout = io::stdout().lock();

    match &cli.command {
        Commands::Run(args) => {
            let config = cli.settlement_config()?;
            commands::run(&config, args, cli.format, &mut stdout)
        }
        Commands::Address => {
            let config = cli.settlement_config()?;
            commands::address(&config, cli.format, &mut stdout)?;
            Ok(0)
        }
        Commands::InitConfig { output, force } => {
            commands::init_config(output, *force)?;
            Ok(0)
        }
    }
}
