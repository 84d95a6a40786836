//! loopdown - audio content packages for GarageBand, Logic Pro and MainStage
//!
//! Entry point: argument parsing, tracing setup, signal translation and the
//! mapping from errors to exit status.

mod cli;
mod commands;
mod output;
mod signals;

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use loopdown_system::Shutdown;

use cli::{Cli, Commands};

/// Exit status for insufficient free space
const EXIT_NO_SPACE: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    let shutdown = Shutdown::new();
    signals::listen(shutdown.clone());

    let result = tokio::select! {
        result = dispatch(cli, shutdown.clone()) => result,
        _ = shutdown.cancelled() => {
            // Deploy runs observe the same token and report Interrupted
            // themselves; this arm covers download and scan.
            Err(loopdown_system::Error::Interrupted {
                signal: shutdown.signal().unwrap_or(0),
            }
            .into())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::from(exit_status(&e))
        }
    }
}

async fn dispatch(cli: Cli, shutdown: Shutdown) -> anyhow::Result<()> {
    match cli.command {
        Commands::Version(args) => commands::version::run(args),
        Commands::Scan(args) => commands::scan::run(args, cli.quiet).await,
        Commands::Deploy(args) => {
            commands::deploy::run(args, &cli.lock_file, cli.quiet, shutdown).await
        }
        Commands::Download(args) => {
            commands::download::run(args, &cli.lock_file, cli.quiet, shutdown).await
        }
    }
}

/// Map a failed run to its exit status
fn exit_status(err: &anyhow::Error) -> u8 {
    use loopdown_core::Error as CoreError;
    use loopdown_system::Error as SystemError;

    if let Some(e) = err.downcast_ref::<SystemError>() {
        if let Some(signal) = e.interrupted_signal() {
            return signals::exit_status(signal);
        }
        if let SystemError::Core(CoreError::InsufficientSpace { .. }) = e {
            return EXIT_NO_SPACE;
        }
    }

    if let Some(CoreError::InsufficientSpace { .. }) = err.downcast_ref::<CoreError>() {
        return EXIT_NO_SPACE;
    }

    1
}

/// Initialize tracing with appropriate verbosity
fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
