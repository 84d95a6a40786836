//! Deploy command

use anyhow::Result;
use camino::Utf8Path;

use loopdown_system::Shutdown;

use super::run::{execute, RunContext};
use crate::cli::DeployArgs;

pub async fn run(
    args: DeployArgs,
    lock_file: &Utf8Path,
    quiet: bool,
    shutdown: Shutdown,
) -> Result<()> {
    let config = args.to_run_config()?;

    execute(RunContext {
        config,
        lock_file: lock_file.to_path_buf(),
        quiet,
        shutdown,
    })
    .await
}
