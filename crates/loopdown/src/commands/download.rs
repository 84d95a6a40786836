//! Download command

use anyhow::Result;
use camino::Utf8Path;

use loopdown_system::Shutdown;

use super::run::{execute, RunContext};
use crate::cli::DownloadArgs;

pub async fn run(
    args: DownloadArgs,
    lock_file: &Utf8Path,
    quiet: bool,
    shutdown: Shutdown,
) -> Result<()> {
    execute(RunContext {
        config: args.to_run_config(),
        lock_file: lock_file.to_path_buf(),
        quiet,
        shutdown,
    })
    .await
}
