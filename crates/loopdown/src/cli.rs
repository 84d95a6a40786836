//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

use loopdown_core::config::{DEFAULT_DESTINATION, DEFAULT_LOCK_FILE};
use loopdown_core::{RunConfig, RunMode, ServerChoice, ShortName};

/// loopdown - audio content packages for GarageBand, Logic Pro and MainStage
#[derive(Parser, Debug)]
#[command(name = "loopdown")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Lock file that keeps two runs from overlapping
    #[arg(
        long,
        global = true,
        env = "LOOPDOWN_LOCK_FILE",
        default_value = DEFAULT_LOCK_FILE,
        value_name = "PATH"
    )]
    pub lock_file: Utf8PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download and install content packages
    Deploy(DeployArgs),

    /// Download content packages without installing them
    Download(DownloadArgs),

    /// Report supported applications and their packages as JSON
    Scan(ScanArgs),

    /// Show version information
    Version(VersionArgs),
}

/// Applications and content classes shared by deploy and download
#[derive(Args, Debug, Clone)]
pub struct ContentArgs {
    /// Applications to process
    #[arg(
        short = 'a',
        long = "apps",
        value_name = "APP",
        num_args = 1..,
        value_delimiter = ',',
        required = true
    )]
    pub apps: Vec<ShortName>,

    /// Include mandatory packages
    #[arg(short = 'r', long = "req")]
    pub mandatory: bool,

    /// Include optional packages
    #[arg(short = 'o', long = "opt")]
    pub optional: bool,

    /// Report what would be done without doing it
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

impl ContentArgs {
    /// Requested applications, first occurrence wins
    pub fn applications(&self) -> Vec<ShortName> {
        let mut apps = Vec::new();
        for app in &self.apps {
            if !apps.contains(app) {
                apps.push(*app);
            }
        }
        apps
    }
}

#[derive(Args, Debug, Clone)]
pub struct DeployArgs {
    #[command(flatten)]
    pub content: ContentArgs,

    /// Reinstall packages that are already installed
    #[arg(short, long)]
    pub force: bool,

    /// Caching server (http://host:port) or 'auto' to discover one
    #[arg(long, value_name = "URL|auto")]
    pub cache_server: Option<String>,

    /// Mirror of the content tree
    #[arg(long, value_name = "URL")]
    pub mirror_server: Option<String>,

    /// Keep the staging directory after the run
    #[arg(long)]
    pub keep_staging: bool,
}

impl DeployArgs {
    pub fn to_run_config(&self) -> loopdown_core::Result<RunConfig> {
        let server = ServerChoice::from_options(
            self.cache_server.as_deref(),
            self.mirror_server.as_deref(),
        )?;

        Ok(RunConfig {
            mode: RunMode::Deploy,
            applications: self.content.applications(),
            mandatory: self.content.mandatory,
            optional: self.content.optional,
            force: self.force,
            dry_run: self.content.dry_run,
            server,
            destination: staging_parent(),
            keep_staging: self.keep_staging,
        })
    }
}

#[derive(Args, Debug, Clone)]
pub struct DownloadArgs {
    #[command(flatten)]
    pub content: ContentArgs,

    /// Directory the packages are downloaded into
    #[arg(short, long = "dest", default_value = DEFAULT_DESTINATION, value_name = "PATH")]
    pub dest: Utf8PathBuf,
}

impl DownloadArgs {
    pub fn to_run_config(&self) -> RunConfig {
        RunConfig {
            mode: RunMode::Download,
            applications: self.content.applications(),
            mandatory: self.content.mandatory,
            optional: self.content.optional,
            force: false,
            dry_run: self.content.dry_run,
            server: ServerChoice::Origin,
            destination: self.dest.clone(),
            keep_staging: false,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ScanArgs {}

#[derive(Args, Debug, Clone)]
pub struct VersionArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Directory staging areas are created under
fn staging_parent() -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(std::env::temp_dir())
        .unwrap_or_else(|_| Utf8PathBuf::from("/tmp"))
}
