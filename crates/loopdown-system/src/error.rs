//! Error types for loopdown-system

use camino::Utf8PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias using loopdown-system's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Child process failures
#[derive(Error, Debug)]
pub enum ProcessError {
    /// Empty argument vector
    #[error("Invalid process arguments: {message}")]
    InvalidArguments { message: String },

    /// The child could not be started or fed its input
    #[error("Failed to launch '{program}': {source}")]
    LaunchFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The child outlived its timeout and was terminated
    #[error("Command timed out after {timeout:?}: {}", .args.join(" "))]
    TimedOut { timeout: Duration, args: Vec<String> },

    /// The child exited with a non-zero status
    #[error("Command exited with code {code}: {}", .args.join(" "))]
    NonZeroExit {
        code: i32,
        args: Vec<String>,
        stdout: Vec<u8>,
        stderr: Vec<u8>,
    },
}

impl ProcessError {
    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            message: message.into(),
        }
    }

    pub fn launch_failed(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::LaunchFailed {
            program: program.into(),
            source,
        }
    }
}

/// Host interaction error types
#[derive(Error, Debug)]
pub enum Error {
    /// Another run holds the host-wide lock
    #[error("Another loopdown run is in progress (lock held on {path})")]
    AlreadyRunning { path: Utf8PathBuf },

    /// The run was cancelled by a signal
    #[error("Interrupted by signal {signal}")]
    Interrupted { signal: i32 },

    /// Caching server discovery scope other than `system`
    #[error("Unsupported caching server scope: {scope} (only 'system' is supported)")]
    UnsupportedScope { scope: String },

    /// Caching server minimum rank outside the accepted range
    #[error("Invalid minimum caching server rank {rank}: must be between {min} and {max}")]
    InvalidMinimumRank { rank: i64, min: i64, max: i64 },

    /// Child process failure
    #[error(transparent)]
    Process(#[from] ProcessError),

    /// Model or validation error
    #[error(transparent)]
    Core(#[from] loopdown_core::Error),

    /// Property list parsing error
    #[error("Property list parsing error: {0}")]
    PlistParse(#[from] plist::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn already_running(path: impl Into<Utf8PathBuf>) -> Self {
        Self::AlreadyRunning { path: path.into() }
    }

    pub fn unsupported_scope(scope: impl Into<String>) -> Self {
        Self::UnsupportedScope {
            scope: scope.into(),
        }
    }

    /// Signal number when the run was interrupted
    pub fn interrupted_signal(&self) -> Option<i32> {
        match self {
            Self::Interrupted { signal } => Some(*signal),
            _ => None,
        }
    }
}
