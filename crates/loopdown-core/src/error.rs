//! Error types for loopdown-core

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::size::ByteSize;

/// Result type alias using loopdown-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for loopdown
#[derive(Error, Debug)]
pub enum Error {
    /// Cache server and mirror server were both requested
    #[error("Conflicting options: {first} cannot be used with {second}")]
    ConflictingOptions { first: String, second: String },

    /// Neither mandatory nor optional content was requested
    #[error("No content selected: use -r/--req and/or -o/--opt")]
    NoContentSelected,

    /// No application was requested
    #[error("No applications selected: use -a/--apps")]
    NoApplicationsSelected,

    /// Installing requires an elevated process
    #[error("Insufficient privileges: {action} requires root (try again with sudo)")]
    PrivilegeRequired { action: String },

    /// Server URL failed validation
    #[error("Invalid server URL '{url}': {reason}")]
    InvalidServerUrl { url: String, reason: String },

    /// Unknown application short name
    #[error("Unknown application: {name}. Valid applications: garageband, logicpro, mainstage")]
    UnknownApplication { name: String },

    /// Package record could not be decoded
    #[error("Invalid package record '{key}': {message}")]
    InvalidPackage { key: String, message: String },

    /// Not enough free space for the requested run
    #[error("Insufficient space available at {path}: {required} required, {available} available")]
    InsufficientSpace {
        required: ByteSize,
        available: ByteSize,
        path: Utf8PathBuf,
    },

    /// Property list parsing error
    #[error("Property list parsing error: {0}")]
    PlistParse(#[from] plist::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// URL parsing error
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a conflicting options error
    pub fn conflicting_options(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self::ConflictingOptions {
            first: first.into(),
            second: second.into(),
        }
    }

    /// Create a privilege required error
    pub fn privilege_required(action: impl Into<String>) -> Self {
        Self::PrivilegeRequired {
            action: action.into(),
        }
    }

    /// Create an invalid server URL error
    pub fn invalid_server_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidServerUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create an unknown application error
    pub fn unknown_application(name: impl Into<String>) -> Self {
        Self::UnknownApplication { name: name.into() }
    }

    /// Create an invalid package error
    pub fn invalid_package(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPackage {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create an insufficient space error
    pub fn insufficient_space(
        required: ByteSize,
        available: ByteSize,
        path: impl Into<Utf8PathBuf>,
    ) -> Self {
        Self::InsufficientSpace {
            required,
            available,
            path: path.into(),
        }
    }

    /// Whether this error was raised while validating options, before any side effect
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::ConflictingOptions { .. }
                | Self::NoContentSelected
                | Self::NoApplicationsSelected
                | Self::PrivilegeRequired { .. }
                | Self::InvalidServerUrl { .. }
                | Self::UnknownApplication { .. }
        )
    }
}
