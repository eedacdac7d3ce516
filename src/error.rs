//! Errors.
//!
//! This module contains the failures that terminate a run with a dedicated exit code.

use std::path::PathBuf;

/// Exit code used in case there were no errors.
pub(crate) const EXIT_OK: i32 = 0;

/// Exit code used in case the requested Python version is not listed.
pub(crate) const EXIT_VERSION_NOT_FOUND: i32 = 1;

/// Exit code used in case the requested architecture is not available for the Python version.
pub(crate) const EXIT_ARCH_UNAVAILABLE: i32 = 2;

/// Exit code used in case the runtime contains more than one `._pth` file.
pub(crate) const EXIT_AMBIGUOUS_PTH: i32 = 3;

/// Exit code used in case an external command failed.
pub(crate) const EXIT_COMMAND_FAILED: i32 = 4;

/// Exit code used for all other errors (network, filesystem, configuration, ...).
pub(crate) const EXIT_NOK: i32 = 5;

/// The error type for failures with a dedicated exit code.
#[derive(Debug, thiserror::Error)]
pub(crate) enum BootstrapError {
    /// The requested Python version is not part of the catalog.
    #[error("couldn't find embeddable Python package of version {version} (available: {})", .available.join(", "))]
    VersionNotFound { version: String, available: Vec<String> },
    /// The catalog lists the version, but not for the requested architecture.
    #[error("couldn't find a suitable embeddable Python {version} for {arch}")]
    ArchitectureUnavailable { version: String, arch: String },
    /// There is more than one `._pth` file in the runtime.
    #[error("there are more than one ._pth files: {0:?}")]
    AmbiguousPthFiles(Vec<PathBuf>),
    /// An external command returned a non-zero exit status.
    #[error("command '{command}' failed with exit code {}", .code.map_or("n/a".to_string(), |code| code.to_string()))]
    CommandFailed { command: String, code: Option<i32> },
}

impl BootstrapError {
    /// Returns the exit code for this error.
    pub(crate) fn exit_code(&self) -> i32 {
        match self {
            Self::VersionNotFound { .. } => EXIT_VERSION_NOT_FOUND,
            Self::ArchitectureUnavailable { .. } => EXIT_ARCH_UNAVAILABLE,
            Self::AmbiguousPthFiles(_) => EXIT_AMBIGUOUS_PTH,
            Self::CommandFailed { .. } => EXIT_COMMAND_FAILED,
        }
    }
}

/// Returns the exit code for the given error.
///
/// Errors without a dedicated exit code map to [EXIT_NOK].
pub(crate) fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<BootstrapError>().map_or(EXIT_NOK, BootstrapError::exit_code)
}
