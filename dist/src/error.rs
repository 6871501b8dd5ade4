//! Error types for the dist pipeline.
//!
//! This module defines semantic error variants that name the failing stage
//! so a release manager can act on them. Verification stage failures
//! (configure, build, test, install) are not errors; they are reported as a
//! [`crate::verify::VerifyOutcome`] so that scratch cleanup and exit-code
//! mapping stay in one place.

use camino::Utf8PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Errors that can abort a dist run.
#[derive(Debug, Error)]
pub enum DistError {
    /// The source tree is neither a Git nor a Mercurial checkout.
    #[error("dist currently only works with Git or Mercurial repos; {path} is neither")]
    UnsupportedVcs {
        /// Source root that was inspected.
        path: Utf8PathBuf,
    },

    /// A version-control command failed while producing the snapshot.
    #[error("{operation} failed: {message}")]
    Vcs {
        /// The command that failed, e.g. `git clone`.
        operation: String,
        /// Captured stderr or exit status of the failed command.
        message: String,
    },

    /// An external program could not be started at all.
    #[error("failed to run {program}: {source}")]
    Launch {
        /// Program that could not be spawned.
        program: String,
        /// The underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// A dist hook could not be started.
    #[error("failed to run dist script '{hook}': {source}")]
    HookLaunch {
        /// Rendered command line of the hook.
        hook: String,
        /// The underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// A dist hook ran but exited unsuccessfully.
    #[error("dist script '{hook}' errored out ({status})")]
    HookFailed {
        /// Rendered command line of the hook.
        hook: String,
        /// Exit status reported by the hook.
        status: ExitStatus,
    },

    /// An archive format name outside the permitted set was requested.
    #[error("value \"{value}\" not one of permitted values {permitted}")]
    UnsupportedFormat {
        /// The rejected format name.
        value: String,
        /// Comma-separated list of accepted names.
        permitted: String,
    },

    /// The format list was empty.
    #[error("no archive types specified")]
    EmptyFormatList,

    /// An unpacked archive did not contain exactly one top-level entry.
    #[error("archive unpacked into {dir} has {entries} top-level entries; expected exactly one directory")]
    PackagingShape {
        /// Directory the archive was unpacked into.
        dir: Utf8PathBuf,
        /// Number of top-level entries found.
        entries: usize,
    },

    /// An archive entry tried to escape the unpack directory.
    #[error("path traversal detected in archive entry: {path}")]
    PathTraversal {
        /// The offending entry path.
        path: String,
    },

    /// The project manifest does not exist.
    #[error("project manifest not found at {path}")]
    ManifestNotFound {
        /// Path where the manifest was expected.
        path: Utf8PathBuf,
    },

    /// The project manifest could not be parsed or is incomplete.
    #[error("invalid project manifest at {path}: {reason}")]
    InvalidManifest {
        /// Path to the manifest.
        path: Utf8PathBuf,
        /// Description of the problem.
        reason: String,
    },

    /// A digest or sidecar file is malformed.
    #[error("invalid SHA-256 digest: {reason}")]
    InvalidDigest {
        /// Description of the validation failure.
        reason: String,
    },

    /// No usable build driver was found on the host.
    #[error("could not find {tool}; install it or set [build].driver in the manifest")]
    BuildToolNotFound {
        /// Name of the missing tool.
        tool: &'static str,
    },

    /// A path is not valid UTF-8.
    #[error("path is not valid UTF-8: {path}")]
    NonUtf8Path {
        /// Lossy rendering of the rejected path.
        path: String,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Reading or writing a zip archive failed.
    #[error("zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Test stub received an unexpected or mismatched command invocation.
    #[cfg(any(test, feature = "test-support"))]
    #[error("stub mismatch: {message}")]
    StubMismatch {
        /// Description of what was expected versus what was received.
        message: String,
    },
}

impl DistError {
    /// Build a [`DistError::Vcs`] from a failed command's captured output.
    pub(crate) fn vcs(operation: impl Into<String>, output: &std::process::Output) -> Self {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let message = if stderr.trim().is_empty() {
            format!("exited with {}", output.status)
        } else {
            stderr.trim().to_owned()
        };
        Self::Vcs {
            operation: operation.into(),
            message,
        }
    }
}

/// Result type alias using [`DistError`].
pub type Result<T> = std::result::Result<T, DistError>;
