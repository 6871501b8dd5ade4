//! meson-dist library.
//!
//! This crate produces reproducible source release archives from a Git or
//! Mercurial checkout and proves each release builds before it is stamped
//! with a checksum. It is used by the `meson-dist` CLI binary and can be
//! driven programmatically through [`pipeline::run_pipeline`].
//!
//! # Modules
//!
//! - [`archive`] - Deterministic tarball and zip construction
//! - [`cli`] - Command-line argument definitions
//! - [`digest`] - SHA-256 checksums and `.sha256sum` sidecars
//! - [`error`] - Semantic error types naming the failing stage
//! - [`format`] - Archive format names, extensions and list parsing
//! - [`hooks`] - Dist script execution against the snapshot
//! - [`manifest`] - Project manifest loading and directory layout
//! - [`output`] - Console and JSON report formatting
//! - [`pipeline`] - Stage sequencing from snapshot to checksum
//! - [`process`] - External command execution seam
//! - [`unpack`] - Archive extraction with path traversal protection
//! - [`vcs`] - Git and Mercurial snapshot strategies
//! - [`verify`] - Configure, build, test and install from the archive

pub mod archive;
pub mod cli;
pub mod digest;
pub mod error;
pub mod format;
pub mod hooks;
pub mod manifest;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod unpack;
pub mod vcs;
pub mod verify;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
