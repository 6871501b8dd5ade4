//! Dist pipeline orchestration.
//!
//! Sequences the stages of a release: snapshot the source tree, run dist
//! scripts, build the archives, verify the first one, and stamp every
//! archive with a checksum only if verification passed. Archives are kept on
//! disk after a failed verification so they can be inspected.

use crate::archive::{ArchiveArtifact, build_archives};
use crate::digest::stamp;
use crate::error::{DistError, Result};
use crate::hooks::run_hooks;
use crate::manifest::{DistLayout, DistRequest};
use crate::output::write_stderr_line;
use crate::process::CommandExecutor;
use crate::vcs::{Vcs, extract_snapshot};
use crate::verify::{BuildTool, VerifyOutcome, verify};
use serde::Serialize;
use std::io::{self, Write};

/// Warning printed when dist scripts are configured for a VCS that cannot
/// run them.
pub const HOOKS_UNSUPPORTED_WARNING: &str = "dist scripts are not supported in Mercurial projects";

/// Everything a pipeline run needs besides the executor and output stream.
#[derive(Debug, Clone, Copy)]
pub struct PipelineContext<'a> {
    /// Source and build directories.
    pub layout: &'a DistLayout,
    /// Project identity, formats and hooks.
    pub request: &'a DistRequest,
    /// Build tool used for verification.
    pub build_tool: &'a BuildTool,
    /// Suppress progress output (warnings are still shown).
    pub quiet: bool,
}

/// Summary of a completed pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    /// Archives produced, in requested format order. Digests are set only
    /// when verification passed.
    pub artifacts: Vec<ArchiveArtifact>,
    /// Outcome of verifying the first archive.
    pub outcome: VerifyOutcome,
}

impl PipelineReport {
    /// Process exit code for this run.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        self.outcome.exit_code()
    }
}

/// Run the whole dist pipeline.
///
/// # Errors
///
/// Returns [`DistError::UnsupportedVcs`] if the source tree is not a Git or
/// Mercurial checkout, [`DistError::Vcs`] if snapshotting fails,
/// [`DistError::HookLaunch`] or [`DistError::HookFailed`] if a dist script
/// fails, [`DistError::PackagingShape`] if the archive does not unpack to a
/// single directory, and I/O errors from any stage. Verification stage
/// failures are reported through [`PipelineReport::outcome`] instead.
pub fn run_pipeline(
    executor: &dyn CommandExecutor,
    context: &PipelineContext<'_>,
    stderr: &mut dyn Write,
) -> Result<PipelineReport> {
    let PipelineContext {
        layout,
        request,
        build_tool,
        quiet,
    } = *context;
    let mut sink = io::sink();

    let vcs = Vcs::detect(layout.source_root())?;
    log::info!("{vcs} detected in {}", layout.source_root());
    let snapshot = extract_snapshot(
        executor,
        vcs,
        layout.source_root(),
        &layout.dist_dir(),
        &request.dist_name(),
        stderr,
    )?;

    if vcs.strategy().supports_hooks() {
        run_hooks(
            executor,
            snapshot.root(),
            &request.hooks,
            progress_writer(quiet, stderr, &mut sink),
        )?;
    } else if !request.hooks.is_empty() {
        log::warn!("{HOOKS_UNSUPPORTED_WARNING}");
        write_stderr_line(stderr, format!("WARNING: {HOOKS_UNSUPPORTED_WARNING}"));
    }

    let mut artifacts = build_archives(&snapshot, &request.formats)?;
    let representative = artifacts
        .first()
        .map(|artifact| artifact.path.clone())
        .ok_or(DistError::EmptyFormatList)?;

    let outcome = verify(
        executor,
        &representative,
        build_tool,
        &layout.private_dir(),
        progress_writer(quiet, stderr, &mut sink),
    )?;

    if outcome.passed() {
        for artifact in &mut artifacts {
            artifact.digest = Some(stamp(&artifact.path)?);
        }
    } else {
        log::warn!("verification of {representative} failed; no checksums written");
    }

    Ok(PipelineReport { artifacts, outcome })
}

/// Progress lines go to `stderr` unless the run is quiet.
fn progress_writer<'a>(
    quiet: bool,
    stderr: &'a mut dyn Write,
    sink: &'a mut io::Sink,
) -> &'a mut dyn Write {
    if quiet {
        return sink;
    }
    stderr
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
