//! Mercurial snapshot strategy.
//!
//! `hg archive` exports the working directory parent, subrepositories
//! included, as a plain file tree. Archive metadata (`.hg_archival.txt`) is
//! switched off so the tree matches what a Git snapshot would contain.

use super::SnapshotStrategy;
use crate::error::Result;
use crate::process::{CommandExecutor, Invocation, run_checked};
use camino::Utf8Path;

/// Marker `hg summary` prints when the working directory has no changes.
const CLEAN_MARKER: &str = "commit: (clean)";

/// Mercurial snapshot strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mercurial;

impl SnapshotStrategy for Mercurial {
    fn name(&self) -> &'static str {
        "Mercurial"
    }

    fn has_dirty_index(
        &self,
        executor: &dyn CommandExecutor,
        source_root: &Utf8Path,
    ) -> Result<bool> {
        let invocation = Invocation::new("hg")
            .args(["-R", source_root.as_str(), "summary"])
            .captured();
        let output = run_checked(executor, &invocation, "hg summary")?;
        let summary = String::from_utf8_lossy(&output.stdout);
        Ok(!summary.lines().any(|line| line.trim() == CLEAN_MARKER))
    }

    fn extract_snapshot(
        &self,
        executor: &dyn CommandExecutor,
        source_root: &Utf8Path,
        dest: &Utf8Path,
    ) -> Result<()> {
        let invocation = Invocation::new("hg")
            .args([
                "archive",
                "-R",
                source_root.as_str(),
                "-S",
                "-t",
                "files",
                "--config",
                "ui.archivemeta=false",
                dest.as_str(),
            ])
            .captured();
        run_checked(executor, &invocation, "hg archive").map(|_| ())
    }

    fn supports_hooks(&self) -> bool {
        false
    }
}
