//! Version-control snapshot strategies.
//!
//! A snapshot is a clean copy of the source tree at the current revision,
//! free of version-control metadata, in `<dist-dir>/<project>-<version>`.
//! Each supported VCS implements [`SnapshotStrategy`]; [`Vcs::detect`]
//! picks one by looking at the source root.
//!
//! # Sub-modules
//!
//! - [`git`] - Shared clone, submodule update, `.git*` stripping.
//! - [`hg`] - `hg archive` export with subrepositories.

pub mod git;
pub mod hg;

use crate::error::{DistError, Result};
use crate::output::write_stderr_line;
use crate::process::CommandExecutor;
use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;
use std::fs;
use std::io::Write;

/// Warning printed when uncommitted changes will be left out of the archive.
pub const DIRTY_INDEX_WARNING: &str =
    "Repository has uncommitted changes that will not be included in the dist tarball";

/// Capabilities a version-control system must provide to be packaged.
pub trait SnapshotStrategy {
    /// Human-readable name of the VCS.
    fn name(&self) -> &'static str;

    /// Whether the working tree has changes not present at the current
    /// revision.
    ///
    /// # Errors
    ///
    /// Returns [`DistError::Vcs`] if the status command itself fails.
    fn has_dirty_index(&self, executor: &dyn CommandExecutor, source_root: &Utf8Path)
    -> Result<bool>;

    /// Export the current revision of `source_root` into `dest`, which does
    /// not exist yet but whose parent does.
    ///
    /// # Errors
    ///
    /// Returns [`DistError::Vcs`] if any VCS command fails, or an I/O error
    /// while removing control files.
    fn extract_snapshot(
        &self,
        executor: &dyn CommandExecutor,
        source_root: &Utf8Path,
        dest: &Utf8Path,
    ) -> Result<()>;

    /// Whether dist scripts can run against snapshots from this VCS.
    fn supports_hooks(&self) -> bool;
}

/// The version-control systems dist knows how to snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vcs {
    /// Git, including worktrees and submodule checkouts (`.git` file).
    Git,
    /// Mercurial.
    Mercurial,
}

impl Vcs {
    /// Detect the VCS of `source_root`, if any.
    ///
    /// A `.git` entry of any kind wins over a `.hg` directory.
    #[must_use]
    pub fn probe(source_root: &Utf8Path) -> Option<Self> {
        let git = source_root.join(".git");
        if git.is_dir() || git.is_file() {
            Some(Self::Git)
        } else if source_root.join(".hg").is_dir() {
            Some(Self::Mercurial)
        } else {
            None
        }
    }

    /// Detect the VCS of `source_root`.
    ///
    /// # Errors
    ///
    /// Returns [`DistError::UnsupportedVcs`] if the tree is neither a Git
    /// nor a Mercurial checkout.
    pub fn detect(source_root: &Utf8Path) -> Result<Self> {
        Self::probe(source_root).ok_or_else(|| DistError::UnsupportedVcs {
            path: source_root.to_owned(),
        })
    }

    /// The snapshot strategy for this VCS.
    #[must_use]
    pub fn strategy(self) -> &'static dyn SnapshotStrategy {
        match self {
            Self::Git => &git::Git,
            Self::Mercurial => &hg::Mercurial,
        }
    }
}

impl fmt::Display for Vcs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.strategy().name())
    }
}

/// A clean, metadata-free export of the source tree ready for archiving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    root: Utf8PathBuf,
    name: String,
}

impl Snapshot {
    /// Absolute path of the snapshot directory.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Directory name, `<project>-<version>`; the single top-level entry of
    /// every archive.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory containing the snapshot; archives are written here.
    #[must_use]
    pub fn parent(&self) -> &Utf8Path {
        self.root.parent().unwrap_or(&self.root)
    }

    /// Wrap an existing directory as a snapshot.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if `root` has no final path component.
    pub fn from_existing(root: Utf8PathBuf) -> Result<Self> {
        let name = root
            .file_name()
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("snapshot path {root} has no directory name"),
                )
            })?
            .to_owned();
        Ok(Self { root, name })
    }
}

/// Produce a snapshot of `source_root` in `dist_dir/<dist_name>`.
///
/// Warns (without failing) when the working tree has uncommitted changes.
/// Any stale directory of the same name is removed first.
///
/// # Errors
///
/// Propagates [`DistError::Vcs`] from the strategy and I/O errors while
/// preparing the snapshot directory. A partially extracted snapshot is left
/// on disk for inspection.
pub fn extract_snapshot(
    executor: &dyn CommandExecutor,
    vcs: Vcs,
    source_root: &Utf8Path,
    dist_dir: &Utf8Path,
    dist_name: &str,
    stderr: &mut dyn Write,
) -> Result<Snapshot> {
    let strategy = vcs.strategy();
    if strategy.has_dirty_index(executor, source_root)? {
        log::warn!("{DIRTY_INDEX_WARNING}");
        write_stderr_line(stderr, format!("WARNING: {DIRTY_INDEX_WARNING}"));
    }

    let root = dist_dir.join(dist_name);
    prepare_snapshot_dir(&root)?;
    log::info!("exporting {} snapshot of {source_root} to {root}", strategy.name());
    strategy.extract_snapshot(executor, source_root, &root)?;

    Ok(Snapshot {
        root,
        name: dist_name.to_owned(),
    })
}

/// Remove any stale snapshot at `root` and make sure its parent exists.
fn prepare_snapshot_dir(root: &Utf8Path) -> Result<()> {
    if root.exists() {
        log::debug!("removing stale snapshot {root}");
        fs::remove_dir_all(root)?;
    }
    if let Some(parent) = root.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ExpectedCall, StubExecutor, exit_status, success_output};
    use rstest::rstest;
    use std::process::Output;

    fn temp_root() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8");
        (dir, root)
    }

    #[rstest]
    #[case::git_dir(&[".git/"], Some(Vcs::Git))]
    #[case::git_file(&[".git"], Some(Vcs::Git))]
    #[case::hg_dir(&[".hg/"], Some(Vcs::Mercurial))]
    #[case::both(&[".hg/", ".git/"], Some(Vcs::Git))]
    #[case::hg_file_ignored(&[".hg"], None)]
    #[case::none(&["README"], None)]
    fn probes_vcs(#[case] entries: &[&str], #[case] expected: Option<Vcs>) {
        let (_dir, root) = temp_root();
        for entry in entries {
            if let Some(name) = entry.strip_suffix('/') {
                fs::create_dir(root.join(name)).expect("mkdir");
            } else {
                fs::write(root.join(entry), "gitdir: ../.git/modules/x\n").expect("write");
            }
        }
        assert_eq!(Vcs::probe(&root), expected);
    }

    #[test]
    fn detect_fails_for_plain_directory() {
        let (_dir, root) = temp_root();
        let err = Vcs::detect(&root).expect_err("no vcs");
        assert!(matches!(err, DistError::UnsupportedVcs { ref path } if *path == root));
    }

    #[test]
    fn only_git_supports_hooks() {
        assert!(Vcs::Git.strategy().supports_hooks());
        assert!(!Vcs::Mercurial.strategy().supports_hooks());
        assert_eq!(Vcs::Mercurial.to_string(), "Mercurial");
    }

    #[test]
    fn extract_warns_on_dirty_tree_and_replaces_stale_snapshot() {
        let (_dir, root) = temp_root();
        let dist_dir = root.join("build/meson-dist");
        let stale = dist_dir.join("proj-1.0");
        fs::create_dir_all(&stale).expect("mkdir stale");
        fs::write(stale.join("leftover"), "old").expect("write stale");

        let dirty = Output {
            status: exit_status(0),
            stdout: b"parent: 3:abc tip\ncommit: 1 modified\n".to_vec(),
            stderr: Vec::new(),
        };
        let source = root.as_str().to_owned();
        let dest = stale.as_str().to_owned();
        let executor = StubExecutor::new(vec![
            ExpectedCall::new("hg", ["-R", source.as_str(), "summary"], dirty),
            ExpectedCall::new(
                "hg",
                [
                    "archive",
                    "-R",
                    source.as_str(),
                    "-S",
                    "-t",
                    "files",
                    "--config",
                    "ui.archivemeta=false",
                    dest.as_str(),
                ],
                success_output(),
            ),
        ]);
        let mut stderr = Vec::new();

        let snapshot = extract_snapshot(
            &executor,
            Vcs::Mercurial,
            &root,
            &dist_dir,
            "proj-1.0",
            &mut stderr,
        )
        .expect("snapshot");

        executor.assert_finished();
        assert_eq!(snapshot.root(), stale);
        assert_eq!(snapshot.name(), "proj-1.0");
        assert_eq!(snapshot.parent(), dist_dir);
        assert!(!stale.exists(), "stale snapshot must be removed before export");
        let text = String::from_utf8(stderr).expect("utf8");
        assert!(text.contains(DIRTY_INDEX_WARNING));
    }

    #[test]
    fn from_existing_uses_directory_name() {
        let snapshot = Snapshot::from_existing(Utf8PathBuf::from("/b/meson-dist/proj-2.0"))
            .expect("named dir");
        assert_eq!(snapshot.name(), "proj-2.0");
        assert_eq!(snapshot.parent(), Utf8Path::new("/b/meson-dist"));
    }
}
