//! Git snapshot strategy.
//!
//! The snapshot is a `--shared` clone of the source repository, so object
//! data is borrowed rather than copied. Submodules are initialised
//! recursively in the clone, then every `.git*` entry is stripped from each
//! submodule directory and from the snapshot root.

use super::SnapshotStrategy;
use crate::error::{DistError, Result};
use crate::process::{CommandExecutor, Invocation, run_checked};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Prefix shared by every Git control file (`.git`, `.gitmodules`,
/// `.gitignore`, `.gitattributes`, ...).
const CONTROL_PREFIX: &str = ".git";

/// Git snapshot strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct Git;

impl SnapshotStrategy for Git {
    fn name(&self) -> &'static str {
        "Git"
    }

    fn has_dirty_index(
        &self,
        executor: &dyn CommandExecutor,
        source_root: &Utf8Path,
    ) -> Result<bool> {
        let invocation = Invocation::new("git")
            .args(["-C", source_root.as_str(), "diff-index", "--quiet", "HEAD"])
            .captured();
        let output = executor.run(&invocation)?;
        match output.status.code() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(DistError::vcs("git diff-index", &output)),
        }
    }

    fn extract_snapshot(
        &self,
        executor: &dyn CommandExecutor,
        source_root: &Utf8Path,
        dest: &Utf8Path,
    ) -> Result<()> {
        let clone = Invocation::new("git")
            .args(["clone", "--shared", source_root.as_str(), dest.as_str()])
            .captured();
        run_checked(executor, &clone, "git clone")?;

        if dest.join(".gitmodules").exists() {
            let update = Invocation::new("git")
                .args(["submodule", "update", "--init", "--recursive"])
                .current_dir(dest)
                .captured();
            run_checked(executor, &update, "git submodule update")?;
        }

        // Nested .gitmodules files are read before anything is stripped.
        let submodules = submodule_dirs(dest)?;
        for dir in &submodules {
            strip_control_files(dir, CONTROL_PREFIX)?;
        }
        strip_control_files(dest, CONTROL_PREFIX)
    }

    fn supports_hooks(&self) -> bool {
        true
    }
}

/// Collect the directories of all submodules below `root`, including
/// submodules of submodules, from their `.gitmodules` files.
///
/// # Errors
///
/// Returns an I/O error if a `.gitmodules` file cannot be read.
pub fn submodule_dirs(root: &Utf8Path) -> Result<Vec<Utf8PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_owned()];

    while let Some(dir) = pending.pop() {
        let modules = dir.join(".gitmodules");
        if !modules.is_file() {
            continue;
        }
        let contents = fs::read_to_string(&modules)?;
        for path in parse_submodule_paths(&contents) {
            let submodule = dir.join(path);
            log::debug!("found submodule {submodule}");
            pending.push(submodule.clone());
            found.push(submodule);
        }
    }

    Ok(found)
}

/// Extract the `path = ...` values from `.gitmodules` text.
///
/// # Examples
///
/// ```
/// use meson_dist::vcs::git::parse_submodule_paths;
///
/// let text = "[submodule \"lib\"]\n\tpath = subprojects/lib\n\turl = ../lib.git\n";
/// assert_eq!(parse_submodule_paths(text), vec!["subprojects/lib"]);
/// ```
#[must_use]
pub fn parse_submodule_paths(contents: &str) -> Vec<&str> {
    contents
        .lines()
        .filter_map(|line| line.trim().split_once('='))
        .filter(|(key, _)| key.trim() == "path")
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
        .collect()
}

/// Remove every entry of `dir` whose name starts with `prefix`.
///
/// Real directories are removed recursively; files and symlinks (including
/// symlinks to directories) are unlinked. A missing `dir` is not an error.
///
/// # Errors
///
/// Returns an I/O error if an entry cannot be removed.
pub fn strip_control_files(dir: &Utf8Path, prefix: &str) -> Result<()> {
    let pattern = format!(
        "{}/{}*",
        glob::Pattern::escape(dir.as_str()),
        glob::Pattern::escape(prefix)
    );
    let entries = glob::glob(&pattern)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;

    for entry in entries {
        let path = entry.map_err(glob::GlobError::into_error)?;
        let metadata = fs::symlink_metadata(&path)?;
        if metadata.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
        log::debug!("removed {}", path.display());
    }
    Ok(())
}
