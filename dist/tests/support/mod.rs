//! Test support utilities for meson-dist integration tests.
//!
//! Provides a throwaway Git repository fixture and an executor that runs
//! real VCS commands while standing in for the Meson and Ninja build tools,
//! so the pipeline can be exercised end to end without a compiler.

use camino::{Utf8Path, Utf8PathBuf};
use meson_dist::error::Result;
use meson_dist::process::{CommandExecutor, Invocation, SystemCommandExecutor};
use meson_dist::test_utils::success_output;
use std::cell::RefCell;
use std::fs;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Checks if `git` can be run on the host system.
pub fn is_git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Converts a temporary directory path into a UTF-8 path.
pub fn utf8_path(dir: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("temp dir should be UTF-8")
}

/// A committed Git repository containing a minimal Meson project.
pub struct GitProject {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl GitProject {
    /// Initialises the repository and commits `meson.build`, a C source
    /// file, a `.gitignore` and the dist manifest.
    pub fn create() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let root = utf8_path(&dir).join("proj");
        fs::create_dir_all(root.join("src")).expect("create src");
        fs::write(root.join("meson.build"), "project('proj', 'c')\n").expect("write meson.build");
        fs::write(root.join("src/main.c"), "int main(void) { return 0; }\n")
            .expect("write main.c");
        fs::write(root.join(".gitignore"), "build/\n").expect("write .gitignore");
        fs::write(
            root.join("dist.toml"),
            "[project]\nname = \"proj\"\nversion = \"1.0\"\n\n[build]\ndriver = \"ninja\"\n",
        )
        .expect("write dist.toml");

        let project = Self { _dir: dir, root };
        project.git(&["init", "--quiet"]);
        project.git(&["add", "."]);
        project.git(&[
            "-c",
            "user.name=Dist Tests",
            "-c",
            "user.email=dist@example.invalid",
            "commit",
            "--quiet",
            "-m",
            "Initial commit",
        ]);
        project
    }

    /// Root of the working tree.
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Build directory inside the working tree (ignored by Git).
    pub fn build_dir(&self) -> Utf8PathBuf {
        self.root.join("build")
    }

    /// Runs `git` in the working tree, panicking on failure.
    pub fn git(&self, args: &[&str]) {
        let status = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .status()
            .expect("failed to run git");
        assert!(status.success(), "git {args:?} failed");
    }
}

/// Runs VCS commands for real and answers every other program with success.
///
/// Build tool invocations are recorded so tests can check what the
/// verification stage asked for.
#[derive(Default)]
pub struct BuildToolStandIn {
    build_calls: RefCell<Vec<Invocation>>,
}

impl BuildToolStandIn {
    /// Build tool invocations received so far.
    pub fn build_calls(&self) -> Vec<Invocation> {
        self.build_calls.borrow().clone()
    }
}

impl CommandExecutor for BuildToolStandIn {
    fn run(&self, invocation: &Invocation) -> Result<Output> {
        match invocation.program() {
            "git" | "hg" => SystemCommandExecutor.run(invocation),
            _ => {
                self.build_calls.borrow_mut().push(invocation.clone());
                Ok(success_output())
            }
        }
    }
}
