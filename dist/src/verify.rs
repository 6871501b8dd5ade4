//! Build-from-archive verification.
//!
//! The representative archive is unpacked into private scratch space and
//! taken through configure, build, test and install exactly as a
//! downstream packager would. The scratch directories are removed on every
//! path out of [`verify`], including early errors.

use crate::error::{DistError, Result};
use crate::manifest::BuildSection;
use crate::output::write_stderr_line;
use crate::process::{CommandExecutor, Invocation, command_succeeds};
use crate::unpack::{single_top_level_dir, unpack_archive};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::io::{self, Write};

/// Environment variable redirecting the install step into scratch space.
pub const DESTDIR_ENV: &str = "DESTDIR";

/// Build drivers probed, in order, when none is configured.
const NINJA_CANDIDATES: [&str; 2] = ["ninja", "ninja-build"];

/// Default configure command.
const DEFAULT_CONFIGURE: &str = "meson";

/// Generator backend forced on the configure step.
const BACKEND_ARG: &str = "--backend=ninja";

/// The configure command and the low-level driver used to verify archives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTool {
    configure: Vec<String>,
    driver: String,
}

impl BuildTool {
    /// Create a build tool from an explicit configure command and driver.
    ///
    /// An empty `configure` falls back to `meson`.
    #[must_use]
    pub fn new(configure: Vec<String>, driver: impl Into<String>) -> Self {
        let configure = if configure.is_empty() {
            vec![DEFAULT_CONFIGURE.to_owned()]
        } else {
            configure
        };
        Self {
            configure,
            driver: driver.into(),
        }
    }

    /// Resolve the build tool from manifest overrides, probing for a Ninja
    /// binary when no driver is set.
    ///
    /// # Errors
    ///
    /// Returns [`DistError::BuildToolNotFound`] if no driver is configured
    /// and neither `ninja` nor `ninja-build` runs.
    pub fn resolve(executor: &dyn CommandExecutor, section: &BuildSection) -> Result<Self> {
        let driver = match &section.driver {
            Some(driver) => driver.clone(),
            None => detect_ninja(executor)?,
        };
        Ok(Self::new(section.configure.clone().unwrap_or_default(), driver))
    }

    /// Configure command and its leading arguments.
    #[must_use]
    pub fn configure(&self) -> &[String] {
        &self.configure
    }

    /// Low-level build driver.
    #[must_use]
    pub fn driver(&self) -> &str {
        &self.driver
    }

    fn configure_invocation(&self, source_dir: &Utf8Path, build_dir: &Utf8Path) -> Invocation {
        let (program, leading) = self
            .configure
            .split_first()
            .map_or((DEFAULT_CONFIGURE, &[][..]), |(p, rest)| (p.as_str(), rest));
        Invocation::new(program)
            .args(leading.iter().cloned())
            .args([BACKEND_ARG, source_dir.as_str(), build_dir.as_str()])
    }

    fn driver_invocation(&self, build_dir: &Utf8Path) -> Invocation {
        Invocation::new(self.driver.as_str()).current_dir(build_dir)
    }
}

/// Find the first Ninja binary on the host whose `--version` succeeds.
///
/// # Errors
///
/// Returns [`DistError::BuildToolNotFound`] if none of the candidates runs.
pub fn detect_ninja(executor: &dyn CommandExecutor) -> Result<String> {
    NINJA_CANDIDATES
        .iter()
        .find(|candidate| {
            command_succeeds(
                executor,
                &Invocation::new(**candidate).arg("--version").captured(),
            )
        })
        .map(|found| (*found).to_owned())
        .ok_or(DistError::BuildToolNotFound { tool: "ninja" })
}

/// A step of the verification build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifyStage {
    /// Configuring the unpacked tree.
    Configure,
    /// Compiling.
    Build,
    /// Running the test suite.
    Test,
    /// Installing into the scratch destination root.
    Install,
}

impl VerifyStage {
    /// Message reported when this stage fails.
    #[must_use]
    pub const fn failure_message(self) -> &'static str {
        match self {
            Self::Configure => "configure failed",
            Self::Build => "build failed",
            Self::Test => "tests failed",
            Self::Install => "install failed",
        }
    }
}

impl fmt::Display for VerifyStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Configure => "configure",
            Self::Build => "build",
            Self::Test => "test",
            Self::Install => "install",
        })
    }
}

/// Result of verifying an archive that could be unpacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifyOutcome {
    /// Every stage succeeded.
    Passed,
    /// The named stage exited unsuccessfully; later stages did not run.
    Failed(VerifyStage),
}

impl VerifyOutcome {
    /// Whether every stage succeeded.
    #[must_use]
    pub const fn passed(self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Process exit code for this outcome.
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Passed => 0,
            Self::Failed(_) => 1,
        }
    }
}

/// Scratch directories for one verification run.
///
/// Creating the workspace destroys any stale directories of the same name;
/// dropping it removes all three.
#[derive(Debug)]
pub struct VerificationWorkspace {
    unpack: Utf8PathBuf,
    build: Utf8PathBuf,
    install: Utf8PathBuf,
}

impl VerificationWorkspace {
    /// Recreate `dist-unpack`, `dist-build` and `dist-install` under
    /// `scratch_root`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if a directory cannot be removed or created.
    /// Directories created before the failure are cleaned up.
    pub fn create(scratch_root: &Utf8Path) -> Result<Self> {
        let workspace = Self {
            unpack: scratch_root.join("dist-unpack"),
            build: scratch_root.join("dist-build"),
            install: scratch_root.join("dist-install"),
        };
        for dir in workspace.dirs() {
            remove_dir_if_present(dir)?;
            fs::create_dir_all(dir)?;
        }
        Ok(workspace)
    }

    /// Directory the archive is unpacked into.
    #[must_use]
    pub fn unpack_dir(&self) -> &Utf8Path {
        &self.unpack
    }

    /// Out-of-tree build directory.
    #[must_use]
    pub fn build_dir(&self) -> &Utf8Path {
        &self.build
    }

    /// Destination root for the install step.
    #[must_use]
    pub fn install_dir(&self) -> &Utf8Path {
        &self.install
    }

    fn dirs(&self) -> [&Utf8Path; 3] {
        [&self.unpack, &self.build, &self.install]
    }
}

impl Drop for VerificationWorkspace {
    fn drop(&mut self) {
        for dir in self.dirs() {
            if let Err(err) = remove_dir_if_present(dir) {
                log::warn!("failed to remove scratch directory {dir}: {err}");
            }
        }
    }
}

fn remove_dir_if_present(dir: &Utf8Path) -> io::Result<()> {
    match fs::remove_dir_all(dir) {
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Unpack `archive` under `scratch_root` and configure, build, test and
/// install it with `build_tool`.
///
/// Stage failures are returned as [`VerifyOutcome::Failed`]. Child output is
/// forwarded to the terminal.
///
/// # Errors
///
/// Returns [`DistError::PackagingShape`] if the archive does not unpack to a
/// single directory (no configure step is attempted), [`DistError::Launch`]
/// if a build program cannot be started, and I/O or archive errors while
/// unpacking. Scratch directories are removed in every case.
pub fn verify(
    executor: &dyn CommandExecutor,
    archive: &Utf8Path,
    build_tool: &BuildTool,
    scratch_root: &Utf8Path,
    stderr: &mut dyn Write,
) -> Result<VerifyOutcome> {
    write_stderr_line(stderr, format!("Testing distribution package {archive}"));

    let workspace = VerificationWorkspace::create(scratch_root)?;
    unpack_archive(archive, workspace.unpack_dir())?;
    let source_dir = single_top_level_dir(workspace.unpack_dir())?;

    let build_dir = workspace.build_dir();
    let stages = [
        (
            VerifyStage::Configure,
            build_tool.configure_invocation(&source_dir, build_dir),
        ),
        (VerifyStage::Build, build_tool.driver_invocation(build_dir)),
        (
            VerifyStage::Test,
            build_tool.driver_invocation(build_dir).arg("test"),
        ),
        (
            VerifyStage::Install,
            build_tool
                .driver_invocation(build_dir)
                .arg("install")
                .env(DESTDIR_ENV, workspace.install_dir().as_str()),
        ),
    ];

    for (stage, invocation) in stages {
        log::debug!("{stage} stage: {invocation}");
        let output = executor.run(&invocation)?;
        if !output.status.success() {
            log::warn!("{stage} stage of {archive} exited with {}", output.status);
            write_stderr_line(stderr, stage.failure_message());
            return Ok(VerifyOutcome::Failed(stage));
        }
    }

    write_stderr_line(stderr, format!("Distribution package {archive} tested"));
    Ok(VerifyOutcome::Passed)
}
