//! Project metadata loading.
//!
//! The dist pipeline needs the project name and version, the registered
//! dist scripts and, optionally, the build tool to verify with. They are
//! read from a small TOML manifest:
//!
//! ```toml
//! [project]
//! name = "proj"
//! version = "1.0"
//!
//! [[dist_script]]
//! exe = "scripts/gen-version.sh"
//! args = ["--stamp"]
//!
//! [build]
//! configure = ["meson"]
//! driver = "ninja"
//! ```

use crate::error::{DistError, Result};
use crate::format::ArchiveFormat;
use crate::hooks::DistHook;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;

/// Project identity used to name the snapshot and the archives.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectInfo {
    /// Project name.
    pub name: String,
    /// Project version.
    pub version: String,
}

impl ProjectInfo {
    /// The `<name>-<version>` directory and archive stem.
    ///
    /// # Examples
    ///
    /// ```
    /// use meson_dist::manifest::ProjectInfo;
    ///
    /// let project = ProjectInfo { name: "proj".to_owned(), version: "1.0".to_owned() };
    /// assert_eq!(project.dist_name(), "proj-1.0");
    /// ```
    #[must_use]
    pub fn dist_name(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }
}

/// Build tool overrides from the `[build]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildSection {
    /// Command used to configure the unpacked tree, e.g. `["meson"]`.
    pub configure: Option<Vec<String>>,
    /// Low-level build driver, e.g. `"ninja"`.
    pub driver: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    project: ProjectInfo,
    #[serde(default)]
    dist_script: Vec<RawHook>,
    #[serde(default)]
    build: BuildSection,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawHook {
    exe: String,
    #[serde(default)]
    args: Vec<String>,
}

/// Parsed project manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectManifest {
    /// Project identity.
    pub project: ProjectInfo,
    /// Dist scripts in registration order.
    pub hooks: Vec<DistHook>,
    /// Build tool overrides.
    pub build: BuildSection,
}

impl ProjectManifest {
    /// Load the manifest at `path`, resolving relative hook paths against
    /// `source_root`.
    ///
    /// # Errors
    ///
    /// Returns [`DistError::ManifestNotFound`] if the file is missing and
    /// [`DistError::InvalidManifest`] if it cannot be parsed.
    pub fn load(path: &Utf8Path, source_root: &Utf8Path) -> Result<Self> {
        if !path.exists() {
            return Err(DistError::ManifestNotFound {
                path: path.to_owned(),
            });
        }
        let contents = std::fs::read_to_string(path)?;
        parse_manifest(&contents, source_root).map_err(|reason| DistError::InvalidManifest {
            path: path.to_owned(),
            reason,
        })
    }
}

/// Parse manifest text. Errors are returned as a plain reason string so the
/// caller can attach the file path.
fn parse_manifest(contents: &str, source_root: &Utf8Path) -> std::result::Result<ProjectManifest, String> {
    let raw: RawManifest = toml::from_str(contents).map_err(|e| e.message().to_owned())?;

    if raw.project.name.trim().is_empty() {
        return Err("project.name must not be empty".to_owned());
    }
    if raw.project.version.trim().is_empty() {
        return Err("project.version must not be empty".to_owned());
    }
    if raw.build.configure.as_ref().is_some_and(Vec::is_empty) {
        return Err("build.configure must name a command".to_owned());
    }

    let hooks = raw
        .dist_script
        .into_iter()
        .map(|hook| DistHook::new(resolve_hook_exe(&hook.exe, source_root), hook.args))
        .collect();

    Ok(ProjectManifest {
        project: raw.project,
        hooks,
        build: raw.build,
    })
}

/// Resolve a relative script path against the source root. Bare program
/// names are left for the OS to find on `PATH`.
fn resolve_hook_exe(exe: &str, source_root: &Utf8Path) -> String {
    let path = Utf8Path::new(exe);
    if path.is_relative() && path.components().count() > 1 {
        source_root.join(path).into_string()
    } else {
        exe.to_owned()
    }
}

/// Everything the pipeline needs to know about one dist run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistRequest {
    /// Project identity.
    pub project: ProjectInfo,
    /// Requested archive formats; never empty, first one is verified.
    pub formats: Vec<ArchiveFormat>,
    /// Dist scripts to run against the snapshot.
    pub hooks: Vec<DistHook>,
}

impl DistRequest {
    /// The `<name>-<version>` snapshot and archive stem.
    #[must_use]
    pub fn dist_name(&self) -> String {
        self.project.dist_name()
    }
}

/// Source and build directory pair for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistLayout {
    source_root: Utf8PathBuf,
    build_root: Utf8PathBuf,
}

impl DistLayout {
    /// Create a layout from already-absolute directories.
    #[must_use]
    pub fn new(source_root: Utf8PathBuf, build_root: Utf8PathBuf) -> Self {
        Self {
            source_root,
            build_root,
        }
    }

    /// Canonicalise both directories, creating the build directory if
    /// needed, so every derived path is absolute.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if either directory cannot be resolved, or
    /// [`DistError::NonUtf8Path`] if the resolved path is not UTF-8.
    pub fn resolve(source_dir: &Utf8Path, build_dir: &Utf8Path) -> Result<Self> {
        std::fs::create_dir_all(build_dir)?;
        Ok(Self::new(canonical(source_dir)?, canonical(build_dir)?))
    }

    /// Source tree root.
    #[must_use]
    pub fn source_root(&self) -> &Utf8Path {
        &self.source_root
    }

    /// Build directory root.
    #[must_use]
    pub fn build_root(&self) -> &Utf8Path {
        &self.build_root
    }

    /// Directory receiving the snapshot and the archives.
    #[must_use]
    pub fn dist_dir(&self) -> Utf8PathBuf {
        self.build_root.join("meson-dist")
    }

    /// Private scratch area for verification.
    #[must_use]
    pub fn private_dir(&self) -> Utf8PathBuf {
        self.build_root.join("meson-private")
    }
}

fn canonical(path: &Utf8Path) -> Result<Utf8PathBuf> {
    let resolved = std::fs::canonicalize(path)?;
    Utf8PathBuf::from_path_buf(resolved).map_err(|p| DistError::NonUtf8Path {
        path: p.display().to_string(),
    })
}
