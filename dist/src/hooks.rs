//! Dist script execution.
//!
//! Dist scripts run against the clean snapshot before it is archived so
//! projects can inject generated files. Each script sees the parent
//! environment plus `MESON_DIST_ROOT`, the absolute snapshot root.

use crate::error::{DistError, Result};
use crate::output::write_stderr_line;
use crate::process::{CommandExecutor, Invocation};
use camino::Utf8Path;
use std::fmt;
use std::io::Write;

/// Environment variable pointing dist scripts at the snapshot root.
pub const DIST_ROOT_ENV: &str = "MESON_DIST_ROOT";

/// A registered dist script: an executable plus its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistHook {
    exe: String,
    args: Vec<String>,
}

impl DistHook {
    /// Create a hook that runs `exe` with `args`.
    #[must_use]
    pub fn new(exe: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            exe: exe.into(),
            args,
        }
    }

    /// Executable path or name.
    #[must_use]
    pub fn exe(&self) -> &str {
        &self.exe
    }

    /// Arguments passed to the executable.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    fn invocation(&self, dist_root: &Utf8Path) -> Invocation {
        Invocation::new(self.exe.as_str())
            .args(self.args.iter().cloned())
            .env(DIST_ROOT_ENV, dist_root.as_str())
    }
}

impl fmt::Display for DistHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.exe)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Run `hooks` in order against the snapshot at `dist_root`.
///
/// Stops at the first hook that cannot be started or exits unsuccessfully;
/// later hooks do not run.
///
/// # Errors
///
/// Returns [`DistError::HookLaunch`] if a hook binary cannot be started and
/// [`DistError::HookFailed`] if a hook exits non-zero.
pub fn run_hooks(
    executor: &dyn CommandExecutor,
    dist_root: &Utf8Path,
    hooks: &[DistHook],
    stderr: &mut dyn Write,
) -> Result<()> {
    debug_assert!(dist_root.is_absolute(), "dist root must be absolute");

    for hook in hooks {
        let name = hook.to_string();
        write_stderr_line(stderr, format!("Running custom dist script '{name}'"));

        let output = executor
            .run(&hook.invocation(dist_root))
            .map_err(|err| match err {
                DistError::Launch { source, .. } => DistError::HookLaunch {
                    hook: name.clone(),
                    source,
                },
                other => other,
            })?;

        if !output.status.success() {
            log::warn!("dist script '{name}' exited with {}", output.status);
            return Err(DistError::HookFailed {
                hook: name,
                status: output.status,
            });
        }
    }

    Ok(())
}
