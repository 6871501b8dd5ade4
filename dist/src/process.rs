//! External process execution.
//!
//! Every child process the pipeline starts (VCS commands, dist hooks, the
//! nested build) goes through [`CommandExecutor`], which lets tests script
//! the outcome of each call. Environment additions travel with the
//! [`Invocation`] and are applied to the child only; the parent process
//! environment is never modified.

use crate::error::{DistError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;
use std::process::{Command, Output, Stdio};

/// A single external command to run.
///
/// # Examples
///
/// ```
/// use meson_dist::process::Invocation;
///
/// let invocation = Invocation::new("ninja")
///     .arg("install")
///     .current_dir("/tmp/build")
///     .env("DESTDIR", "/tmp/install");
/// assert_eq!(invocation.to_string(), "ninja install");
/// assert_eq!(invocation.env_value("DESTDIR"), Some("/tmp/install"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
    current_dir: Option<Utf8PathBuf>,
    env: Vec<(String, String)>,
    capture: bool,
}

impl Invocation {
    /// Create an invocation of `program` with inherited stdio.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            env: Vec::new(),
            capture: false,
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run the child in `dir`.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Add `key=value` to the child's environment on top of the inherited one.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Capture stdout and stderr instead of forwarding them to the terminal.
    #[must_use]
    pub fn captured(mut self) -> Self {
        self.capture = true;
        self
    }

    /// Program name or path.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments, in order.
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Working directory, if one was set.
    #[must_use]
    pub fn working_dir(&self) -> Option<&Utf8Path> {
        self.current_dir.as_deref()
    }

    /// Environment additions, in insertion order.
    #[must_use]
    pub fn env_additions(&self) -> &[(String, String)] {
        &self.env
    }

    /// Look up an environment addition by name. The last assignment wins.
    #[must_use]
    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Whether output is captured.
    #[must_use]
    pub fn is_captured(&self) -> bool {
        self.capture
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir.as_std_path());
        }
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        cmd
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Abstraction for running external commands.
#[cfg_attr(test, mockall::automock)]
pub trait CommandExecutor {
    /// Run `invocation` to completion and return its output.
    ///
    /// Stdout and stderr are empty unless the invocation asked for capture.
    ///
    /// # Errors
    ///
    /// Returns [`DistError::Launch`] if the program cannot be started.
    fn run(&self, invocation: &Invocation) -> Result<Output>;
}

/// Executes commands on the host system, blocking until each exits.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandExecutor;

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, invocation: &Invocation) -> Result<Output> {
        log::debug!("running {invocation}");
        let mut cmd = invocation.to_command();
        let launch_error = |source| DistError::Launch {
            program: invocation.program().to_owned(),
            source,
        };

        if invocation.is_captured() {
            cmd.stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());
            return cmd.output().map_err(launch_error);
        }

        let status = cmd.status().map_err(launch_error)?;
        Ok(Output {
            status,
            stdout: Vec::new(),
            stderr: Vec::new(),
        })
    }
}

/// Run `invocation` with captured output, mapping a non-zero exit to
/// [`DistError::Vcs`] labelled with `operation`.
pub(crate) fn run_checked(
    executor: &dyn CommandExecutor,
    invocation: &Invocation,
    operation: &str,
) -> Result<Output> {
    let output = executor.run(invocation)?;
    if output.status.success() {
        Ok(output)
    } else {
        Err(DistError::vcs(operation, &output))
    }
}

/// Returns true if the given command executes successfully.
pub(crate) fn command_succeeds(executor: &dyn CommandExecutor, invocation: &Invocation) -> bool {
    executor.run(invocation).is_ok_and(|o| o.status.success())
}
