//! Shared test utilities for the dist crate.

use crate::error::{DistError, Result};
use crate::process::{CommandExecutor, Invocation};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::process::{ExitStatus, Output};

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// Creates a successful command `Output` with empty stdout and stderr.
#[must_use]
pub fn success_output() -> Output {
    output_with_stdout(0, "")
}

/// Creates a command `Output` with the given exit code and stdout.
#[must_use]
pub fn output_with_stdout(code: i32, stdout: &str) -> Output {
    Output {
        status: exit_status(code),
        stdout: stdout.as_bytes().to_vec(),
        stderr: Vec::new(),
    }
}

/// Creates a failed command `Output` with the given stderr message.
#[must_use]
pub fn failure_output(stderr: &str) -> Output {
    Output {
        status: exit_status(1),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Represents an expected command invocation for testing.
#[derive(Debug)]
pub struct ExpectedCall {
    /// The program to execute (e.g., "ninja").
    pub program: &'static str,
    /// The arguments to pass to the program.
    pub args: Vec<String>,
    /// The result to return when this command is invoked.
    pub result: Result<Output>,
    /// Side effect applied to the file system before the result is returned.
    pub effect: Option<fn(&Invocation)>,
}

impl ExpectedCall {
    /// Expect `program args...` and answer with `output`.
    #[must_use]
    pub fn new<I, S>(program: &'static str, args: I, output: Output) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program,
            args: args.into_iter().map(Into::into).collect(),
            result: Ok(output),
            effect: None,
        }
    }

    /// Expect `program args...` and fail as if the binary were missing.
    #[must_use]
    pub fn not_found<I, S>(program: &'static str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program,
            args: args.into_iter().map(Into::into).collect(),
            result: Err(DistError::Launch {
                program: program.to_owned(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            }),
            effect: None,
        }
    }

    /// Run `effect` when this call is matched, e.g. to stand in for the
    /// files a VCS export would have written.
    #[must_use]
    pub fn with_effect(mut self, effect: fn(&Invocation)) -> Self {
        self.effect = Some(effect);
        self
    }
}

/// Write a minimal project tree into the directory named by the last
/// argument of `invocation`, as `git clone` or `hg archive` would.
///
/// # Panics
///
/// Panics if the invocation has no arguments or the tree cannot be written.
pub fn export_sample_project(invocation: &Invocation) {
    let dest = invocation
        .arguments()
        .last()
        .map(camino::Utf8PathBuf::from)
        .expect("export destination argument");
    std::fs::create_dir_all(dest.join("src")).expect("create sample tree");
    std::fs::write(dest.join("meson.build"), "project('proj', 'c')\n").expect("write meson.build");
    std::fs::write(dest.join("src/main.c"), "int main(void) { return 0; }\n")
        .expect("write main.c");
}

/// A stub implementation of `CommandExecutor` for testing.
///
/// Answers expected command invocations in order with predefined results
/// and records every invocation so tests can inspect working directories
/// and environment additions afterwards.
#[derive(Debug)]
pub struct StubExecutor {
    expected: RefCell<VecDeque<ExpectedCall>>,
    calls: RefCell<Vec<Invocation>>,
}

impl StubExecutor {
    /// Creates a new `StubExecutor` with the given expected calls.
    #[must_use]
    pub fn new(expected: Vec<ExpectedCall>) -> Self {
        Self {
            expected: RefCell::new(expected.into()),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Returns every invocation received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }

    /// Asserts that all expected command invocations have been consumed.
    ///
    /// # Panics
    ///
    /// Panics if there are remaining expected calls that were not invoked.
    pub fn assert_finished(&self) {
        let remaining = self.expected.borrow();
        assert!(
            remaining.is_empty(),
            "expected no further command invocations, {} remain: {:?}",
            remaining.len(),
            remaining.iter().map(|c| c.program).collect::<Vec<_>>()
        );
    }
}

impl CommandExecutor for StubExecutor {
    fn run(&self, invocation: &Invocation) -> Result<Output> {
        self.calls.borrow_mut().push(invocation.clone());
        let Some(call) = self.expected.borrow_mut().pop_front() else {
            return Err(DistError::StubMismatch {
                message: format!("unexpected command invocation: {invocation}"),
            });
        };

        if call.program != invocation.program() || call.args.as_slice() != invocation.arguments() {
            return Err(DistError::StubMismatch {
                message: format!(
                    "expected `{} {}`, got `{invocation}`",
                    call.program,
                    call.args.join(" ")
                ),
            });
        }

        if let Some(effect) = call.effect {
            effect(invocation);
        }
        call.result
    }
}
