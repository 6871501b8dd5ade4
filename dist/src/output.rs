//! Console output for dist runs.
//!
//! Progress and warnings go to an injected writer so tests can capture
//! them; the final report is rendered either as human-readable text or as
//! JSON for release tooling.

use crate::pipeline::PipelineReport;
use crate::verify::VerifyOutcome;
use serde::Serialize;
use std::fmt;
use std::io::Write;

/// Write one line to `stderr`, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}

/// Format a pipeline report for humans.
///
/// # Examples
///
/// ```
/// use meson_dist::output::format_human;
/// use meson_dist::pipeline::PipelineReport;
/// use meson_dist::verify::{VerifyOutcome, VerifyStage};
///
/// let report = PipelineReport {
///     artifacts: Vec::new(),
///     outcome: VerifyOutcome::Failed(VerifyStage::Test),
/// };
/// assert!(format_human(&report).contains("tests failed"));
/// ```
#[must_use]
pub fn format_human(report: &PipelineReport) -> String {
    match report.outcome {
        VerifyOutcome::Passed => {
            let mut output = String::from("Created:\n");
            for artifact in &report.artifacts {
                output.push_str(&format!("  {}\n", artifact.path));
                if let Some(digest) = &artifact.digest {
                    output.push_str(&format!("    sha256 {digest}\n"));
                }
            }
            output
        }
        VerifyOutcome::Failed(stage) => {
            let mut output = format!(
                "Verification failed: {}. No checksums were written.\n",
                stage.failure_message()
            );
            if !report.artifacts.is_empty() {
                output.push_str("Archives kept for inspection:\n");
                for artifact in &report.artifacts {
                    output.push_str(&format!("  {}\n", artifact.path));
                }
            }
            output
        }
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    passed: bool,
    #[serde(flatten)]
    report: &'a PipelineReport,
}

/// Format a pipeline report as pretty-printed JSON.
///
/// # Examples
///
/// ```
/// use meson_dist::output::format_json;
/// use meson_dist::pipeline::PipelineReport;
/// use meson_dist::verify::VerifyOutcome;
///
/// let report = PipelineReport { artifacts: Vec::new(), outcome: VerifyOutcome::Passed };
/// let json = format_json(&report);
/// assert!(json.contains("\"passed\": true"));
/// ```
#[must_use]
pub fn format_json(report: &PipelineReport) -> String {
    let json = JsonReport {
        passed: report.outcome.passed(),
        report,
    };
    serde_json::to_string_pretty(&json).unwrap_or_else(|_| "{}".to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveArtifact;
    use crate::digest::Sha256Digest;
    use crate::format::ArchiveFormat;
    use crate::verify::VerifyStage;
    use camino::Utf8PathBuf;
    use serde_json::Value;

    fn artifact(name: &str, format: ArchiveFormat, digest: Option<&str>) -> ArchiveArtifact {
        ArchiveArtifact {
            path: Utf8PathBuf::from(format!("/b/meson-dist/{name}")),
            format,
            digest: digest.map(|d| Sha256Digest::try_from(d).expect("valid digest")),
        }
    }

    #[test]
    fn human_lists_archives_and_digests() {
        let hex = "b".repeat(64);
        let report = PipelineReport {
            artifacts: vec![
                artifact("proj-1.0.tar.gz", ArchiveFormat::Gztar, Some(&hex)),
                artifact("proj-1.0.zip", ArchiveFormat::Zip, Some(&hex)),
            ],
            outcome: VerifyOutcome::Passed,
        };
        let text = format_human(&report);
        assert!(text.contains("/b/meson-dist/proj-1.0.tar.gz"));
        assert!(text.contains("/b/meson-dist/proj-1.0.zip"));
        assert!(text.contains(&format!("sha256 {hex}")));
    }

    #[test]
    fn human_failure_keeps_archive_paths() {
        let report = PipelineReport {
            artifacts: vec![artifact("proj-1.0.tar.xz", ArchiveFormat::Xztar, None)],
            outcome: VerifyOutcome::Failed(VerifyStage::Install),
        };
        let text = format_human(&report);
        assert!(text.contains("install failed"));
        assert!(text.contains("No checksums were written"));
        assert!(text.contains("proj-1.0.tar.xz"));
    }

    #[test]
    fn json_report_has_stable_shape() {
        let hex = "c".repeat(64);
        let report = PipelineReport {
            artifacts: vec![artifact("proj-1.0.zip", ArchiveFormat::Zip, Some(&hex))],
            outcome: VerifyOutcome::Passed,
        };
        let parsed: Value = serde_json::from_str(&format_json(&report)).expect("valid JSON");

        assert_eq!(parsed["passed"], Value::Bool(true));
        assert_eq!(parsed["outcome"], "passed");
        assert_eq!(parsed["artifacts"][0]["format"], "zip");
        assert_eq!(parsed["artifacts"][0]["path"], "/b/meson-dist/proj-1.0.zip");
        assert_eq!(parsed["artifacts"][0]["digest"], Value::String(hex));
    }

    #[test]
    fn json_failure_names_the_stage() {
        let report = PipelineReport {
            artifacts: vec![artifact("proj-1.0.zip", ArchiveFormat::Zip, None)],
            outcome: VerifyOutcome::Failed(VerifyStage::Configure),
        };
        let parsed: Value = serde_json::from_str(&format_json(&report)).expect("valid JSON");

        assert_eq!(parsed["passed"], Value::Bool(false));
        assert_eq!(parsed["outcome"]["failed"], "configure");
        assert_eq!(parsed["artifacts"][0]["digest"], Value::Null);
    }

    #[test]
    fn write_stderr_line_appends_newline() {
        let mut buffer = Vec::new();
        write_stderr_line(&mut buffer, "hello");
        assert_eq!(buffer, b"hello\n");
    }
}
