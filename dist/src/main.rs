//! meson-dist CLI entrypoint.
//!
//! This binary snapshots the source checkout, builds the requested release
//! archives, verifies the first one with a full build and, on success,
//! writes a checksum next to every archive.

use clap::Parser;
use meson_dist::cli::Cli;
use meson_dist::error::Result;
use meson_dist::format::parse_formats;
use meson_dist::manifest::{DistLayout, DistRequest, ProjectManifest};
use meson_dist::output::{format_human, format_json, write_stderr_line};
use meson_dist::pipeline::{PipelineContext, PipelineReport, run_pipeline};
use meson_dist::process::{CommandExecutor, SystemCommandExecutor};
use meson_dist::verify::BuildTool;
use std::io::Write;

fn main() {
    let cli = Cli::parse();
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &SystemCommandExecutor, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, cli.json, &mut stdout, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(
    cli: &Cli,
    executor: &dyn CommandExecutor,
    stderr: &mut dyn Write,
) -> Result<PipelineReport> {
    // Step 1: Reject bad format lists before touching the checkout
    let formats = parse_formats(&cli.formats)?;

    // Step 2: Resolve directories and project metadata
    let layout = DistLayout::resolve(&cli.source_dir, &cli.build_dir)?;
    let manifest = ProjectManifest::load(
        &cli.manifest_path(layout.source_root()),
        layout.source_root(),
    )?;
    let build_tool = BuildTool::resolve(executor, &manifest.build)?;
    let request = DistRequest {
        project: manifest.project,
        formats,
        hooks: manifest.hooks,
    };

    // Step 3: Snapshot, archive, verify and stamp
    let context = PipelineContext {
        layout: &layout,
        request: &request,
        build_tool: &build_tool,
        quiet: cli.quiet,
    };
    run_pipeline(executor, &context, stderr)
}

fn exit_code_for_run_result(
    result: Result<PipelineReport>,
    json: bool,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> i32 {
    match result {
        Ok(report) => {
            let rendered = if json {
                format_json(&report)
            } else {
                format_human(&report)
            };
            if writeln!(stdout, "{}", rendered.trim_end()).is_err() {
                // Best-effort output; the exit code still reports the result.
            }
            report.exit_code()
        }
        Err(err) => {
            write_stderr_line(stderr, err);
            1
        }
    }
}
