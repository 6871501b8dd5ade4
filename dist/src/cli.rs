//! CLI argument definitions for meson-dist.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the entrypoint so argument handling can be tested without running
//! the pipeline.

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;

/// File name of the project manifest looked up in the source directory.
pub const DEFAULT_MANIFEST: &str = "dist.toml";

/// Create verified source release archives.
#[derive(Parser, Debug, Clone)]
#[command(name = "meson-dist")]
#[command(version, about)]
#[command(long_about = concat!(
    "Create verified source release archives.\n\n",
    "meson-dist exports a clean snapshot of a Git or Mercurial checkout, runs ",
    "the project's dist scripts against it, and packs it into one archive per ",
    "requested format under <build-dir>/meson-dist. The first archive is then ",
    "unpacked, configured, built, tested and installed into scratch space. ",
    "Only when that succeeds is a .sha256sum checksum written next to every ",
    "archive.",
))]
#[command(after_help = concat!(
    "FORMATS:\n",
    "  gztar    .tar.gz\n",
    "  xztar    .tar.xz (default)\n",
    "  zip      .zip\n\n",
    "EXAMPLES:\n",
    "  Package the project in the current directory:\n",
    "    $ meson-dist\n\n",
    "  Produce both a gzip tarball and a zip file:\n",
    "    $ meson-dist --formats gztar,zip\n\n",
    "  Use a separate build directory and emit a JSON report:\n",
    "    $ meson-dist -C _build --json\n",
))]
pub struct Cli {
    /// Root of the source checkout.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub source_dir: Utf8PathBuf,

    /// Build directory; archives are written to its meson-dist subdirectory.
    #[arg(short = 'C', long, value_name = "DIR", default_value = "build")]
    pub build_dir: Utf8PathBuf,

    /// Comma-separated list of archive formats.
    #[arg(long, value_name = "LIST", default_value = "xztar")]
    pub formats: String,

    /// Project manifest [default: <source-dir>/dist.toml].
    #[arg(long, value_name = "PATH")]
    pub manifest: Option<Utf8PathBuf>,

    /// Suppress progress output (warnings and errors still shown).
    #[arg(short, long)]
    pub quiet: bool,

    /// Print the final report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// The manifest path, defaulting to `dist.toml` in `source_root`.
    #[must_use]
    pub fn manifest_path(&self, source_root: &Utf8Path) -> Utf8PathBuf {
        self.manifest
            .clone()
            .unwrap_or_else(|| source_root.join(DEFAULT_MANIFEST))
    }
}

impl Default for Cli {
    /// Creates a `Cli` with the same values as an empty command line.
    ///
    /// # Examples
    ///
    /// ```
    /// use meson_dist::cli::Cli;
    ///
    /// let cli = Cli::default();
    /// assert_eq!(cli.formats, "xztar");
    /// assert!(!cli.quiet);
    /// ```
    fn default() -> Self {
        Self {
            source_dir: Utf8PathBuf::from("."),
            build_dir: Utf8PathBuf::from("build"),
            formats: "xztar".to_owned(),
            manifest: None,
            quiet: false,
            json: false,
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
