//! Archive format selection.
//!
//! Only the three formats below are produced. The requested list is
//! validated before any version-control command runs, so a typo never
//! leaves a half-built snapshot behind.

use crate::error::{DistError, Result};
use camino::Utf8Path;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// A supported release archive format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveFormat {
    /// Gzip-compressed tarball (`.tar.gz`).
    Gztar,
    /// XZ-compressed tarball (`.tar.xz`).
    Xztar,
    /// Zip archive (`.zip`).
    Zip,
}

impl ArchiveFormat {
    /// Every supported format, in canonical order.
    pub const ALL: [Self; 3] = [Self::Gztar, Self::Xztar, Self::Zip];

    /// The format name accepted on the command line.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Gztar => "gztar",
            Self::Xztar => "xztar",
            Self::Zip => "zip",
        }
    }

    /// File extension, including the leading dot.
    ///
    /// # Examples
    ///
    /// ```
    /// use meson_dist::format::ArchiveFormat;
    ///
    /// assert_eq!(ArchiveFormat::Gztar.extension(), ".tar.gz");
    /// assert_eq!(ArchiveFormat::Zip.extension(), ".zip");
    /// ```
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Gztar => ".tar.gz",
            Self::Xztar => ".tar.xz",
            Self::Zip => ".zip",
        }
    }

    /// Infer the format of an existing archive from its file name.
    #[must_use]
    pub fn from_archive_path(path: &Utf8Path) -> Option<Self> {
        let name = path.file_name()?;
        Self::ALL
            .into_iter()
            .find(|format| name.ends_with(format.extension()))
    }

    /// Comma-separated list of accepted names, for error messages.
    #[must_use]
    pub fn permitted() -> String {
        Self::ALL
            .iter()
            .map(|format| format.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ArchiveFormat {
    type Err = DistError;

    fn from_str(value: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|format| format.name() == value)
            .ok_or_else(|| DistError::UnsupportedFormat {
                value: value.to_owned(),
                permitted: Self::permitted(),
            })
    }
}

/// Parse a comma-separated format list such as `"gztar,zip"`.
///
/// Duplicates are dropped, keeping the first occurrence, so the first
/// element is always the first format the user asked for.
///
/// # Errors
///
/// Returns [`DistError::EmptyFormatList`] for an empty list and
/// [`DistError::UnsupportedFormat`] for any name outside the permitted set,
/// including empty items such as the trailing one in `"gztar,"`.
///
/// # Examples
///
/// ```
/// use meson_dist::format::{ArchiveFormat, parse_formats};
///
/// let formats = parse_formats("gztar,zip").expect("valid list");
/// assert_eq!(formats, vec![ArchiveFormat::Gztar, ArchiveFormat::Zip]);
/// assert!(parse_formats("rar").is_err());
/// ```
pub fn parse_formats(list: &str) -> Result<Vec<ArchiveFormat>> {
    if list.trim().is_empty() {
        return Err(DistError::EmptyFormatList);
    }

    let mut formats = Vec::new();
    for item in list.split(',') {
        let format = item.trim().parse::<ArchiveFormat>()?;
        if !formats.contains(&format) {
            formats.push(format);
        }
    }
    Ok(formats)
}
