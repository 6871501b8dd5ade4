//! SHA-256 integrity stamps for release archives.
//!
//! Each verified archive gets a sidecar `<archive>.sha256sum` holding the
//! lowercase hex digest and the archive's base name, in the layout
//! `sha256sum -c` accepts.

use crate::error::{DistError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::io;

/// Expected length of a hex-encoded SHA-256 digest.
const DIGEST_HEX_LEN: usize = 64;

/// Suffix appended to an archive path to name its checksum file.
pub const SIDECAR_SUFFIX: &str = ".sha256sum";

/// A validated hex-encoded SHA-256 digest string.
///
/// # Examples
///
/// ```
/// use meson_dist::digest::Sha256Digest;
///
/// let hex = "a".repeat(64);
/// let digest = Sha256Digest::try_from(hex.as_str()).expect("valid digest");
/// assert_eq!(digest.as_str().len(), 64);
/// assert!(Sha256Digest::try_from("abc").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Sha256Digest(String);

impl Sha256Digest {
    /// Return the digest as a hex string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for Sha256Digest {
    type Error = DistError;

    fn try_from(value: &str) -> Result<Self> {
        validate_sha256(value)?;
        Ok(Self(value.to_owned()))
    }
}

impl TryFrom<String> for Sha256Digest {
    type Error = DistError;

    fn try_from(value: String) -> Result<Self> {
        validate_sha256(&value)?;
        Ok(Self(value))
    }
}

impl AsRef<str> for Sha256Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn validate_sha256(value: &str) -> Result<()> {
    if value.len() != DIGEST_HEX_LEN {
        return Err(DistError::InvalidDigest {
            reason: format!(
                "expected {DIGEST_HEX_LEN} hex characters, got {}",
                value.len()
            ),
        });
    }
    if let Some(bad) = value.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(DistError::InvalidDigest {
            reason: format!("non-hex character '{bad}'"),
        });
    }
    if value.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(DistError::InvalidDigest {
            reason: "digest must be lowercase".to_owned(),
        });
    }
    Ok(())
}

/// Compute the SHA-256 digest of a file, streaming it through the hasher.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be read.
pub fn compute_sha256(path: &Utf8Path) -> Result<Sha256Digest> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    // sha2 always renders 64 lowercase hex characters.
    Ok(Sha256Digest(format!("{:x}", hasher.finalize())))
}

/// Path of the checksum file for `archive`.
#[must_use]
pub fn sidecar_path(archive: &Utf8Path) -> Utf8PathBuf {
    Utf8PathBuf::from(format!("{archive}{SIDECAR_SUFFIX}"))
}

/// Hash `archive` and write `<archive>.sha256sum` next to it.
///
/// Returns the digest that was written.
///
/// # Errors
///
/// Returns an I/O error if the archive cannot be read or the sidecar cannot
/// be written.
pub fn stamp(archive: &Utf8Path) -> Result<Sha256Digest> {
    let digest = compute_sha256(archive)?;
    let name = archive.file_name().unwrap_or(archive.as_str());
    let sidecar = sidecar_path(archive);
    fs::write(&sidecar, format!("{digest}  {name}\n"))?;
    log::info!("wrote {sidecar}");
    Ok(digest)
}

/// Read the digest recorded in `archive`'s sidecar.
///
/// # Errors
///
/// Returns an I/O error if the sidecar is missing, or
/// [`DistError::InvalidDigest`] if its first field is not a digest.
pub fn read_sidecar(archive: &Utf8Path) -> Result<Sha256Digest> {
    let contents = fs::read_to_string(sidecar_path(archive))?;
    let field = contents
        .split_whitespace()
        .next()
        .ok_or_else(|| DistError::InvalidDigest {
            reason: "checksum file is empty".to_owned(),
        })?;
    Sha256Digest::try_from(field)
}

/// Whether `archive` still matches the digest in its sidecar.
///
/// # Errors
///
/// Propagates errors from [`read_sidecar`] and [`compute_sha256`].
pub fn check_sidecar(archive: &Utf8Path) -> Result<bool> {
    let recorded = read_sidecar(archive)?;
    Ok(compute_sha256(archive)? == recorded)
}
