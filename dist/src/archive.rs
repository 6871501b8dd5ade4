//! Release archive construction.
//!
//! Each requested format gets one archive next to the snapshot, named
//! `<project>-<version><ext>`, whose single top-level entry is the snapshot
//! directory. Archives are reproducible: entries are written in sorted
//! order with fixed timestamps and ownership, so two runs over the same
//! tree produce byte-identical files.

use crate::digest::{Sha256Digest, sidecar_path};
use crate::error::{DistError, Result};
use crate::format::ArchiveFormat;
use crate::vcs::Snapshot;
use camino::{Utf8Path, Utf8PathBuf};
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use walkdir::WalkDir;
use xz2::write::XzEncoder;
use zip::write::SimpleFileOptions;

/// Compression preset used for `.tar.xz` archives.
const XZ_PRESET: u32 = 6;

/// A finished release archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveArtifact {
    /// Absolute path of the archive.
    pub path: Utf8PathBuf,
    /// Format the archive was written in.
    pub format: ArchiveFormat,
    /// Recorded digest, set once the archive has been verified and stamped.
    pub digest: Option<Sha256Digest>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Dir,
    File,
    Symlink,
}

/// One file-system entry of the snapshot, with its in-archive name.
#[derive(Debug)]
struct SnapshotEntry {
    source: Utf8PathBuf,
    name: String,
    kind: EntryKind,
    mode: u32,
}

/// Write one archive per format for `snapshot`, then delete the snapshot.
///
/// The returned artifacts keep the order of `formats`. Any stale archive or
/// checksum file from an earlier run is replaced.
///
/// # Errors
///
/// Returns an I/O or zip error if the snapshot cannot be read or an archive
/// cannot be written. The snapshot is only removed once every archive has
/// been written.
pub fn build_archives(
    snapshot: &Snapshot,
    formats: &[ArchiveFormat],
) -> Result<Vec<ArchiveArtifact>> {
    let entries = collect_entries(snapshot)?;
    log::debug!(
        "archiving {} entries from {}",
        entries.len(),
        snapshot.root()
    );

    let mut artifacts = Vec::with_capacity(formats.len());
    for &format in formats {
        let path = snapshot
            .parent()
            .join(format!("{}{}", snapshot.name(), format.extension()));
        remove_if_present(&sidecar_path(&path))?;
        write_archive(format, &path, &entries)?;
        log::info!("created {path}");
        artifacts.push(ArchiveArtifact {
            path,
            format,
            digest: None,
        });
    }

    fs::remove_dir_all(snapshot.root())?;
    Ok(artifacts)
}

fn remove_if_present(path: &Utf8Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Walk the snapshot in sorted order, without following symlinks.
fn collect_entries(snapshot: &Snapshot) -> Result<Vec<SnapshotEntry>> {
    let root = snapshot.root();
    let mut entries = Vec::new();

    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        let source = Utf8Path::from_path(entry.path())
            .ok_or_else(|| DistError::NonUtf8Path {
                path: entry.path().display().to_string(),
            })?
            .to_owned();
        let relative = source.strip_prefix(root).unwrap_or(&source);
        let name = archive_name(snapshot.name(), relative);

        let file_type = entry.file_type();
        let kind = if file_type.is_symlink() {
            EntryKind::Symlink
        } else if file_type.is_dir() {
            EntryKind::Dir
        } else {
            EntryKind::File
        };
        let mode = unix_mode(&entry.metadata().map_err(io::Error::from)?, kind);

        entries.push(SnapshotEntry {
            source,
            name,
            kind,
            mode,
        });
    }
    Ok(entries)
}

/// `<top>/<relative>` with forward slashes, or just `<top>` for the root.
fn archive_name(top: &str, relative: &Utf8Path) -> String {
    relative
        .components()
        .fold(top.to_owned(), |mut name, component| {
            name.push('/');
            name.push_str(component.as_str());
            name
        })
}

#[cfg(unix)]
fn unix_mode(metadata: &fs::Metadata, _kind: EntryKind) -> u32 {
    use std::os::unix::fs::PermissionsExt;

    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn unix_mode(_metadata: &fs::Metadata, kind: EntryKind) -> u32 {
    match kind {
        EntryKind::Dir => 0o755,
        EntryKind::File | EntryKind::Symlink => 0o644,
    }
}

fn write_archive(format: ArchiveFormat, path: &Utf8Path, entries: &[SnapshotEntry]) -> Result<()> {
    let file = fs::File::create(path)?;
    match format {
        ArchiveFormat::Gztar => {
            let encoder = write_tar(GzEncoder::new(file, Compression::default()), entries)?;
            encoder.finish()?;
        }
        ArchiveFormat::Xztar => {
            let encoder = write_tar(XzEncoder::new(file, XZ_PRESET), entries)?;
            encoder.finish()?;
        }
        ArchiveFormat::Zip => write_zip(file, entries)?,
    }
    Ok(())
}

/// Append every entry to a tar stream and hand back the inner writer so
/// the caller can finish the compressor.
fn write_tar<W: Write>(writer: W, entries: &[SnapshotEntry]) -> Result<W> {
    let mut builder = tar::Builder::new(writer);
    builder.mode(tar::HeaderMode::Deterministic);
    builder.follow_symlinks(false);

    for entry in entries {
        builder.append_path_with_name(&entry.source, &entry.name)?;
    }

    Ok(builder.into_inner()?)
}

fn write_zip(file: fs::File, entries: &[SnapshotEntry]) -> Result<()> {
    let mut zip = zip::ZipWriter::new(file);

    for entry in entries {
        let options = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default())
            .unix_permissions(entry.mode);
        match entry.kind {
            EntryKind::Dir => zip.add_directory(entry.name.as_str(), options)?,
            EntryKind::File => {
                zip.start_file(entry.name.as_str(), options)?;
                let mut source = fs::File::open(&entry.source)?;
                io::copy(&mut source, &mut zip)?;
            }
            EntryKind::Symlink => {
                let target = fs::read_link(&entry.source)?;
                let target = Utf8PathBuf::from_path_buf(target).map_err(|p| {
                    DistError::NonUtf8Path {
                        path: p.display().to_string(),
                    }
                })?;
                zip.add_symlink(entry.name.as_str(), target.as_str(), options)?;
            }
        }
    }

    zip.finish()?;
    Ok(())
}
