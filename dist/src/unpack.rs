//! Archive extraction for verification.
//!
//! Unpacks release archives into a scratch directory with path traversal
//! protection, then checks that the archive holds exactly one top-level
//! directory.

use crate::error::{DistError, Result};
use crate::format::ArchiveFormat;
use camino::{Utf8Path, Utf8PathBuf};
use flate2::read::GzDecoder;
use std::fs;
use std::io::{BufReader, Read};
use std::path::{Component, Path};
use xz2::read::XzDecoder;

/// Extract `archive` into `dest`, picking the decoder from the file name.
///
/// # Errors
///
/// Returns [`DistError::UnsupportedFormat`] for an unknown extension,
/// [`DistError::PathTraversal`] if an entry would land outside `dest`, and
/// I/O or zip errors on read failures.
pub fn unpack_archive(archive: &Utf8Path, dest: &Utf8Path) -> Result<()> {
    let format =
        ArchiveFormat::from_archive_path(archive).ok_or_else(|| DistError::UnsupportedFormat {
            value: archive.file_name().unwrap_or(archive.as_str()).to_owned(),
            permitted: ArchiveFormat::permitted(),
        })?;
    fs::create_dir_all(dest)?;
    let file = BufReader::new(fs::File::open(archive)?);
    log::debug!("unpacking {archive} into {dest}");

    match format {
        ArchiveFormat::Gztar => unpack_tar(GzDecoder::new(file), dest),
        ArchiveFormat::Xztar => unpack_tar(XzDecoder::new(file), dest),
        ArchiveFormat::Zip => unpack_zip(file, dest),
    }
}

fn unpack_tar<R: Read>(reader: R, dest: &Utf8Path) -> Result<()> {
    let mut archive = tar::Archive::new(reader);
    archive.set_preserve_permissions(true);

    for entry_result in archive.entries()? {
        let mut entry = entry_result?;
        let entry_path = entry.path()?.into_owned();

        validate_entry_path(&entry_path)?;

        let dest_path = dest.as_std_path().join(&entry_path);
        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent)?;
        }

        entry.unpack(&dest_path)?;
    }
    Ok(())
}

fn unpack_zip<R: Read + std::io::Seek>(reader: R, dest: &Utf8Path) -> Result<()> {
    let mut archive = zip::ZipArchive::new(reader)?;

    for index in 0..archive.len() {
        let entry = archive.by_index_raw(index)?;
        if entry.enclosed_name().is_none() {
            return Err(DistError::PathTraversal {
                path: entry.name().to_owned(),
            });
        }
    }

    archive.extract(dest)?;
    Ok(())
}

/// Validate that an entry path does not escape the destination directory
/// via `..` components or absolute paths.
fn validate_entry_path(path: &Path) -> Result<()> {
    let escapes = path.is_absolute()
        || path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)));
    if escapes {
        return Err(DistError::PathTraversal {
            path: path.display().to_string(),
        });
    }
    Ok(())
}

/// Return the only entry of `dir`, which must be a directory.
///
/// Hidden entries count, so a stray `.DS_Store` next to the project
/// directory is reported rather than ignored.
///
/// # Errors
///
/// Returns [`DistError::PackagingShape`] unless `dir` holds exactly one
/// entry and that entry is a directory.
pub fn single_top_level_dir(dir: &Utf8Path) -> Result<Utf8PathBuf> {
    let mut entries = dir.read_dir_utf8()?.collect::<std::io::Result<Vec<_>>>()?;
    let shape_error = |entries: usize| DistError::PackagingShape {
        dir: dir.to_owned(),
        entries,
    };

    let count = entries.len();
    let Some(entry) = entries.pop().filter(|_| count == 1) else {
        return Err(shape_error(count));
    };
    if !entry.file_type()?.is_dir() {
        return Err(shape_error(1));
    }
    Ok(entry.into_path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::build_archives;
    use crate::vcs::Snapshot;
    use rstest::{fixture, rstest};
    use std::io::Write;
    use std::path::PathBuf;

    struct Scratch {
        _dir: tempfile::TempDir,
        root: Utf8PathBuf,
    }

    #[fixture]
    fn scratch() -> Scratch {
        let dir = tempfile::tempdir().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8");
        Scratch { _dir: dir, root }
    }

    #[rstest]
    #[case::gztar(ArchiveFormat::Gztar)]
    #[case::xztar(ArchiveFormat::Xztar)]
    #[case::zip(ArchiveFormat::Zip)]
    fn unpacks_what_the_builder_wrote(scratch: Scratch, #[case] format: ArchiveFormat) {
        let snapshot_root = scratch.root.join("meson-dist/proj-1.0");
        fs::create_dir_all(snapshot_root.join("src")).expect("mkdir");
        fs::write(snapshot_root.join("src/main.c"), "int x;\n").expect("write");
        fs::write(snapshot_root.join(".clang-format"), "{}\n").expect("write");
        let snapshot = Snapshot::from_existing(snapshot_root).expect("snapshot");
        let artifacts = build_archives(&snapshot, &[format]).expect("build");

        let dest = scratch.root.join("dist-unpack");
        unpack_archive(&artifacts[0].path, &dest).expect("unpack");

        let top = single_top_level_dir(&dest).expect("one directory");
        assert_eq!(top.file_name(), Some("proj-1.0"));
        assert_eq!(
            fs::read_to_string(top.join("src/main.c")).expect("read"),
            "int x;\n"
        );
        assert!(top.join(".clang-format").exists());
    }

    #[rstest]
    #[case::parent_dir("../escape.txt")]
    #[case::nested_parent("foo/../../escape.txt")]
    #[case::absolute("/etc/passwd")]
    fn rejects_path_traversal(#[case] bad_path: &str) {
        let result = validate_entry_path(&PathBuf::from(bad_path));
        assert!(
            matches!(result, Err(DistError::PathTraversal { .. })),
            "expected PathTraversal for {bad_path}"
        );
    }

    #[test]
    fn accepts_normal_paths() {
        assert!(validate_entry_path(Path::new("proj-1.0/src/main.c")).is_ok());
    }

    #[rstest]
    fn zip_with_escaping_entry_is_rejected(scratch: Scratch) {
        let archive = scratch.root.join("evil.zip");
        let mut writer = zip::ZipWriter::new(fs::File::create(&archive).expect("create"));
        writer
            .start_file("../escape.txt", zip::write::SimpleFileOptions::default())
            .expect("start");
        writer.write_all(b"gotcha").expect("write");
        writer.finish().expect("finish");

        let dest = scratch.root.join("out");
        let err = unpack_archive(&archive, &dest).expect_err("traversal");
        assert!(matches!(err, DistError::PathTraversal { .. }));
        assert!(!scratch.root.join("escape.txt").exists());
    }

    #[rstest]
    fn unknown_extension_is_rejected(scratch: Scratch) {
        let archive = scratch.root.join("proj-1.0.tar.bz2");
        fs::write(&archive, "").expect("write");
        let err = unpack_archive(&archive, &scratch.root.join("out")).expect_err("unknown");
        assert!(matches!(err, DistError::UnsupportedFormat { .. }));
    }

    #[rstest]
    #[case::empty(&[], 0)]
    #[case::two_dirs(&["a/", "b/"], 2)]
    #[case::hidden_sibling(&["proj-1.0/", ".DS_Store"], 2)]
    #[case::single_file(&["README"], 1)]
    fn rejects_bad_shapes(scratch: Scratch, #[case] entries: &[&str], #[case] count: usize) {
        for entry in entries {
            match entry.strip_suffix('/') {
                Some(name) => fs::create_dir(scratch.root.join(name)).expect("mkdir"),
                None => fs::write(scratch.root.join(entry), "").expect("write"),
            }
        }
        match single_top_level_dir(&scratch.root) {
            Err(DistError::PackagingShape { entries, .. }) => assert_eq!(entries, count),
            other => panic!("expected PackagingShape, got {other:?}"),
        }
    }
}
