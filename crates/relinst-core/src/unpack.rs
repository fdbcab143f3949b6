//! Archive extraction and executable lookup.

use crate::asset::ArchiveFormat;
use crate::cache::is_executable;
use crate::error::Error;
use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extracts `archive` into `dest` (created if missing).
pub fn unpack(archive: &Path, format: ArchiveFormat, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest).with_context(|| format!("create {}", dest.display()))?;
    let file = File::open(archive).with_context(|| format!("open {}", archive.display()))?;
    let reader = BufReader::new(file);
    match format {
        ArchiveFormat::Tar => tar::Archive::new(reader)
            .unpack(dest)
            .with_context(|| format!("extract tar {}", archive.display()))?,
        ArchiveFormat::TarGz | ArchiveFormat::Tgz => tar::Archive::new(GzDecoder::new(reader))
            .unpack(dest)
            .with_context(|| format!("extract tar.gz {}", archive.display()))?,
        ArchiveFormat::Zip => zip::ZipArchive::new(reader)
            .and_then(|mut z| z.extract(dest))
            .with_context(|| format!("extract zip {}", archive.display()))?,
        ArchiveFormat::Raw => return Err(Error::UnsupportedFormat(format.to_string()).into()),
    }
    tracing::debug!("unpacked {} into {}", archive.display(), dest.display());
    Ok(())
}

fn regular_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file())
        .collect()
}

fn base_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("")
}

/// Finds the executable inside an unpacked tree. Rules, first hit wins:
/// 1. `dir/binary`;
/// 2. any file named `binary` or `project`;
/// 3. any file whose name starts with `project-` or `binary-`;
/// 4. the first file with an execute bit.
///
/// Files are visited in sorted order, so the result is deterministic.
pub fn locate_executable(dir: &Path, binary: &str, project: &str) -> Result<PathBuf> {
    let direct = dir.join(binary);
    if direct.is_file() {
        return Ok(direct);
    }

    let files = regular_files(dir);
    let project_prefix = format!("{}-", project);
    let binary_prefix = format!("{}-", binary);
    let found = files
        .iter()
        .find(|p| {
            let name = base_name(p);
            name == binary || name == project
        })
        .or_else(|| {
            files.iter().find(|p| {
                let name = base_name(p);
                name.starts_with(&project_prefix) || name.starts_with(&binary_prefix)
            })
        })
        .or_else(|| files.iter().find(|p| is_executable(p)));

    match found {
        Some(p) => {
            tracing::debug!("located executable {}", p.display());
            Ok(p.clone())
        }
        None => Err(Error::ExecutableNotFound {
            dir: dir.display().to_string(),
            binary: binary.to_string(),
            project: project.to_string(),
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::set_executable;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn touch(dir: &Path, rel: &str) -> PathBuf {
        let p = dir.join(rel);
        fs::create_dir_all(p.parent().unwrap()).unwrap();
        fs::write(&p, rel.as_bytes()).unwrap();
        p
    }

    fn tar_bytes(entries: &[(&str, &[u8], u32)]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (name, data, mode) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(*mode);
            header.set_entry_type(tar::EntryType::Regular);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap()
    }

    #[test]
    fn exact_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a/tool");
        let direct = touch(dir.path(), "tool");
        assert_eq!(locate_executable(dir.path(), "tool", "proj").unwrap(), direct);
    }

    #[test]
    fn nested_name_match_beats_prefix() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a/proj-linux-amd64");
        let named = touch(dir.path(), "z/dist/proj");
        assert_eq!(locate_executable(dir.path(), "tool", "proj").unwrap(), named);
    }

    #[test]
    fn prefix_match() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "README.md");
        let prefixed = touch(dir.path(), "pkg/tool-v1-linux-amd64");
        assert_eq!(locate_executable(dir.path(), "tool", "proj").unwrap(), prefixed);
    }

    #[cfg(unix)]
    #[test]
    fn any_executable_is_last_resort() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "LICENSE");
        let exe = touch(dir.path(), "bin/runner");
        set_executable(&exe).unwrap();
        assert_eq!(locate_executable(dir.path(), "tool", "proj").unwrap(), exe);
    }

    #[test]
    fn nothing_found() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "docs/readme.txt");
        let err = locate_executable(dir.path(), "tool", "proj").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::ExecutableNotFound { .. })
        ));
    }

    #[test]
    fn unpack_tar_gz_keeps_mode() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("a.tar.gz");
        let tar = tar_bytes(&[("tool-v1/tool", &b"#!/bin/sh\necho hi\n"[..], 0o755)]);
        let mut gz = GzEncoder::new(File::create(&archive).unwrap(), Compression::default());
        gz.write_all(&tar).unwrap();
        gz.finish().unwrap();

        let out = dir.path().join("out");
        unpack(&archive, ArchiveFormat::TarGz, &out).unwrap();
        let exe = locate_executable(&out, "tool", "tool").unwrap();
        assert_eq!(exe, out.join("tool-v1/tool"));
        assert!(is_executable(&exe));
    }

    #[test]
    fn unpack_plain_tar() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("a.tar");
        fs::write(&archive, tar_bytes(&[("tool", &b"x"[..], 0o755)])).unwrap();
        let out = dir.path().join("out");
        unpack(&archive, ArchiveFormat::Tar, &out).unwrap();
        assert_eq!(fs::read(out.join("tool")).unwrap(), b"x");
    }

    #[test]
    fn unpack_zip() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("a.zip");
        let mut zip = zip::ZipWriter::new(File::create(&archive).unwrap());
        let options = zip::write::FileOptions::default().unix_permissions(0o755);
        zip.start_file("dist/tool", options).unwrap();
        zip.write_all(b"zipped").unwrap();
        zip.finish().unwrap();

        let out = dir.path().join("out");
        unpack(&archive, ArchiveFormat::Zip, &out).unwrap();
        assert_eq!(fs::read(out.join("dist/tool")).unwrap(), b"zipped");
    }

    #[test]
    fn raw_is_not_an_archive() {
        let dir = tempfile::tempdir().unwrap();
        let archive = touch(dir.path(), "tool");
        let err = unpack(&archive, ArchiveFormat::Raw, &dir.path().join("out")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::UnsupportedFormat(_))
        ));
    }
}
