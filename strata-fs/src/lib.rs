//! Capability-based filesystem helpers for Strata output.
//!
//! Output paths arrive from the command line as arbitrary absolute or relative
//! UTF-8 paths. These helpers resolve them to an ambient `cap-std` directory
//! handle plus a relative remainder, and perform every write through that
//! handle.
#![forbid(unsafe_code)]

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};
use std::io;
use std::path::Component;

/// Open the parent directory of `path`, returning it with the file name.
///
/// # Errors
/// Fails when `path` has no file name or the parent cannot be opened.
pub fn open_dir_and_file(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, String)> {
    let name = path
        .file_name()
        .ok_or_else(|| io::Error::other(format!("{path} does not name a file")))?
        .to_owned();
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    let dir = fs_utf8::Dir::open_ambient_dir(parent, ambient_authority())?;
    Ok((dir, name))
}

/// Split `path` into an ambient root handle and the path relative to it.
///
/// Absolute paths resolve against the filesystem root (or the drive prefix on
/// Windows); relative paths resolve against the working directory.
///
/// # Errors
/// Fails when the root cannot be opened or the path is not valid UTF-8 after
/// stripping its root.
pub fn base_dir_and_relative(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, Utf8PathBuf)> {
    let std_path = path.as_std_path();
    let base = match std_path.components().next() {
        Some(Component::Prefix(prefix)) => {
            let prefix = prefix
                .as_os_str()
                .to_str()
                .ok_or_else(|| io::Error::other("non-UTF-8 path prefix"))?;
            Utf8PathBuf::from(prefix).join(std::path::MAIN_SEPARATOR_STR)
        }
        Some(Component::RootDir) => Utf8PathBuf::from(std::path::MAIN_SEPARATOR_STR),
        _ => Utf8PathBuf::from("."),
    };
    let relative = if base.as_str() == "." {
        path.to_path_buf()
    } else {
        path.strip_prefix(&base)
            .map_err(|_| io::Error::other(format!("cannot strip {base} from {path}")))?
            .to_path_buf()
    };
    let dir = fs_utf8::Dir::open_ambient_dir(&base, ambient_authority())?;
    Ok((dir, relative))
}

/// Create `path` and any missing ancestors.
///
/// # Errors
/// Propagates I/O failures from directory creation.
pub fn ensure_dir(path: &Utf8Path) -> io::Result<()> {
    let (base, relative) = base_dir_and_relative(path)?;
    if relative.as_str().is_empty() {
        return Ok(());
    }
    base.create_dir_all(&relative)
}

/// Create or truncate the file at `path` and return a standard file handle.
///
/// # Errors
/// Fails when the parent directory is missing or the file cannot be created.
pub fn create_file(path: &Utf8Path) -> io::Result<std::fs::File> {
    let (dir, name) = open_dir_and_file(path)?;
    Ok(dir.create(&name)?.into_std())
}

/// Replace the contents of the file at `path`.
///
/// # Errors
/// Fails when the parent directory is missing or the write fails.
pub fn write_file(path: &Utf8Path, contents: impl AsRef<[u8]>) -> io::Result<()> {
    let (dir, name) = open_dir_and_file(path)?;
    dir.write(&name, contents)
}

/// Whether `path` exists and is a regular file.
///
/// # Errors
/// Fails when the parent directory cannot be opened or the metadata lookup
/// fails for a reason other than the file being absent.
pub fn file_is_file(path: &Utf8Path) -> io::Result<bool> {
    let (dir, name) = open_dir_and_file(path)?;
    match dir.metadata(&name) {
        Ok(meta) => Ok(meta.is_file()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

/// Whether the existing entry at `path` is a directory.
///
/// # Errors
/// Fails with [`io::ErrorKind::NotFound`] when nothing exists at `path`, and
/// with other I/O errors when the entry cannot be inspected.
pub fn dir_is_dir(path: &Utf8Path) -> io::Result<bool> {
    if path.file_name().is_none() {
        return fs_utf8::Dir::open_ambient_dir(path, ambient_authority()).map(|_| true);
    }
    let (dir, name) = open_dir_and_file(path)?;
    dir.metadata(&name).map(|meta| meta.is_dir())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use std::io::Write;
    use tempfile::TempDir;

    #[fixture]
    fn temp_dir() -> TempDir {
        tempfile::tempdir().expect("create temp dir")
    }

    fn utf8(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("temp dir is UTF-8")
    }

    #[rstest]
    fn ensure_dir_creates_nested_directories(temp_dir: TempDir) {
        let target = utf8(&temp_dir).join("out/layers");
        ensure_dir(&target).expect("create nested dir");
        assert!(target.is_dir());
        ensure_dir(&target).expect("existing dir is fine");
    }

    #[rstest]
    fn create_file_yields_writable_handle(temp_dir: TempDir) {
        let target = utf8(&temp_dir).join("roads.parquet");
        let mut file = create_file(&target).expect("create file");
        file.write_all(b"PAR1").expect("write");
        assert_eq!(std::fs::read(&target).expect("read back"), b"PAR1");
    }

    #[rstest]
    fn write_file_replaces_contents(temp_dir: TempDir) {
        let target = utf8(&temp_dir).join("metadata.json");
        write_file(&target, "first").expect("first write");
        write_file(&target, "second").expect("second write");
        assert_eq!(
            std::fs::read_to_string(&target).expect("read back"),
            "second"
        );
    }

    #[rstest]
    fn file_is_file_distinguishes_files_from_dirs(temp_dir: TempDir) {
        let root = utf8(&temp_dir);
        write_file(&root.join("planet.osm.pbf"), b"").expect("write");
        assert!(file_is_file(&root.join("planet.osm.pbf")).expect("lookup"));
        assert!(!file_is_file(&root.join("missing.osm.pbf")).expect("lookup"));
        ensure_dir(&root.join("nested")).expect("mkdir");
        assert!(!file_is_file(&root.join("nested")).expect("lookup"));
    }

    #[rstest]
    fn dir_is_dir_separates_dirs_files_and_absent_paths(temp_dir: TempDir) {
        let root = utf8(&temp_dir);
        ensure_dir(&root.join("layers")).expect("mkdir");
        write_file(&root.join("roads.parquet"), b"").expect("write");
        assert!(dir_is_dir(&root.join("layers")).expect("lookup"));
        assert!(dir_is_dir(&root.join("layers/..")).expect("lookup"));
        assert!(!dir_is_dir(&root.join("roads.parquet")).expect("lookup"));
        let err = dir_is_dir(&root.join("missing")).expect_err("absent path");
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        let nested = dir_is_dir(&root.join("missing/layers")).expect_err("absent parent");
        assert_eq!(nested.kind(), io::ErrorKind::NotFound);
    }
}
