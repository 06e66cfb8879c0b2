//! Filesystem helpers for the boundary cache and database paths, built on
//! `cap-std` and `camino`.
#![forbid(unsafe_code)]

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};
use std::io;
use std::path::Component;

/// Create `dir` and any missing ancestors.
pub fn ensure_dir(dir: &Utf8Path) -> io::Result<()> {
    if dir.as_os_str().is_empty() {
        return Ok(());
    }
    let (base, relative) = split_ambient_root(dir)?;
    if relative.as_os_str().is_empty() {
        return Ok(());
    }
    base.create_dir_all(&relative)
}

/// Create the directory that will hold `path`.
pub fn ensure_parent_dir(path: &Utf8Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if parent != Utf8Path::new("/") => ensure_dir(parent),
        _ => Ok(()),
    }
}

/// Open `dir` with ambient authority.
pub fn open_dir(dir: &Utf8Path) -> io::Result<fs_utf8::Dir> {
    fs_utf8::Dir::open_ambient_dir(dir, ambient_authority())
}

/// Return whether `path` exists and is a regular file.
///
/// A missing file or parent directory yields `Ok(false)`.
pub fn file_is_file(path: &Utf8Path) -> io::Result<bool> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let name = path
        .file_name()
        .ok_or_else(|| io::Error::other("path should include a file name"))?;
    let dir = match open_dir(parent) {
        Ok(dir) => dir,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    };
    match dir.metadata(name) {
        Ok(meta) => Ok(meta.is_file()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

/// List the entries of `names` that are not regular files inside `dir`.
pub fn missing_files<'a>(dir: &Utf8Path, names: &[&'a str]) -> io::Result<Vec<&'a str>> {
    let mut missing = Vec::new();
    for name in names {
        if !file_is_file(&dir.join(name))? {
            missing.push(*name);
        }
    }
    Ok(missing)
}

/// Convert a standard path into a UTF-8 one.
pub fn utf8_path(path: std::path::PathBuf) -> io::Result<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(path)
        .map_err(|raw| io::Error::other(format!("path {} is not valid UTF-8", raw.display())))
}

/// Move the file at `from` to `to`, replacing any file already there.
pub fn replace_file(from: &Utf8Path, to: &Utf8Path) -> io::Result<()> {
    let (from_dir, from_name) = parent_and_name(from)?;
    let (to_dir, to_name) = parent_and_name(to)?;
    open_dir(from_dir)?.rename(from_name, &open_dir(to_dir)?, to_name)
}

fn parent_and_name(path: &Utf8Path) -> io::Result<(&Utf8Path, &str)> {
    let name = path.file_name().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, format!("{path} has no file name"))
    })?;
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    Ok((parent, name))
}

/// Split a path into an ambient root directory and the path relative to it.
///
/// Absolute paths are anchored at the filesystem root (or Windows prefix);
/// relative paths at the current directory.
pub fn split_ambient_root(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, Utf8PathBuf)> {
    let std_path = path.as_std_path();
    let (root, relative) = match std_path.components().next() {
        Some(Component::Prefix(prefix)) => {
            let prefix_str = prefix
                .as_os_str()
                .to_str()
                .ok_or_else(|| io::Error::other("non-UTF-8 path prefix"))?;
            let root = Utf8PathBuf::from(prefix_str).join(std::path::MAIN_SEPARATOR.to_string());
            let relative = std_path
                .strip_prefix(root.as_std_path())
                .or_else(|_| std_path.strip_prefix(prefix.as_os_str()))
                .map_err(|_| io::Error::other("failed to strip prefix from path"))?
                .to_path_buf();
            (root, relative)
        }
        Some(Component::RootDir) => {
            let root = Utf8PathBuf::from(std::path::MAIN_SEPARATOR.to_string());
            let relative = std_path
                .strip_prefix(root.as_std_path())
                .map_err(|_| io::Error::other("failed to strip root from absolute path"))?
                .to_path_buf();
            (root, relative)
        }
        _ => (Utf8PathBuf::from("."), std_path.to_path_buf()),
    };

    Ok((open_dir(&root)?, utf8_path(relative)?))
}
