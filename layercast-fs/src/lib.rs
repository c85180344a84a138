//! Shared filesystem helpers built on `cap-std` and `camino`.
//!
//! The publisher and the fetch log both operate on files inside the output
//! directory; these helpers resolve UTF-8 paths into a capability handle for
//! that directory plus a file name, so all subsequent I/O stays inside it.

#![forbid(unsafe_code)]

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};

/// Resolve an ambient directory handle for `path` together with its file name.
///
/// # Errors
///
/// Fails when `path` has no file-name component or the parent directory
/// cannot be opened.
pub fn open_dir_and_file(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, String)> {
    let parent = path.parent().unwrap_or_else(|| Utf8Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::other("target should include a file name"))?
        .to_owned();
    let dir = fs_utf8::Dir::open_ambient_dir(parent, ambient_authority())?;
    Ok((dir, file_name))
}

/// Open `path` as a directory, creating it (and missing ancestors) first.
///
/// # Errors
///
/// Fails when the directory cannot be created or opened.
pub fn ensure_dir(path: &Utf8Path) -> io::Result<fs_utf8::Dir> {
    let (base, relative) = split_ambient(path)?;
    if relative.as_str().is_empty() {
        return Ok(base);
    }
    base.create_dir_all(&relative)?;
    base.open_dir(&relative)
}

/// Split a path into an ambient base directory and a relative remainder.
fn split_ambient(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, Utf8PathBuf)> {
    let (base, relative) = if path.is_absolute() {
        let relative = path
            .strip_prefix("/")
            .map_err(|_| io::Error::other("failed to strip root from absolute path"))?;
        (Utf8Path::new("/"), relative)
    } else {
        (Utf8Path::new("."), path)
    };
    let dir = fs_utf8::Dir::open_ambient_dir(base, ambient_authority())?;
    Ok((dir, relative.to_path_buf()))
}
