//! Crash-safe publication of layer files.

use std::io::{self, Write};

use camino::Utf8Path;
use cap_std::fs::OpenOptions;

/// Atomically replace `path` with `content` when the bytes differ.
///
/// If the current file content is byte-identical the file is left alone so
/// its modification time survives; downstream cache layers key off it.
/// Otherwise the new content is written to a temporary file in the same
/// directory, synced to durable storage, and renamed over the target, so a
/// concurrent reader only ever observes fully-old or fully-new content.
/// Returns whether the file changed.
///
/// # Errors
///
/// Fails on I/O errors; the previously published file is never corrupted,
/// because the target is only touched by the final rename.
pub fn replace_file_content(path: &Utf8Path, content: &[u8]) -> io::Result<bool> {
    let (dir, file_name) = layercast_fs::open_dir_and_file(path)?;
    match dir.read(&file_name) {
        Ok(existing) if existing == content => return Ok(false),
        Ok(_) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(err),
    }
    // Same directory as the target, so the rename stays on one filesystem.
    let tmp_name = format!("tmp-{}-{file_name}", std::process::id());
    let mut tmp = dir.open_with(
        &tmp_name,
        OpenOptions::new().write(true).create(true).truncate(true),
    )?;
    tmp.write_all(content)?;
    // Data blocks must be durable before the rename replaces the target.
    tmp.sync_all()?;
    drop(tmp);
    dir.rename(&tmp_name, &dir, &file_name)?;
    Ok(true)
}
