//! Crash-safe writes to the host filesystem.
//!
//! The ledger, the doc-set manifest and copied archives are all replaced in
//! full. Each write goes to a temporary file in the destination directory, is
//! flushed to disk, and is then renamed over the target, so a reader sees
//! either the previous contents or the new ones and never a truncated file.
//! The directory is synced after the rename so the new entry survives a
//! power loss.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{Error, Result};

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Flushes the directory entry of a freshly renamed file.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    fs::File::open(dir)
        .and_then(|d| d.sync_all())
        .map_err(|e| Error::filesystem("sync directory", dir, e))
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}

/// Atomically replaces `path` with `contents`.
pub fn atomic_write(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = parent_dir(path);
    fs::create_dir_all(dir).map_err(|e| Error::filesystem("create directory", dir, e))?;

    let mut tmp =
        NamedTempFile::new_in(dir).map_err(|e| Error::filesystem("create temporary file in", dir, e))?;
    tmp.write_all(contents)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| Error::filesystem("write", tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| Error::filesystem("replace", path, e.error))?;

    sync_dir(dir)
}

/// Copies `src` to `dst` through a temporary file, creating parent
/// directories of `dst` as needed.
pub fn atomic_copy(src: &Path, dst: &Path) -> Result<()> {
    let dir = parent_dir(dst);
    fs::create_dir_all(dir).map_err(|e| Error::filesystem("create directory", dir, e))?;

    let tmp =
        NamedTempFile::new_in(dir).map_err(|e| Error::filesystem("create temporary file in", dir, e))?;
    fs::copy(src, tmp.path()).map_err(|e| Error::filesystem("copy", src, e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| Error::filesystem("sync", tmp.path(), e))?;
    tmp.persist(dst)
        .map_err(|e| Error::filesystem("replace", dst, e.error))?;

    sync_dir(dir)
}
