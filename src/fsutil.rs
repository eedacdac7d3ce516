//! Filesystem.
//!
//! This module contains filesystem helpers that the standard library lacks.

use anyhow::Context;
use std::fs;
use std::io;
use std::path::Path;
use tracing::trace;
use walkdir::WalkDir;

/// Recursively copies the directory `from` into `to`.
///
/// Existing content of `to` is kept, files with the same name are overwritten.
pub(crate) fn copy_tree(from: &Path, to: &Path) -> anyhow::Result<()> {
    for entry in WalkDir::new(from) {
        let entry = entry?;
        let relative = entry.path().strip_prefix(from)?;
        let target = to.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            trace!("copying {target:?}");
            make_writable(&target)?;
            fs::copy(entry.path(), &target).with_context(|| format!("failed to copy {}", entry.path().display()))?;
        }
    }

    Ok(())
}

/// Removes the file or directory at `path`; a missing path is not an error.
pub(crate) fn remove_path(path: &Path) -> anyhow::Result<()> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err.into()),
    };

    if metadata.is_dir() {
        // Windows won't delete directories/files marked read-only
        for entry in WalkDir::new(path) {
            make_writable(entry?.path())?;
        }
        fs::remove_dir_all(path)?;
    } else {
        make_writable(path)?;
        fs::remove_file(path)?;
    }

    Ok(())
}

// Clears the read-only flag of the given path (if it exists).
#[allow(clippy::permissions_set_readonly_false)]
#[doc(hidden)]
fn make_writable(path: &Path) -> io::Result<()> {
    let Ok(metadata) = fs::symlink_metadata(path) else {
        return Ok(());
    };
    let mut perms = metadata.permissions();
    if perms.readonly() && !metadata.file_type().is_symlink() {
        perms.set_readonly(false);
        fs::set_permissions(path, perms)?;
    }

    Ok(())
}
