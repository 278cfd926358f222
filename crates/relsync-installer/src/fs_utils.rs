use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};

pub fn remove_file_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

pub fn remove_dir_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Removes whatever sits at `path` (file, symlink or directory tree).
pub(crate) fn remove_entry(path: &Path) -> Result<()> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to stat {}", path.display()));
        }
    };

    if metadata.is_dir() {
        fs::remove_dir_all(path)
            .with_context(|| format!("failed to remove directory {}", path.display()))
    } else {
        fs::remove_file(path).with_context(|| format!("failed to remove {}", path.display()))
    }
}

/// Copies `src` into `dst` recursively. Existing destination files are
/// overwritten; a destination entry whose kind differs from the source
/// entry (file vs directory) is removed first.
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    if dst.exists() && !dst.is_dir() {
        remove_entry(dst)?;
    }
    fs::create_dir_all(dst).with_context(|| format!("failed to create {}", dst.display()))?;

    for entry in fs::read_dir(src).with_context(|| format!("failed to read {}", src.display()))? {
        let entry = entry?;
        copy_entry(&entry.path(), &dst.join(entry.file_name()))?;
    }
    Ok(())
}

pub(crate) fn copy_entry(src_path: &Path, dst_path: &Path) -> Result<()> {
    let metadata = fs::symlink_metadata(src_path)
        .with_context(|| format!("failed to stat {}", src_path.display()))?;
    if metadata.is_dir() {
        return copy_dir_recursive(src_path, dst_path);
    }

    if dst_path.is_dir() {
        remove_entry(dst_path)?;
    }

    #[cfg(unix)]
    if metadata.file_type().is_symlink() {
        let target = fs::read_link(src_path)
            .with_context(|| format!("failed to read symlink {}", src_path.display()))?;
        remove_entry(dst_path)?;
        std::os::unix::fs::symlink(&target, dst_path).with_context(|| {
            format!(
                "failed to create symlink {} -> {}",
                dst_path.display(),
                target.display()
            )
        })?;
        return Ok(());
    }

    fs::copy(src_path, dst_path).with_context(|| {
        format!(
            "failed to copy {} to {}",
            src_path.display(),
            dst_path.display()
        )
    })?;
    Ok(())
}
