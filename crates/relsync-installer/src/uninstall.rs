use std::path::{Component, Path};

use anyhow::{Context, Result};
use relsync_core::HostLayout;
use tracing::info;

use crate::fs_utils::remove_entry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalStatus {
    Removed,
    AlreadyAbsent,
}

/// Deletes `units_root/<directory>`. A directory that is already gone is
/// reported, not treated as an error.
pub fn remove_unit_directory(host: &HostLayout, directory: &str) -> Result<RemovalStatus> {
    let mut components = Path::new(directory).components();
    let single_normal = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if !single_normal {
        anyhow::bail!("invalid unit directory '{directory}': expected a single path component");
    }

    let target = host.unit_dir(directory);
    if std::fs::symlink_metadata(&target).is_err() {
        return Ok(RemovalStatus::AlreadyAbsent);
    }

    remove_entry(&target)
        .with_context(|| format!("failed to remove unit directory {}", target.display()))?;
    info!(path = %target.display(), "removed unit directory");
    Ok(RemovalStatus::Removed)
}
