use std::path::{Path, PathBuf};

use anyhow::Result;
use relsync_core::SyncError;
use tracing::debug;

use crate::tree::{DirectoryTree, TreeEntry};

/// Finds the payload root of an extracted archive: the first directory, in
/// depth-first pre-order starting at the root, that directly contains a
/// file named after itself with `artifact_extension` appended.
///
/// Returns the tree-relative path of that directory, or `None` when no
/// directory qualifies.
pub fn locate_payload<T: DirectoryTree + ?Sized>(
    tree: &T,
    artifact_extension: &str,
) -> Result<Option<PathBuf>> {
    let extension = artifact_extension.trim_start_matches('.');
    let mut pending = vec![PathBuf::new()];

    while let Some(dir) = pending.pop() {
        let entries = tree.entries(&dir)?;
        let dir_name = match dir.file_name() {
            Some(name) => Some(name.to_string_lossy().into_owned()),
            None => tree.root_name(),
        };

        if let Some(dir_name) = dir_name {
            if contains_named_artifact(&entries, &dir_name, extension) {
                debug!(payload = %dir.display(), "located payload directory");
                return Ok(Some(dir));
            }
        }

        for entry in entries.iter().rev().filter(|entry| entry.is_dir()) {
            pending.push(dir.join(&entry.name));
        }
    }

    Ok(None)
}

fn contains_named_artifact(entries: &[TreeEntry], dir_name: &str, extension: &str) -> bool {
    entries.iter().filter(|entry| !entry.is_dir()).any(|entry| {
        let path = Path::new(&entry.name);
        path.file_stem().and_then(|stem| stem.to_str()) == Some(dir_name)
            && path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
    })
}

/// Directory name the payload will occupy under the units root.
pub fn payload_directory_name(archive_root: &Path, payload: &Path) -> Result<String> {
    let name = payload
        .file_name()
        .or_else(|| archive_root.file_name())
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty());

    match name {
        Some(name) => Ok(name.to_string()),
        None => Err(SyncError::Filesystem {
            path: archive_root.join(payload),
            reason: "payload directory has no usable name".to_string(),
        }
        .into()),
    }
}
