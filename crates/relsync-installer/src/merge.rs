use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use relsync_core::HostLayout;
use tracing::{debug, info};

use crate::fs_utils::{copy_dir_recursive, copy_entry, remove_entry};
use crate::locate::payload_directory_name;
use crate::tree::{DirectoryTree, FsTree};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    /// The archive replicated the host nesting from `segments[depth]` down.
    Structural { depth: usize },
    /// The payload directory was placed under the units root.
    Fallback,
}

impl MergeStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Structural { .. } => "structural",
            Self::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    pub strategy: MergeStrategy,
    /// Host paths written at the top level of the merge.
    pub destinations: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralMatch {
    pub depth: usize,
    /// Tree-relative directory named `segments[depth]`.
    pub matched_dir: PathBuf,
    /// Tree-relative parent of `matched_dir`; mirrors the host directory at
    /// `depth`.
    pub replica_root: PathBuf,
}

/// Looks for a directory named `segments[i]` (for each `i` in order) below
/// the tree root whose descendants contain the remaining segment chain.
pub fn find_structural_match<T: DirectoryTree + ?Sized>(
    tree: &T,
    segments: &[String],
) -> Result<Option<StructuralMatch>> {
    for (depth, segment) in segments.iter().enumerate() {
        for candidate in directories_named(tree, segment)? {
            if chain_exists(tree, &candidate, &segments[depth + 1..])? {
                let replica_root = candidate
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_default();
                debug!(
                    segment = %segment,
                    matched = %candidate.display(),
                    "structural match"
                );
                return Ok(Some(StructuralMatch {
                    depth,
                    matched_dir: candidate,
                    replica_root,
                }));
            }
        }
    }

    Ok(None)
}

fn directories_named<T: DirectoryTree + ?Sized>(tree: &T, name: &str) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![PathBuf::new()];
    while let Some(dir) = pending.pop() {
        let entries = tree.entries(&dir)?;
        for entry in entries.iter().rev().filter(|entry| entry.is_dir()) {
            pending.push(dir.join(&entry.name));
        }
        if !dir.as_os_str().is_empty() && dir.file_name().is_some_and(|value| value == name) {
            found.push(dir);
        }
    }
    Ok(found)
}

fn chain_exists<T: DirectoryTree + ?Sized>(
    tree: &T,
    start: &Path,
    chain: &[String],
) -> Result<bool> {
    let mut current = start.to_path_buf();
    for segment in chain {
        if !tree.has_child_dir(&current, segment)? {
            return Ok(false);
        }
        current.push(segment);
    }
    Ok(true)
}

/// Reconciles an extracted archive into the host tree.
///
/// A structural match merges every top-level entry of the replica root into
/// the matching host directory, file by file, last write wins. Otherwise
/// `payload` (relative to `archive_root`) replaces
/// `units_root/<payload name>` entirely.
pub fn merge_into_host(
    archive_root: &Path,
    payload: &Path,
    host: &HostLayout,
) -> Result<MergeReport> {
    let tree = FsTree::new(archive_root);
    if let Some(found) = find_structural_match(&tree, host.segments())? {
        let source = archive_root.join(&found.replica_root);
        let destination = host.replica_destination(found.depth);
        fs::create_dir_all(&destination)
            .with_context(|| format!("failed to create {}", destination.display()))?;

        let mut destinations = Vec::new();
        for entry in tree.entries(&found.replica_root)? {
            let target = destination.join(&entry.name);
            copy_entry(&source.join(&entry.name), &target)?;
            info!(
                from = %source.join(&entry.name).display(),
                to = %target.display(),
                "merged archive entry"
            );
            destinations.push(target);
        }

        return Ok(MergeReport {
            strategy: MergeStrategy::Structural { depth: found.depth },
            destinations,
        });
    }

    let name = payload_directory_name(archive_root, payload)?;
    let source = archive_root.join(payload);
    let destination = host.unit_dir(&name);
    remove_entry(&destination)?;
    copy_dir_recursive(&source, &destination)?;
    info!(
        from = %source.display(),
        to = %destination.display(),
        "copied payload into units root"
    );

    Ok(MergeReport {
        strategy: MergeStrategy::Fallback,
        destinations: vec![destination],
    })
}
