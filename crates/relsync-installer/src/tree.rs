use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub name: String,
    pub kind: EntryKind,
}

impl TreeEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Read-only view of a directory tree addressed by paths relative to its
/// root. The empty path is the root itself.
pub trait DirectoryTree {
    /// Name of the root directory, if it has one.
    fn root_name(&self) -> Option<String>;

    /// Direct children of `dir`, sorted by name.
    fn entries(&self, dir: &Path) -> Result<Vec<TreeEntry>>;

    fn has_child_dir(&self, dir: &Path, name: &str) -> Result<bool> {
        Ok(self
            .entries(dir)?
            .iter()
            .any(|entry| entry.is_dir() && entry.name == name))
    }
}

#[derive(Debug, Clone)]
pub struct FsTree {
    root: PathBuf,
}

impl FsTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl DirectoryTree for FsTree {
    fn root_name(&self) -> Option<String> {
        self.root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
    }

    fn entries(&self, dir: &Path) -> Result<Vec<TreeEntry>> {
        let path = self.root.join(dir);
        let mut entries = Vec::new();
        for entry in
            fs::read_dir(&path).with_context(|| format!("failed to read {}", path.display()))?
        {
            let entry = entry?;
            let file_type = entry
                .file_type()
                .with_context(|| format!("failed to stat {}", entry.path().display()))?;
            entries.push(TreeEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                kind: if file_type.is_dir() {
                    EntryKind::Directory
                } else {
                    EntryKind::File
                },
            });
        }
        entries.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(entries)
    }
}

/// In-memory tree for fixtures. Adding a path implicitly adds its parent
/// directories.
#[derive(Debug, Clone, Default)]
pub struct MemoryTree {
    root_name: Option<String>,
    nodes: BTreeMap<PathBuf, EntryKind>,
}

impl MemoryTree {
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            root_name: Some(root_name.into()),
            nodes: BTreeMap::new(),
        }
    }

    pub fn with_file(mut self, path: &str) -> Self {
        self.insert(path, EntryKind::File);
        self
    }

    pub fn with_dir(mut self, path: &str) -> Self {
        self.insert(path, EntryKind::Directory);
        self
    }

    fn insert(&mut self, path: &str, kind: EntryKind) {
        let path = PathBuf::from(path.trim_matches('/'));
        let mut parent = path.parent();
        while let Some(dir) = parent {
            if dir.as_os_str().is_empty() {
                break;
            }
            self.nodes.insert(dir.to_path_buf(), EntryKind::Directory);
            parent = dir.parent();
        }
        self.nodes.insert(path, kind);
    }
}

impl DirectoryTree for MemoryTree {
    fn root_name(&self) -> Option<String> {
        self.root_name.clone()
    }

    fn entries(&self, dir: &Path) -> Result<Vec<TreeEntry>> {
        let is_root = dir.as_os_str().is_empty();
        if !is_root && self.nodes.get(dir) != Some(&EntryKind::Directory) {
            anyhow::bail!("not a directory in memory tree: {}", dir.display());
        }

        let mut entries = self
            .nodes
            .iter()
            .filter(|(path, _)| path.parent() == Some(dir))
            .filter_map(|(path, kind)| {
                Some(TreeEntry {
                    name: path.file_name()?.to_string_lossy().into_owned(),
                    kind: *kind,
                })
            })
            .collect::<Vec<_>>();
        entries.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(entries)
    }
}
