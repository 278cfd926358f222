use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::warn;

use crate::fs_utils::{remove_dir_if_exists, remove_file_if_exists};

/// Downloaded archive file, removed when the guard goes out of scope.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if let Err(err) = remove_file_if_exists(&self.path) {
            warn!(path = %self.path.display(), error = %err, "failed to remove scratch file");
        }
    }
}

/// Extraction directory owned by one unit's update. Removed by
/// [`ScratchArchive::cleanup`] or, failing that, on drop.
#[derive(Debug)]
pub struct ScratchArchive {
    root: PathBuf,
    armed: bool,
}

impl ScratchArchive {
    /// Claims `root` as a fresh, empty directory. Leftovers from an earlier
    /// failed attempt at the same path are clobbered.
    pub fn claim(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        remove_dir_if_exists(&root).with_context(|| {
            format!("failed to clear stale extraction dir {}", root.display())
        })?;
        fs::create_dir_all(&root)
            .with_context(|| format!("failed to create extraction dir {}", root.display()))?;
        Ok(Self { root, armed: true })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn cleanup(mut self) -> Result<()> {
        self.armed = false;
        remove_dir_if_exists(&self.root)
            .with_context(|| format!("failed to remove extraction dir {}", self.root.display()))
    }
}

impl Drop for ScratchArchive {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(err) = remove_dir_if_exists(&self.root) {
            warn!(path = %self.root.display(), error = %err, "failed to remove extraction dir");
        }
    }
}
