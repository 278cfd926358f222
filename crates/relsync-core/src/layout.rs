use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// The target file-tree units are merged into.
///
/// `host_root` is the directory that contains `segments[0]`; the units root
/// is `host_root` joined with every segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostLayout {
    host_root: PathBuf,
    segments: Vec<String>,
}

impl HostLayout {
    pub fn new(host_root: impl Into<PathBuf>, segments: Vec<String>) -> Self {
        Self {
            host_root: host_root.into(),
            segments,
        }
    }

    pub fn host_root(&self) -> &Path {
        &self.host_root
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn units_root(&self) -> PathBuf {
        self.replica_destination(self.segments.len())
    }

    pub fn unit_dir(&self, directory: &str) -> PathBuf {
        self.units_root().join(directory)
    }

    /// Host directory that corresponds to the parent of an archive directory
    /// named `segments[depth]`.
    pub fn replica_destination(&self, depth: usize) -> PathBuf {
        let mut path = self.host_root.clone();
        for segment in self.segments.iter().take(depth) {
            path.push(segment);
        }
        path
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateLayout {
    state_dir: PathBuf,
}

impl StateLayout {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
        }
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    pub fn config_path(&self) -> PathBuf {
        self.state_dir.join("relsync.json")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.state_dir.join("manifest.json")
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.state_dir.join("tmp")
    }

    pub fn downloads_dir(&self) -> PathBuf {
        self.tmp_dir().join("downloads")
    }

    pub fn active_pass_path(&self) -> PathBuf {
        self.state_dir.join("active-pass")
    }

    pub fn ensure_base_dirs(&self) -> Result<()> {
        for dir in [self.state_dir.clone(), self.tmp_dir(), self.downloads_dir()] {
            fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        Ok(())
    }
}

pub fn default_state_dir() -> Result<PathBuf> {
    if cfg!(windows) {
        let app_data = std::env::var("LOCALAPPDATA")
            .context("LOCALAPPDATA is not set; cannot resolve Windows state directory")?;
        return Ok(PathBuf::from(app_data).join("relsync"));
    }

    let home = std::env::var("HOME").context("HOME is not set; cannot resolve state directory")?;
    Ok(PathBuf::from(home).join(".relsync"))
}
