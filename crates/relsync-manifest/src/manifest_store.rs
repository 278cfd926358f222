use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::{parse_manifest_file, render_manifest_file, Manifest};

#[derive(Debug, Clone)]
pub struct ManifestStore {
    path: PathBuf,
}

impl ManifestStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the manifest, persisting an empty one when the file is absent.
    /// A file that exists but does not parse is an error the caller must
    /// treat as fatal.
    pub fn load_or_create(&self) -> Result<Manifest> {
        if !self.path.exists() {
            let manifest = Manifest::default();
            self.save(&manifest)?;
            info!(path = %self.path.display(), "created empty manifest");
            return Ok(manifest);
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("failed reading manifest: {}", self.path.display()))?;
        parse_manifest_file(&content)
            .with_context(|| format!("failed parsing manifest: {}", self.path.display()))
    }

    /// Writes the whole manifest to a sibling temp file and renames it into
    /// place.
    pub fn save(&self, manifest: &Manifest) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed creating manifest directory: {}", parent.display())
            })?;
        }

        let content = render_manifest_file(manifest)?;
        let part_path = self.part_path();
        if let Err(err) = fs::write(&part_path, content) {
            let _ = fs::remove_file(&part_path);
            return Err(err)
                .with_context(|| format!("failed writing manifest: {}", part_path.display()));
        }

        if let Err(err) = fs::rename(&part_path, &self.path) {
            let _ = fs::remove_file(&part_path);
            return Err(err).with_context(|| {
                format!("failed replacing manifest: {}", self.path.display())
            });
        }

        Ok(())
    }

    fn part_path(&self) -> PathBuf {
        self.path.with_file_name(format!(
            "{}.part",
            self.path
                .file_name()
                .and_then(|value| value.to_str())
                .unwrap_or("manifest.json")
        ))
    }
}
