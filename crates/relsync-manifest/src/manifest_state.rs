use std::collections::HashSet;

use anyhow::{Context, Result};
use relsync_core::{strip_jsonc_comments, InstalledUnit, SyncError};
use serde::{Deserialize, Serialize};

use crate::Manifest;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ManifestFile {
    pub(crate) version: u32,
    #[serde(default)]
    pub(crate) units: Vec<InstalledUnit>,
}

impl ManifestFile {
    pub(crate) fn from_manifest(manifest: &Manifest) -> Self {
        Self {
            version: manifest_file_version(),
            units: manifest.units.clone(),
        }
    }
}

pub(crate) fn parse_manifest_file(content: &str) -> Result<Manifest> {
    let stripped = strip_jsonc_comments(content);
    let value: serde_json::Value =
        serde_json::from_str(&stripped).map_err(|err| SyncError::Parse {
            subject: "manifest".to_string(),
            reason: err.to_string(),
        })?;

    let expected = manifest_file_version();
    let version_error = match value.get("version").and_then(serde_json::Value::as_u64) {
        Some(found) if found == u64::from(expected) => None,
        Some(found) => Some(format!(
            "unsupported manifest version {found} (expected {expected}): update manifest.json to version {expected}"
        )),
        None => Some(format!(
            "manifest is missing its version field (expected {expected})"
        )),
    };
    if let Some(reason) = version_error {
        return Err(SyncError::Parse {
            subject: "manifest".to_string(),
            reason,
        }
        .into());
    }

    let parsed: ManifestFile = serde_json::from_value(value).map_err(|err| SyncError::Parse {
        subject: "manifest".to_string(),
        reason: err.to_string(),
    })?;
    validate_loaded_units(&parsed.units)?;
    Ok(Manifest::new(parsed.units))
}

pub(crate) fn render_manifest_file(manifest: &Manifest) -> Result<String> {
    let mut rendered = serde_json::to_string_pretty(&ManifestFile::from_manifest(manifest))
        .context("failed serializing manifest")?;
    rendered.push('\n');
    Ok(rendered)
}

pub fn manifest_file_version() -> u32 {
    1
}

fn validate_loaded_units(units: &[InstalledUnit]) -> Result<()> {
    let mut seen_identifiers: HashSet<&str> = HashSet::with_capacity(units.len());
    let mut seen_directories: HashSet<&str> = HashSet::with_capacity(units.len());
    for unit in units {
        if !seen_identifiers.insert(unit.identifier.as_str()) {
            anyhow::bail!(
                "duplicate unit '{}' in manifest.json: remove one entry",
                unit.identifier
            );
        }

        if let Some(directory) = unit.directory.as_deref() {
            if !seen_directories.insert(directory) {
                anyhow::bail!(
                    "directory '{}' is recorded by more than one unit in manifest.json",
                    directory
                );
            }
        }
    }

    Ok(())
}
