use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::jsonc::strip_jsonc_comments;
use crate::HostLayout;

pub const DEFAULT_HOST_SEGMENTS: [&str; 4] = ["csgo", "addons", "counterstrikesharp", "plugins"];

/// Engine configuration, read once at startup and never written back
/// except to seed a missing file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    pub version: u32,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default = "update_on_start_default")]
    pub update_on_start: bool,
    #[serde(default)]
    pub update_on_reload: bool,
    #[serde(default)]
    pub update_on_map_change: bool,
    #[serde(default = "periodic_interval_secs_default")]
    pub periodic_interval_secs: u64,
    #[serde(default = "artifact_extension_default")]
    pub artifact_extension: String,
    #[serde(default = "host_segments_default")]
    pub host_segments: Vec<String>,
    #[serde(default)]
    pub host_root: Option<PathBuf>,
    #[serde(default = "api_base_url_default")]
    pub api_base_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Startup,
    Reload,
    Periodic,
    Manual,
}

impl Trigger {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Reload => "reload",
            Self::Periodic => "periodic",
            Self::Manual => "manual",
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            version: config_file_version(),
            api_token: None,
            update_on_start: update_on_start_default(),
            update_on_reload: false,
            update_on_map_change: false,
            periodic_interval_secs: periodic_interval_secs_default(),
            artifact_extension: artifact_extension_default(),
            host_segments: host_segments_default(),
            host_root: None,
            api_base_url: api_base_url_default(),
        }
    }
}

impl SyncConfig {
    pub fn from_jsonc_str(content: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(&strip_jsonc_comments(content))
            .context("failed to parse relsync config")?;

        let expected = config_file_version();
        match value.get("version").and_then(serde_json::Value::as_u64) {
            Some(found) if found == u64::from(expected) => {}
            Some(found) => anyhow::bail!(
                "unsupported config version {found} (expected {expected}): update relsync.json to version {expected}"
            ),
            None => anyhow::bail!(
                "config is missing its version field (expected {expected})"
            ),
        }

        let config: Self =
            serde_json::from_value(value).context("failed to parse relsync config")?;
        config.validate()?;
        Ok(config)
    }

    /// Reads the config at `path`, writing and returning the default when
    /// the file does not exist yet.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            let content = serde_json::to_string_pretty(&config)
                .context("failed to serialize default config")?;
            fs::write(path, content)
                .with_context(|| format!("failed to write config: {}", path.display()))?;
            return Ok(config);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        Self::from_jsonc_str(&content)
            .with_context(|| format!("failed to load config: {}", path.display()))
    }

    pub fn api_token(&self) -> Option<&str> {
        self.api_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }

    pub fn trigger_enabled(&self, trigger: Trigger) -> bool {
        match trigger {
            Trigger::Startup => self.update_on_start,
            Trigger::Reload => self.update_on_reload,
            Trigger::Periodic => self.update_on_map_change,
            Trigger::Manual => true,
        }
    }

    pub fn host_layout(&self, host_root: impl Into<PathBuf>) -> HostLayout {
        HostLayout::new(host_root, self.host_segments.clone())
    }

    fn validate(&self) -> Result<()> {
        if self.host_segments.is_empty() {
            anyhow::bail!("host_segments must not be empty");
        }
        for segment in &self.host_segments {
            if segment.is_empty()
                || segment == "."
                || segment == ".."
                || segment.contains(['/', '\\'])
            {
                anyhow::bail!("invalid host segment '{segment}'");
            }
        }

        let extension = self.artifact_extension.trim_start_matches('.');
        if extension.is_empty() || extension.contains(['/', '\\']) {
            anyhow::bail!(
                "invalid artifact_extension '{}'",
                self.artifact_extension
            );
        }

        if self.periodic_interval_secs == 0 {
            anyhow::bail!("periodic_interval_secs must be greater than zero");
        }

        Ok(())
    }
}

pub fn config_file_version() -> u32 {
    1
}

fn update_on_start_default() -> bool {
    true
}

fn periodic_interval_secs_default() -> u64 {
    900
}

fn artifact_extension_default() -> String {
    "dll".to_string()
}

fn host_segments_default() -> Vec<String> {
    DEFAULT_HOST_SEGMENTS
        .iter()
        .map(|segment| segment.to_string())
        .collect()
}

fn api_base_url_default() -> String {
    "https://api.github.com".to_string()
}
