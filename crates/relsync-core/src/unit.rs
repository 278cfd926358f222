use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledUnit {
    #[serde(rename = "download_string")]
    pub identifier: String,
    #[serde(default)]
    pub directory: Option<String>,
    #[serde(rename = "tag_name", default)]
    pub version: Option<String>,
    #[serde(default = "auto_update_default")]
    pub auto_update: bool,
}

impl InstalledUnit {
    pub fn new(identifier: impl Into<String>, auto_update: bool) -> Self {
        Self {
            identifier: identifier.into(),
            directory: None,
            version: None,
            auto_update,
        }
    }

    /// True when `target` names this unit by identifier or by its recorded
    /// directory.
    pub fn matches_target(&self, target: &str) -> bool {
        self.identifier == target || self.directory.as_deref() == Some(target)
    }
}

fn auto_update_default() -> bool {
    true
}

pub fn validate_identifier(identifier: &str) -> Result<()> {
    let Some((owner, repo)) = identifier.split_once('/') else {
        anyhow::bail!("invalid unit identifier '{identifier}': expected owner/repo");
    };

    let part_is_valid = |part: &str| {
        !part.is_empty()
            && part
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.')
            && part != "."
            && part != ".."
    };
    if !part_is_valid(owner) || !part_is_valid(repo) {
        anyhow::bail!("invalid unit identifier '{identifier}': expected owner/repo");
    }

    Ok(())
}
