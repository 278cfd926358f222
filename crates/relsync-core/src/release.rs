use anyhow::Result;
use serde::Deserialize;

use crate::SyncError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseAsset {
    pub name: String,
    pub download_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseDescriptor {
    pub tag: String,
    pub assets: Vec<ReleaseAsset>,
}

#[derive(Debug, Deserialize)]
struct LatestReleaseBody {
    #[serde(default)]
    tag_name: Option<String>,
    #[serde(default)]
    assets: Vec<LatestReleaseAsset>,
}

#[derive(Debug, Deserialize)]
struct LatestReleaseAsset {
    name: String,
    browser_download_url: String,
}

impl ReleaseDescriptor {
    /// Parses a latest-release response body. A missing or empty
    /// `tag_name` means the upstream has no usable release.
    pub fn from_json_str(subject: &str, body: &str) -> Result<Self> {
        let parsed: LatestReleaseBody =
            serde_json::from_str(body).map_err(|err| SyncError::Parse {
                subject: subject.to_string(),
                reason: err.to_string(),
            })?;

        let tag = parsed
            .tag_name
            .filter(|tag| !tag.trim().is_empty())
            .ok_or_else(|| SyncError::Parse {
                subject: subject.to_string(),
                reason: "release has no tag_name".to_string(),
            })?;

        Ok(Self {
            tag,
            assets: parsed
                .assets
                .into_iter()
                .map(|asset| ReleaseAsset {
                    name: asset.name,
                    download_url: asset.browser_download_url,
                })
                .collect(),
        })
    }

    pub fn primary_asset(&self) -> Option<&ReleaseAsset> {
        self.assets.first()
    }
}
