use anyhow::Result;
use relsync_core::{ReleaseDescriptor, SyncError};
use tracing::debug;

use crate::HttpTransport;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    UpToDate,
    NewRelease(ReleaseDescriptor),
}

pub fn latest_release_url(api_base: &str, identifier: &str) -> String {
    format!(
        "{}/repos/{}/releases/latest",
        api_base.trim_end_matches('/'),
        identifier
    )
}

/// Queries the latest release of `identifier` and compares its tag with
/// `known_version` by exact string equality.
pub fn resolve_latest_release(
    transport: &dyn HttpTransport,
    api_base: &str,
    identifier: &str,
    known_version: Option<&str>,
) -> Result<ResolveOutcome> {
    let url = latest_release_url(api_base, identifier);
    let response = transport.get(&url)?;
    if !response.is_success() {
        return Err(SyncError::Transport {
            url,
            reason: format!("unexpected status {}", response.status),
        }
        .into());
    }

    let body = response.into_text(&url)?;
    let release = ReleaseDescriptor::from_json_str(identifier, &body)?;
    debug!(
        identifier,
        tag = %release.tag,
        known = known_version.unwrap_or("-"),
        assets = release.assets.len(),
        "resolved latest release"
    );

    if known_version == Some(release.tag.as_str()) {
        return Ok(ResolveOutcome::UpToDate);
    }
    Ok(ResolveOutcome::NewRelease(release))
}
