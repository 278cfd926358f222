use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use relsync_core::{ArchiveType, ReleaseDescriptor, SyncError};
use relsync_resolver::HttpTransport;
use tracing::{debug, info};

use crate::extract::extract_zip;
use crate::scratch::{ScratchArchive, ScratchFile};

pub const DOWNLOAD_BUFFER_BYTES: usize = 1024 * 1024;

/// Receives download progress. Purely informational.
pub trait DownloadObserver {
    fn on_start(&mut self, _file_name: &str, _total: Option<u64>) {}
    fn on_progress(&mut self, received: u64, total: Option<u64>);
    fn on_finish(&mut self) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl DownloadObserver for NoopObserver {
    fn on_progress(&mut self, _received: u64, _total: Option<u64>) {}
}

/// Downloads the first asset of `release` into `scratch_root` and extracts
/// it next to the download. The compressed file is gone once this returns;
/// on error neither the file nor the extraction directory is left behind.
pub fn fetch_release_archive(
    transport: &dyn HttpTransport,
    release: &ReleaseDescriptor,
    scratch_root: &Path,
    observer: &mut dyn DownloadObserver,
) -> Result<ScratchArchive> {
    let asset = release
        .primary_asset()
        .ok_or_else(|| SyncError::UnsupportedAsset {
            name: release.tag.clone(),
            reason: "release has no assets".to_string(),
        })?;

    let response = transport.get(&asset.download_url)?;
    if !response.is_success() {
        return Err(SyncError::Transport {
            url: asset.download_url.clone(),
            reason: format!("unexpected status {}", response.status),
        }
        .into());
    }

    let Some(file_name) = response.file_name.clone() else {
        return Err(SyncError::Transport {
            url: asset.download_url.clone(),
            reason: "response did not name the downloaded file".to_string(),
        }
        .into());
    };
    if let Some(archive_type) = ArchiveType::infer_from_file_name(&file_name) {
        if !archive_type.is_supported() {
            return Err(SyncError::UnsupportedAsset {
                name: file_name,
                reason: format!("{} archives are not supported", archive_type.as_str()),
            }
            .into());
        }
    }

    fs::create_dir_all(scratch_root)
        .with_context(|| format!("failed to create scratch dir {}", scratch_root.display()))?;

    let download = ScratchFile::new(scratch_root.join(&file_name));
    let total = response.content_length;
    observer.on_start(&file_name, total);
    let streamed = stream_to_file(
        response.body,
        &asset.download_url,
        download.path(),
        total,
        observer,
    );
    observer.on_finish();
    let received = streamed?;
    info!(file = %file_name, bytes = received, "downloaded release asset");

    let archive = ScratchArchive::claim(scratch_root.join(extraction_dir_name(&file_name)))?;
    extract_zip(download.path(), archive.root())?;
    drop(download);
    debug!(root = %archive.root().display(), "extracted release asset");

    Ok(archive)
}

/// Extraction directory name derived from the downloaded file name.
pub fn extraction_dir_name(file_name: &str) -> String {
    let lower = file_name.to_ascii_lowercase();
    if lower.ends_with(".zip") && file_name.len() > 4 {
        return file_name[..file_name.len() - 4].to_string();
    }

    match Path::new(file_name).file_stem().and_then(|stem| stem.to_str()) {
        Some(stem) if stem != file_name && !stem.is_empty() => stem.to_string(),
        _ => format!("{file_name}-extracted"),
    }
}

fn stream_to_file(
    mut body: Box<dyn Read>,
    url: &str,
    path: &Path,
    total: Option<u64>,
    observer: &mut dyn DownloadObserver,
) -> Result<u64> {
    let mut file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut buffer = vec![0_u8; DOWNLOAD_BUFFER_BYTES];
    let mut received = 0_u64;

    loop {
        let read = match body.read(&mut buffer) {
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                return Err(SyncError::Transport {
                    url: url.to_string(),
                    reason: format!("download interrupted: {err}"),
                }
                .into());
            }
        };
        if read == 0 {
            break;
        }
        file.write_all(&buffer[..read])
            .with_context(|| format!("failed to write {}", path.display()))?;
        received += read as u64;
        observer.on_progress(received, total);
        debug!(received, total = total.unwrap_or(0), "download progress");
    }

    file.flush()
        .with_context(|| format!("failed to flush {}", path.display()))?;
    Ok(received)
}
