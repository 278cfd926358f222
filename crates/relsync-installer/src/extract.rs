use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use relsync_core::SyncError;
use zip::result::ZipError;
use zip::ZipArchive;

/// Extracts a zip archive into `dst`, which must already exist. Entries
/// with paths escaping `dst` are rejected by the zip reader.
pub fn extract_zip(archive_path: &Path, dst: &Path) -> Result<()> {
    let file = File::open(archive_path)
        .with_context(|| format!("failed to open {}", archive_path.display()))?;
    let name = archive_path
        .file_name()
        .map(|value| value.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut archive = ZipArchive::new(file).map_err(|err| classify_zip_error(&name, dst, err))?;
    archive
        .extract(dst)
        .map_err(|err| classify_zip_error(&name, dst, err))?;
    Ok(())
}

fn classify_zip_error(name: &str, dst: &Path, err: ZipError) -> SyncError {
    match err {
        ZipError::Io(io_err) => SyncError::Filesystem {
            path: dst.to_path_buf(),
            reason: format!("failed extracting '{name}': {io_err}"),
        },
        other => SyncError::UnsupportedAsset {
            name: name.to_string(),
            reason: format!("not a readable zip archive: {other}"),
        },
    }
}
