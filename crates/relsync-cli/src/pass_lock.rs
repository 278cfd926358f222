use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use relsync_core::StateLayout;
use tracing::warn;

/// Marker claiming the state directory for one update pass. A second pass
/// is refused while the marker exists; dropping the lock releases it. A
/// marker whose recorded pid is no longer running is cleared on acquire.
#[derive(Debug)]
pub(crate) struct PassLock {
    path: PathBuf,
}

impl PassLock {
    pub(crate) fn acquire(state: &StateLayout) -> Result<Self> {
        let path = state.active_pass_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        if let Some(lock) = claim(&path)? {
            return Ok(lock);
        }
        if clear_if_abandoned(&path)? {
            if let Some(lock) = claim(&path)? {
                return Ok(lock);
            }
        }
        Err(held_error(&path))
    }
}

/// Creates the marker, or returns `None` when another pass already holds it.
fn claim(path: &Path) -> Result<Option<PassLock>> {
    let mut file = match fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
    {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => return Ok(None),
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to claim pass marker: {}", path.display()));
        }
    };

    let written = file
        .write_all(format!("{}\n", std::process::id()).as_bytes())
        .and_then(|()| file.sync_all());
    if let Err(err) = written {
        let _ = fs::remove_file(path);
        return Err(err)
            .with_context(|| format!("failed to write pass marker: {}", path.display()));
    }

    Ok(Some(PassLock {
        path: path.to_path_buf(),
    }))
}

/// Removes a marker left by a process that no longer exists, such as a
/// `watch` killed mid-pass. Returns whether the marker was cleared.
fn clear_if_abandoned(path: &Path) -> Result<bool> {
    let Some(pid) = read_holder(path).and_then(|holder| holder.parse::<u32>().ok()) else {
        return Ok(false);
    };
    if pid == std::process::id() || process_is_running(pid) {
        return Ok(false);
    }

    warn!(pid, path = %path.display(), "clearing pass marker left by a process that is gone");
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(true),
        Err(err) => Err(err)
            .with_context(|| format!("failed to clear abandoned pass marker: {}", path.display())),
    }
}

fn held_error(path: &Path) -> anyhow::Error {
    let detail = read_holder(path)
        .map(|holder| format!(" (pid={holder})"))
        .unwrap_or_default();
    anyhow!(
        "another update pass is already running{detail}; remove {} if it is stale",
        path.display()
    )
}

#[cfg(target_os = "linux")]
fn process_is_running(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

// No portable liveness check here; the holder is assumed alive.
#[cfg(not(target_os = "linux"))]
fn process_is_running(_pid: u32) -> bool {
    true
}

impl Drop for PassLock {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.path) {
            if err.kind() != io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %err, "failed to release pass marker");
            }
        }
    }
}

fn read_holder(path: &Path) -> Option<String> {
    let raw = fs::read_to_string(path).ok()?;
    let holder = raw.trim();
    (!holder.is_empty()).then(|| holder.to_string())
}
