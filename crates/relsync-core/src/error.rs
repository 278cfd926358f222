use std::path::PathBuf;

use thiserror::Error;

/// Classified failure raised by the update pipeline.
///
/// Values travel inside `anyhow::Error` so callers keep context chains;
/// [`classify_failure`] recovers the class for reporting.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("transport failure for {url}: {reason}")]
    Transport { url: String, reason: String },

    #[error("parse failure for {subject}: {reason}")]
    Parse { subject: String, reason: String },

    #[error("unsupported release asset '{name}': {reason}")]
    UnsupportedAsset { name: String, reason: String },

    #[error("no payload directory containing '<dir>.{extension}' found in {}", archive_root.display())]
    PayloadNotFound {
        archive_root: PathBuf,
        extension: String,
    },

    #[error("directory conflict for '{identifier}': located '{located}' but '{recorded}' is recorded{}", owner_suffix(owner.as_deref()))]
    DirectoryConflict {
        identifier: String,
        recorded: String,
        located: String,
        owner: Option<String>,
    },

    #[error("filesystem failure at {}: {reason}", path.display())]
    Filesystem { path: PathBuf, reason: String },
}

fn owner_suffix(owner: Option<&str>) -> String {
    owner
        .map(|owner| format!(" by '{owner}'"))
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    Transport,
    Parse,
    UnsupportedAsset,
    PayloadNotFound,
    DirectoryConflict,
    Filesystem,
}

impl FailureClass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::Parse => "parse",
            Self::UnsupportedAsset => "unsupported-asset",
            Self::PayloadNotFound => "payload-not-found",
            Self::DirectoryConflict => "directory-conflict",
            Self::Filesystem => "filesystem",
        }
    }
}

impl SyncError {
    pub fn class(&self) -> FailureClass {
        match self {
            Self::Transport { .. } => FailureClass::Transport,
            Self::Parse { .. } => FailureClass::Parse,
            Self::UnsupportedAsset { .. } => FailureClass::UnsupportedAsset,
            Self::PayloadNotFound { .. } => FailureClass::PayloadNotFound,
            Self::DirectoryConflict { .. } => FailureClass::DirectoryConflict,
            Self::Filesystem { .. } => FailureClass::Filesystem,
        }
    }
}

pub fn classify_failure(err: &anyhow::Error) -> FailureClass {
    if let Some(sync_err) = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<SyncError>())
    {
        return sync_err.class();
    }

    // Unclassified errors come from `with_context` around std::fs calls.
    FailureClass::Filesystem
}
