mod archive;
mod config;
mod error;
mod jsonc;
mod layout;
mod release;
mod unit;

pub use archive::ArchiveType;
pub use config::{config_file_version, SyncConfig, Trigger, DEFAULT_HOST_SEGMENTS};
pub use error::{classify_failure, FailureClass, SyncError};
pub use jsonc::strip_jsonc_comments;
pub use layout::{default_state_dir, HostLayout, StateLayout};
pub use release::{ReleaseAsset, ReleaseDescriptor};
pub use unit::{validate_identifier, InstalledUnit};
