mod manifest;
mod manifest_state;
mod manifest_store;

pub use manifest::Manifest;
pub use manifest_state::manifest_file_version;
pub use manifest_store::ManifestStore;

pub(crate) use manifest_state::{parse_manifest_file, render_manifest_file};
