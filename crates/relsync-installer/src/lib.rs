mod extract;
mod fetch;
mod fs_utils;
mod locate;
mod merge;
mod scratch;
mod tree;
mod uninstall;

pub use extract::extract_zip;
pub use fetch::{
    extraction_dir_name, fetch_release_archive, DownloadObserver, NoopObserver,
    DOWNLOAD_BUFFER_BYTES,
};
pub use fs_utils::{copy_dir_recursive, remove_dir_if_exists, remove_file_if_exists};
pub use locate::{locate_payload, payload_directory_name};
pub use merge::{find_structural_match, merge_into_host, MergeReport, MergeStrategy, StructuralMatch};
pub use scratch::{ScratchArchive, ScratchFile};
pub use tree::{DirectoryTree, EntryKind, FsTree, MemoryTree, TreeEntry};
pub use uninstall::{remove_unit_directory, RemovalStatus};
