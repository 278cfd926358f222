#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveType {
    Zip,
    TarGz,
    TarBz2,
    TarXz,
    TarZst,
    Tar,
    Gzip,
    Bzip2,
    Xz,
    SevenZip,
    Rar,
}

impl ArchiveType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::TarGz => "tar.gz",
            Self::TarBz2 => "tar.bz2",
            Self::TarXz => "tar.xz",
            Self::TarZst => "tar.zst",
            Self::Tar => "tar",
            Self::Gzip => "gz",
            Self::Bzip2 => "bz2",
            Self::Xz => "xz",
            Self::SevenZip => "7z",
            Self::Rar => "rar",
        }
    }

    /// Only zip archives carry a folder structure this engine can extract.
    pub fn is_supported(self) -> bool {
        self == Self::Zip
    }

    pub fn infer_from_file_name(file_name: &str) -> Option<Self> {
        let lower = file_name.trim().to_ascii_lowercase();
        if lower.ends_with(".zip") {
            return Some(Self::Zip);
        }
        if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            return Some(Self::TarGz);
        }
        if lower.ends_with(".tar.bz2") || lower.ends_with(".tbz2") {
            return Some(Self::TarBz2);
        }
        if lower.ends_with(".tar.xz") || lower.ends_with(".txz") {
            return Some(Self::TarXz);
        }
        if lower.ends_with(".tar.zst") || lower.ends_with(".tzst") {
            return Some(Self::TarZst);
        }
        if lower.ends_with(".tar") {
            return Some(Self::Tar);
        }
        if lower.ends_with(".gz") {
            return Some(Self::Gzip);
        }
        if lower.ends_with(".bz2") {
            return Some(Self::Bzip2);
        }
        if lower.ends_with(".xz") {
            return Some(Self::Xz);
        }
        if lower.ends_with(".zst") {
            return Some(Self::TarZst);
        }
        if lower.ends_with(".7z") {
            return Some(Self::SevenZip);
        }
        if lower.ends_with(".rar") {
            return Some(Self::Rar);
        }

        None
    }
}
