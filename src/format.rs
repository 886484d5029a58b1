//! Container format detection.
//!
//! Detection is suffix-based. It happens once, when a path is first seen, and
//! the resulting tag picks the reader; nothing downstream branches on file
//! names again.

use std::fmt;
use std::path::Path;

/// A container format the engine knows about.
///
/// A format can be detected even when its reader is not compiled in; opening
/// such an archive fails with [`crate::Error::UnsupportedFormat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveFormat {
    Zip,
    Tar,
    TarGz,
    TarBz2,
    SevenZ,
    Rar,
}

/// Suffixes, longest first so `.tar.gz` wins over `.tar`. A bare `.gz` is
/// not a container.
const SUFFIXES: &[(&str, ArchiveFormat)] = &[
    (".tar.bz2", ArchiveFormat::TarBz2),
    (".tar.gz", ArchiveFormat::TarGz),
    (".tbz2", ArchiveFormat::TarBz2),
    (".tbz", ArchiveFormat::TarBz2),
    (".tgz", ArchiveFormat::TarGz),
    (".tar", ArchiveFormat::Tar),
    (".zip", ArchiveFormat::Zip),
    (".rar", ArchiveFormat::Rar),
    (".7z", ArchiveFormat::SevenZ),
];

impl ArchiveFormat {
    /// Detect the format of `path` from its file name.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        Self::from_file_name(name)
    }

    /// Detect the format from a bare file name.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        SUFFIXES
            .iter()
            .find(|(suffix, _)| lower.len() > suffix.len() && lower.ends_with(suffix))
            .map(|(_, format)| *format)
    }

    /// Strip the format suffix from a file name (`bundle.tar.gz` -> `bundle`).
    ///
    /// Names without a known suffix are returned unchanged.
    pub fn strip_suffix(name: &str) -> &str {
        let lower = name.to_ascii_lowercase();
        for (suffix, _) in SUFFIXES {
            if lower.len() > suffix.len() && lower.ends_with(suffix) {
                // ASCII lowercasing keeps byte offsets, so the cut is valid in `name`.
                return &name[..name.len() - suffix.len()];
            }
        }
        name
    }

    /// Human-readable format name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::Tar => "tar",
            Self::TarGz => "tar.gz",
            Self::TarBz2 => "tar.bz2",
            Self::SevenZ => "7z",
            Self::Rar => "rar",
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether `path` names a supported container.
pub fn is_supported_archive(path: &Path) -> bool {
    ArchiveFormat::from_path(path).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_suffix_wins() {
        assert_eq!(
            ArchiveFormat::from_file_name("a.tar.gz"),
            Some(ArchiveFormat::TarGz)
        );
        assert_eq!(
            ArchiveFormat::from_file_name("A.TBZ2"),
            Some(ArchiveFormat::TarBz2)
        );
        assert_eq!(ArchiveFormat::from_file_name("notes.gz"), None);
        assert_eq!(ArchiveFormat::from_file_name(".zip"), None);
    }

    #[test]
    fn strip_keeps_original_case() {
        assert_eq!(ArchiveFormat::strip_suffix("Bundle.TAR.GZ"), "Bundle");
        assert_eq!(ArchiveFormat::strip_suffix("v1.2.zip"), "v1.2");
        assert_eq!(ArchiveFormat::strip_suffix("readme.txt"), "readme.txt");
    }
}
