//! Archive entry metadata shared by all adapters.

use crate::decode::Codepage;

/// An entry name as stored in the archive, before decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawName {
    /// Raw bytes with no reliable encoding information.
    Bytes(Vec<u8>),
    /// Text the reader decoded from a Unicode field; trusted as-is.
    Text(String),
    /// Text the reader already decoded once through a fixed fallback codepage,
    /// which may have been the wrong one.
    Legacy { text: String, codepage: Codepage },
}

impl RawName {
    /// Best-effort display form, used in messages before decoding.
    pub fn lossy(&self) -> String {
        match self {
            Self::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            Self::Text(text) | Self::Legacy { text, .. } => text.clone(),
        }
    }
}

/// Type of an archive entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    /// Symbolic or hard link. Never written.
    Symlink { target: String },
    /// Device files, fifos and other special types. Never written.
    Other { kind: String },
}

/// Metadata about one archive entry.
#[derive(Debug, Clone)]
pub struct EntryInfo {
    /// Name as stored in the archive.
    pub name: RawName,
    /// Declared (uncompressed) size in bytes.
    pub size: u64,
    pub kind: EntryKind,
    /// Unix permission bits, when the format records them.
    pub mode: Option<u32>,
    /// Entry data requires a password.
    pub encrypted: bool,
}

impl EntryInfo {
    pub fn is_dir(&self) -> bool {
        matches!(self.kind, EntryKind::Directory)
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, EntryKind::File)
    }
}
