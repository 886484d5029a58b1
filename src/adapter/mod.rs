//! Archive format adapters.
//!
//! Adapters normalize different archive formats into a common interface
//! for the extraction engine. The engine never looks at a format directly:
//! it asks an [`ArchiveOpener`] for a reader and drives it through
//! [`ArchiveReader`].

use std::io::Read;
use std::path::Path;

use crate::entry::EntryInfo;
use crate::error::Error;
use crate::format::ArchiveFormat;

#[cfg(feature = "tar")]
mod tar_adapter;
mod zip_adapter;

#[cfg(feature = "sevenz")]
mod sevenz_adapter;

#[cfg(feature = "rar")]
mod rar_adapter;

#[cfg(feature = "tar")]
pub use tar_adapter::TarAdapter;
pub use zip_adapter::ZipAdapter;

#[cfg(feature = "sevenz")]
pub use sevenz_adapter::SevenZAdapter;

#[cfg(feature = "rar")]
pub use rar_adapter::RarAdapter;

/// Callback receiving each entry and a reader over its data.
///
/// Directories, links and encrypted entries get an empty reader. When the
/// adapter cannot open one entry's data it passes the entry-level error
/// instead and moves on to the next entry. Returning an error from the
/// callback stops the walk and is passed through unchanged.
pub type EntryVisitor<'a> =
    dyn FnMut(&EntryInfo, Result<&mut dyn Read, Error>) -> Result<(), Error> + 'a;

/// One opened container.
pub trait ArchiveReader {
    /// Format tag detected for this archive.
    fn format(&self) -> ArchiveFormat;

    /// Path the archive was opened from.
    fn path(&self) -> &Path;

    /// Whether the archive as a whole needs a password.
    ///
    /// Archives with some encrypted members report `false`; those members
    /// carry [`EntryInfo::encrypted`] instead.
    fn is_encrypted(&mut self) -> Result<bool, Error>;

    /// Entry metadata, without decompressing entry data.
    fn list_entries(&mut self) -> Result<Vec<EntryInfo>, Error>;

    /// Stream every entry, in archive order, through `visit`.
    fn for_each_entry(&mut self, visit: &mut EntryVisitor<'_>) -> Result<(), Error>;
}

/// Picks a reader for a path.
pub trait ArchiveOpener: Send + Sync {
    /// Format of `path`, or `None` if it is not an archive this opener handles.
    fn detect(&self, path: &Path) -> Option<ArchiveFormat> {
        ArchiveFormat::from_path(path)
    }

    /// Open `path` as the given format.
    fn open(&self, path: &Path, format: ArchiveFormat) -> Result<Box<dyn ArchiveReader>, Error>;
}

/// Opener for the formats compiled into this build.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinOpener;

impl ArchiveOpener for BuiltinOpener {
    fn open(&self, path: &Path, format: ArchiveFormat) -> Result<Box<dyn ArchiveReader>, Error> {
        match format {
            ArchiveFormat::Zip => Ok(Box::new(ZipAdapter::open(path)?)),
            #[cfg(feature = "tar")]
            ArchiveFormat::Tar | ArchiveFormat::TarGz | ArchiveFormat::TarBz2 => {
                Ok(Box::new(TarAdapter::open(path, format)?))
            }
            #[cfg(feature = "sevenz")]
            ArchiveFormat::SevenZ => Ok(Box::new(SevenZAdapter::open(path)?)),
            #[cfg(feature = "rar")]
            ArchiveFormat::Rar => Ok(Box::new(RarAdapter::open(path)?)),
            #[allow(unreachable_patterns)]
            other => Err(Error::UnsupportedFormat {
                path: path.to_path_buf(),
                detail: format!("{} support is not enabled in this build", other),
            }),
        }
    }
}

/// Open `path` with the built-in readers, detecting the format from its name.
pub fn open(path: &Path) -> Result<Box<dyn ArchiveReader>, Error> {
    let format = ArchiveFormat::from_path(path).ok_or_else(|| Error::UnsupportedFormat {
        path: path.to_path_buf(),
        detail: "unrecognized file extension".to_string(),
    })?;
    BuiltinOpener.open(path, format)
}
