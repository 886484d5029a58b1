//! Path traversal defense.
//!
//! Every decoded entry name goes through [`PathGuard::sanitize`] before it
//! touches the filesystem, at every nesting depth.

use std::path::{Path, PathBuf};

use path_jail::Jail;

use crate::error::Error;

/// Validates entry names against one target directory.
pub struct PathGuard {
    root: PathBuf,
    jail: Jail,
}

impl PathGuard {
    /// Create a guard for `root`, which must already exist.
    pub fn new(root: &Path) -> Result<Self, Error> {
        let jail = Jail::new(root).map_err(|e| Error::PathTraversal {
            entry: root.display().to_string(),
            detail: e.to_string(),
        })?;
        Ok(Self {
            root: root.to_path_buf(),
            jail,
        })
    }

    /// Directory entries are confined to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Turn a decoded entry name into a safe path relative to the root.
    ///
    /// Backslashes count as separators and `.`/empty segments are dropped.
    /// Absolute names, drive prefixes and `..` segments are rejected outright,
    /// even when they would resolve back inside the root.
    pub fn sanitize(&self, name: &str) -> Result<PathBuf, Error> {
        let relative = normalize(name)?;

        // Lexically clean, but a symlink already on disk could still redirect it.
        self.jail
            .join(&relative)
            .map_err(|e| Error::PathTraversal {
                entry: name.to_string(),
                detail: e.to_string(),
            })?;

        Ok(relative)
    }

    /// Absolute destination for an entry name.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, Error> {
        // Built by hand rather than taken from the jail, which canonicalizes
        // the root (e.g. /tmp -> /private/tmp on macOS).
        Ok(self.root.join(self.sanitize(name)?))
    }
}

/// Lexical normalization shared by [`PathGuard::sanitize`].
fn normalize(name: &str) -> Result<PathBuf, Error> {
    if name.contains('\0') {
        return Err(Error::InvalidName {
            entry: name.to_string(),
            reason: "contains NUL byte".to_string(),
        });
    }

    let unified = name.replace('\\', "/");
    if unified.starts_with('/') {
        return Err(Error::PathTraversal {
            entry: name.to_string(),
            detail: "absolute path".to_string(),
        });
    }
    if has_drive_prefix(&unified) {
        return Err(Error::PathTraversal {
            entry: name.to_string(),
            detail: "drive-qualified path".to_string(),
        });
    }

    let mut relative = PathBuf::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                return Err(Error::PathTraversal {
                    entry: name.to_string(),
                    detail: "parent directory segment".to_string(),
                });
            }
            normal => relative.push(normal),
        }
    }

    if relative.as_os_str().is_empty() {
        return Err(Error::InvalidName {
            entry: name.to_string(),
            reason: "empty filename".to_string(),
        });
    }
    Ok(relative)
}

/// `C:foo`, `c:/foo` and friends.
fn has_drive_prefix(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}
