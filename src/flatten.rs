//! Collapsing redundant wrapper directories.
//!
//! `photos.zip` very often holds a single `photos/` folder. Extracted into
//! its own `photos/` target that gives `photos/photos/...`; this pass hoists
//! the inner folder's contents one level up.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

const WRAPPER_SUFFIXES: &[&str] = &[
    "_files",
    "-files",
    "_contents",
    "-contents",
    "_extracted",
    "-extracted",
];

/// Whether two directory names denote the same thing, ignoring case and
/// common wrapper suffixes such as `_files`.
pub fn names_similar(a: &str, b: &str) -> bool {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    strip_wrapper_suffix(&a) == strip_wrapper_suffix(&b)
}

/// Strip wrapper suffixes repeatedly: `x_contents_files` -> `x`.
fn strip_wrapper_suffix(mut name: &str) -> &str {
    while let Some(stripped) = WRAPPER_SUFFIXES.iter().find_map(move |s| name.strip_suffix(*s)) {
        name = stripped;
    }
    name
}

/// Hoist the contents of `dir`'s only child directory into `dir`.
///
/// Applies only when `dir` holds exactly one item, that item is a directory
/// (not a link to one), and its name is similar to `dir`'s own name.
/// Children whose names are taken get a `_N` suffix before the extension.
/// Returns the name of the removed wrapper, or `None` if nothing changed.
///
/// Single level: a wrapper inside the wrapper is left alone. If a move
/// fails, the wrapper is put back under a visible name with whatever was not
/// moved yet, and the error is returned.
pub fn flatten_single_folder(dir: &Path) -> io::Result<Option<String>> {
    let Some(dir_name) = dir.file_name().map(|n| n.to_string_lossy().into_owned()) else {
        return Ok(None);
    };

    let mut items = fs::read_dir(dir)?;
    let Some(only) = items.next().transpose()? else {
        return Ok(None);
    };
    if items.next().is_some() {
        return Ok(None);
    }
    if !only.file_type()?.is_dir() {
        return Ok(None);
    }

    let inner_name = only.file_name().to_string_lossy().into_owned();
    if !names_similar(&inner_name, &dir_name) {
        return Ok(None);
    }

    info!(dir = %dir.display(), inner = %inner_name, "flattening single folder");

    // Park the wrapper under a name no child can have.
    let staging = unique_path(dir, &OsString::from(format!(".{inner_name}.flatten")));
    fs::rename(only.path(), &staging)?;

    if let Err(e) = hoist_children(dir, &staging) {
        let restored = restore_wrapper(dir, &staging, &only.file_name());
        warn!(wrapper = %restored.display(), error = %e, "flatten interrupted");
        return Err(e);
    }

    fs::remove_dir(&staging)?;
    Ok(Some(inner_name))
}

fn hoist_children(dir: &Path, staging: &Path) -> io::Result<()> {
    for child in fs::read_dir(staging)? {
        let child = child?;
        let dest = unique_path(dir, &child.file_name());
        debug!(from = %child.path().display(), to = %dest.display(), "moving");
        fs::rename(child.path(), dest)?;
    }
    Ok(())
}

/// Rename the staging folder back to `name` (or `name_N`). Returns where the
/// leftovers now live.
fn restore_wrapper(dir: &Path, staging: &Path, name: &OsStr) -> PathBuf {
    let restored = unique_path(dir, &name.to_os_string());
    match fs::rename(staging, &restored) {
        Ok(()) => restored,
        Err(e) => {
            warn!(staging = %staging.display(), error = %e, "could not restore wrapper");
            staging.to_path_buf()
        }
    }
}

/// `<dir>/<name>`, or `<dir>/<stem>_N<.ext>` for the first free N.
fn unique_path(dir: &Path, name: &OsString) -> PathBuf {
    let candidate = dir.join(name);
    if fs::symlink_metadata(&candidate).is_err() {
        return candidate;
    }

    let as_path = Path::new(name);
    let stem = as_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = as_path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut n = 1u32;
    loop {
        let candidate = dir.join(format!("{stem}_{n}{ext}"));
        if fs::symlink_metadata(&candidate).is_err() {
            return candidate;
        }
        n += 1;
    }
}
