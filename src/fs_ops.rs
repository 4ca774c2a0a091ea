//! Filesystem helpers shared by the install processes and the linker
//!
//! These return plain `std::io::Result` so callers can attach their own
//! context (link phase, linked module path, process step).

use std::fs;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

/// Report whether a path exists, following symlinks.
///
/// Unlike `Path::exists`, errors other than "not found" are surfaced.
pub fn exists(path: &Path) -> io::Result<bool> {
    match fs::metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Remove a file, symlink or directory tree. Missing paths are fine.
pub fn remove_all(path: &Path) -> io::Result<()> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// Whether a directory has no entries
pub fn is_empty_dir(path: &Path) -> io::Result<bool> {
    Ok(fs::read_dir(path)?.next().is_none())
}

/// Move `source` to `destination`, replacing whatever is there.
///
/// Falls back to copy-and-delete when a rename is not possible
/// (e.g. source and destination live on different devices).
pub fn move_path(source: &Path, destination: &Path) -> io::Result<()> {
    remove_all(destination)?;
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }

    if fs::rename(source, destination).is_ok() {
        return Ok(());
    }

    copy_path(source, destination)?;
    remove_all(source)
}

/// Copy a file or directory tree. Symlinks are recreated, not followed,
/// except when `source` itself is a symlink.
pub fn copy_path(source: &Path, destination: &Path) -> io::Result<()> {
    let metadata = fs::metadata(source)?;
    if !metadata.is_dir() {
        fs::copy(source, destination)?;
        return Ok(());
    }

    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry.path().strip_prefix(source).unwrap_or(entry.path());
        let target = destination.join(relative);
        let file_type = entry.file_type();

        if file_type.is_symlink() && entry.depth() > 0 {
            let link = fs::read_link(entry.path())?;
            remove_all(&target)?;
            std::os::unix::fs::symlink(link, &target)?;
        } else if entry.path().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }

    Ok(())
}

/// Replace `link` with a direct symlink to `target`
pub fn replace_with_symlink(target: &Path, link: &Path) -> io::Result<()> {
    remove_all(link)?;
    std::os::unix::fs::symlink(target, link)
}
