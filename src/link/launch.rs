//! Launch-time symlink setup
//!
//! Runs in a separate, later process. The application's links were
//! published at build time through indirections; here only those
//! indirections are repointed at the launch layer.

use crate::error::{NpmError, NpmResult};
use crate::fs_ops;
use crate::link::linker::Linker;
use crate::link::lockfile::{PackageLock, PACKAGE_LOCK};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Repoint the application's indirections at `layer_path`.
///
/// Does nothing when `node_modules` already resolves to a directory.
pub fn setup_symlinks(app_dir: &Path, layer_path: &Path) -> NpmResult<()> {
    let node_modules = app_dir.join("node_modules");
    let handle = read_handle(app_dir, &node_modules)?;

    let resolved = fs::metadata(&handle).map(|m| m.is_dir()).unwrap_or(false);
    if resolved {
        debug!("{} already resolves, nothing to do", node_modules.display());
        return Ok(());
    }

    let lockfile_path = app_dir.join(PACKAGE_LOCK);
    let locked = fs_ops::exists(&lockfile_path)
        .map_err(|e| NpmError::io(format!("probing {}", lockfile_path.display()), e))?;
    if locked {
        let lock = PackageLock::from_file(&lockfile_path)?;
        for relative in lock.linked_paths() {
            let package_handle = read_handle(app_dir, &app_dir.join(relative))?;
            Linker::repoint(&package_handle, &layer_path.join(relative))?;
        }
    }

    Linker::repoint(&handle, &layer_path.join("node_modules"))?;
    info!(
        "Pointed {} at {}",
        node_modules.display(),
        layer_path.join("node_modules").display()
    );
    Ok(())
}

fn read_handle(app_dir: &Path, link: &Path) -> NpmResult<PathBuf> {
    let handle = fs::read_link(link)
        .map_err(|e| NpmError::io(format!("reading link {}", link.display()), e))?;
    if handle.is_absolute() {
        Ok(handle)
    } else {
        Ok(link.parent().unwrap_or(app_dir).join(handle))
    }
}
