//! Linked workspace packages
//!
//! Workspace packages listed in the lockfile with `link: true` live in
//! the application source, which does not survive the build. Each one is
//! copied into a layer and its original location is published through a
//! pinned indirection so a later process can repoint it.

use crate::error::{NpmError, NpmResult};
use crate::fs_ops;
use crate::link::linker::Linker;
use crate::link::lockfile::PackageLock;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Makes linked workspace packages resolvable from a layer
#[derive(Debug, Clone)]
pub struct LinkedModuleResolver {
    linker: Linker,
}

impl LinkedModuleResolver {
    pub fn new(linker: Linker) -> Self {
        Self { linker }
    }

    /// Copy every linked package into `layer_path` and link the original
    /// location to the copy. Returns the relative paths handled.
    pub fn resolve(&self, lockfile_path: &Path, layer_path: &Path) -> NpmResult<Vec<PathBuf>> {
        let lock = PackageLock::from_file(lockfile_path)?;
        let dir = lockfile_path.parent().unwrap_or_else(|| Path::new("."));

        let mut resolved = Vec::new();
        for relative in lock.linked_paths() {
            let source = dir.join(relative);
            let destination = layer_path.join(relative);

            scaffold(&destination)?;

            let present = fs_ops::exists(&destination)
                .map_err(|e| NpmError::linked_module(&destination, "probe layer copy", e))?;
            if !present {
                fs_ops::copy_path(&source, &destination).map_err(|e| {
                    NpmError::linked_module(&source, "copy linked module directory to layer", e)
                })?;
            }

            self.linker
                .with_path(relative)
                .link(&source, &destination)?;

            debug!(
                "Resolved linked module {} -> {}",
                source.display(),
                destination.display()
            );
            resolved.push(PathBuf::from(relative));
        }

        if !resolved.is_empty() {
            info!("Resolved {} linked workspace modules", resolved.len());
        }
        Ok(resolved)
    }

    /// Copy already-resolved linked packages from one layer to another.
    /// No links are touched.
    pub fn copy(
        &self,
        lockfile_path: &Path,
        source_layer: &Path,
        target_layer: &Path,
    ) -> NpmResult<Vec<PathBuf>> {
        let lock = PackageLock::from_file(lockfile_path)?;

        let mut copied = Vec::new();
        for relative in lock.linked_paths() {
            let source = source_layer.join(relative);
            let destination = target_layer.join(relative);

            scaffold(&destination)?;
            fs_ops::copy_path(&source, &destination).map_err(|e| {
                NpmError::linked_module(&source, "copy linked module directory between layers", e)
            })?;

            copied.push(PathBuf::from(relative));
        }

        Ok(copied)
    }
}

fn scaffold(destination: &Path) -> NpmResult<()> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            NpmError::linked_module(destination, "set up linked module directory scaffolding", e)
        })?;
    }
    Ok(())
}
