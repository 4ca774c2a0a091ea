//! Two-hop symlink indirection
//!
//! `source -> indirection -> target`. The first hop is public and never
//! changes once created; only the indirection is ever repointed, which
//! lets a later process move `target` without touching `source`.

use crate::error::{LinkPhase, NpmError, NpmResult};
use crate::fs_ops;
use sha2::{Digest, Sha256};
use std::fs;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Publishes links through a relocatable indirection under a shared root
#[derive(Debug, Clone)]
pub struct Linker {
    tmp_dir: PathBuf,
    path: Option<PathBuf>,
}

impl Linker {
    /// Create a linker whose indirections live under `tmp_dir`
    pub fn new(tmp_dir: impl Into<PathBuf>) -> Self {
        Self {
            tmp_dir: tmp_dir.into(),
            path: None,
        }
    }

    /// Pin the indirection to `tmp_dir/<path>` instead of a hashed name
    pub fn with_path(&self, path: impl Into<PathBuf>) -> Self {
        Self {
            tmp_dir: self.tmp_dir.clone(),
            path: Some(path.into()),
        }
    }

    /// The indirection path `link` would use for this pair
    pub fn indirection(&self, source: &Path, target: &Path) -> PathBuf {
        match &self.path {
            Some(path) => self.tmp_dir.join(path),
            None => {
                let mut hasher = Sha256::new();
                hasher.update(source.as_os_str().as_encoded_bytes());
                hasher.update(target.as_os_str().as_encoded_bytes());
                self.tmp_dir.join(hex::encode(hasher.finalize()))
            }
        }
    }

    /// Make `source` resolve to `target` through the indirection.
    ///
    /// When `source` already points at the indirection it is left alone
    /// and only the second hop is rewritten. Returns the indirection path.
    pub fn link(&self, source: &Path, target: &Path) -> NpmResult<PathBuf> {
        let indirection = self.indirection(source, target);
        let first_hop_current = fs::read_link(source)
            .map(|current| current == indirection)
            .unwrap_or(false);

        if !first_hop_current {
            fs_ops::remove_all(source)
                .map_err(|e| NpmError::link(LinkPhase::RemoveSource, source, e))?;
        }

        Self::repoint(&indirection, target)?;

        if !first_hop_current {
            symlink(&indirection, source)
                .map_err(|e| NpmError::link(LinkPhase::CreateSourceLink, source, e))?;
        }

        debug!(
            "Linked {} -> {} -> {}",
            source.display(),
            indirection.display(),
            target.display()
        );
        Ok(indirection)
    }

    /// Point an existing indirection at a new target
    pub fn repoint(indirection: &Path, target: &Path) -> NpmResult<()> {
        fs_ops::remove_all(indirection)
            .map_err(|e| NpmError::link(LinkPhase::RemoveIndirection, indirection, e))?;

        if let Some(parent) = indirection.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| NpmError::link(LinkPhase::CreateIndirectionParent, parent, e))?;
        }

        symlink(target, indirection)
            .map_err(|e| NpmError::link(LinkPhase::CreateIndirectionLink, indirection, e))
    }
}
