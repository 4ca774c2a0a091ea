//! package-lock.json parsing
//!
//! Only `packages.<name>.resolved` and `packages.<name>.link` are read.

use crate::error::{NpmError, NpmResult};
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::warn;

/// Lockfile file name
pub const PACKAGE_LOCK: &str = "package-lock.json";

/// Parsed lockfile
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageLock {
    #[serde(default)]
    pub packages: HashMap<String, LockedPackage>,
}

/// A single lockfile package entry
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LockedPackage {
    /// Relative path (linked packages) or remote URL
    #[serde(default)]
    pub resolved: String,

    /// Whether the package is a local workspace link
    #[serde(default)]
    pub link: bool,
}

impl PackageLock {
    /// Read a lockfile from disk
    pub fn from_file(path: &Path) -> NpmResult<Self> {
        let file = File::open(path).map_err(|e| NpmError::LockfileOpen {
            path: path.to_path_buf(),
            source: e,
        })?;

        serde_json::from_reader(BufReader::new(file)).map_err(|e| NpmError::LockfileParse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Relative paths of every linked workspace package, sorted
    pub fn linked_paths(&self) -> Vec<&str> {
        let mut paths = BTreeSet::new();
        for (name, package) in &self.packages {
            if !package.link {
                continue;
            }
            if package.resolved.is_empty() || package.resolved.contains("://") {
                warn!(
                    "Skipping linked package {:?} with unusable resolved path {:?}",
                    name, package.resolved
                );
                continue;
            }
            paths.insert(package.resolved.as_str());
        }
        paths.into_iter().collect()
    }
}
