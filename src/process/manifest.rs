//! package.json lifecycle scripts

use crate::error::{NpmError, NpmResult};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Manifest file name
pub const PACKAGE_JSON: &str = "package.json";

/// The parts of package.json this crate reads
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageManifest {
    #[serde(default)]
    pub scripts: HashMap<String, String>,
}

impl PackageManifest {
    /// Read `package.json` from a project directory. A missing file
    /// yields an empty manifest.
    pub fn from_dir(dir: &Path) -> NpmResult<Self> {
        let path = dir.join(PACKAGE_JSON);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(NpmError::io(format!("reading {}", path.display()), e)),
        };
        Ok(serde_json::from_str(&content)?)
    }

    /// Whether a lifecycle script is declared
    pub fn has_script(&self, name: &str) -> bool {
        self.scripts.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn reads_declared_scripts() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(PACKAGE_JSON),
            r#"{"name": "app", "scripts": {"postinstall": "node setup.js"}}"#,
        )
        .unwrap();

        let manifest = PackageManifest::from_dir(dir.path()).unwrap();
        assert!(manifest.has_script("postinstall"));
        assert!(!manifest.has_script("preinstall"));
    }

    #[test]
    fn missing_manifest_is_empty() {
        let dir = TempDir::new().unwrap();
        let manifest = PackageManifest::from_dir(dir.path()).unwrap();
        assert!(manifest.scripts.is_empty());
    }

    #[test]
    fn malformed_manifest_errors() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(PACKAGE_JSON), "{").unwrap();
        assert!(matches!(
            PackageManifest::from_dir(dir.path()),
            Err(NpmError::Json(_))
        ));
    }
}
