//! Storage layers
//!
//! A layer is a directory with a lifetime scope (build, launch, cache)
//! and a small persisted metadata record. The record is the only state
//! that survives across builds.
//!
//! # On-disk layout
//!
//! | Path | Contents |
//! |------|----------|
//! | `<layers>/<name>/` | Layer contents (`node_modules/`, `env/`) |
//! | `<layers>/<name>.toml` | Scope flags and `[metadata]` |

pub mod env;

pub use env::{EnvEntry, EnvOp};

use crate::error::{NpmError, NpmResult};
use crate::fs_ops;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Layer name for build-time modules
pub const BUILD_MODULES: &str = "build-modules";
/// Layer name for launch-time modules
pub const LAUNCH_MODULES: &str = "launch-modules";
/// Layer name for the npm cache
pub const NPM_CACHE: &str = "npm-cache";

/// Persisted cache metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerMetadata {
    /// Checksum of the inputs that produced the layer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_sha: Option<String>,

    /// When the layer was produced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub built_at: Option<DateTime<Utc>>,
}

impl LayerMetadata {
    /// Metadata for a freshly built layer
    pub fn built(cache_sha: impl Into<String>) -> Self {
        let cache_sha = cache_sha.into();
        Self {
            cache_sha: (!cache_sha.is_empty()).then_some(cache_sha),
            built_at: Some(Utc::now()),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LayerRecord {
    #[serde(default)]
    build: bool,
    #[serde(default)]
    launch: bool,
    #[serde(default)]
    cache: bool,
    #[serde(default)]
    metadata: LayerMetadata,
}

/// A storage layer
#[derive(Debug, Clone)]
pub struct Layer {
    /// Layer name
    pub name: String,
    /// Layer directory
    pub path: PathBuf,
    /// Available to later build steps
    pub build: bool,
    /// Persisted into the runtime image
    pub launch: bool,
    /// Restored on the next build
    pub cache: bool,
    /// Metadata read back from the previous build
    pub metadata: LayerMetadata,
}

impl Layer {
    fn record_path(&self) -> PathBuf {
        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        parent.join(format!("{}.toml", self.name))
    }

    /// Path of `node_modules` inside the layer
    pub fn node_modules(&self) -> PathBuf {
        self.path.join("node_modules")
    }

    /// Empty the layer directory and forget its metadata
    pub fn reset(&mut self) -> NpmResult<()> {
        fs_ops::remove_all(&self.path)
            .map_err(|e| NpmError::io(format!("resetting layer {}", self.path.display()), e))?;
        fs::create_dir_all(&self.path)
            .map_err(|e| NpmError::io(format!("creating layer {}", self.path.display()), e))?;
        self.metadata = LayerMetadata::default();
        Ok(())
    }

    /// Whether the layer directory holds nothing
    pub fn is_empty(&self) -> NpmResult<bool> {
        match fs_ops::exists(&self.path) {
            Ok(false) => Ok(true),
            Ok(true) => fs_ops::is_empty_dir(&self.path)
                .map_err(|e| NpmError::io(format!("reading layer {}", self.path.display()), e)),
            Err(e) => Err(NpmError::io(
                format!("probing layer {}", self.path.display()),
                e,
            )),
        }
    }

    /// Persist flags and metadata
    pub fn save(&self) -> NpmResult<()> {
        let record = LayerRecord {
            build: self.build,
            launch: self.launch,
            cache: self.cache,
            metadata: self.metadata.clone(),
        };
        let content = toml::to_string_pretty(&record)?;
        let path = self.record_path();
        fs::write(&path, content)
            .map_err(|e| NpmError::io(format!("writing layer record {}", path.display()), e))?;
        debug!("Saved layer record {}", path.display());
        Ok(())
    }

    /// Write environment contributions into `<layer>/env/`
    pub fn write_env(&self, entries: &[EnvEntry]) -> NpmResult<()> {
        let env_dir = self.path.join("env");
        fs::create_dir_all(&env_dir)
            .map_err(|e| NpmError::io(format!("creating {}", env_dir.display()), e))?;

        for entry in entries {
            for (file_name, content) in entry.files() {
                let path = env_dir.join(file_name);
                fs::write(&path, content)
                    .map_err(|e| NpmError::io(format!("writing {}", path.display()), e))?;
            }
        }
        Ok(())
    }
}

/// A directory of layers
#[derive(Debug, Clone)]
pub struct Layers {
    dir: PathBuf,
}

impl Layers {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Get a layer by name, restoring any record from a previous build
    pub fn get(&self, name: &str) -> NpmResult<Layer> {
        let path = self.dir.join(name);
        fs::create_dir_all(&path)
            .map_err(|e| NpmError::io(format!("creating layer {}", path.display()), e))?;

        let mut layer = Layer {
            name: name.to_string(),
            path,
            build: false,
            launch: false,
            cache: false,
            metadata: LayerMetadata::default(),
        };

        let record_path = layer.record_path();
        match fs::read_to_string(&record_path) {
            Ok(content) => match toml::from_str::<LayerRecord>(&content) {
                Ok(record) => {
                    layer.build = record.build;
                    layer.launch = record.launch;
                    layer.cache = record.cache;
                    layer.metadata = record.metadata;
                }
                Err(e) => {
                    warn!(
                        "Ignoring unreadable layer record {}: {}",
                        record_path.display(),
                        e
                    );
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(NpmError::io(
                    format!("reading layer record {}", record_path.display()),
                    e,
                ))
            }
        }

        Ok(layer)
    }
}
