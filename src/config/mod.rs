//! Configuration lookup for npm-install
//!
//! Only variables declared in the descriptor are visible. Precedence is
//! explicit value, then a non-empty declared default, then absent.

pub mod schema;

pub use schema::{Configuration, Descriptor};

use crate::error::{NpmError, NpmResult};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

// Descriptor embedded at compile time
const BUILTIN_DESCRIPTOR: &str = include_str!("defaults.toml");

/// Log level handed to npm
pub const NPM_CONFIG_LOGLEVEL: &str = "NPM_CONFIG_LOGLEVEL";
/// Global npmrc override
pub const NPM_CONFIG_GLOBALCONFIG: &str = "NPM_CONFIG_GLOBALCONFIG";
/// Node.js installation used by `npm rebuild`
pub const NODE_HOME: &str = "NODE_HOME";
/// Project sub-directory
pub const BP_NODE_PROJECT_PATH: &str = "BP_NODE_PROJECT_PATH";
/// Log verbosity
pub const BP_LOG_LEVEL: &str = "BP_LOG_LEVEL";

/// Configuration lookup capability
///
/// Strategies read configuration through this trait so tests can
/// substitute a deterministic environment.
pub trait EnvironmentConfig: Send + Sync {
    /// Look up a declared variable
    fn lookup(&self, key: &str) -> Option<&str>;
}

/// Resolved configuration store
#[derive(Debug, Clone, Default)]
pub struct Environment {
    store: HashMap<String, String>,
}

impl Environment {
    /// Merge a descriptor's declarations with a set of variables
    pub fn new<I, K, V>(descriptor: &Descriptor, variables: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let environ: HashMap<String, String> = variables
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        let mut store = HashMap::new();
        for configuration in &descriptor.metadata.configurations {
            if let Some(value) = environ.get(&configuration.name) {
                store.insert(configuration.name.clone(), value.clone());
            } else if !configuration.default.is_empty() {
                store.insert(configuration.name.clone(), configuration.default.clone());
            }
        }

        debug!("Resolved {} configuration values", store.len());
        Self { store }
    }

    /// Parse a descriptor from a TOML string and merge the variables
    pub fn parse<I, K, V>(content: &str, variables: I) -> NpmResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let descriptor: Descriptor =
            toml::from_str(content).map_err(|e| NpmError::ConfigInvalid {
                path: "buildpack.toml".into(),
                reason: e.to_string(),
            })?;
        Ok(Self::new(&descriptor, variables))
    }

    /// Load a descriptor file from disk and merge the variables
    pub fn from_file<I, K, V>(path: &Path, variables: I) -> NpmResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                NpmError::ConfigNotFound(path.to_path_buf())
            } else {
                NpmError::io(format!("reading descriptor {}", path.display()), e)
            }
        })?;

        let descriptor: Descriptor =
            toml::from_str(&content).map_err(|e| NpmError::ConfigInvalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        Ok(Self::new(&descriptor, variables))
    }

    /// Use the built-in descriptor with the given variables
    pub fn builtin<I, K, V>(variables: I) -> NpmResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::parse(BUILTIN_DESCRIPTOR, variables)
    }

    /// Use the built-in descriptor with the process environment
    pub fn from_process() -> NpmResult<Self> {
        Self::builtin(std::env::vars())
    }
}

impl EnvironmentConfig for Environment {
    fn lookup(&self, key: &str) -> Option<&str> {
        self.store.get(key).map(String::as_str)
    }
}
