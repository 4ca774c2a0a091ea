//! Configuration descriptor schema
//!
//! Declared configuration is stored in a TOML descriptor. Only the
//! `[[metadata.configurations]]` entries are consumed.

use serde::{Deserialize, Serialize};

/// Root descriptor structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Descriptor {
    /// Declared configuration
    pub metadata: DescriptorMetadata,
}

/// Metadata section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DescriptorMetadata {
    /// Every variable the engine is allowed to see
    pub configurations: Vec<Configuration>,
}

/// A single declared configuration variable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Configuration {
    /// Environment variable name
    pub name: String,

    /// Declared default; empty means "absent unless set"
    #[serde(default)]
    pub default: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,
}
