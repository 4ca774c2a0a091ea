//! Environment contributions for consumers of the installed tree

use crate::config::{NPM_CONFIG_GLOBALCONFIG, NPM_CONFIG_LOGLEVEL};
use std::path::Path;

/// How a contributed variable combines with any existing value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvOp {
    /// Set only when not already set
    Default,
    /// Always set
    Override,
    /// Append with a delimiter
    Append { delim: &'static str },
}

/// A single contributed variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvEntry {
    pub name: String,
    pub op: EnvOp,
    pub value: String,
}

impl EnvEntry {
    pub fn new(name: impl Into<String>, op: EnvOp, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            op,
            value: value.into(),
        }
    }

    /// File names and contents describing this entry
    pub fn files(&self) -> Vec<(String, String)> {
        match self.op {
            EnvOp::Default => vec![(format!("{}.default", self.name), self.value.clone())],
            EnvOp::Override => vec![(format!("{}.override", self.name), self.value.clone())],
            EnvOp::Append { delim } => vec![
                (format!("{}.append", self.name), self.value.clone()),
                (format!("{}.delim", self.name), delim.to_string()),
            ],
        }
    }
}

/// Variables contributed by a modules layer.
///
/// `launch` selects runtime contributions; build-time layers also get
/// the development-mode flag.
pub fn contributions(layer_path: &Path, npmrc_path: Option<&Path>, launch: bool) -> Vec<EnvEntry> {
    let mut entries = vec![EnvEntry::new(NPM_CONFIG_LOGLEVEL, EnvOp::Default, "error")];

    if !launch {
        entries.push(EnvEntry::new("NODE_ENV", EnvOp::Override, "development"));
    }

    entries.push(EnvEntry::new(
        "PATH",
        EnvOp::Append { delim: ":" },
        layer_path.join("node_modules").join(".bin").display().to_string(),
    ));

    if let Some(npmrc) = npmrc_path {
        entries.push(EnvEntry::new(
            NPM_CONFIG_GLOBALCONFIG,
            EnvOp::Default,
            npmrc.display().to_string(),
        ));
    }

    entries
}
