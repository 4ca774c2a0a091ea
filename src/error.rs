//! Error types for npm-install
//!
//! All modules use `NpmResult<T>` as their return type.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for npm-install operations
pub type NpmResult<T> = Result<T, NpmError>;

/// Phase of a two-hop link operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkPhase {
    /// Removing whatever occupied the link source
    RemoveSource,
    /// Removing whatever occupied the indirection path
    RemoveIndirection,
    /// Creating parent directories of the indirection path
    CreateIndirectionParent,
    /// Creating `source -> indirection`
    CreateSourceLink,
    /// Creating `indirection -> target`
    CreateIndirectionLink,
}

impl fmt::Display for LinkPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self {
            Self::RemoveSource => "remove link source",
            Self::RemoveIndirection => "remove link indirection",
            Self::CreateIndirectionParent => "create indirection path",
            Self::CreateSourceLink => "create link source",
            Self::CreateIndirectionLink => "create link indirection",
        };
        write!(f, "{}", phase)
    }
}

/// All errors that can occur while resolving and running installs
#[derive(Error, Debug)]
pub enum NpmError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error(
        "Expected value derived from BP_NODE_PROJECT_PATH [{value}] to be an existing directory"
    )]
    ProjectPathInvalid { value: String },

    // Filesystem errors
    #[error("Failed to probe {path}: {source}")]
    Probe {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Lockfile errors
    #[error("Failed to open \"package-lock.json\" at {path}: {source}")]
    LockfileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse \"package-lock.json\" at {path}: {source}")]
    LockfileParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    // Link errors
    #[error("Failed to {phase} at {path}: {source}")]
    Link {
        phase: LinkPhase,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Linked module {path}: failed to {stage}: {source}")]
    LinkedModule {
        path: PathBuf,
        stage: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{step} failed: {}", exit_description(*.code))]
    Subprocess {
        step: String,
        code: Option<i32>,
        output: String,
    },

    #[error("Vendored node_modules have unmet dependencies: npm list failed")]
    UnmetDependencies { output: String },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

fn exit_description(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {}", code),
        None => "terminated by signal".to_string(),
    }
}

impl NpmError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a link error tagged with the failing phase
    pub fn link(phase: LinkPhase, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Link {
            phase,
            path: path.into(),
            source,
        }
    }

    /// Create a per-package linked module error
    pub fn linked_module(
        path: impl Into<PathBuf>,
        stage: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Self::LinkedModule {
            path: path.into(),
            stage: stage.into(),
            source,
        }
    }

    /// Captured subprocess output, when the error carries any
    pub fn output(&self) -> Option<&str> {
        match self {
            Self::Subprocess { output, .. } | Self::UnmetDependencies { output } => Some(output),
            _ => None,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::UnmetDependencies { .. } => Some(
                "Vendored node_modules do not match package.json. \
                 Run `npm install` locally and commit the refreshed package-lock.json",
            ),
            Self::ProjectPathInvalid { .. } => {
                Some("BP_NODE_PROJECT_PATH must name a directory relative to the app root")
            }
            Self::LockfileParse { .. } => Some("Regenerate package-lock.json with `npm install`"),
            _ => None,
        }
    }
}
