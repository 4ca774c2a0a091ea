//! Installation process selection
//!
//! Probes the project once and selects a process. First match wins:
//!
//! | locked | vendored | cached | Process |
//! |--------|----------|--------|---------|
//! | no | yes | any | Rebuild |
//! | yes | yes | no | Rebuild |
//! | no | no | any | Install |
//! | yes | any | any | CI |

use crate::error::{NpmError, NpmResult};
use crate::fs_ops;
use crate::link::PACKAGE_LOCK;
use crate::process::{
    BuildProcess, CiProcess, InstallProcess, ProcessContext, PruneProcess, RebuildProcess,
};
use std::path::Path;
use tracing::info;

/// In-project npm cache folder migrated into cache storage
pub const NPM_CACHE_DIR: &str = "npm-cache";

/// Which process a set of probe results selects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessKind {
    Install,
    Ci,
    Rebuild,
}

/// Probe results for a project directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessInputs {
    /// package-lock.json exists
    pub locked: bool,
    /// node_modules exists
    pub vendored: bool,
    /// npm-cache exists
    pub cached: bool,
}

impl ProcessInputs {
    /// Probe a working directory
    pub fn probe(working_dir: &Path) -> NpmResult<Self> {
        Ok(Self {
            locked: probe(&working_dir.join(PACKAGE_LOCK))?,
            vendored: probe(&working_dir.join("node_modules"))?,
            cached: probe(&working_dir.join(NPM_CACHE_DIR))?,
        })
    }

    /// Apply the selection table
    pub fn select(&self) -> ProcessKind {
        match (self.locked, self.vendored, self.cached) {
            (false, true, _) | (true, true, false) => ProcessKind::Rebuild,
            (false, false, _) => ProcessKind::Install,
            _ => ProcessKind::Ci,
        }
    }
}

fn probe(path: &Path) -> NpmResult<bool> {
    fs_ops::exists(path).map_err(|e| NpmError::Probe {
        path: path.to_path_buf(),
        source: e,
    })
}

fn found(present: bool) -> &'static str {
    if present {
        "Found"
    } else {
        "Not found"
    }
}

/// Selects the installation process for a project
#[derive(Clone)]
pub struct BuildProcessResolver {
    ctx: ProcessContext,
}

impl BuildProcessResolver {
    pub fn new(ctx: ProcessContext) -> Self {
        Self { ctx }
    }

    /// Probe `working_dir`, migrate any in-project npm cache into
    /// `cache_dir`, and select a process.
    pub fn resolve(&self, working_dir: &Path, cache_dir: &Path) -> NpmResult<BuildProcess> {
        let inputs = ProcessInputs::probe(working_dir)?;

        if inputs.cached {
            let source = working_dir.join(NPM_CACHE_DIR);
            let destination = cache_dir.join(NPM_CACHE_DIR);
            fs_ops::move_path(&source, &destination).map_err(|e| {
                NpmError::io(
                    format!("moving npm-cache to {}", destination.display()),
                    e,
                )
            })?;
        }

        let process = match inputs.select() {
            ProcessKind::Rebuild => BuildProcess::Rebuild(RebuildProcess::new(self.ctx.clone())),
            ProcessKind::Install => BuildProcess::Install(InstallProcess::new(self.ctx.clone())),
            ProcessKind::Ci => BuildProcess::Ci(CiProcess::new(self.ctx.clone())),
        };

        info!(
            "Process inputs: package-lock.json: {}, node_modules: {}, npm-cache: {}; selected '{}'",
            found(inputs.locked),
            found(inputs.vendored),
            found(inputs.cached),
            process.name()
        );

        Ok(process)
    }

    /// The prune process, used when launch modules are derived from an
    /// existing build tree
    pub fn prune(&self) -> BuildProcess {
        BuildProcess::Prune(PruneProcess::new(self.ctx.clone()))
    }
}
