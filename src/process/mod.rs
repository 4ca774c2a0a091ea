//! Installation processes
//!
//! Exactly one process is selected per build. Every process exposes a
//! staleness check (`should_run`) and an execution step (`run`).
//!
//! | Process | Staleness inputs | npm subcommands |
//! |---------|------------------|-----------------|
//! | Install | none, always runs | `install` |
//! | CI | package.json, package-lock.json, user-agent | `ci` |
//! | Rebuild | node_modules, user-agent | `list`, scripts, `rebuild` |
//! | Prune | none, always runs | `prune` |

pub mod ci;
pub mod install;
pub mod manifest;
pub mod prune;
pub mod rebuild;
pub mod resolver;

pub use ci::CiProcess;
pub use install::InstallProcess;
pub use prune::PruneProcess;
pub use rebuild::RebuildProcess;
pub use resolver::{BuildProcessResolver, ProcessInputs};

use crate::checksum::Summer;
use crate::config::{EnvironmentConfig, NPM_CONFIG_GLOBALCONFIG, NPM_CONFIG_LOGLEVEL};
use crate::error::{NpmError, NpmResult};
use crate::executable::{ExecOutput, Executable, Execution};
use crate::fs_ops;
use crate::layer::LayerMetadata;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Outcome of a staleness check
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunDecision {
    /// Whether the process must run
    pub run: bool,
    /// Checksum to store after a successful run (empty when not tracked)
    pub checksum: String,
}

impl RunDecision {
    /// Run without tracking a checksum
    pub fn always() -> Self {
        Self {
            run: true,
            checksum: String::new(),
        }
    }

    /// Compare a fresh checksum with the stored one
    pub fn compare(checksum: String, metadata: &LayerMetadata) -> Self {
        match metadata.cache_sha.as_deref() {
            Some(stored) if stored == checksum => Self::default(),
            _ => Self {
                run: true,
                checksum,
            },
        }
    }
}

/// Paths and flags for a single execution
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Layer that receives `node_modules`
    pub modules_dir: PathBuf,
    /// Shared npm cache
    pub cache_dir: PathBuf,
    /// Project directory npm runs in
    pub working_dir: PathBuf,
    /// Global npmrc, when one was resolved
    pub npmrc_path: Option<PathBuf>,
    /// Installing for runtime rather than for later build steps
    pub launch: bool,
}

/// Collaborators shared by every process
#[derive(Clone)]
pub struct ProcessContext {
    pub executable: Arc<dyn Executable>,
    pub summer: Arc<dyn Summer>,
    pub environment: Arc<dyn EnvironmentConfig>,
}

impl ProcessContext {
    pub fn new(
        executable: Arc<dyn Executable>,
        summer: Arc<dyn Summer>,
        environment: Arc<dyn EnvironmentConfig>,
    ) -> Self {
        Self {
            executable,
            summer,
            environment,
        }
    }

    /// Environment overrides for an npm invocation
    pub(crate) fn npm_env(&self, npmrc_path: Option<&Path>, launch: bool) -> Vec<(String, String)> {
        let mut env = Vec::new();

        if let Some(level) = self.environment.lookup(NPM_CONFIG_LOGLEVEL) {
            env.push((NPM_CONFIG_LOGLEVEL.to_string(), level.to_string()));
        }

        if let Some(npmrc) = npmrc_path {
            env.push((
                NPM_CONFIG_GLOBALCONFIG.to_string(),
                npmrc.display().to_string(),
            ));
        }

        if !launch {
            env.push(("NODE_ENV".to_string(), "development".to_string()));
        }

        env
    }

    /// Execute one npm step; a non-zero exit is logged and returned
    /// as an error naming the step.
    pub(crate) async fn run_step(&self, step: &str, execution: Execution) -> NpmResult<ExecOutput> {
        info!("Running 'npm {}'", execution.display_args());

        let output = self.executable.execute(&execution).await?;
        if output.is_success() {
            return Ok(output);
        }

        let combined = output.combined();
        log_output(&combined);
        Err(NpmError::Subprocess {
            step: step.to_string(),
            code: output.code,
            output: combined,
        })
    }

    /// Capture `npm get user-agent`, which folds the npm and node
    /// versions into staleness checksums.
    pub(crate) async fn user_agent(
        &self,
        working_dir: &Path,
        npmrc_path: Option<&Path>,
    ) -> NpmResult<String> {
        let execution = Execution::new(["get", "user-agent"], working_dir)
            .with_env(self.npm_env(npmrc_path, true));

        let output = self.executable.execute(&execution).await?;
        if !output.is_success() {
            let combined = output.combined();
            log_output(&combined);
            return Err(NpmError::Subprocess {
                step: "npm get user-agent".to_string(),
                code: output.code,
                output: combined,
            });
        }
        Ok(output.stdout)
    }
}

/// Emit captured output line by line, indented
pub fn log_output(output: &str) {
    for line in output.lines() {
        info!("    {}", line);
    }
}

/// Move `<working>/node_modules` into `<modules_dir>/node_modules` and
/// leave a direct symlink behind. A missing tree is not an error.
pub(crate) fn relocate_modules(working_dir: &Path, modules_dir: &Path) -> NpmResult<()> {
    let local = working_dir.join("node_modules");
    let stored = modules_dir.join("node_modules");

    let metadata = match fs::symlink_metadata(&local) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => {
            return Err(NpmError::io(
                "unable to stat node_modules in working directory",
                e,
            ))
        }
    };

    if metadata.file_type().is_symlink() {
        let current = fs::read_link(&local)
            .map_err(|e| NpmError::io(format!("reading link {}", local.display()), e))?;
        if current == stored {
            return Ok(());
        }
        fs_ops::remove_all(&stored)
            .and_then(|_| fs_ops::copy_path(&local, &stored))
            .map_err(|e| {
                NpmError::io(format!("copying node_modules to {}", stored.display()), e)
            })?;
    } else {
        fs_ops::move_path(&local, &stored)
            .map_err(|e| NpmError::io(format!("moving node_modules to {}", stored.display()), e))?;
    }

    fs_ops::replace_with_symlink(&stored, &local)
        .map_err(|e| NpmError::io(format!("linking {}", local.display()), e))
}

/// The selected installation process
pub enum BuildProcess {
    Install(InstallProcess),
    Ci(CiProcess),
    Rebuild(RebuildProcess),
    Prune(PruneProcess),
}

impl BuildProcess {
    /// Decide whether the process needs to run against the stored metadata
    pub async fn should_run(
        &self,
        working_dir: &Path,
        metadata: &LayerMetadata,
        npmrc_path: Option<&Path>,
    ) -> NpmResult<RunDecision> {
        match self {
            Self::Install(p) => p.should_run(working_dir, metadata, npmrc_path).await,
            Self::Ci(p) => p.should_run(working_dir, metadata, npmrc_path).await,
            Self::Rebuild(p) => p.should_run(working_dir, metadata, npmrc_path).await,
            Self::Prune(p) => p.should_run(working_dir, metadata, npmrc_path).await,
        }
    }

    /// Execute the process
    pub async fn run(&self, ctx: &RunContext) -> NpmResult<()> {
        match self {
            Self::Install(p) => p.run(ctx).await,
            Self::Ci(p) => p.run(ctx).await,
            Self::Rebuild(p) => p.run(ctx).await,
            Self::Prune(p) => p.run(ctx).await,
        }
    }

    /// The npm subcommand this process is named after
    pub fn name(&self) -> &'static str {
        match self {
            Self::Install(_) => "npm install",
            Self::Ci(_) => "npm ci",
            Self::Rebuild(_) => "npm rebuild",
            Self::Prune(_) => "npm prune",
        }
    }
}

impl fmt::Display for BuildProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl fmt::Debug for BuildProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BuildProcess").field(&self.name()).finish()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn compare_matches_stored_checksum() {
        let metadata = LayerMetadata {
            cache_sha: Some("abc".to_string()),
            built_at: None,
        };
        assert_eq!(
            RunDecision::compare("abc".to_string(), &metadata),
            RunDecision::default()
        );
        assert_eq!(
            RunDecision::compare("def".to_string(), &metadata),
            RunDecision {
                run: true,
                checksum: "def".to_string()
            }
        );
        assert!(RunDecision::compare("abc".to_string(), &LayerMetadata::default()).run);
    }

    #[test]
    fn relocate_moves_tree_and_links_back() {
        let temp = TempDir::new().unwrap();
        let working = temp.path().join("app");
        let modules = temp.path().join("layer");
        fs::create_dir_all(working.join("node_modules").join("leftpad")).unwrap();
        fs::create_dir_all(&modules).unwrap();

        relocate_modules(&working, &modules).unwrap();

        assert_eq!(
            fs::read_link(working.join("node_modules")).unwrap(),
            modules.join("node_modules")
        );
        assert!(modules.join("node_modules").join("leftpad").is_dir());

        // idempotent once relocated
        relocate_modules(&working, &modules).unwrap();
        assert!(modules.join("node_modules").join("leftpad").is_dir());
    }

    #[test]
    fn relocate_without_tree_is_noop() {
        let temp = TempDir::new().unwrap();
        relocate_modules(temp.path(), &temp.path().join("layer")).unwrap();
        assert!(!temp.path().join("layer").exists());
    }
}
