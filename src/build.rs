//! Build orchestration
//!
//! Resolves a process once, then produces the build-time and/or
//! launch-time modules layers, reusing a layer whenever its stored
//! checksum is still current.

use crate::config::{EnvironmentConfig, BP_NODE_PROJECT_PATH, NPM_CONFIG_GLOBALCONFIG};
use crate::error::{NpmError, NpmResult};
use crate::fs_ops;
use crate::layer::{self, Layer, LayerMetadata, Layers};
use crate::link::{LinkedModuleResolver, Linker, PACKAGE_LOCK};
use crate::process::manifest::PACKAGE_JSON;
use crate::process::{BuildProcess, BuildProcessResolver, ProcessContext, RunContext};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// What the build must produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BuildPlan {
    /// Modules for later build steps
    pub build: bool,
    /// Modules for the runtime image
    pub launch: bool,
}

/// Inputs of a single build
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// Application source directory
    pub app_dir: PathBuf,
    /// Directory holding the layers
    pub layers_dir: PathBuf,
    /// Shared root for link indirections
    pub tmp_dir: PathBuf,
    pub plan: BuildPlan,
}

/// Layers produced by a build
#[derive(Debug, Default)]
pub struct BuildResult {
    pub layers: Vec<Layer>,
}

/// Resolve `BP_NODE_PROJECT_PATH` against the application directory
pub fn project_path(environment: &dyn EnvironmentConfig, app_dir: &Path) -> NpmResult<PathBuf> {
    let Some(custom) = environment.lookup(BP_NODE_PROJECT_PATH) else {
        return Ok(app_dir.to_path_buf());
    };

    let path = app_dir.join(custom);
    match fs_ops::exists(&path) {
        Ok(true) => Ok(path),
        Ok(false) => Err(NpmError::ProjectPathInvalid {
            value: custom.to_string(),
        }),
        Err(e) => Err(NpmError::io(format!("probing {}", path.display()), e)),
    }
}

/// Drives a full build
pub struct Builder {
    ctx: ProcessContext,
    resolver: BuildProcessResolver,
}

impl Builder {
    pub fn new(ctx: ProcessContext) -> Self {
        Self {
            resolver: BuildProcessResolver::new(ctx.clone()),
            ctx,
        }
    }

    pub async fn build(&self, build_ctx: &BuildContext) -> NpmResult<BuildResult> {
        let environment: &dyn EnvironmentConfig = self.ctx.environment.as_ref();
        let project = project_path(environment, &build_ctx.app_dir)?;
        let npmrc_path = environment.lookup(NPM_CONFIG_GLOBALCONFIG).map(PathBuf::from);
        let npmrc = npmrc_path.as_deref();

        let layers = Layers::new(&build_ctx.layers_dir);
        let mut cache_layer = layers.get(layer::NPM_CACHE)?;
        cache_layer.cache = true;

        info!("Resolving installation process");
        let process = self.resolver.resolve(&project, &cache_layer.path)?;

        let lockfile = project.join(PACKAGE_LOCK);
        let locked = fs_ops::exists(&lockfile)
            .map_err(|e| NpmError::io(format!("probing {}", lockfile.display()), e))?;
        let linker = Linker::new(&build_ctx.tmp_dir);
        let linked = LinkedModuleResolver::new(linker.clone());

        let mut result = BuildResult::default();
        let mut build_layer_path = None;

        if build_ctx.plan.build {
            let mut build_layer = layers.get(layer::BUILD_MODULES)?;
            build_layer.build = true;
            build_layer.cache = true;

            let decision = process
                .should_run(&project, &build_layer.metadata, npmrc)
                .await?;
            if decision.run {
                build_layer.reset()?;
                let run_ctx = RunContext {
                    modules_dir: build_layer.path.clone(),
                    cache_dir: cache_layer.path.clone(),
                    working_dir: project.clone(),
                    npmrc_path: npmrc_path.clone(),
                    launch: false,
                };
                execute(&process, &run_ctx).await?;

                build_layer.metadata = LayerMetadata::built(decision.checksum);
                build_layer.write_env(&layer::env::contributions(
                    &build_layer.path,
                    npmrc,
                    false,
                ))?;

                if locked {
                    linked.resolve(&lockfile, &build_layer.path)?;
                }
            } else {
                reuse(&build_layer, &project)?;
                // a fresh checkout holds the workspace sources again
                if locked {
                    linked.resolve(&lockfile, &build_layer.path)?;
                }
            }

            build_layer.save()?;
            build_layer_path = Some(build_layer.path.clone());
            result.layers.push(build_layer);
        }

        if build_ctx.plan.launch {
            let mut launch_layer = layers.get(layer::LAUNCH_MODULES)?;
            launch_layer.launch = true;
            launch_layer.cache = true;

            let decision = process
                .should_run(&project, &launch_layer.metadata, npmrc)
                .await?;
            if decision.run {
                launch_layer.reset()?;

                match &build_layer_path {
                    Some(build_path) => {
                        self.derive_from_build(
                            build_path,
                            &launch_layer,
                            &project,
                            &cache_layer.path,
                            npmrc,
                            locked.then_some(lockfile.as_path()),
                            &linked,
                        )
                        .await?;
                    }
                    None => {
                        let run_ctx = RunContext {
                            modules_dir: launch_layer.path.clone(),
                            cache_dir: cache_layer.path.clone(),
                            working_dir: project.clone(),
                            npmrc_path: npmrc_path.clone(),
                            launch: true,
                        };
                        execute(&process, &run_ctx).await?;

                        if locked {
                            linked.resolve(&lockfile, &launch_layer.path)?;
                        }
                    }
                }

                launch_layer.metadata = LayerMetadata::built(decision.checksum);
                launch_layer.write_env(&layer::env::contributions(
                    &launch_layer.path,
                    npmrc,
                    true,
                ))?;
            } else {
                info!("Reusing cached layer {}", launch_layer.path.display());
                if locked && build_layer_path.is_none() {
                    linked.resolve(&lockfile, &launch_layer.path)?;
                }
            }

            // Build steps see the build tree; launch repoints the indirection
            let target = build_layer_path
                .as_ref()
                .map(|p| p.join("node_modules"))
                .unwrap_or_else(|| launch_layer.node_modules());
            let present = fs_ops::exists(&target)
                .map_err(|e| NpmError::io(format!("probing {}", target.display()), e))?;
            if present {
                linker.link(&project.join("node_modules"), &target)?;
            }

            launch_layer.save()?;
            result.layers.push(launch_layer);
        }

        if !cache_layer.is_empty()? {
            cache_layer.save()?;
            result.layers.push(cache_layer);
        } else {
            debug!("npm cache is empty, not keeping cache layer");
        }

        Ok(result)
    }

    /// Fill the launch layer from the build layer and prune dev packages
    #[allow(clippy::too_many_arguments)]
    async fn derive_from_build(
        &self,
        build_path: &Path,
        launch_layer: &Layer,
        project: &Path,
        cache_dir: &Path,
        npmrc: Option<&Path>,
        lockfile: Option<&Path>,
        linked: &LinkedModuleResolver,
    ) -> NpmResult<()> {
        let launch_path = &launch_layer.path;

        let build_modules = build_path.join("node_modules");
        let present = fs_ops::exists(&build_modules)
            .map_err(|e| NpmError::io(format!("probing {}", build_modules.display()), e))?;
        if present {
            fs_ops::copy_path(&build_modules, &launch_layer.node_modules())
                .map_err(|e| NpmError::io("copying build modules to launch layer", e))?;
        }

        for name in [PACKAGE_JSON, PACKAGE_LOCK] {
            let source = project.join(name);
            let present = fs_ops::exists(&source)
                .map_err(|e| NpmError::io(format!("probing {}", source.display()), e))?;
            if present {
                fs_ops::copy_path(&source, &launch_path.join(name))
                    .map_err(|e| NpmError::io(format!("copying {}", name), e))?;
            }
        }

        if let Some(lockfile) = lockfile {
            linked.copy(lockfile, build_path, launch_path)?;
        }

        let run_ctx = RunContext {
            modules_dir: launch_path.clone(),
            cache_dir: cache_dir.to_path_buf(),
            working_dir: launch_path.clone(),
            npmrc_path: npmrc.map(Path::to_path_buf),
            launch: true,
        };
        execute(&self.resolver.prune(), &run_ctx).await
    }
}

async fn execute(process: &BuildProcess, run_ctx: &RunContext) -> NpmResult<()> {
    info!("Executing build process");
    let started = Instant::now();
    process.run(run_ctx).await?;
    info!("Completed in {}ms", started.elapsed().as_millis());
    Ok(())
}

/// Point the project's node_modules at a layer built by an earlier build
fn reuse(layer: &Layer, project: &Path) -> NpmResult<()> {
    info!("Reusing cached layer {}", layer.path.display());
    let local = project.join("node_modules");
    fs_ops::replace_with_symlink(&layer.node_modules(), &local)
        .map_err(|e| NpmError::io(format!("linking {}", local.display()), e))
}
