//! `npm rebuild` for vendored trees

use crate::checksum::SumInput;
use crate::config::NODE_HOME;
use crate::error::{NpmError, NpmResult};
use crate::executable::Execution;
use crate::layer::LayerMetadata;
use crate::process::manifest::PackageManifest;
use crate::process::{log_output, relocate_modules, ProcessContext, RunContext, RunDecision};
use std::path::Path;
use tracing::{debug, info};

/// Rebuilds native modules in a `node_modules` tree shipped with the app
pub struct RebuildProcess {
    ctx: ProcessContext,
}

impl RebuildProcess {
    pub fn new(ctx: ProcessContext) -> Self {
        Self { ctx }
    }

    /// Runs when the vendored tree or the npm user-agent changed since
    /// the stored checksum.
    pub async fn should_run(
        &self,
        working_dir: &Path,
        metadata: &LayerMetadata,
        npmrc_path: Option<&Path>,
    ) -> NpmResult<RunDecision> {
        let agent = self.ctx.user_agent(working_dir, npmrc_path).await?;

        let modules = working_dir.join("node_modules");
        let sum = self.ctx.summer.sum(&[
            SumInput::Path(&modules),
            SumInput::Bytes(agent.as_bytes()),
        ])?;

        Ok(RunDecision::compare(sum, metadata))
    }

    pub async fn run(&self, ctx: &RunContext) -> NpmResult<()> {
        let env = self.ctx.npm_env(ctx.npmrc_path.as_deref(), ctx.launch);

        info!("Running 'npm list'");
        let list = Execution::new(["list"], &ctx.working_dir).with_env(env.clone());
        let output = self.ctx.executable.execute(&list).await?;
        if !output.is_success() {
            let combined = output.combined();
            log_output(&combined);
            return Err(NpmError::UnmetDependencies { output: combined });
        }

        let manifest = PackageManifest::from_dir(&ctx.working_dir)?;

        if manifest.has_script("preinstall") {
            let args = ["run-script", "preinstall", "--if-present"];
            let execution = Execution::new(args, &ctx.working_dir).with_env(env.clone());
            self.ctx
                .run_step("preinstall script on rebuild", execution)
                .await?;
        } else {
            debug!("No preinstall script declared");
        }

        let mut args = vec!["rebuild".to_string()];
        if let Some(node_home) = self.ctx.environment.lookup(NODE_HOME) {
            args.push(format!("--nodedir={}", node_home));
        }
        let execution = Execution::new(args, &ctx.working_dir).with_env(env.clone());
        self.ctx.run_step("npm rebuild", execution).await?;

        if manifest.has_script("postinstall") {
            let args = ["run-script", "postinstall", "--if-present"];
            let execution = Execution::new(args, &ctx.working_dir).with_env(env);
            self.ctx
                .run_step("postinstall script on rebuild", execution)
                .await?;
        } else {
            debug!("No postinstall script declared");
        }

        relocate_modules(&ctx.working_dir, &ctx.modules_dir)
    }
}
