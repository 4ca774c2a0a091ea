//! `npm install`

use crate::error::{NpmError, NpmResult};
use crate::executable::Execution;
use crate::layer::LayerMetadata;
use crate::process::{relocate_modules, ProcessContext, RunContext, RunDecision};
use std::fs;
use std::path::Path;

/// Plain install for projects with neither a lockfile nor a vendored tree
pub struct InstallProcess {
    ctx: ProcessContext,
}

impl InstallProcess {
    pub fn new(ctx: ProcessContext) -> Self {
        Self { ctx }
    }

    /// Always runs; no checksum is tracked.
    pub async fn should_run(
        &self,
        _working_dir: &Path,
        _metadata: &LayerMetadata,
        _npmrc_path: Option<&Path>,
    ) -> NpmResult<RunDecision> {
        Ok(RunDecision::always())
    }

    pub async fn run(&self, ctx: &RunContext) -> NpmResult<()> {
        let target = ctx.modules_dir.join("node_modules");
        fs::create_dir_all(&target)
            .map_err(|e| NpmError::io(format!("creating {}", target.display()), e))?;

        let args = vec![
            "install".to_string(),
            "--unsafe-perm".to_string(),
            "--cache".to_string(),
            ctx.cache_dir.display().to_string(),
        ];
        let execution = Execution::new(args, &ctx.working_dir)
            .with_env(self.ctx.npm_env(ctx.npmrc_path.as_deref(), ctx.launch));
        self.ctx.run_step("npm install", execution).await?;

        // Projects without dependencies produce no tree
        relocate_modules(&ctx.working_dir, &ctx.modules_dir)
    }
}
