//! `npm prune`

use crate::error::NpmResult;
use crate::executable::Execution;
use crate::layer::LayerMetadata;
use crate::process::{ProcessContext, RunContext, RunDecision};
use std::path::Path;

/// Removes extraneous packages from an already-relocated tree in place
pub struct PruneProcess {
    ctx: ProcessContext,
}

impl PruneProcess {
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
        let execution = Execution::new(["prune"], &ctx.working_dir)
            .with_env(self.ctx.npm_env(ctx.npmrc_path.as_deref(), ctx.launch));
        self.ctx.run_step("npm prune", execution).await?;
        Ok(())
    }
}
