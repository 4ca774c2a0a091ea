//! `npm ci`

use crate::checksum::SumInput;
use crate::error::{NpmError, NpmResult};
use crate::executable::Execution;
use crate::layer::LayerMetadata;
use crate::link::PACKAGE_LOCK;
use crate::process::manifest::PACKAGE_JSON;
use crate::process::{relocate_modules, ProcessContext, RunContext, RunDecision};
use std::fs;
use std::path::Path;

/// Reproducible install from the lockfile
pub struct CiProcess {
    ctx: ProcessContext,
}

impl CiProcess {
    pub fn new(ctx: ProcessContext) -> Self {
        Self { ctx }
    }

    /// Runs when package.json, package-lock.json or the npm user-agent
    /// changed since the stored checksum.
    pub async fn should_run(
        &self,
        working_dir: &Path,
        metadata: &LayerMetadata,
        npmrc_path: Option<&Path>,
    ) -> NpmResult<RunDecision> {
        let agent = self.ctx.user_agent(working_dir, npmrc_path).await?;

        let manifest = working_dir.join(PACKAGE_JSON);
        let lockfile = working_dir.join(PACKAGE_LOCK);
        let sum = self.ctx.summer.sum(&[
            SumInput::Path(&manifest),
            SumInput::Path(&lockfile),
            SumInput::Bytes(agent.as_bytes()),
        ])?;

        Ok(RunDecision::compare(sum, metadata))
    }

    pub async fn run(&self, ctx: &RunContext) -> NpmResult<()> {
        // Put the tree in its final place before npm writes anything
        let local = ctx.working_dir.join("node_modules");
        fs::create_dir_all(&local)
            .map_err(|e| NpmError::io(format!("creating {}", local.display()), e))?;
        relocate_modules(&ctx.working_dir, &ctx.modules_dir)?;

        let args = vec![
            "ci".to_string(),
            "--unsafe-perm".to_string(),
            "--cache".to_string(),
            ctx.cache_dir.display().to_string(),
        ];
        let execution = Execution::new(args, &ctx.working_dir)
            .with_env(self.ctx.npm_env(ctx.npmrc_path.as_deref(), ctx.launch));
        self.ctx.run_step("npm ci", execution).await?;

        // npm may have replaced the link with a fresh directory
        relocate_modules(&ctx.working_dir, &ctx.modules_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executable::fake::FakeExecutable;
    use crate::executable::ExecOutput;
    use crate::process::testing::{context, env_value, run_context};
    use std::path::PathBuf;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn project() -> (TempDir, PathBuf) {
        let temp = TempDir::new().unwrap();
        let app = temp.path().join("app");
        fs::create_dir_all(&app).unwrap();
        fs::write(app.join(PACKAGE_JSON), r#"{"name": "app"}"#).unwrap();
        fs::write(app.join(PACKAGE_LOCK), r#"{"packages": {}}"#).unwrap();
        (temp, app)
    }

    async fn decide(agent: &'static str, app: &Path, metadata: &LayerMetadata) -> RunDecision {
        let executable = Arc::new(FakeExecutable::succeeding(agent));
        CiProcess::new(context(executable, &[]))
            .should_run(app, metadata, None)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn should_run_without_metadata() {
        let (_temp, app) = project();
        let decision = decide("npm/10.2.4 node/v20.11.0", &app, &LayerMetadata::default()).await;
        assert!(decision.run);
        assert_eq!(decision.checksum.len(), 64);
    }

    #[tokio::test]
    async fn should_run_is_idempotent() {
        let (_temp, app) = project();
        let metadata = LayerMetadata::default();
        let first = decide("npm/10.2.4 node/v20.11.0", &app, &metadata).await;
        let second = decide("npm/10.2.4 node/v20.11.0", &app, &metadata).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn skips_when_checksum_matches() {
        let (_temp, app) = project();
        let first = decide("npm/10.2.4 node/v20.11.0", &app, &LayerMetadata::default()).await;
        let stored = LayerMetadata::built(first.checksum.clone());

        let decision = decide("npm/10.2.4 node/v20.11.0", &app, &stored).await;
        assert_eq!(decision, RunDecision::default());
    }

    #[tokio::test]
    async fn user_agent_change_forces_run() {
        let (_temp, app) = project();
        let first = decide("npm/10.2.4 node/v20.11.0", &app, &LayerMetadata::default()).await;
        let stored = LayerMetadata::built(first.checksum.clone());

        let decision = decide("npm/10.5.0 node/v22.1.0", &app, &stored).await;
        assert!(decision.run);
        assert_ne!(decision.checksum, first.checksum);
    }

    #[tokio::test]
    async fn lockfile_change_forces_run() {
        let (_temp, app) = project();
        let first = decide("npm/10", &app, &LayerMetadata::default()).await;
        let stored = LayerMetadata::built(first.checksum);
        fs::write(app.join(PACKAGE_LOCK), r#"{"packages": {"x": {}}}"#).unwrap();

        assert!(decide("npm/10", &app, &stored).await.run);
    }

    #[tokio::test]
    async fn user_agent_failure_is_reported() {
        let (_temp, app) = project();
        let executable = Arc::new(FakeExecutable::with_handler(|_| {
            Ok(ExecOutput::failure(1, "npm: command broken"))
        }));
        let err = CiProcess::new(context(executable, &[]))
            .should_run(&app, &LayerMetadata::default(), None)
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("npm get user-agent failed"));
    }

    #[tokio::test]
    async fn run_links_before_invoking_npm() {
        let temp = TempDir::new().unwrap();
        let mut ctx = run_context(temp.path(), false);
        ctx.npmrc_path = Some(PathBuf::from("/bindings/npmrc/.npmrc"));
        let working = ctx.working_dir.clone();
        let stored = ctx.modules_dir.join("node_modules");
        let expected_link = stored.clone();
        let executable = Arc::new(FakeExecutable::with_handler(move |_| {
            // the link is already in place when npm starts
            assert_eq!(
                fs::read_link(working.join("node_modules")).unwrap(),
                expected_link
            );
            fs::create_dir_all(working.join("node_modules").join("leftpad")).unwrap();
            Ok(ExecOutput::success(""))
        }));
        let process = CiProcess::new(context(executable.clone(), &[]));

        process.run(&ctx).await.unwrap();

        let execution = &executable.executions()[0];
        assert_eq!(execution.args[0], "ci");
        assert_eq!(
            env_value(execution, "NPM_CONFIG_GLOBALCONFIG"),
            Some("/bindings/npmrc/.npmrc")
        );
        assert_eq!(env_value(execution, "NPM_CONFIG_LOGLEVEL"), Some("error"));
        assert!(stored.join("leftpad").is_dir());
        assert_eq!(
            fs::read_link(ctx.working_dir.join("node_modules")).unwrap(),
            stored
        );
    }

    #[tokio::test]
    async fn run_relocates_directory_written_by_npm() {
        let temp = TempDir::new().unwrap();
        let ctx = run_context(temp.path(), true);
        let working = ctx.working_dir.clone();
        let executable = Arc::new(FakeExecutable::with_handler(move |_| {
            let local = working.join("node_modules");
            fs::remove_file(&local).unwrap();
            fs::create_dir_all(local.join("fresh")).unwrap();
            Ok(ExecOutput::success(""))
        }));

        CiProcess::new(context(executable, &[]))
            .run(&ctx)
            .await
            .unwrap();

        assert!(ctx.modules_dir.join("node_modules/fresh").is_dir());
        assert_eq!(
            fs::read_link(ctx.working_dir.join("node_modules")).unwrap(),
            ctx.modules_dir.join("node_modules")
        );
    }

    #[tokio::test]
    async fn run_failure_wraps_step() {
        let temp = TempDir::new().unwrap();
        let ctx = run_context(temp.path(), false);
        let executable = Arc::new(FakeExecutable::with_handler(|_| {
            Ok(ExecOutput::failure(1, "ERR! lockfile out of sync"))
        }));

        let err = CiProcess::new(context(executable, &[]))
            .run(&ctx)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "npm ci failed: exit status 1");
    }
}
