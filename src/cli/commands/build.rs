//! Build command - install dependencies into layers

use crate::build::{BuildContext, BuildPlan, Builder};
use crate::checksum::ChecksumCalculator;
use crate::cli::args::BuildArgs;
use crate::config::Environment;
use crate::error::NpmResult;
use crate::executable::SystemExecutable;
use crate::process::ProcessContext;
use console::style;
use std::sync::Arc;
use std::time::Instant;

/// Execute the build command
pub async fn execute(args: BuildArgs) -> NpmResult<()> {
    let environment = match &args.descriptor {
        Some(path) => Environment::from_file(path, std::env::vars())?,
        None => Environment::from_process()?,
    };

    let ctx = ProcessContext::new(
        Arc::new(SystemExecutable::npm()),
        Arc::new(ChecksumCalculator::new()),
        Arc::new(environment),
    );

    let build_ctx = BuildContext {
        app_dir: args.app_dir,
        layers_dir: args.layers_dir,
        tmp_dir: args.tmp_dir.unwrap_or_else(std::env::temp_dir),
        plan: BuildPlan {
            build: args.build,
            launch: args.launch,
        },
    };

    let started = Instant::now();
    let result = Builder::new(ctx).build(&build_ctx).await?;

    for layer in &result.layers {
        println!(
            "{} {} ({})",
            style("✓").green(),
            style(&layer.name).cyan(),
            layer.path.display()
        );
    }
    println!(
        "Dependencies ready in {:.1}s",
        started.elapsed().as_secs_f64()
    );

    Ok(())
}
