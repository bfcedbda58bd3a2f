//! Build command - compile targets of the solution with MSBuild

use crate::cli::args::{BuildArgs, Targets};
use crate::context::ExecutionContext;
use crate::error::CistepResult;
use crate::exec::{EchoSink, ProcessRequest, ProcessRunner, SystemRunner};
use crate::ui;

/// Execute the build command
pub async fn execute(args: BuildArgs, ctx: &ExecutionContext) -> CistepResult<()> {
    let targets = args.targets.resolve()?;
    build(ctx, &SystemRunner::new(), &targets).await
}

/// MSBuild invocation for the targets; the solution is named after the repository
pub fn build_request(ctx: &ExecutionContext, targets: &Targets) -> CistepResult<ProcessRequest> {
    let solution = format!("{}.sln", ctx.repository_name()?);
    Ok(ctx
        .command(&ctx.config.toolchain.msbuild)
        .arg(solution)
        .arg("/m")
        .arg(format!("/t:{}", targets.projects.join(";")))
        .arg(format!("/p:Configuration={}", targets.flavor.configuration))
        .arg(format!("/p:Platform={}", targets.flavor.platform))
        .cwd(ctx.resolve(&targets.solution_path)))
}

pub async fn build(
    ctx: &ExecutionContext,
    runner: &dyn ProcessRunner,
    targets: &Targets,
) -> CistepResult<()> {
    let request = build_request(ctx, targets)?;
    let _group = ui::group(
        &ctx.ui,
        &format!("Building projects {}", targets.projects.join(", ")),
    );
    let outcome = runner.run(&request, &EchoSink).await?;
    tracing::info!("Build finished in {:.1}s", outcome.duration.as_secs_f64());
    Ok(())
}
