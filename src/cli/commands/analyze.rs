//! Analyze command - run clang-tidy over the workspace sources

use crate::analysis::{self, AnalyzeOptions};
use crate::cli::args::AnalyzeArgs;
use crate::context::ExecutionContext;
use crate::error::CistepResult;
use crate::exec::SystemRunner;
use crate::inputs;

/// Execute the analyze command
pub async fn execute(args: AnalyzeArgs, ctx: &ExecutionContext) -> CistepResult<()> {
    let options = AnalyzeOptions {
        id: inputs::required("id", args.id)?,
        clang_args: args.clang_args.filter(|a| !a.trim().is_empty()),
        jobs: args.jobs,
    };
    analysis::analyze(ctx, &SystemRunner::new(), &options).await?;
    Ok(())
}
