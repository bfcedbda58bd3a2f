//! Coverage command - collect coverage and upload it to Codecov and Codacy

use super::{github_registry, local_cache};
use crate::cli::args::{optional_secret, CoverageArgs};
use crate::context::ExecutionContext;
use crate::coverage::{self, CoverageOptions, CoverageServices};
use crate::error::CistepResult;
use crate::exec::SystemRunner;
use crate::http::HttpClient;
use crate::inputs;
use crate::provision::Provisioner;
use tracing::info;

/// Execute the coverage command
pub async fn execute(args: CoverageArgs, ctx: &ExecutionContext) -> CistepResult<()> {
    let targets = args.targets.resolve()?;
    let options = CoverageOptions {
        solution_path: targets.solution_path,
        projects: targets.projects,
        flavor: targets.flavor,
        codacy_token: inputs::required_secret(&ctx.ui, "codacy-token", args.codacy_token)?,
    };
    let github_token = optional_secret(&ctx.ui, args.github_token);

    let http = HttpClient::new();
    let runner = SystemRunner::new();
    let cache = local_cache(ctx);
    let registry = github_registry(ctx, &http, github_token);
    let provisioner = Provisioner::new(ctx, &registry, &cache, &http, &runner);
    let services = CoverageServices {
        runner: &runner,
        fetcher: &http,
        cache: &cache,
        provisioner: &provisioner,
    };

    let reports = coverage::coverage(ctx, &services, &options).await?;
    info!("Uploaded {} coverage report(s)", reports.len());
    Ok(())
}
