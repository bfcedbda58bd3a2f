//! Provision command - install a known tool through the cache

use super::{github_registry, local_cache};
use crate::cli::args::{optional_secret, ProvisionArgs};
use crate::context::ExecutionContext;
use crate::error::CistepResult;
use crate::exec::SystemRunner;
use crate::http::HttpClient;
use crate::provision::{tools, Provisioner};
use tracing::info;

/// Execute the provision command
pub async fn execute(args: ProvisionArgs, ctx: &ExecutionContext) -> CistepResult<()> {
    let descriptor = tools::by_name(&args.tool)?;
    let github_token = optional_secret(&ctx.ui, args.github_token);

    let http = HttpClient::new();
    let runner = SystemRunner::new();
    let cache = local_cache(ctx);
    let registry = github_registry(ctx, &http, github_token);
    let provisioner = Provisioner::new(ctx, &registry, &cache, &http, &runner);

    let tool = provisioner.provision(&descriptor).await?;
    info!(
        "{} {} ({})",
        tool.name,
        if tool.cache_hit { "restored" } else { "installed" },
        tool.key
    );
    println!("{}", tool.install_path.display());
    Ok(())
}
