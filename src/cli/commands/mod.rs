//! CLI command implementations

pub mod analyze;
pub mod build;
pub mod cache;
pub mod coverage;
pub mod provision;
pub mod report;
pub mod run;

pub use analyze::execute as analyze;
pub use build::execute as build;
pub use cache::execute as cache;
pub use coverage::execute as coverage;
pub use provision::execute as provision;
pub use report::execute as report;
pub use run::execute as run;

use crate::cache::LocalCacheBackend;
use crate::config::{Config, ConfigManager};
use crate::context::ExecutionContext;
use crate::http::HttpClient;
use crate::inputs::Secret;
use crate::provision::GithubRegistry;
use std::path::PathBuf;

/// Directory of the local cache backend
pub(crate) fn cache_dir(config: &Config) -> PathBuf {
    config
        .cache
        .dir
        .clone()
        .unwrap_or_else(ConfigManager::default_cache_dir)
}

/// Cache backend rooted at the configured directory, paths relative to the workspace
pub(crate) fn local_cache(ctx: &ExecutionContext) -> LocalCacheBackend {
    LocalCacheBackend::new(cache_dir(&ctx.config), ctx.workspace.clone())
}

pub(crate) fn github_registry(
    ctx: &ExecutionContext,
    http: &HttpClient,
    token: Option<Secret>,
) -> GithubRegistry {
    GithubRegistry::new(http.clone(), &ctx.config.endpoints.github_api, token)
}
