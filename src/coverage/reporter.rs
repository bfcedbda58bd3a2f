//! Codacy coverage reporter bootstrap and its cache
//!
//! The bootstrap script has no version, so the cache key is the SHA-256 of
//! its content. A run with a changed script may still start from the newest
//! older entry (fallback prefix); such a hit is stale and the directory is
//! saved again under the new key once the reporter has run.

use crate::cache::{restore_or_warn, save_or_warn, CacheBackend, CacheKey, RestoredEntry};
use crate::context::ExecutionContext;
use crate::error::{CistepError, CistepResult};
use crate::http::Fetcher;
use crate::ui;
use std::path::PathBuf;
use tracing::debug;

/// Script file, relative to the workspace
pub const REPORTER_SCRIPT: &str = ".codacy-coverage.sh";

/// Directory the script downloads the reporter into, relative to the workspace
pub const REPORTER_DIR: &str = ".codacy-coverage";

const KEY_NAME: &str = "codacy-coverage";

/// A downloaded reporter script and the state of its cache entry
#[derive(Debug, Clone)]
pub struct Reporter {
    pub script: PathBuf,
    pub key: CacheKey,
    pub restored: Option<RestoredEntry>,
}

impl Reporter {
    /// Whether the restored directory matches this script exactly
    pub fn exact_hit(&self) -> bool {
        self.restored.as_ref().is_some_and(|entry| entry.exact)
    }
}

fn cache_paths() -> Vec<PathBuf> {
    vec![PathBuf::from(REPORTER_DIR)]
}

/// Download the bootstrap script and restore the reporter directory
pub async fn prepare(
    ctx: &ExecutionContext,
    fetcher: &dyn Fetcher,
    cache: &dyn CacheBackend,
) -> CistepResult<Reporter> {
    let script = ctx.resolve(REPORTER_SCRIPT);
    fetcher
        .download(&ctx.config.endpoints.codacy_coverage_script, &script)
        .await?;
    let content = std::fs::read(&script)
        .map_err(|e| CistepError::io(format!("reading {}", script.display()), e))?;

    let key = CacheKey::for_content(KEY_NAME, &content)?;
    let restored = restore_or_warn(
        cache,
        &ctx.ui,
        &cache_paths(),
        &key,
        &[CacheKey::prefix(KEY_NAME)],
    )
    .await;

    match &restored {
        Some(entry) if entry.exact => {
            ui::info(&ctx.ui, &format!("{} is found in cache", REPORTER_DIR))
        }
        Some(entry) => ui::info(
            &ctx.ui,
            &format!("{} restored from older entry {}", REPORTER_DIR, entry.matched_key),
        ),
        None => debug!("No cached {} for {}", REPORTER_DIR, key),
    }

    Ok(Reporter {
        script,
        key,
        restored,
    })
}

/// Save the reporter directory unless it came from an exact hit.
/// Returns whether an entry was written.
pub async fn finish(ctx: &ExecutionContext, cache: &dyn CacheBackend, reporter: &Reporter) -> bool {
    if reporter.exact_hit() {
        return false;
    }
    if !ctx.resolve(REPORTER_DIR).exists() {
        debug!("{} was not created, nothing to cache", REPORTER_DIR);
        return false;
    }
    let saved = save_or_warn(cache, &ctx.ui, &cache_paths(), &reporter.key).await;
    if saved {
        ui::info(&ctx.ui, &format!("Added {} to cache", REPORTER_DIR));
    }
    saved
}
