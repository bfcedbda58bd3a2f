//! Cache backend abstraction
//!
//! The storage behind the cache belongs to the CI platform. Steps only see
//! this trait, and only through [`restore_or_warn`] / [`save_or_warn`]:
//! a cache that is down must never fail the job.

use crate::cache::key::CacheKey;
use crate::error::CistepResult;
use crate::ui::{self, UiContext};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

/// A successful restore
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoredEntry {
    /// Key of the entry that was restored
    pub matched_key: String,
    /// False when a fallback prefix matched; the content may be stale
    pub exact: bool,
}

/// Keyed storage for directory trees
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Restore `paths` from the entry stored under `key`.
    ///
    /// Fallback prefixes are tried in order only when the exact key misses;
    /// the newest entry matching a prefix wins. `Ok(None)` is a miss.
    async fn restore(
        &self,
        paths: &[PathBuf],
        key: &CacheKey,
        fallback_prefixes: &[String],
    ) -> CistepResult<Option<RestoredEntry>>;

    /// Store `paths` under `key`. Entries are immutable: saving an existing
    /// key fails.
    async fn save(&self, paths: &[PathBuf], key: &CacheKey) -> CistepResult<()>;
}

/// Restore, downgrading any backend failure to a warning and a miss
pub async fn restore_or_warn(
    backend: &dyn CacheBackend,
    ui: &UiContext,
    paths: &[PathBuf],
    key: &CacheKey,
    fallback_prefixes: &[String],
) -> Option<RestoredEntry> {
    match backend.restore(paths, key, fallback_prefixes).await {
        Ok(Some(entry)) => {
            debug!("Cache restored {} (exact: {})", entry.matched_key, entry.exact);
            Some(entry)
        }
        Ok(None) => {
            debug!("Cache miss for {}", key);
            None
        }
        Err(e) => {
            ui::warning(ui, &format!("Restoring cache {} failed: {}", key, e));
            None
        }
    }
}

/// Save, downgrading any backend failure to a warning. Returns whether the
/// entry was stored.
pub async fn save_or_warn(
    backend: &dyn CacheBackend,
    ui: &UiContext,
    paths: &[PathBuf],
    key: &CacheKey,
) -> bool {
    match backend.save(paths, key).await {
        Ok(()) => {
            debug!("Cache saved {}", key);
            true
        }
        Err(e) => {
            ui::warning(ui, &format!("Saving cache {} failed: {}", key, e));
            false
        }
    }
}
