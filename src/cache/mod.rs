//! Keyed cache for tool installs and downloaded scripts
//!
//! Entries are immutable once saved and found by exact key. A caller may
//! pass fallback prefixes for content-hash keyed data; a prefix hit is
//! reported as not exact so the caller can treat it as stale.
//!
//! # Key policy
//!
//! | Artifact | Key | Fallback |
//! |----------|-----|----------|
//! | Tool install | `{tool}-{asset id}` or `{tool}-{pinned version}` | none |
//! | Codacy coverage reporter | `codacy-coverage-{sha256}` | `codacy-coverage-` |
//!
//! Backend failures never fail a step: use [`restore_or_warn`] and
//! [`save_or_warn`].

pub mod backend;
pub mod key;
pub mod local;

pub use backend::{restore_or_warn, save_or_warn, CacheBackend, RestoredEntry};
pub use key::{sha256_hex, CacheKey};
pub use local::{CacheManifest, LocalCacheBackend};
