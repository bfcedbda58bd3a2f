//! Directory-backed cache backend
//!
//! Each entry lives in its own directory under the cache root:
//!
//! ```text
//! <root>/<sha256(key, version)>/manifest.json
//! <root>/<sha256(key, version)>/data/0/...     copy of paths[0]
//! <root>/<sha256(key, version)>/data/1/...     copy of paths[1]
//! ```
//!
//! Like the hosted cache service, an entry is also bound to the exact list
//! of paths it was saved with (its "version"): restoring the same key for
//! different paths is a miss.

use crate::cache::backend::{CacheBackend, RestoredEntry};
use crate::cache::key::{sha256_hex, CacheKey};
use crate::error::{CistepError, CistepResult};
use crate::paths::posix_string;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

const MANIFEST: &str = "manifest.json";
const DATA: &str = "data";

/// Metadata stored next to each entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheManifest {
    pub key: String,
    /// Hash of the normalized path list
    pub version: String,
    /// Cached paths, forward slashes only
    pub paths: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub size_bytes: u64,
}

/// Cache stored in a local directory (e.g. the runner's tool cache)
#[derive(Debug, Clone)]
pub struct LocalCacheBackend {
    root: PathBuf,
    /// Relative cache paths are resolved against this directory
    base: PathBuf,
}

impl LocalCacheBackend {
    pub fn new(root: PathBuf, base: PathBuf) -> Self {
        Self { root, base }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All entries, newest first. Unreadable manifests are skipped.
    pub fn entries(&self) -> CistepResult<Vec<CacheManifest>> {
        let mut entries = Vec::new();
        let dir = match fs::read_dir(&self.root) {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(entries),
            Err(e) => {
                return Err(CistepError::io(
                    format!("reading cache directory {}", self.root.display()),
                    e,
                ))
            }
        };

        // Staging directories carry an extension and are never listed
        for entry in dir.flatten().filter(|e| e.path().extension().is_none()) {
            let manifest = entry.path().join(MANIFEST);
            match read_manifest(&manifest) {
                Ok(m) => entries.push(m),
                Err(e) => debug!("Skipping {}: {}", manifest.display(), e),
            }
        }
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    /// Remove every entry, returning how many were removed
    pub fn clear(&self) -> CistepResult<usize> {
        let entries = self.entries()?;
        for manifest in &entries {
            let dir = self.entry_dir(&manifest.key, &manifest.version);
            fs::remove_dir_all(&dir)
                .map_err(|e| CistepError::io(format!("removing {}", dir.display()), e))?;
        }
        info!("Removed {} cache entries", entries.len());
        Ok(entries.len())
    }

    fn entry_dir(&self, key: &str, version: &str) -> PathBuf {
        let id = sha256_hex(format!("{}\n{}", key, version).as_bytes());
        self.root.join(&id[..32])
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base.join(path)
        }
    }
}

/// Normalized path strings and the version hash derived from them
fn path_version(paths: &[PathBuf]) -> (Vec<String>, String) {
    let normalized: Vec<String> = paths.iter().map(|p| posix_string(p)).collect();
    let version = sha256_hex(normalized.join("|").as_bytes());
    (normalized, version)
}

fn read_manifest(path: &Path) -> CistepResult<CacheManifest> {
    let content = fs::read_to_string(path)
        .map_err(|e| CistepError::io(format!("reading {}", path.display()), e))?;
    Ok(serde_json::from_str(&content)?)
}

/// Copy a file or directory tree, overwriting existing files. Returns bytes copied.
fn copy_tree(from: &Path, to: &Path) -> CistepResult<u64> {
    let mut bytes = 0;
    for entry in WalkDir::new(from).follow_links(false) {
        let entry = entry.map_err(|e| CistepError::CacheBackend(e.to_string()))?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(|e| CistepError::Internal(e.to_string()))?;
        let target = if relative.as_os_str().is_empty() {
            to.to_path_buf()
        } else {
            to.join(relative)
        };

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .map_err(|e| CistepError::io(format!("creating {}", target.display()), e))?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .map_err(|e| CistepError::io(format!("creating {}", parent.display()), e))?;
            }
            bytes += fs::copy(entry.path(), &target).map_err(|e| {
                CistepError::io(format!("copying {}", entry.path().display()), e)
            })?;
        }
    }
    Ok(bytes)
}

impl LocalCacheBackend {
    fn restore_blocking(
        &self,
        paths: &[PathBuf],
        key: &CacheKey,
        fallback_prefixes: &[String],
    ) -> CistepResult<Option<RestoredEntry>> {
        let (_, version) = path_version(paths);

        let exact_dir = self.entry_dir(key.as_str(), &version);
        let (dir, matched_key, exact) = if exact_dir.join(MANIFEST).is_file() {
            (exact_dir, key.to_string(), true)
        } else {
            let entries = self.entries()?;
            let fallback = fallback_prefixes.iter().find_map(|prefix| {
                entries
                    .iter()
                    .find(|m| m.version == version && m.key.starts_with(prefix.as_str()))
            });
            match fallback {
                Some(m) => (self.entry_dir(&m.key, &m.version), m.key.clone(), false),
                None => return Ok(None),
            }
        };

        for (index, path) in paths.iter().enumerate() {
            let stored = dir.join(DATA).join(index.to_string());
            if stored.exists() {
                copy_tree(&stored, &self.resolve(path))?;
            }
        }
        Ok(Some(RestoredEntry { matched_key, exact }))
    }

    fn save_blocking(&self, paths: &[PathBuf], key: &CacheKey) -> CistepResult<()> {
        let (normalized, version) = path_version(paths);
        let dir = self.entry_dir(key.as_str(), &version);
        if dir.exists() {
            return Err(CistepError::CacheKeyExists(key.to_string()));
        }

        for path in paths {
            let resolved = self.resolve(path);
            if !resolved.exists() {
                return Err(CistepError::CacheBackend(format!(
                    "path to cache does not exist: {}",
                    posix_string(path)
                )));
            }
        }

        // Write under a temporary name so readers never see half an entry
        let staging = dir.with_extension("partial");
        if staging.exists() {
            fs::remove_dir_all(&staging)
                .map_err(|e| CistepError::io(format!("removing {}", staging.display()), e))?;
        }

        let mut size_bytes = 0;
        for (index, path) in paths.iter().enumerate() {
            size_bytes += copy_tree(
                &self.resolve(path),
                &staging.join(DATA).join(index.to_string()),
            )?;
        }

        let manifest = CacheManifest {
            key: key.to_string(),
            version,
            paths: normalized,
            created_at: Utc::now(),
            size_bytes,
        };
        fs::create_dir_all(&staging)
            .map_err(|e| CistepError::io(format!("creating {}", staging.display()), e))?;
        fs::write(staging.join(MANIFEST), serde_json::to_string_pretty(&manifest)?)
            .map_err(|e| CistepError::io("writing cache manifest", e))?;
        fs::rename(&staging, &dir)
            .map_err(|e| CistepError::io(format!("finalizing {}", dir.display()), e))?;
        Ok(())
    }
}

#[async_trait]
impl CacheBackend for LocalCacheBackend {
    async fn restore(
        &self,
        paths: &[PathBuf],
        key: &CacheKey,
        fallback_prefixes: &[String],
    ) -> CistepResult<Option<RestoredEntry>> {
        let backend = self.clone();
        let paths = paths.to_vec();
        let key = key.clone();
        let fallback_prefixes = fallback_prefixes.to_vec();
        tokio::task::spawn_blocking(move || {
            backend.restore_blocking(&paths, &key, &fallback_prefixes)
        })
        .await
        .map_err(|e| CistepError::CacheBackend(e.to_string()))?
    }

    async fn save(&self, paths: &[PathBuf], key: &CacheKey) -> CistepResult<()> {
        let backend = self.clone();
        let paths = paths.to_vec();
        let key = key.clone();
        tokio::task::spawn_blocking(move || backend.save_blocking(&paths, &key))
            .await
            .map_err(|e| CistepError::CacheBackend(e.to_string()))?
    }
}
