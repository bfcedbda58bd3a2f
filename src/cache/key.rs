//! Cache keys
//!
//! A key names exactly one version of a cached artifact. Tools are keyed by
//! `{tool}-{asset id or pinned version}`, downloaded scripts by
//! `{name}-{sha256 of the content}`.

use crate::error::{CistepError, CistepResult};
use sha2::{Digest, Sha256};
use std::fmt;

/// Longest key the cache service accepts
pub const MAX_KEY_LEN: usize = 512;

/// Validated cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Validate a raw key
    pub fn new(key: impl Into<String>) -> CistepResult<Self> {
        let key = key.into();
        let invalid = |reason: &str| CistepError::CacheKeyInvalid {
            key: key.clone(),
            reason: reason.to_string(),
        };

        if key.is_empty() {
            return Err(invalid("key is empty"));
        }
        if key.len() > MAX_KEY_LEN {
            return Err(invalid("key is longer than 512 characters"));
        }
        if key.contains(',') {
            return Err(invalid("key must not contain commas"));
        }
        if key.chars().any(char::is_control) {
            return Err(invalid("key must not contain control characters"));
        }
        Ok(Self(key))
    }

    /// Key for one version of a named artifact: `{name}-{version}`
    pub fn for_tool(name: &str, version_component: &str) -> CistepResult<Self> {
        if name.is_empty() || version_component.is_empty() {
            return Err(CistepError::CacheKeyInvalid {
                key: format!("{}-{}", name, version_component),
                reason: "name and version must both be non-empty".to_string(),
            });
        }
        Self::new(format!("{}-{}", name, version_component))
    }

    /// Key derived from content: `{name}-{sha256 hex}`
    pub fn for_content(name: &str, content: &[u8]) -> CistepResult<Self> {
        Self::for_tool(name, &sha256_hex(content))
    }

    /// Fallback prefix matching every version of `name`
    pub fn prefix(name: &str) -> String {
        format!("{}-", name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lowercase hex SHA-256 of a byte slice
pub fn sha256_hex(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}
