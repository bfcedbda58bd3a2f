//! Release metadata registry (GitHub releases)

use crate::error::{CistepError, CistepResult};
use crate::http::HttpClient;
use crate::inputs::Secret;
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;

/// A published release
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    #[serde(default)]
    pub name: Option<String>,
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

/// A downloadable file attached to a release
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
    /// Registry id; changes whenever the file is re-uploaded
    pub id: u64,
    pub name: String,
    pub browser_download_url: String,
}

impl Release {
    /// Release name, falling back to the tag
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.tag_name)
    }

    /// First asset whose name matches `pattern`
    pub fn find_asset(&self, pattern: &Regex) -> Option<&ReleaseAsset> {
        self.assets.iter().find(|a| pattern.is_match(&a.name))
    }
}

/// Source of release metadata
#[async_trait]
pub trait ReleaseRegistry: Send + Sync {
    async fn latest_release(&self, owner: &str, repo: &str) -> CistepResult<Release>;
}

/// GitHub REST API client
pub struct GithubRegistry {
    http: HttpClient,
    api_base: String,
    token: Option<Secret>,
}

impl GithubRegistry {
    pub fn new(http: HttpClient, api_base: &str, token: Option<Secret>) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
        }
    }
}

#[async_trait]
impl ReleaseRegistry for GithubRegistry {
    async fn latest_release(&self, owner: &str, repo: &str) -> CistepResult<Release> {
        let url = format!("{}/repos/{}/{}/releases/latest", self.api_base, owner, repo);
        let mut headers = vec![(
            "Accept".to_string(),
            "application/vnd.github+json".to_string(),
        )];
        if let Some(token) = &self.token {
            headers.push((
                "Authorization".to_string(),
                format!("Bearer {}", token.expose()),
            ));
        }
        let body = self.http.get_text(&url, headers).await?;
        serde_json::from_str(&body).map_err(|e| CistepError::http(&url, e))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory registry that counts lookups
    #[derive(Default)]
    pub(crate) struct FakeRegistry {
        releases: Mutex<HashMap<String, Release>>,
        pub lookups: Mutex<usize>,
    }

    impl FakeRegistry {
        /// Publish a release with a single asset
        pub fn publish(&self, owner: &str, repo: &str, tag: &str, asset: &str, id: u64) {
            let release = Release {
                name: Some(tag.to_string()),
                tag_name: tag.to_string(),
                assets: vec![ReleaseAsset {
                    id,
                    name: asset.to_string(),
                    browser_download_url: format!(
                        "https://example.com/{}/{}/{}/{}",
                        owner, repo, tag, asset
                    ),
                }],
            };
            self.releases
                .lock()
                .unwrap()
                .insert(format!("{}/{}", owner, repo), release);
        }

        pub fn lookups(&self) -> usize {
            *self.lookups.lock().unwrap()
        }
    }

    #[async_trait]
    impl ReleaseRegistry for FakeRegistry {
        async fn latest_release(&self, owner: &str, repo: &str) -> CistepResult<Release> {
            *self.lookups.lock().unwrap() += 1;
            let slug = format!("{}/{}", owner, repo);
            self.releases
                .lock()
                .unwrap()
                .get(&slug)
                .cloned()
                .ok_or_else(|| CistepError::http(slug, "404 Not Found"))
        }
    }
}
