//! Blocking HTTP via `ureq`, driven from async code
//!
//! Requests run on the blocking thread pool. There are no retries: a failed
//! download or upload fails the step that issued it.

use crate::error::{CistepError, CistepResult};
use async_trait::async_trait;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Request headers as owned pairs
pub type Headers = Vec<(String, String)>;

/// Downloads a URL to a file
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Download `url` to `dest`, creating parent directories. Returns the byte count.
    async fn download(&self, url: &str, dest: &Path) -> CistepResult<u64>;
}

/// Shared HTTP client
#[derive(Clone)]
pub struct HttpClient {
    agent: ureq::Agent,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    pub fn new() -> Self {
        Self {
            agent: ureq::Agent::new_with_defaults(),
        }
    }

    /// GET a URL and return the body as text
    pub async fn get_text(&self, url: &str, headers: Headers) -> CistepResult<String> {
        let agent = self.agent.clone();
        let url = url.to_string();
        tokio::task::spawn_blocking(move || {
            debug!("GET {}", url);
            let mut request = agent.get(&url);
            for (name, value) in &headers {
                request = request.header(name.as_str(), value.as_str());
            }
            let mut response = request.call().map_err(|e| CistepError::http(&url, e))?;
            response
                .body_mut()
                .read_to_string()
                .map_err(|e| CistepError::http(&url, e))
        })
        .await
        .map_err(|e| CistepError::Internal(e.to_string()))?
    }

    /// POST a body (or nothing) and return the response text
    pub async fn post(&self, url: &str, headers: Headers, body: Option<Vec<u8>>) -> CistepResult<String> {
        let agent = self.agent.clone();
        let url = url.to_string();
        tokio::task::spawn_blocking(move || {
            debug!("POST {}", url);
            let mut request = agent.post(&url);
            for (name, value) in &headers {
                request = request.header(name.as_str(), value.as_str());
            }
            let result = match &body {
                Some(body) => request.send(&body[..]),
                None => request.send_empty(),
            };
            let mut response = result.map_err(|e| CistepError::http(&url, e))?;
            response
                .body_mut()
                .read_to_string()
                .map_err(|e| CistepError::http(&url, e))
        })
        .await
        .map_err(|e| CistepError::Internal(e.to_string()))?
    }
}

#[async_trait]
impl Fetcher for HttpClient {
    async fn download(&self, url: &str, dest: &Path) -> CistepResult<u64> {
        let agent = self.agent.clone();
        let url = url.to_string();
        let dest: PathBuf = dest.to_path_buf();
        tokio::task::spawn_blocking(move || {
            debug!("Downloading {} to {}", url, dest.display());
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    CistepError::io(format!("creating directory {}", parent.display()), e)
                })?;
            }
            let response = agent.get(&url).call().map_err(|e| CistepError::http(&url, e))?;
            let mut reader = response.into_body().into_reader();
            let mut file = File::create(&dest)
                .map_err(|e| CistepError::io(format!("creating {}", dest.display()), e))?;
            std::io::copy(&mut reader, &mut file)
                .map_err(|e| CistepError::io(format!("downloading {}", url), e))
        })
        .await
        .map_err(|e| CistepError::Internal(e.to_string()))?
    }
}

/// Last path segment of a URL, used as the file name of a download
pub fn file_name_from_url(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or("download")
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Writes a fixed body (or the URL itself) instead of downloading
    #[derive(Default)]
    pub(crate) struct FakeFetcher {
        body: Option<Vec<u8>>,
        pub urls: Mutex<Vec<String>>,
    }

    impl FakeFetcher {
        pub fn serving(body: &[u8]) -> Self {
            Self {
                body: Some(body.to_vec()),
                urls: Mutex::new(Vec::new()),
            }
        }

        pub fn count(&self) -> usize {
            self.urls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Fetcher for FakeFetcher {
        async fn download(&self, url: &str, dest: &Path) -> CistepResult<u64> {
            std::fs::create_dir_all(dest.parent().unwrap()).unwrap();
            let body = self.body.clone().unwrap_or_else(|| url.as_bytes().to_vec());
            std::fs::write(dest, &body).unwrap();
            self.urls.lock().unwrap().push(url.to_string());
            Ok(body.len() as u64)
        }
    }
}
