//! Codacy API client for remote analysis results

use crate::error::CistepResult;
use crate::http::{Headers, HttpClient};
use crate::inputs::Secret;
use tracing::debug;

/// Uploads clang-tidy results for a commit
pub struct CodacyClient {
    http: HttpClient,
    api_base: String,
    token: Secret,
}

impl CodacyClient {
    pub fn new(http: HttpClient, api_base: &str, token: Secret) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn commit_url(&self, sha: &str, endpoint: &str) -> String {
        format!("{}/2.0/commit/{}/{}", self.api_base, sha, endpoint)
    }

    fn headers(&self) -> Headers {
        vec![
            ("project-token".to_string(), self.token.expose().to_string()),
            ("Content-Type".to_string(), "application/json".to_string()),
        ]
    }

    /// Send the converted results of all analyzed files
    pub async fn upload_results(&self, sha: &str, results: Vec<u8>) -> CistepResult<()> {
        let url = self.commit_url(sha, "issuesRemoteResults");
        let response = self.http.post(&url, self.headers(), Some(results)).await?;
        debug!("Codacy upload: {}", response.trim());
        Ok(())
    }

    /// Mark the commit's remote results as complete
    pub async fn finalize(&self, sha: &str) -> CistepResult<()> {
        let url = self.commit_url(sha, "resultsFinal");
        let response = self.http.post(&url, self.headers(), None).await?;
        debug!("Codacy finalize: {}", response.trim());
        Ok(())
    }
}
