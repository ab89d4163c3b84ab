//! GitHub code index client (REST v3) for remote candidate discovery.
//!
//! Endpoints used:
//! - GET /search/code?q=...                — code search with language qualifier
//! - GET /repos/{owner}/{repo}/contents/{path} — full file content (base64)
//! - GET /search/issues?q=...              — repo-scoped issue search
//!
//! Search endpoints are heavily rate-limited, so calls go through a
//! retry-with-backoff wrapper: a primary rate-limit signal (403/429 with
//! reset hints) is retried with the server-provided delay up to a small
//! budget; exhausting the budget surfaces `ProviderError::RateLimited`,
//! which the orchestrator degrades to "no results" for that call.

use std::time::Duration;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode, header::HeaderMap};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::errors::{ProviderError, ScanResult};
use pattern_store::RelatedIssue;

/// Retry budget for rate-limited calls (attempts after the first).
const RATE_LIMIT_RETRIES: u32 = 2;
/// Fallback backoff when the server gives no delay hint.
const DEFAULT_BACKOFF_SECS: u64 = 2;
/// Upper bound on a single backoff sleep.
const MAX_BACKOFF_SECS: u64 = 60;
/// Page size for search endpoints.
const SEARCH_PAGE_SIZE: u32 = 10;
/// Page size for issue search (issues are enrichment, keep it small).
const ISSUE_PAGE_SIZE: u32 = 5;

/// One raw hit from the remote code index.
#[derive(Debug, Clone)]
pub struct CodeSearchHit {
    /// Repository full name, e.g. `acme/shop`.
    pub repository: String,
    /// Path within the repository.
    pub path: String,
    /// Web URL of the file (dedup key and pattern provenance).
    pub html_url: String,
}

/// Capability interface for the external code index.
///
/// Implemented by [`GitHubCodeIndex`] in production and by counting mocks in
/// orchestrator tests (the short-circuit law is verified via call counts).
pub trait CodeIndex {
    fn search_code(
        &self,
        query: &str,
    ) -> impl Future<Output = ScanResult<Vec<CodeSearchHit>>> + Send;

    fn fetch_content(
        &self,
        repository: &str,
        path: &str,
    ) -> impl Future<Output = ScanResult<String>> + Send;

    fn search_issues(
        &self,
        repository: &str,
        query: &str,
    ) -> impl Future<Output = ScanResult<Vec<RelatedIssue>>> + Send;
}

/// Thin GitHub REST client with rate-limit-aware retry.
#[derive(Debug, Clone)]
pub struct GitHubCodeIndex {
    http: Client,
    base_api: String, // "https://api.github.com"
    token: Option<String>,
}

impl GitHubCodeIndex {
    /// Constructs a client with a shared reqwest instance and optional token.
    pub fn new(http: Client, base_api: String, token: Option<String>) -> Self {
        Self {
            http,
            base_api,
            token,
        }
    }

    /// Builds a client from `GITHUB_API_URL` / `GITHUB_TOKEN` env variables.
    ///
    /// # Errors
    /// Returns a provider error if the HTTP client cannot be built.
    pub fn from_env() -> ScanResult<Self> {
        let base_api = std::env::var("GITHUB_API_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "https://api.github.com".to_string());
        let token = std::env::var("GITHUB_TOKEN")
            .ok()
            .filter(|s| !s.trim().is_empty());

        let http = Client::builder()
            .user_agent("repo-scanner/0.1")
            .timeout(Duration::from_secs(20))
            .build()?;

        Ok(Self::new(http, base_api, token))
    }

    /// GET with auth headers and bounded rate-limit retry.
    async fn get_with_retry(&self, url: &str) -> ScanResult<reqwest::Response> {
        let mut attempt: u32 = 0;
        loop {
            let mut req = self
                .http
                .get(url)
                .header("Accept", "application/vnd.github+json");
            if let Some(token) = &self.token {
                req = req.bearer_auth(token);
            }

            let resp = req.send().await?;
            let status = resp.status();

            if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
                let hint = retry_after_secs(resp.headers());
                if attempt < RATE_LIMIT_RETRIES {
                    let delay = hint.unwrap_or(DEFAULT_BACKOFF_SECS).min(MAX_BACKOFF_SECS);
                    attempt += 1;
                    warn!(
                        %status,
                        %url,
                        delay_secs = delay,
                        attempt,
                        "rate limited, backing off before retry"
                    );
                    tokio::time::sleep(Duration::from_secs(delay)).await;
                    continue;
                }
                return Err(ProviderError::RateLimited {
                    retry_after_secs: hint,
                }
                .into());
            }

            if !status.is_success() {
                return Err(map_status(status).into());
            }
            return Ok(resp);
        }
    }
}

impl CodeIndex for GitHubCodeIndex {
    /// Searches the code index; the query should already carry a
    /// `language:<lang>` qualifier.
    async fn search_code(&self, query: &str) -> ScanResult<Vec<CodeSearchHit>> {
        let url = format!(
            "{}/search/code?q={}&per_page={}&sort=indexed",
            self.base_api,
            urlencoding::encode(query),
            SEARCH_PAGE_SIZE
        );
        debug!(%query, "github code search");

        let resp: GhSearchResponse<GhCodeItem> = self.get_with_retry(&url).await?.json().await?;

        let hits = resp
            .items
            .into_iter()
            .map(|item| CodeSearchHit {
                repository: item.repository.full_name,
                path: item.path,
                html_url: item.html_url,
            })
            .collect();
        Ok(hits)
    }

    /// Fetches full file content, decoding base64 payloads when needed.
    async fn fetch_content(&self, repository: &str, path: &str) -> ScanResult<String> {
        let encoded_path: Vec<_> = path
            .split('/')
            .map(|seg| urlencoding::encode(seg).into_owned())
            .collect();
        let url = format!(
            "{}/repos/{}/contents/{}",
            self.base_api,
            repository,
            encoded_path.join("/")
        );
        debug!(%repository, %path, "github content fetch");

        let resp: GhContent = self.get_with_retry(&url).await?.json().await?;
        decode_content(resp)
    }

    /// Searches issues scoped to one repository.
    async fn search_issues(&self, repository: &str, query: &str) -> ScanResult<Vec<RelatedIssue>> {
        let q = format!("{query} repo:{repository}");
        let url = format!(
            "{}/search/issues?q={}&per_page={}",
            self.base_api,
            urlencoding::encode(&q),
            ISSUE_PAGE_SIZE
        );
        debug!(%repository, "github issue search");

        let resp: GhSearchResponse<GhIssue> = self.get_with_retry(&url).await?.json().await?;

        let issues = resp
            .items
            .into_iter()
            .map(|i| RelatedIssue {
                title: i.title,
                url: i.html_url,
                state: i.state,
                created_at: i.created_at,
                closed_at: i.closed_at,
                labels: i.labels.into_iter().map(|l| l.name).collect(),
            })
            .collect();
        Ok(issues)
    }
}

/// Maps a non-rate-limit HTTP status to a provider error.
fn map_status(status: StatusCode) -> ProviderError {
    match status.as_u16() {
        401 => ProviderError::Unauthorized,
        404 => ProviderError::NotFound,
        code @ 500..=599 => ProviderError::Server(code),
        code => ProviderError::HttpStatus(code),
    }
}

/// Extracts a backoff delay from rate-limit response headers.
///
/// Prefers `Retry-After` (secondary/abuse signal), then falls back to the
/// primary `x-ratelimit-reset` epoch when the quota is exhausted.
fn retry_after_secs(headers: &HeaderMap) -> Option<u64> {
    if let Some(v) = headers.get("retry-after") {
        if let Some(secs) = v.to_str().ok().and_then(|s| s.parse::<u64>().ok()) {
            return Some(secs);
        }
    }

    let remaining = headers
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok());
    if remaining == Some("0") {
        if let Some(reset) = headers
            .get("x-ratelimit-reset")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<i64>().ok())
        {
            let now = Utc::now().timestamp();
            return Some((reset - now).max(0) as u64);
        }
    }
    None
}

/// Decodes a contents-API payload into text.
fn decode_content(content: GhContent) -> ScanResult<String> {
    let body = content
        .content
        .ok_or_else(|| ProviderError::InvalidResponse("contents response without body".into()))?;

    match content.encoding.as_deref() {
        Some("base64") => {
            // GitHub wraps base64 at 60 columns; strip all whitespace first.
            let compact: String = body.chars().filter(|c| !c.is_whitespace()).collect();
            let bytes = BASE64.decode(compact.as_bytes()).map_err(|e| {
                ProviderError::InvalidResponse(format!("invalid base64 content: {e}"))
            })?;
            String::from_utf8(bytes)
                .map_err(|e| ProviderError::InvalidResponse(format!("non-utf8 content: {e}")).into())
        }
        _ => Ok(body),
    }
}

/// --- GitHub response shapes (subset of fields we actually use) ---

// `#[serde(default)]` on `items` puts a `Default` bound on `T`, hence the
// `Default` derives on the item structs below.
#[derive(Debug, Deserialize)]
struct GhSearchResponse<T> {
    #[serde(default)]
    items: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
struct GhCodeItem {
    path: String,
    html_url: String,
    repository: GhRepo,
}

#[derive(Debug, Default, Deserialize)]
struct GhRepo {
    full_name: String,
}

#[derive(Debug, Deserialize)]
struct GhContent {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GhIssue {
    title: String,
    html_url: String,
    state: String,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    labels: Vec<GhLabel>,
}

#[derive(Debug, Deserialize)]
struct GhLabel {
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderName, HeaderValue};

    #[test]
    fn retry_after_header_wins() {
        let mut h = HeaderMap::new();
        h.insert(
            HeaderName::from_static("retry-after"),
            HeaderValue::from_static("7"),
        );
        assert_eq!(retry_after_secs(&h), Some(7));
    }

    #[test]
    fn ratelimit_reset_is_used_when_quota_exhausted() {
        let mut h = HeaderMap::new();
        h.insert(
            HeaderName::from_static("x-ratelimit-remaining"),
            HeaderValue::from_static("0"),
        );
        let reset = Utc::now().timestamp() + 30;
        h.insert(
            HeaderName::from_static("x-ratelimit-reset"),
            HeaderValue::from_str(&reset.to_string()).unwrap(),
        );
        let secs = retry_after_secs(&h).unwrap();
        assert!(secs <= 30 && secs >= 28);
    }

    #[test]
    fn no_hint_yields_none() {
        assert_eq!(retry_after_secs(&HeaderMap::new()), None);
    }

    #[test]
    fn base64_content_is_decoded_with_line_wraps() {
        let encoded = BASE64.encode("function computeTotal() {}");
        // Simulate GitHub's 60-column wrapping.
        let wrapped = format!("{}\n{}", &encoded[..10], &encoded[10..]);
        let text = decode_content(GhContent {
            content: Some(wrapped),
            encoding: Some("base64".into()),
        })
        .unwrap();
        assert_eq!(text, "function computeTotal() {}");
    }

    #[test]
    fn plain_content_passes_through() {
        let text = decode_content(GhContent {
            content: Some("plain text".into()),
            encoding: None,
        })
        .unwrap();
        assert_eq!(text, "plain text");
    }

    #[test]
    fn search_responses_deserialize_with_and_without_items() {
        let resp: GhSearchResponse<GhIssue> =
            serde_json::from_str(r#"{"total_count": 0}"#).unwrap();
        assert!(resp.items.is_empty());

        let resp: GhSearchResponse<GhCodeItem> = serde_json::from_str(
            r#"{"items": [{"path": "src/cart.js",
                          "html_url": "https://gh/cart",
                          "repository": {"full_name": "acme/shop"}}]}"#,
        )
        .unwrap();
        assert_eq!(resp.items.len(), 1);
        assert_eq!(resp.items[0].repository.full_name, "acme/shop");
    }

    #[test]
    fn missing_body_is_invalid_response() {
        assert!(
            decode_content(GhContent {
                content: None,
                encoding: None,
            })
            .is_err()
        );
    }
}
