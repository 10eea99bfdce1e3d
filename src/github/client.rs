//! GitHub REST client
//!
//! A minimal reqwest-based client for the endpoints the discovery pipeline
//! needs: repository search, contributor and commit listings, directory
//! contents, and the rate limit resource. Every response refreshes the cached
//! core quota from the `x-ratelimit-*` headers.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use log::{debug, trace};
use reqwest::header::{HeaderMap, ACCEPT, USER_AGENT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::error::{ApiError, ApiResult};
use super::host::RepositoryHost;
use super::types::{CommitRef, ContentEntry, Contributor, RateLimitState, RawCandidate, SearchPage, SearchQuery};
use crate::credentials::Credentials;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
const ACCEPT_JSON: &str = "application/vnd.github+json";

/// Connection settings for [`GitHubClient`]
#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    pub api_url: String,
    pub request_timeout: Duration,
    pub user_agent: String,
    pub page_size: usize,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            user_agent: format!("repo-scout/{}", env!("CARGO_PKG_VERSION")),
            page_size: 30,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RateLimitResponse {
    resources: RateLimitResources,
}

#[derive(Debug, Deserialize)]
struct RateLimitResources {
    core: RateLimitResource,
}

#[derive(Debug, Deserialize)]
struct RateLimitResource {
    remaining: u64,
    reset: i64,
}

pub struct GitHubClient {
    client: reqwest::Client,
    settings: ClientSettings,
    credentials: Credentials,
    core_quota: Mutex<Option<RateLimitState>>,
}

impl GitHubClient {
    pub fn new(settings: ClientSettings, credentials: Credentials) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()?;

        Ok(Self {
            client,
            settings,
            credentials,
            core_quota: Mutex::new(None),
        })
    }

    /// GET `path` and decode the JSON body; `None` for `204 No Content`
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> ApiResult<Option<T>> {
        let url = format!("{}{}", self.settings.api_url.trim_end_matches('/'), path);
        trace!("GET {} {:?}", url, query);

        let resp = self
            .client
            .get(&url)
            .basic_auth(self.credentials.principal(), Some(self.credentials.secret()))
            .header(ACCEPT, ACCEPT_JSON)
            .header(USER_AGENT, &self.settings.user_agent)
            .query(query)
            .send()
            .await?;

        self.observe_quota(path, resp.headers());

        let status = resp.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if !status.is_success() {
            let headers = resp.headers().clone();
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_status(status, &headers, body, Utc::now()));
        }

        Ok(Some(resp.json::<T>().await?))
    }

    async fn get_list<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> ApiResult<Vec<T>> {
        Ok(self.get_json::<Vec<T>>(path, query).await?.unwrap_or_default())
    }

    fn page_query(&self, page: u32) -> Vec<(&'static str, String)> {
        vec![
            ("per_page", self.settings.page_size.to_string()),
            ("page", page.to_string()),
        ]
    }

    fn observe_quota(&self, path: &str, headers: &HeaderMap) {
        if !reports_core_quota(path, headers) {
            return;
        }
        if let Some(state) = parse_rate_limit(headers) {
            trace!("Observed core quota: {} remaining until {}", state.remaining, state.reset_at);
            *self.core_quota.lock().unwrap_or_else(|p| p.into_inner()) = Some(state);
        }
    }

    fn cached_quota(&self) -> Option<RateLimitState> {
        unexpired(*self.core_quota.lock().unwrap_or_else(|p| p.into_inner()), Utc::now())
    }
}

#[async_trait]
impl RepositoryHost for GitHubClient {
    fn page_size(&self) -> usize {
        self.settings.page_size
    }

    async fn search_page(&self, query: &SearchQuery, page: u32) -> ApiResult<Vec<RawCandidate>> {
        let mut params = vec![
            ("q", query.qualifiers()),
            ("sort", query.sort.clone()),
            ("order", query.order.clone()),
        ];
        params.extend(self.page_query(page));

        let result: Option<SearchPage> = self.get_json("/search/repositories", &params).await?;
        let items = result.map(|p| {
            if p.incomplete_results {
                debug!("Search page {} reported incomplete results", page);
            }
            p.items
        });
        Ok(items.unwrap_or_default())
    }

    async fn contributors_page(&self, repo: &RawCandidate, page: u32) -> ApiResult<Vec<Contributor>> {
        let path = format!("/repos/{}/contributors", repo.full_name);
        self.get_list(&path, &self.page_query(page)).await
    }

    async fn commits_page(
        &self,
        repo: &RawCandidate,
        since: Option<DateTime<Utc>>,
        page: u32,
    ) -> ApiResult<Vec<CommitRef>> {
        let path = format!("/repos/{}/commits", repo.full_name);
        let mut params = self.page_query(page);
        if let Some(since) = since {
            params.push(("since", since.to_rfc3339()));
        }
        self.get_list(&path, &params).await
    }

    async fn contents(&self, repo: &RawCandidate, path: &str) -> ApiResult<Vec<ContentEntry>> {
        let path = format!("/repos/{}/contents/{}", repo.full_name, encode_path(path));
        self.get_list(&path, &[("ref", repo.default_branch.clone())]).await
    }

    /// The quota seen on the latest core response, or a fresh
    /// `GET /rate_limit` once that reading's reset time has passed
    async fn rate_limit(&self) -> ApiResult<RateLimitState> {
        if let Some(state) = self.cached_quota() {
            return Ok(state);
        }

        let response: Option<RateLimitResponse> = self.get_json("/rate_limit", &[]).await?;
        let core = response
            .map(|r| r.resources.core)
            .ok_or_else(|| ApiError::Decode("empty rate limit response".to_string()))?;
        let state = RateLimitState::new(core.remaining, epoch_to_utc(core.reset));

        *self.core_quota.lock().unwrap_or_else(|p| p.into_inner()) = Some(state);
        Ok(state)
    }
}

/// Whether a response's quota headers describe the core quota
///
/// Search responses report the separate search quota. Servers that omit
/// `x-ratelimit-resource` are judged by the request path.
fn reports_core_quota(path: &str, headers: &HeaderMap) -> bool {
    match header_str(headers, "x-ratelimit-resource") {
        Some(resource) => resource == "core",
        None => !path.starts_with("/search/"),
    }
}

/// A cached reading stays usable only until its reset time
fn unexpired(cached: Option<RateLimitState>, now: DateTime<Utc>) -> Option<RateLimitState> {
    cached.filter(|state| state.reset_at > now)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn epoch_to_utc(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(seconds, 0).single().unwrap_or_else(Utc::now)
}

/// Read `x-ratelimit-remaining` / `x-ratelimit-reset`
pub fn parse_rate_limit(headers: &HeaderMap) -> Option<RateLimitState> {
    let remaining = header_str(headers, "x-ratelimit-remaining")?.parse::<u64>().ok()?;
    let reset = header_str(headers, "x-ratelimit-reset")?.parse::<i64>().ok()?;
    Some(RateLimitState::new(remaining, epoch_to_utc(reset)))
}

/// Map a non-success response onto an [`ApiError`]
pub fn classify_status(status: StatusCode, headers: &HeaderMap, body: String, now: DateTime<Utc>) -> ApiError {
    if status == StatusCode::UNAUTHORIZED {
        return ApiError::Unauthorized(body);
    }

    if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
        if let Some(state) = parse_rate_limit(headers) {
            if state.remaining == 0 {
                return ApiError::RateLimited { reset_at: state.reset_at };
            }
        }
        if let Some(seconds) = header_str(headers, "retry-after").and_then(|v| v.parse::<i64>().ok()) {
            return ApiError::RateLimited { reset_at: now + chrono::Duration::seconds(seconds) };
        }
    }

    ApiError::Status { status: status.as_u16(), message: body }
}

/// Percent-encode a repository path, keeping `/` separators
fn encode_path(path: &str) -> String {
    let mut encoded = String::with_capacity(path.len());
    for byte in path.trim_start_matches('/').bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'/' => {
                encoded.push(byte as char)
            }
            other => encoded.push_str(&format!("%{:02X}", other)),
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_parse_rate_limit_headers() {
        let map = headers(&[("x-ratelimit-remaining", "4321"), ("x-ratelimit-reset", "1492780000")]);
        let state = parse_rate_limit(&map).unwrap();
        assert_eq!(state.remaining, 4321);
        assert_eq!(state.reset_at.timestamp(), 1492780000);

        assert!(parse_rate_limit(&headers(&[("x-ratelimit-remaining", "10")])).is_none());
    }

    #[test]
    fn test_classify_exhausted_quota() {
        let map = headers(&[("x-ratelimit-remaining", "0"), ("x-ratelimit-reset", "1492780000")]);
        let err = classify_status(StatusCode::FORBIDDEN, &map, "API rate limit exceeded".into(), Utc::now());
        match err {
            ApiError::RateLimited { reset_at } => assert_eq!(reset_at.timestamp(), 1492780000),
            other => panic!("expected RateLimited, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_secondary_limit_retry_after() {
        let now = Utc.with_ymd_and_hms(2017, 4, 21, 12, 0, 0).unwrap();
        let map = headers(&[("retry-after", "60")]);
        let err = classify_status(StatusCode::FORBIDDEN, &map, "secondary rate limit".into(), now);
        match err {
            ApiError::RateLimited { reset_at } => assert_eq!(reset_at, now + chrono::Duration::seconds(60)),
            other => panic!("expected RateLimited, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_plain_forbidden_and_unauthorized() {
        let map = headers(&[("x-ratelimit-remaining", "4000"), ("x-ratelimit-reset", "1492780000")]);
        let err = classify_status(StatusCode::FORBIDDEN, &map, "too large to list".into(), Utc::now());
        assert!(matches!(err, ApiError::Status { status: 403, .. }));

        let err = classify_status(StatusCode::UNAUTHORIZED, &HeaderMap::new(), "Bad credentials".into(), Utc::now());
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[test]
    fn test_core_quota_detection() {
        let core = headers(&[("x-ratelimit-resource", "core")]);
        let search = headers(&[("x-ratelimit-resource", "search")]);
        let unlabelled = headers(&[("x-ratelimit-remaining", "9"), ("x-ratelimit-reset", "1492780000")]);

        assert!(reports_core_quota("/repos/a/b/commits", &core));
        assert!(!reports_core_quota("/search/repositories", &search));
        assert!(!reports_core_quota("/repos/a/b/commits", &search));
        assert!(reports_core_quota("/repos/a/b/contributors", &unlabelled));
        assert!(!reports_core_quota("/search/repositories", &unlabelled));
    }

    #[test]
    fn test_cached_quota_expires_at_reset() {
        let now = Utc.with_ymd_and_hms(2017, 4, 21, 12, 0, 0).unwrap();
        let pending = RateLimitState::new(12, now + chrono::Duration::seconds(30));
        let stale = RateLimitState::new(12, now - chrono::Duration::seconds(1));

        assert_eq!(unexpired(Some(pending), now), Some(pending));
        assert_eq!(unexpired(Some(stale), now), None);
        assert_eq!(unexpired(None, now), None);
    }

    #[test]
    fn test_encode_path() {
        assert_eq!(encode_path(""), "");
        assert_eq!(encode_path("/src/main/java"), "src/main/java");
        assert_eq!(encode_path("docs/read me#1.md"), "docs/read%20me%231.md");
    }

    #[test]
    fn test_client_settings_default() {
        let settings = ClientSettings::default();
        assert_eq!(settings.api_url, DEFAULT_API_URL);
        assert_eq!(settings.page_size, 30);
        assert!(settings.user_agent.starts_with("repo-scout/"));
    }
}
