//! Test doubles for code built on the pagination engine.
//!
//! [`FakePagedApi`] serves an in-memory collection page by page with
//! GitHub-style Link headers, and [`MockResponse`] builds [`ResponseMeta`]
//! values carrying rate limit signals.

use crate::client::ResponseMeta;
use crate::errors::{GitHubError, GitHubErrorKind, GitHubResult};
use crate::resilience::{
    HEADER_LIMIT, HEADER_REMAINING, HEADER_RESET, HEADER_RESOURCE, HEADER_RETRY_AFTER, HEADER_USED,
};
use crate::types::{Issue, IssueState, Label, User};
use chrono::{Duration, Utc};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;

/// Builds a GitHub-style Link header for `page` of `total_pages`.
///
/// Returns `None` when there is only one page, matching GitHub, which omits
/// the header entirely in that case.
pub fn link_header(base_url: &str, page: u32, total_pages: u32, per_page: u32) -> Option<String> {
    if total_pages <= 1 {
        return None;
    }

    let url = |n: u32| format!("<{}?per_page={}&page={}>", base_url, per_page, n);
    let mut sections = Vec::new();

    if page > 1 {
        sections.push(format!(r#"{}; rel="prev""#, url(page - 1)));
    }
    if page < total_pages {
        sections.push(format!(r#"{}; rel="next""#, url(page + 1)));
        sections.push(format!(r#"{}; rel="last""#, url(total_pages)));
    }
    if page > 1 {
        sections.push(format!(r#"{}; rel="first""#, url(1)));
    }

    Some(sections.join(", "))
}

/// A mock response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// Status code.
    pub status: u16,
    /// Response body.
    pub body: String,
    /// Headers.
    pub headers: HashMap<String, String>,
}

impl MockResponse {
    /// Creates a response with the given status and body.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            headers: HashMap::new(),
        }
    }

    /// Creates a successful response with the given body.
    pub fn ok_json<T: Serialize>(body: &T) -> Self {
        Self::new(200, serde_json::to_string(body).unwrap_or_default())
    }

    /// Creates a 404 Not Found response.
    pub fn not_found(message: &str) -> Self {
        Self::error(404, message)
    }

    /// Creates a 401 Unauthorized response.
    pub fn unauthorized(message: &str) -> Self {
        Self::error(401, message)
    }

    /// Creates a 403 Forbidden response.
    pub fn forbidden(message: &str) -> Self {
        Self::error(403, message)
    }

    /// Creates a 500 Internal Server Error response.
    pub fn server_error(message: &str) -> Self {
        Self::error(500, message)
    }

    /// Creates a primary rate limit exhausted response.
    pub fn rate_limited() -> Self {
        let reset_at = Utc::now() + Duration::minutes(1);
        Self::error(403, "API rate limit exceeded").with_rate_limit(5000, 0, reset_at.timestamp())
    }

    /// Creates a secondary rate limit response asking for a `retry-after` wait.
    pub fn secondary_rate_limited(retry_after_secs: u64) -> Self {
        Self::error(403, "You have exceeded a secondary rate limit")
            .with_header(HEADER_RETRY_AFTER, &retry_after_secs.to_string())
    }

    fn error(status: u16, message: &str) -> Self {
        Self::new(
            status,
            serde_json::json!({
                "message": message,
                "documentation_url": "https://docs.github.com/rest"
            })
            .to_string(),
        )
    }

    /// Adds a header to the response.
    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.insert(key.to_lowercase(), value.to_string());
        self
    }

    /// Adds a Link header.
    pub fn with_link(self, value: &str) -> Self {
        self.with_header("link", value)
    }

    /// Adds the five rate limit headers for the `core` resource.
    pub fn with_rate_limit(self, limit: u32, remaining: u32, reset_timestamp: i64) -> Self {
        let used = limit.saturating_sub(remaining);
        self.with_header(HEADER_LIMIT, &limit.to_string())
            .with_header(HEADER_REMAINING, &remaining.to_string())
            .with_header(HEADER_RESET, &reset_timestamp.to_string())
            .with_header(HEADER_RESOURCE, "core")
            .with_header(HEADER_USED, &used.to_string())
    }

    /// Converts into a response value.
    pub fn into_meta(self) -> ResponseMeta {
        let headers: HeaderMap = self
            .headers
            .iter()
            .filter_map(|(k, v)| {
                let name = HeaderName::from_bytes(k.as_bytes()).ok()?;
                let value = HeaderValue::from_str(v).ok()?;
                Some((name, value))
            })
            .collect();

        ResponseMeta::new(self.status, headers, self.body)
    }
}

/// In-memory paginated collection.
///
/// Pages are sliced from `items` using the requested page size. Every call is
/// recorded so tests can assert which pages were requested and in what order.
#[derive(Debug)]
pub struct FakePagedApi<T> {
    items: Vec<T>,
    base_url: String,
    link_headers: bool,
    delays: HashMap<u32, std::time::Duration>,
    failures: HashMap<u32, (GitHubErrorKind, String)>,
    calls: Mutex<Vec<(u32, u32)>>,
}

impl<T: Clone> FakePagedApi<T> {
    /// Creates a fake API serving `items`.
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            base_url: "https://api.github.com/repos/octo/fake/items".to_string(),
            link_headers: true,
            delays: HashMap::new(),
            failures: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Never sends a Link header.
    pub fn without_link_header(mut self) -> Self {
        self.link_headers = false;
        self
    }

    /// Delays the response for `page`.
    pub fn with_delay(mut self, page: u32, delay: std::time::Duration) -> Self {
        self.delays.insert(page, delay);
        self
    }

    /// Fails every request for `page` with the given error kind.
    pub fn fail_on(mut self, page: u32, kind: GitHubErrorKind, message: &str) -> Self {
        self.failures.insert(page, (kind, message.to_string()));
        self
    }

    /// Number of pages for a given page size.
    pub fn total_pages(&self, per_page: u32) -> u32 {
        let per_page = per_page.max(1) as usize;
        self.items.len().div_ceil(per_page) as u32
    }

    /// Serves one page.
    pub async fn fetch(&self, page: u32, per_page: u32) -> GitHubResult<(Vec<T>, ResponseMeta)> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((page, per_page));

        if let Some(delay) = self.delays.get(&page) {
            tokio::time::sleep(*delay).await;
        }

        if let Some((kind, message)) = self.failures.get(&page) {
            return Err(GitHubError::new(*kind, message.clone()));
        }

        let size = per_page.max(1) as usize;
        let start = (page.saturating_sub(1) as usize).saturating_mul(size);
        let items: Vec<T> = self.items.iter().skip(start).take(size).cloned().collect();

        let mut response = MockResponse::new(200, "");
        let total_pages = self.total_pages(per_page);
        if self.link_headers {
            if let Some(link) = link_header(&self.base_url, page, total_pages, per_page) {
                response = response.with_link(&link);
            }
        }

        Ok((items, response.into_meta()))
    }

    /// Every `(page, per_page)` requested so far, in call order.
    pub fn calls(&self) -> Vec<(u32, u32)> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Page numbers requested so far, in call order.
    pub fn requested_pages(&self) -> Vec<u32> {
        self.calls().into_iter().map(|(page, _)| page).collect()
    }

    /// Number of fetch calls so far.
    pub fn call_count(&self) -> usize {
        self.calls().len()
    }
}

/// Test fixtures for common GitHub types.
pub mod fixtures {
    use super::*;

    /// Creates a test user.
    pub fn user(login: &str) -> User {
        User {
            id: 1,
            login: login.to_string(),
            user_type: "User".to_string(),
        }
    }

    /// Creates a test label.
    pub fn label(name: &str) -> Label {
        Label {
            id: name.len() as u64,
            name: name.to_string(),
            description: None,
            color: "ededed".to_string(),
            default: false,
        }
    }

    /// Creates a test issue.
    pub fn issue(number: u32, title: &str, labels: &[&str]) -> Issue {
        let timestamp = Utc::now();
        Issue {
            id: number as u64,
            number,
            title: title.to_string(),
            body: None,
            state: IssueState::Open,
            user: Some(user("testuser")),
            labels: labels.iter().map(|name| label(name)).collect(),
            html_url: format!("https://github.com/octo/fake/issues/{}", number),
            created_at: timestamp,
            updated_at: timestamp,
        }
    }
}
