//! GitHub API client and HTTP transport.

use crate::config::{GitHubConfig, GitHubConfigBuilder, RateLimitConfig, DEFAULT_BASE_URL};
use crate::errors::{GitHubError, GitHubErrorKind, GitHubResult};
use crate::observability::{Metrics, TracingHooks};
use crate::pagination::{self, PaginationParams};
use crate::resilience::{RateLimitInfo, RateLimitMonitor, RateLimitOutcome};
use crate::services::{IssuesService, LabelsService};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Method};
use secrecy::ExposeSecret;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

/// GitHub error response format.
#[derive(Debug, serde::Deserialize)]
struct GitHubErrorResponse {
    message: String,
    documentation_url: Option<String>,
}

/// A completed HTTP response: status, headers and the buffered body.
#[derive(Debug, Clone)]
pub struct ResponseMeta {
    status: u16,
    headers: HeaderMap,
    body: Bytes,
}

impl ResponseMeta {
    /// Creates a response.
    pub fn new(status: u16, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Gets the HTTP status code.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Returns true for a 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Gets all response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Looks up a header by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Gets the raw body.
    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    /// Gets the body as text.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserializes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> GitHubResult<T> {
        serde_json::from_slice(&self.body).map_err(|e| {
            GitHubError::deserialization(format!("Failed to deserialize response: {}", e))
                .with_status(self.status)
        })
    }
}

/// A request ready to hand to a transport.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL including the query string.
    pub url: String,
    /// Request headers.
    pub headers: HeaderMap,
    /// JSON body, if any.
    pub body: Option<Bytes>,
}

/// Sends requests over the wire.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends one request and buffers the response.
    async fn send(&self, request: HttpRequest) -> GitHubResult<ResponseMeta>;
}

/// [`HttpTransport`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    /// Creates a transport using the timeouts and pool settings in `config`.
    pub fn new(config: &GitHubConfig) -> GitHubResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.pool.max_idle_per_host)
            .pool_idle_timeout(config.pool.idle_timeout)
            .build()
            .map_err(|e| {
                GitHubError::new(
                    GitHubErrorKind::InvalidConfiguration,
                    format!("Failed to create HTTP client: {}", e),
                )
            })?;

        Ok(Self { http })
    }

    fn map_error(e: reqwest::Error) -> GitHubError {
        let error = if e.is_timeout() {
            GitHubError::timeout(format!("Request timed out: {}", e))
        } else {
            GitHubError::new(
                GitHubErrorKind::ConnectionFailed,
                format!("Request failed: {}", e),
            )
        };
        error.with_cause(e)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> GitHubResult<ResponseMeta> {
        let mut builder = self
            .http
            .request(request.method, &request.url)
            .headers(request.headers);

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(Self::map_error)?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(Self::map_error)?;

        Ok(ResponseMeta::new(status, headers, body))
    }
}

/// GitHub API client.
///
/// Owns one [`RateLimitMonitor`]; every request goes through its admission
/// gate and response inspection.
pub struct GitHubClient {
    transport: Arc<dyn HttpTransport>,
    config: GitHubConfig,
    monitor: Arc<RateLimitMonitor>,
    metrics: Arc<Metrics>,
}

impl GitHubClient {
    /// Creates a new GitHub client using the `reqwest` transport.
    pub fn new(config: GitHubConfig) -> GitHubResult<Self> {
        let transport = ReqwestTransport::new(&config)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Creates a client that sends requests through `transport`.
    pub fn with_transport(
        config: GitHubConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> GitHubResult<Self> {
        config.validate()?;
        let monitor = Arc::new(RateLimitMonitor::new(config.rate_limit.clone()));

        Ok(Self {
            transport,
            config,
            monitor,
            metrics: Arc::new(Metrics::new()),
        })
    }

    /// Creates a new client builder.
    pub fn builder() -> GitHubClientBuilder {
        GitHubClientBuilder::new()
    }

    /// Gets the base URL.
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Gets the configuration.
    pub fn config(&self) -> &GitHubConfig {
        &self.config
    }

    /// Gets the rate limit monitor.
    pub fn rate_limit_monitor(&self) -> &RateLimitMonitor {
        &self.monitor
    }

    /// Gets the request metrics.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Resets the primary-limit backoff to its default.
    pub fn reset_rate_limit_backoff(&self) {
        self.monitor.reset_backoff();
    }

    // Service accessors

    /// Gets the issues service.
    pub fn issues(&self) -> IssuesService<'_> {
        IssuesService::new(self)
    }

    /// Gets the labels service.
    pub fn labels(&self) -> LabelsService<'_> {
        LabelsService::new(self)
    }

    // Pagination

    /// Fetches all pages. See [`pagination::get_all_data`].
    pub async fn get_all_data<T, F, Fut>(
        &self,
        fetch: F,
        page: u32,
        per_page: u32,
    ) -> GitHubResult<Vec<T>>
    where
        F: Fn(u32, u32) -> Fut,
        Fut: Future<Output = GitHubResult<(Vec<T>, ResponseMeta)>>,
    {
        pagination::get_all_data(fetch, page, per_page).await
    }

    /// Fetches pages until one satisfies `predicate`. See
    /// [`pagination::get_all_data_until`].
    pub async fn get_all_data_until<T, F, Fut, P>(
        &self,
        fetch: F,
        page: u32,
        per_page: u32,
        predicate: P,
    ) -> GitHubResult<Vec<T>>
    where
        F: Fn(u32, u32) -> Fut,
        Fut: Future<Output = GitHubResult<(Vec<T>, ResponseMeta)>>,
        P: Fn(&[T]) -> bool,
    {
        pagination::get_all_data_until(fetch, page, per_page, predicate).await
    }

    /// Fetches all pages and keeps matching items. See
    /// [`pagination::get_all_filtered_data`].
    pub async fn get_all_filtered_data<T, F, Fut, P>(
        &self,
        fetch: F,
        page: u32,
        per_page: u32,
        filter: P,
    ) -> GitHubResult<Vec<T>>
    where
        F: Fn(u32, u32) -> Fut,
        Fut: Future<Output = GitHubResult<(Vec<T>, ResponseMeta)>>,
        P: FnMut(&T) -> bool,
    {
        pagination::get_all_filtered_data(fetch, page, per_page, filter).await
    }

    /// Fetches one page of a list endpoint as a `(items, response)` pair.
    ///
    /// This is the page fetch function service methods hand to the engine.
    pub async fn fetch_page<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
        page: u32,
        per_page: u32,
    ) -> GitHubResult<(Vec<T>, ResponseMeta)> {
        let mut params = query.to_vec();
        params.extend(PaginationParams::new(page, per_page).to_query());

        let url = self.build_url(path, &params)?;
        let response = self.send(Method::GET, url, None).await?;
        let items = response.json()?;
        self.metrics.record_page();

        Ok((items, response))
    }

    // HTTP methods

    /// Makes a GET request and deserializes the body.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> GitHubResult<T> {
        self.send_get(path).await?.json()
    }

    /// Makes a GET request.
    pub async fn send_get(&self, path: &str) -> GitHubResult<ResponseMeta> {
        let url = self.build_url(path, &[])?;
        self.send(Method::GET, url, None).await
    }

    /// Makes a POST request.
    pub async fn send_post<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> GitHubResult<ResponseMeta> {
        self.send_with_body(Method::POST, path, body).await
    }

    /// Makes a PATCH request.
    pub async fn send_patch<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> GitHubResult<ResponseMeta> {
        self.send_with_body(Method::PATCH, path, body).await
    }

    /// Makes a PUT request.
    pub async fn send_put<B: Serialize>(&self, path: &str, body: &B) -> GitHubResult<ResponseMeta> {
        self.send_with_body(Method::PUT, path, body).await
    }

    /// Makes a DELETE request.
    pub async fn send_delete(&self, path: &str) -> GitHubResult<ResponseMeta> {
        let url = self.build_url(path, &[])?;
        self.send(Method::DELETE, url, None).await
    }

    // Internal methods

    async fn send_with_body<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> GitHubResult<ResponseMeta> {
        let bytes = serde_json::to_vec(body).map_err(|e| {
            GitHubError::new(
                GitHubErrorKind::ValidationError,
                format!("Failed to serialize request body: {}", e),
            )
        })?;
        let url = self.build_url(path, &[])?;
        self.send(method, url, Some(Bytes::from(bytes))).await
    }

    /// Sends a request, waiting out and re-sending on rate-limit signals.
    async fn send(
        &self,
        method: Method,
        url: String,
        body: Option<Bytes>,
    ) -> GitHubResult<ResponseMeta> {
        let request = self.build_request(method, url, body)?;
        let mut retries = 0u32;

        loop {
            let response = {
                let _slot = self.monitor.admit().await;
                TracingHooks::on_request_start(request.method.as_str(), &request.url);
                self.metrics.record_request();
                let started = Instant::now();

                let response = self.transport.send(request.clone()).await.map_err(|e| {
                    self.metrics.record_failure();
                    e
                })?;

                TracingHooks::on_request_complete(
                    request.method.as_str(),
                    &request.url,
                    response.status(),
                    started.elapsed(),
                );
                response
            };

            let outcome = self.monitor.inspect(&response).await?;
            match outcome {
                RateLimitOutcome::SecondaryWait(_) => self.metrics.record_secondary_wait(),
                RateLimitOutcome::PrimaryWait(_) => self.metrics.record_primary_wait(),
                RateLimitOutcome::Clear => {}
            }

            let throttled = matches!(response.status(), 403 | 429);
            if outcome.waited() && throttled && self.may_retry(retries) {
                retries += 1;
                self.metrics.record_rate_limit_retry();
                tracing::debug!(
                    url = %request.url,
                    attempt = retries,
                    waited_ms = outcome.wait().unwrap_or_default().as_millis() as u64,
                    "Re-sending request after rate limit wait"
                );
                continue;
            }

            if !response.is_success() {
                self.metrics.record_failure();
                return Err(Self::error_from_response(&response));
            }

            return Ok(response);
        }
    }

    fn may_retry(&self, retries: u32) -> bool {
        self.config
            .rate_limit
            .max_rate_limit_retries
            .map_or(true, |max| retries < max)
    }

    fn build_request(
        &self,
        method: Method,
        url: String,
        body: Option<Bytes>,
    ) -> GitHubResult<HttpRequest> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(USER_AGENT, header_value(&self.config.user_agent)?);
        headers.insert("X-GitHub-Api-Version", header_value(&self.config.api_version)?);

        if let Some(ref token) = self.config.token {
            let mut value = header_value(&format!("Bearer {}", token.expose_secret()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        if body.is_some() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        Ok(HttpRequest {
            method,
            url,
            headers,
            body,
        })
    }

    fn build_url(&self, path: &str, query: &[(String, String)]) -> GitHubResult<String> {
        let base = self.config.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        let mut url = url::Url::parse(&format!("{}/{}", base, path)).map_err(|e| {
            GitHubError::new(GitHubErrorKind::InvalidBaseUrl, format!("Invalid URL: {}", e))
        })?;

        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        Ok(url.into())
    }

    fn error_from_response(response: &ResponseMeta) -> GitHubError {
        let status = response.status();
        let request_id = response.header("x-github-request-id").map(String::from);
        let rate_limit = RateLimitInfo::from_headers(response.headers()).ok();

        if RateLimitMonitor::primary_exhausted(response) {
            let error = GitHubError::rate_limit_exceeded(status, rate_limit);
            return match request_id {
                Some(id) => error.with_request_id(id),
                None => error,
            };
        }

        let error_body = response.json::<GitHubErrorResponse>().ok();

        let message = error_body
            .as_ref()
            .map(|e| e.message.clone())
            .unwrap_or_else(|| format!("HTTP {} error", status));

        let documentation_url = error_body.and_then(|e| e.documentation_url);

        let error = GitHubError::from_response(status, message, documentation_url, request_id);

        match rate_limit {
            Some(info) => error.with_rate_limit(info),
            None => error,
        }
    }
}

/// Percent-encodes `segment` so it stays a single URL path segment.
///
/// Needed for user-supplied names such as labels, which may contain `/`, `?`
/// or `#`.
pub fn path_segment(segment: &str) -> GitHubResult<String> {
    let mut url = url::Url::parse(DEFAULT_BASE_URL).map_err(|e| {
        GitHubError::new(GitHubErrorKind::InvalidBaseUrl, format!("Invalid URL: {}", e))
    })?;
    url.path_segments_mut()
        .map_err(|_| GitHubError::configuration("URL cannot carry path segments"))?
        .clear()
        .push(segment);

    Ok(url.path().trim_start_matches('/').to_string())
}

fn header_value(value: &str) -> GitHubResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| GitHubError::configuration(format!("Invalid header value: {}", e)))
}

/// Builder for GitHubClient.
pub struct GitHubClientBuilder {
    config_builder: GitHubConfigBuilder,
    transport: Option<Arc<dyn HttpTransport>>,
}

impl GitHubClientBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            config_builder: GitHubConfig::builder(),
            transport: None,
        }
    }

    /// Sets the base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.base_url(url);
        self
    }

    /// Sets the bearer token.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.token(token);
        self
    }

    /// Sets the timeout.
    pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config_builder = self.config_builder.timeout(timeout);
        self
    }

    /// Sets the User-Agent.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.user_agent(ua);
        self
    }

    /// Sets the rate limit configuration.
    pub fn rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.config_builder = self.config_builder.rate_limit(config);
        self
    }

    /// Uses a custom transport instead of `reqwest`.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Builds the client.
    pub fn build(self) -> GitHubResult<GitHubClient> {
        let config = self.config_builder.build()?;
        match self.transport {
            Some(transport) => GitHubClient::with_transport(config, transport),
            None => GitHubClient::new(config),
        }
    }
}

impl Default for GitHubClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
