//! Error types for the GitHub request engine.

use crate::resilience::RateLimitInfo;
use std::fmt;
use thiserror::Error;

/// Result type alias for GitHub operations.
pub type GitHubResult<T> = Result<T, GitHubError>;

/// Error kinds for categorizing GitHub errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GitHubErrorKind {
    // Configuration errors
    /// Invalid base URL.
    InvalidBaseUrl,
    /// Invalid configuration.
    InvalidConfiguration,

    // Authentication and authorization errors
    /// Bad credentials (401).
    BadCredentials,
    /// Access forbidden (403).
    Forbidden,

    // Request errors
    /// Request validation failed (400).
    ValidationError,
    /// Unprocessable entity (422).
    UnprocessableEntity,

    // Resource errors
    /// Resource not found (404).
    NotFound,
    /// Resource is gone (410).
    Gone,
    /// Resource conflict (409).
    Conflict,

    // Rate limit errors
    /// Primary rate limit exceeded.
    PrimaryRateLimitExceeded,
    /// Secondary rate limit exceeded.
    SecondaryRateLimitExceeded,
    /// Rate limit headers were needed but missing from the response.
    RateLimitHeaderMissing,

    // Transport errors
    /// Connection failed.
    ConnectionFailed,
    /// Request timeout.
    Timeout,
    /// Internal server error (500).
    InternalError,
    /// Bad gateway (502).
    BadGateway,
    /// Service unavailable (503).
    ServiceUnavailable,

    // Pagination
    /// A page fetch failed for a reason the engine does not classify.
    Pagination,

    // Response errors
    /// Failed to deserialize response.
    DeserializationError,

    // Generic
    /// Unknown error.
    Unknown,
}

/// Broad classification used when deciding whether an error is passed
/// through the pagination engine or wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad client configuration.
    Configuration,
    /// Network or server-side HTTP failure.
    Transport,
    /// Rate limit headers were required but absent.
    RateLimitHeader,
    /// Error reported by GitHub about the requested resource.
    Domain,
    /// Pagination engine wrapper.
    Pagination,
    /// Anything the engine does not recognize.
    Unrecognized,
}

impl GitHubErrorKind {
    /// Returns the category this kind belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidBaseUrl | Self::InvalidConfiguration => ErrorCategory::Configuration,
            Self::ConnectionFailed
            | Self::Timeout
            | Self::InternalError
            | Self::BadGateway
            | Self::ServiceUnavailable => ErrorCategory::Transport,
            Self::RateLimitHeaderMissing => ErrorCategory::RateLimitHeader,
            Self::BadCredentials
            | Self::Forbidden
            | Self::ValidationError
            | Self::UnprocessableEntity
            | Self::NotFound
            | Self::Gone
            | Self::Conflict
            | Self::PrimaryRateLimitExceeded
            | Self::SecondaryRateLimitExceeded => ErrorCategory::Domain,
            Self::Pagination => ErrorCategory::Pagination,
            Self::DeserializationError | Self::Unknown => ErrorCategory::Unrecognized,
        }
    }
}

impl fmt::Display for GitHubErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InvalidBaseUrl => "invalid_base_url",
            Self::InvalidConfiguration => "invalid_configuration",
            Self::BadCredentials => "bad_credentials",
            Self::Forbidden => "forbidden",
            Self::ValidationError => "validation_error",
            Self::UnprocessableEntity => "unprocessable_entity",
            Self::NotFound => "not_found",
            Self::Gone => "gone",
            Self::Conflict => "conflict",
            Self::PrimaryRateLimitExceeded => "primary_rate_limit_exceeded",
            Self::SecondaryRateLimitExceeded => "secondary_rate_limit_exceeded",
            Self::RateLimitHeaderMissing => "rate_limit_header_missing",
            Self::ConnectionFailed => "connection_failed",
            Self::Timeout => "timeout",
            Self::InternalError => "internal_error",
            Self::BadGateway => "bad_gateway",
            Self::ServiceUnavailable => "service_unavailable",
            Self::Pagination => "pagination",
            Self::DeserializationError => "deserialization_error",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// GitHub API error with detailed information.
#[derive(Error, Debug)]
pub struct GitHubError {
    kind: GitHubErrorKind,
    message: String,
    status_code: Option<u16>,
    request_id: Option<String>,
    documentation_url: Option<String>,
    rate_limit: Option<RateLimitInfo>,
    #[source]
    cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for GitHubError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)?;
        if let Some(code) = self.status_code {
            write!(f, " (HTTP {})", code)?;
        }
        if let Some(ref id) = self.request_id {
            write!(f, " [request_id: {}]", id)?;
        }
        Ok(())
    }
}

impl GitHubError {
    /// Creates a new GitHub error.
    pub fn new(kind: GitHubErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code: None,
            request_id: None,
            documentation_url: None,
            rate_limit: None,
            cause: None,
        }
    }

    /// Sets the HTTP status code.
    pub fn with_status(mut self, code: u16) -> Self {
        self.status_code = Some(code);
        self
    }

    /// Sets the GitHub request ID.
    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    /// Sets the documentation URL.
    pub fn with_documentation_url(mut self, url: impl Into<String>) -> Self {
        self.documentation_url = Some(url.into());
        self
    }

    /// Sets the rate limit info.
    pub fn with_rate_limit(mut self, info: RateLimitInfo) -> Self {
        self.rate_limit = Some(info);
        self
    }

    /// Sets the underlying cause.
    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Gets the error kind.
    pub fn kind(&self) -> GitHubErrorKind {
        self.kind
    }

    /// Gets the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Gets the HTTP status code.
    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    /// Gets the request ID.
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Gets the documentation URL.
    pub fn documentation_url(&self) -> Option<&str> {
        self.documentation_url.as_deref()
    }

    /// Gets the rate limit info.
    pub fn rate_limit(&self) -> Option<&RateLimitInfo> {
        self.rate_limit.as_ref()
    }

    /// Gets the category of this error.
    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    /// Returns true if the error carries a classification the pagination
    /// engine must not re-wrap.
    pub fn is_known(&self) -> bool {
        self.category() != ErrorCategory::Unrecognized
    }

    /// Creates an error from an HTTP status code and GitHub error response.
    pub fn from_response(
        status: u16,
        message: String,
        documentation_url: Option<String>,
        request_id: Option<String>,
    ) -> Self {
        let kind = Self::kind_from_status(status);
        let mut error = Self::new(kind, message).with_status(status);

        if let Some(url) = documentation_url {
            error = error.with_documentation_url(url);
        }
        if let Some(id) = request_id {
            error = error.with_request_id(id);
        }

        error
    }

    fn kind_from_status(status: u16) -> GitHubErrorKind {
        match status {
            400 => GitHubErrorKind::ValidationError,
            401 => GitHubErrorKind::BadCredentials,
            403 => GitHubErrorKind::Forbidden,
            404 => GitHubErrorKind::NotFound,
            409 => GitHubErrorKind::Conflict,
            410 => GitHubErrorKind::Gone,
            422 => GitHubErrorKind::UnprocessableEntity,
            429 => GitHubErrorKind::SecondaryRateLimitExceeded,
            500 => GitHubErrorKind::InternalError,
            502 => GitHubErrorKind::BadGateway,
            503 => GitHubErrorKind::ServiceUnavailable,
            _ => GitHubErrorKind::Unknown,
        }
    }

    // Convenience constructors

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(GitHubErrorKind::InvalidConfiguration, message)
    }

    /// Creates a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(GitHubErrorKind::NotFound, message).with_status(404)
    }

    /// Creates a primary rate limit error.
    pub fn rate_limit_exceeded(status: u16, info: Option<RateLimitInfo>) -> Self {
        let error = Self::new(
            GitHubErrorKind::PrimaryRateLimitExceeded,
            "API rate limit exceeded",
        )
        .with_status(status);
        match info {
            Some(info) => error.with_rate_limit(info),
            None => error,
        }
    }

    /// Creates an error for a missing rate limit header.
    pub fn missing_rate_limit_header(header: &str) -> Self {
        Self::new(
            GitHubErrorKind::RateLimitHeaderMissing,
            format!("Rate limit header '{}' is missing or invalid", header),
        )
    }

    /// Wraps an unrecognized failure raised while fetching a page.
    pub fn pagination(context: impl Into<String>, cause: GitHubError) -> Self {
        let message = format!("{}: {}", context.into(), cause);
        Self::new(GitHubErrorKind::Pagination, message).with_cause(cause)
    }

    /// Creates a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(GitHubErrorKind::Timeout, message)
    }

    /// Creates a deserialization error.
    pub fn deserialization(message: impl Into<String>) -> Self {
        Self::new(GitHubErrorKind::DeserializationError, message)
    }
}

/// Checks if an error is a rate limit error.
pub fn is_rate_limit_error(error: &GitHubError) -> bool {
    matches!(
        error.kind(),
        GitHubErrorKind::PrimaryRateLimitExceeded | GitHubErrorKind::SecondaryRateLimitExceeded
    )
}
