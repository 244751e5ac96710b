//! # GitHub Paging Library
//!
//! The request engine shared by GitHub REST clients:
//! - Link header parsing into page numbers
//! - Fetch-all, fetch-until-predicate and fetch-then-filter pagination
//! - Transparent waits on primary and secondary rate limits
//! - An in-flight request cap per client
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use integrations_github_paging::{GitHubClient, IssueStateFilter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = GitHubClient::builder().token("ghp_xxxxxxxxxxxx").build()?;
//!
//!     // Every page, fetched concurrently after the first
//!     let issues = client
//!         .issues()
//!         .list_all("octocat", "Hello-World", IssueStateFilter::All)
//!         .await?;
//!     println!("{} issues", issues.len());
//!
//!     // Custom endpoint through the engine directly
//!     let path = "/repos/octocat/Hello-World/releases";
//!     let releases: Vec<serde_json::Value> = client
//!         .get_all_data_until(
//!             |page, per_page| client.fetch_page(path, &[], page, per_page),
//!             1,
//!             100,
//!             |page: &[serde_json::Value]| page.iter().any(|r| r["tag_name"] == "v1.0.0"),
//!         )
//!         .await?;
//!     println!("matched page has {} releases", releases.len());
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod config;
pub mod errors;
pub mod types;

// HTTP client and transport
pub mod client;

// Pagination engine
pub mod pagination;

// Rate limit monitor
pub mod resilience;

// API Services
pub mod services;

// Observability
pub mod observability;

// Mocks for testing
pub mod mocks;

// Re-exports for convenience
pub use client::{GitHubClient, GitHubClientBuilder, HttpRequest, HttpTransport, ResponseMeta};
pub use config::{GitHubConfig, GitHubConfigBuilder, RateLimitConfig};
pub use errors::{ErrorCategory, GitHubError, GitHubErrorKind, GitHubResult};
pub use pagination::{
    get_all_data, get_all_data_until, get_all_filtered_data, LinkHeaderInfo, LinkSection,
    PaginationParams,
};
pub use resilience::{RateLimitInfo, RateLimitMonitor, RateLimitOutcome};
pub use types::*;
