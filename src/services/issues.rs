//! Issue operations.

use crate::client::GitHubClient;
use crate::errors::GitHubResult;
use crate::types::{Issue, IssueState, IssueStateFilter};
use serde::Serialize;

/// Request body for changing an issue's state.
#[derive(Debug, Clone, Serialize)]
struct UpdateStateRequest {
    state: IssueState,
}

/// Service for issue operations.
pub struct IssuesService<'a> {
    client: &'a GitHubClient,
}

impl<'a> IssuesService<'a> {
    /// Creates a new issues service.
    pub fn new(client: &'a GitHubClient) -> Self {
        Self { client }
    }

    /// Lists every issue in a repository with the given state.
    pub async fn list_all(
        &self,
        owner: &str,
        repo: &str,
        state: IssueStateFilter,
    ) -> GitHubResult<Vec<Issue>> {
        self.client.reset_rate_limit_backoff();
        let path = format!("/repos/{}/{}/issues", owner, repo);
        let query = vec![("state".to_string(), state.as_str().to_string())];

        self.client
            .get_all_data(
                |page, per_page| self.client.fetch_page(&path, &query, page, per_page),
                1,
                self.per_page(),
            )
            .await
    }

    /// Finds an issue by exact title, searching open and closed issues.
    ///
    /// Stops paging at the first page containing a match.
    pub async fn find_by_title(
        &self,
        owner: &str,
        repo: &str,
        title: &str,
    ) -> GitHubResult<Option<Issue>> {
        self.client.reset_rate_limit_backoff();
        let path = format!("/repos/{}/{}/issues", owner, repo);
        let query = vec![("state".to_string(), IssueStateFilter::All.as_str().to_string())];

        let page = self
            .client
            .get_all_data_until(
                |page, per_page| self.client.fetch_page::<Issue>(&path, &query, page, per_page),
                1,
                self.per_page(),
                |issues| issues.iter().any(|issue| issue.title == title),
            )
            .await?;

        Ok(page.into_iter().find(|issue| issue.title == title))
    }

    /// Lists open issues carrying the named label.
    pub async fn list_with_label(
        &self,
        owner: &str,
        repo: &str,
        label: &str,
    ) -> GitHubResult<Vec<Issue>> {
        self.client.reset_rate_limit_backoff();
        let path = format!("/repos/{}/{}/issues", owner, repo);
        let query = vec![("state".to_string(), IssueStateFilter::Open.as_str().to_string())];

        self.client
            .get_all_filtered_data(
                |page, per_page| self.client.fetch_page(&path, &query, page, per_page),
                1,
                self.per_page(),
                |issue: &Issue| issue.labels.iter().any(|l| l.name == label),
            )
            .await
    }

    /// Gets an issue.
    pub async fn get(&self, owner: &str, repo: &str, issue_number: u32) -> GitHubResult<Issue> {
        self.client
            .get(&format!("/repos/{}/{}/issues/{}", owner, repo, issue_number))
            .await
    }

    /// Opens or closes an issue.
    pub async fn update_state(
        &self,
        owner: &str,
        repo: &str,
        issue_number: u32,
        state: IssueState,
    ) -> GitHubResult<Issue> {
        self.client
            .send_patch(
                &format!("/repos/{}/{}/issues/{}", owner, repo, issue_number),
                &UpdateStateRequest { state },
            )
            .await?
            .json()
    }

    fn per_page(&self) -> u32 {
        self.client.config().pagination.default_per_page
    }
}
