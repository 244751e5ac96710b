//! Label operations.

use crate::client::{path_segment, GitHubClient};
use crate::errors::GitHubResult;
use crate::types::Label;
use serde::Serialize;

/// Request body for adding or replacing an issue's labels.
#[derive(Debug, Clone, Serialize)]
struct AddLabelsRequest<'a> {
    labels: &'a [&'a str],
}

/// Service for label operations.
pub struct LabelsService<'a> {
    client: &'a GitHubClient,
}

impl<'a> LabelsService<'a> {
    /// Creates a new labels service.
    pub fn new(client: &'a GitHubClient) -> Self {
        Self { client }
    }

    /// Lists every label in a repository.
    pub async fn list_all(&self, owner: &str, repo: &str) -> GitHubResult<Vec<Label>> {
        self.client.reset_rate_limit_backoff();
        let path = format!("/repos/{}/{}/labels", owner, repo);

        self.client
            .get_all_data(
                |page, per_page| self.client.fetch_page(&path, &[], page, per_page),
                1,
                self.client.config().pagination.default_per_page,
            )
            .await
    }

    /// Finds a label by name.
    pub async fn find(&self, owner: &str, repo: &str, name: &str) -> GitHubResult<Option<Label>> {
        self.client.reset_rate_limit_backoff();
        let path = format!("/repos/{}/{}/labels", owner, repo);

        let page = self
            .client
            .get_all_data_until(
                |page, per_page| self.client.fetch_page::<Label>(&path, &[], page, per_page),
                1,
                self.client.config().pagination.default_per_page,
                |labels| labels.iter().any(|label| label.name == name),
            )
            .await?;

        Ok(page.into_iter().find(|label| label.name == name))
    }

    /// Adds labels to an issue and returns the issue's full label set.
    pub async fn add_to_issue(
        &self,
        owner: &str,
        repo: &str,
        issue_number: u32,
        labels: &[&str],
    ) -> GitHubResult<Vec<Label>> {
        self.client
            .send_post(
                &format!("/repos/{}/{}/issues/{}/labels", owner, repo, issue_number),
                &AddLabelsRequest { labels },
            )
            .await?
            .json()
    }

    /// Replaces every label on an issue and returns the new label set.
    pub async fn replace_on_issue(
        &self,
        owner: &str,
        repo: &str,
        issue_number: u32,
        labels: &[&str],
    ) -> GitHubResult<Vec<Label>> {
        self.client
            .send_put(
                &format!("/repos/{}/{}/issues/{}/labels", owner, repo, issue_number),
                &AddLabelsRequest { labels },
            )
            .await?
            .json()
    }

    /// Removes a label from an issue.
    pub async fn remove_from_issue(
        &self,
        owner: &str,
        repo: &str,
        issue_number: u32,
        name: &str,
    ) -> GitHubResult<()> {
        let path = format!(
            "/repos/{}/{}/issues/{}/labels/{}",
            owner,
            repo,
            issue_number,
            path_segment(name)?
        );
        self.client.send_delete(&path).await?;
        Ok(())
    }
}
