//! Issue orchestration: normalization, one remote call, reconciliation.
//!
//! Each operation is a thin sequence of core functions around a single
//! [`JiraClient`] call. Bulk creation is the only one with real bookkeeping:
//! local validation failures and remote outcomes are kept in two separate
//! maps keyed by position and merged back in input order.

use std::collections::HashMap;

use log::{info, warn};
use serde_json::Value;

use mcp_jira_core::jira::bulk::tally;
use mcp_jira_core::jira::payloads::ProjectRequest;
use mcp_jira_core::jira::{
    normalize, transform_comment, transform_issue, transform_issue_types, transform_project,
    transform_search_response, transform_transitions, CommentOutput, CreatedIssue, IssueOutcome,
    IssueOutput, IssueTypeOutput, IssueUpdate, ItemFailure, ItemOutcome, JiraIssueResponse,
    JiraSearchResponse, ProjectOutput, SearchOutput, TransitionOutput,
};

use super::client::JiraClient;
use crate::error::{Error, JiraResult};

/// Shared by every concurrent tool call; holds no mutable state.
#[derive(Debug, Clone)]
pub struct IssueService {
    client: JiraClient,
}

fn into_fields(raw: Value) -> JiraResult<mcp_jira_core::jira::NormalizedIssueFields> {
    match raw {
        Value::Object(map) => Ok(normalize(map)?),
        _ => Err(Error::validation("Each issue must be a JSON object of fields")),
    }
}

impl IssueService {
    pub fn new(client: JiraClient) -> Self {
        Self { client }
    }

    /// Create many issues in one bulk request.
    ///
    /// Items that fail normalization are reported as failed without being
    /// sent. The rest go out together, and the outcome list always matches
    /// the input in length and order.
    pub async fn create_issues(&self, raw_items: Vec<Value>) -> JiraResult<Vec<IssueOutcome>> {
        if raw_items.is_empty() {
            return Err(Error::validation("field_list must contain at least one issue"));
        }

        let total = raw_items.len();
        let mut rejected: HashMap<usize, ItemFailure> = HashMap::new();
        let mut submitted_positions: Vec<usize> = Vec::new();
        let mut batch: Vec<IssueUpdate> = Vec::new();

        for (index, raw) in raw_items.into_iter().enumerate() {
            match into_fields(raw) {
                Ok(fields) => {
                    submitted_positions.push(index);
                    batch.push(fields.into());
                }
                Err(Error::Core(err)) => {
                    warn!("Issue {index} failed validation: {}", err.detail());
                    rejected.insert(index, ItemFailure::validation(err.detail()));
                }
                Err(other) => return Err(other),
            }
        }

        let remote: Vec<ItemOutcome> = if batch.is_empty() {
            info!("No valid issues to submit out of {total}");
            Vec::new()
        } else {
            self.client.bulk_create(&batch).await?
        };

        let mut by_position: HashMap<usize, ItemOutcome> =
            submitted_positions.into_iter().zip(remote).collect();

        let outcomes: Vec<ItemOutcome> = (0..total)
            .map(|index| {
                if let Some(failure) = rejected.remove(&index) {
                    return ItemOutcome::Failed(failure);
                }
                by_position.remove(&index).unwrap_or_else(|| {
                    ItemOutcome::Failed(ItemFailure::remote("no result returned"))
                })
            })
            .collect();

        let (created, failed) = tally(&outcomes);
        info!("Bulk create finished: {created} created, {failed} failed");
        for (index, outcome) in outcomes.iter().enumerate() {
            if let ItemOutcome::Failed(failure) = outcome {
                warn!("Issue {index} not created: {}", failure.message);
            }
        }

        Ok(outcomes.into_iter().map(IssueOutcome::from).collect())
    }

    /// Create a single issue from a raw field map.
    pub async fn create_issue(&self, raw: Value) -> JiraResult<CreatedIssue> {
        let fields = into_fields(raw)?;
        let created = self.client.create_issue(&fields.into()).await?;
        info!("Created issue {}", created.key);
        Ok(created)
    }

    pub async fn get_issue(&self, issue_key: &str) -> JiraResult<IssueOutput> {
        let issue = self.client.get_issue(issue_key).await?;
        Ok(transform_issue(issue))
    }

    /// Run a JQL search, following `nextPageToken` until `limit` issues are
    /// collected or the last page is reached.
    pub async fn search_issues(&self, jql: &str, limit: usize) -> JiraResult<SearchOutput> {
        if jql.trim().is_empty() {
            return Err(Error::validation("jql must not be empty"));
        }
        let limit = limit.max(1);

        let mut issues: Vec<JiraIssueResponse> = Vec::new();
        let mut token: Option<String> = None;
        let mut reported_total: Option<u64> = None;

        loop {
            let page = self
                .client
                .search_issues(jql, limit - issues.len(), token.as_deref())
                .await?;

            reported_total = page.total.or(reported_total);
            let is_last = page.is_last.unwrap_or(false);
            token = page.next_page_token;
            let fetched = page.issues.len();

            issues.extend(page.issues);

            if issues.len() >= limit || is_last || token.is_none() || fetched == 0 {
                break;
            }
        }

        issues.truncate(limit);

        Ok(transform_search_response(JiraSearchResponse {
            issues,
            total: reported_total,
            is_last: None,
            next_page_token: token,
        }))
    }

    pub async fn add_comment(&self, issue_key: &str, text: &str) -> JiraResult<CommentOutput> {
        if text.trim().is_empty() {
            return Err(Error::validation("comment must not be empty"));
        }
        let comment = self.client.add_comment(issue_key, text).await?;
        Ok(transform_comment(comment))
    }

    pub async fn get_transitions(&self, issue_key: &str) -> JiraResult<Vec<TransitionOutput>> {
        let response = self.client.get_transitions(issue_key).await?;
        Ok(transform_transitions(response))
    }

    pub async fn transition_issue(
        &self,
        issue_key: &str,
        transition_id: &str,
        comment: Option<&str>,
        fields: Option<serde_json::Map<String, Value>>,
    ) -> JiraResult<()> {
        self.client
            .transition_issue(issue_key, transition_id, comment, fields)
            .await?;
        info!("Transitioned {issue_key} with transition {transition_id}");
        Ok(())
    }

    pub async fn get_projects(&self) -> JiraResult<Vec<ProjectOutput>> {
        let projects = self.client.get_projects().await?;
        Ok(projects.into_iter().map(transform_project).collect())
    }

    pub async fn get_project_issue_types(
        &self,
        project_key: &str,
    ) -> JiraResult<Vec<IssueTypeOutput>> {
        let page = self.client.get_project_issue_types(project_key).await?;
        Ok(transform_issue_types(page))
    }

    /// Create a project. The create response has no name, so the requested one is reported.
    pub async fn create_project(&self, request: &ProjectRequest) -> JiraResult<ProjectOutput> {
        let created = self.client.create_project(request).await?;
        let mut output = transform_project(created);
        if let Some(name) = request.name.as_deref().filter(|n| !n.trim().is_empty()) {
            output.name = name.to_string();
        }
        info!("Created project {}", output.key);
        Ok(output)
    }
}
