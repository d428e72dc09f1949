//! Jira v3 domain: request shaping and response normalization.
//!
//! Everything in this module is pure. The HTTP client in the shell crate
//! deserializes raw responses into the `Jira*Response` types below and calls
//! the `transform_*` functions to get the stable tool output.

pub mod adf;
pub mod auth;
pub mod bulk;
pub mod fields;
pub mod payloads;

use serde::{Deserialize, Serialize};

pub use adf::{extract_description, render_adf, to_rich_text, RichTextDocument};
pub use auth::{select as select_auth, AuthConfig, AuthStrategy};
pub use bulk::{
    reconcile_bulk_response, BulkCreateResponse, CreatedIssue, IssueOutcome, ItemFailure,
    ItemOutcome, MAX_BULK_ISSUES,
};
pub use fields::{normalize, IssueUpdate, NormalizedIssueFields, RawIssueFields};

/// Jira user reference (assignee, reporter, author, lead)
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct JiraUser {
    #[serde(rename = "displayName", default)]
    pub display_name: Option<String>,
    #[serde(rename = "emailAddress", default)]
    pub email_address: Option<String>,
    #[serde(rename = "accountId", default)]
    pub account_id: Option<String>,
}

impl JiraUser {
    /// Prefer displayName, then emailAddress, then accountId.
    pub fn label(self) -> Option<String> {
        self.display_name.or(self.email_address).or(self.account_id)
    }
}

/// Anything with a `name`: status, priority, issue type, component
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct JiraNamed {
    #[serde(default)]
    pub name: String,
}

/// Fields read back from a Jira issue
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct JiraIssueFields {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: Option<serde_json::Value>, // String or ADF
    #[serde(default)]
    pub status: Option<JiraNamed>,
    #[serde(default)]
    pub assignee: Option<JiraUser>,
    #[serde(default)]
    pub reporter: Option<JiraUser>,
    #[serde(default)]
    pub priority: Option<JiraNamed>,
    #[serde(default)]
    pub issuetype: Option<JiraNamed>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub components: Vec<JiraNamed>,
    #[serde(default)]
    pub comment: Option<JiraCommentPage>,
}

/// Jira issue response from API
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct JiraIssueResponse {
    #[serde(default)]
    pub id: Option<String>,
    pub key: String,
    #[serde(default)]
    pub fields: JiraIssueFields,
}

/// Embedded `comment` field of an issue
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct JiraCommentPage {
    #[serde(default)]
    pub comments: Vec<JiraComment>,
}

/// Comment on a Jira issue
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct JiraComment {
    pub id: String,
    #[serde(default)]
    pub body: serde_json::Value,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub author: Option<JiraUser>,
}

/// Search response from Jira API
/// The GET /rest/api/3/search/jql endpoint returns this structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct JiraSearchResponse {
    #[serde(default)]
    pub issues: Vec<JiraIssueResponse>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    #[serde(rename = "isLast")]
    pub is_last: Option<bool>,
    #[serde(default)]
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

/// GET /issue/{key}/transitions
#[derive(Debug, Deserialize, Clone, Default)]
pub struct JiraTransitionsResponse {
    #[serde(default)]
    pub transitions: Vec<JiraTransition>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JiraTransition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub to: Option<JiraNamed>,
}

/// A project as returned by /project/search and POST /project
#[derive(Debug, Deserialize, Clone)]
pub struct JiraProject {
    #[serde(default)]
    pub id: serde_json::Value,
    pub key: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub lead: Option<JiraUser>,
}

/// One page of GET /project/search
#[derive(Debug, Deserialize, Clone, Default)]
pub struct JiraProjectPage {
    #[serde(default)]
    pub values: Vec<JiraProject>,
    #[serde(rename = "isLast", default)]
    pub is_last: Option<bool>,
    #[serde(rename = "startAt", default)]
    pub start_at: Option<u64>,
    #[serde(rename = "maxResults", default)]
    pub max_results: Option<u64>,
    #[serde(default)]
    pub total: Option<u64>,
}

/// Issue type reference from createmeta
#[derive(Debug, Deserialize, Clone)]
pub struct JiraIssueTypeResponse {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub subtask: Option<bool>,
}

/// GET /issue/createmeta/{project}/issuetypes. Older servers call the list `values`.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct JiraIssueTypePage {
    #[serde(default, alias = "values", rename = "issueTypes")]
    pub issue_types: Vec<JiraIssueTypeResponse>,
}

/// Output structure for a single issue
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct IssueOutput {
    pub key: String,
    pub summary: String,
    pub description: Option<String>,
    pub status: Option<String>,
    pub assignee: Option<String>,
    pub reporter: Option<String>,
    pub created: Option<String>,
    pub updated: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<CommentOutput>,
}

/// Output structure for search command
#[derive(Debug, Serialize, PartialEq)]
pub struct SearchOutput {
    pub issues: Vec<IssueOutput>,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CommentOutput {
    pub id: String,
    pub author: String,
    pub body: String,
    pub created: Option<String>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct TransitionOutput {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_status: Option<String>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ProjectOutput {
    pub key: String,
    pub name: String,
    pub id: String,
    pub lead: Option<String>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct IssueTypeOutput {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtask: Option<bool>,
}

fn render_body(body: &serde_json::Value) -> String {
    match body {
        serde_json::Value::String(s) => s.clone(),
        other => render_adf(other).unwrap_or_default(),
    }
}

/// Convert a Jira comment to tool output
pub fn transform_comment(comment: JiraComment) -> CommentOutput {
    CommentOutput {
        body: render_body(&comment.body),
        author: comment
            .author
            .and_then(JiraUser::label)
            .unwrap_or_else(|| "Unknown".to_string()),
        id: comment.id,
        created: comment.created,
    }
}

/// Convert a Jira issue response to tool output
///
/// Descriptions and comment bodies are rendered from ADF to plain text.
pub fn transform_issue(issue: JiraIssueResponse) -> IssueOutput {
    let fields = issue.fields;

    IssueOutput {
        key: issue.key,
        summary: fields.summary,
        description: extract_description(fields.description),
        status: fields.status.map(|s| s.name),
        assignee: fields.assignee.and_then(JiraUser::label),
        reporter: fields.reporter.and_then(JiraUser::label),
        created: fields.created,
        updated: fields.updated,
        issue_type: fields.issuetype.map(|t| t.name),
        priority: fields.priority.map(|p| p.name),
        labels: fields.labels,
        components: fields.components.into_iter().map(|c| c.name).collect(),
        comments: fields
            .comment
            .map(|page| page.comments.into_iter().map(transform_comment).collect())
            .unwrap_or_default(),
    }
}

/// Convert Jira API response to domain model
///
/// `total` falls back to the number of issues on the page when the endpoint
/// omits it, which `/search/jql` does.
pub fn transform_search_response(search_response: JiraSearchResponse) -> SearchOutput {
    let issues: Vec<IssueOutput> = search_response
        .issues
        .into_iter()
        .map(transform_issue)
        .collect();

    let total = search_response
        .total
        .map(|t| t as usize)
        .unwrap_or(issues.len());

    SearchOutput {
        issues,
        total,
        next_page_token: search_response.next_page_token,
    }
}

pub fn transform_transitions(response: JiraTransitionsResponse) -> Vec<TransitionOutput> {
    response
        .transitions
        .into_iter()
        .map(|t| TransitionOutput {
            id: t.id,
            name: t.name,
            to_status: t.to.map(|s| s.name),
        })
        .collect()
}

/// Project ids come back as strings from some endpoints and numbers from others.
fn id_to_string(id: &serde_json::Value) -> String {
    match id {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

pub fn transform_project(project: JiraProject) -> ProjectOutput {
    ProjectOutput {
        id: id_to_string(&project.id),
        name: project.name.unwrap_or_else(|| project.key.clone()),
        key: project.key,
        lead: project.lead.and_then(JiraUser::label),
    }
}

pub fn transform_issue_types(page: JiraIssueTypePage) -> Vec<IssueTypeOutput> {
    page.issue_types
        .into_iter()
        .map(|t| IssueTypeOutput {
            id: t.id,
            name: t.name,
            description: t.description.filter(|d| !d.is_empty()),
            subtask: t.subtask,
        })
        .collect()
}

/// Extract a readable message from a Jira error body.
///
/// Looks at `errorMessages`, then the per-field `errors` map, then a plain
/// `message`. Returns `None` when the body is not JSON or carries none of them.
pub fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let mut parts: Vec<String> = Vec::new();

    if let Some(messages) = value.get("errorMessages").and_then(|m| m.as_array()) {
        parts.extend(
            messages
                .iter()
                .filter_map(|m| m.as_str())
                .filter(|m| !m.trim().is_empty())
                .map(String::from),
        );
    }

    if let Some(errors) = value.get("errors").and_then(|e| e.as_object()) {
        for (field, detail) in errors {
            match detail.as_str() {
                Some(s) => parts.push(format!("{field}: {s}")),
                None => parts.push(format!("{field}: {detail}")),
            }
        }
    }

    if parts.is_empty() {
        if let Some(message) = value.get("message").and_then(|m| m.as_str()) {
            parts.push(message.to_string());
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("; "))
    }
}
