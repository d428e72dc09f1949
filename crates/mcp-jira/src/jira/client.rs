//! HTTP client for the Jira v3 REST API.
//!
//! Every request carries the credential selected at startup in its default
//! headers. Response bodies are read as text first so error bodies can be
//! inspected before deciding between a remote error and a partial success.

use std::time::Duration;

use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use mcp_jira_core::jira::payloads::{comment_payload, transition_payload, ProjectRequest};
use mcp_jira_core::jira::{
    extract_error_message, reconcile_bulk_response, AuthStrategy, BulkCreateResponse,
    CreatedIssue, IssueUpdate, ItemOutcome, JiraComment, JiraIssueResponse, JiraIssueTypePage,
    JiraProject, JiraProjectPage, JiraSearchResponse, JiraTransitionsResponse, MAX_BULK_ISSUES,
};

use crate::error::{Error, JiraResult};

const API_PREFIX: &str = "/rest/api/3";
const SEARCH_PAGE_MAX: usize = 100;
const PROJECT_PAGE_SIZE: usize = 50;
const ISSUE_FIELDS: &str =
    "summary,description,status,assignee,reporter,created,updated,issuetype,priority,labels,components";

/// Build the `Authorization` header for a strategy.
fn authorization_header(auth: &AuthStrategy) -> JiraResult<HeaderValue> {
    use base64::Engine;

    let raw = match auth {
        AuthStrategy::Basic { username, secret } => {
            let encoded =
                base64::engine::general_purpose::STANDARD.encode(format!("{username}:{secret}"));
            format!("Basic {encoded}")
        }
        AuthStrategy::Token { token } => format!("Bearer {token}"),
    };

    let mut value = HeaderValue::from_str(&raw).map_err(|_| {
        Error::Core(mcp_jira_core::Error::Configuration(
            "Credentials contain characters that cannot be sent in a header".into(),
        ))
    })?;
    value.set_sensitive(true);
    Ok(value)
}

fn remote_error(status: StatusCode, body: String) -> Error {
    let message = extract_error_message(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .map(String::from)
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
    });
    Error::Remote {
        status: status.as_u16(),
        message,
        body,
    }
}

fn parse<T: DeserializeOwned>(body: &str) -> JiraResult<T> {
    serde_json::from_str(body)
        .map_err(|e| Error::Transport(format!("Failed to parse Jira response: {e}")))
}

fn require_key(issue_key: &str) -> JiraResult<&str> {
    let key = issue_key.trim();
    if key.is_empty() {
        return Err(Error::validation("issue_key must not be empty"));
    }
    Ok(key)
}

/// Jira v3 API client
#[derive(Debug, Clone)]
pub struct JiraClient {
    http: reqwest::Client,
    base_url: String,
}

impl JiraClient {
    /// Create a client for `base_url` (without the `/rest/api/3` suffix).
    pub fn new(base_url: &str, auth: &AuthStrategy, timeout: Duration) -> JiraResult<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(Error::Core(mcp_jira_core::Error::Configuration(
                "Jira server URL must not be empty".into(),
            )));
        }

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, authorization_header(auth)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Transport(format!("Failed to build HTTP client: {e}")))?;

        debug!("Jira client ready for {base_url} using {}", auth.method());

        Ok(Self {
            http,
            base_url: base_url.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{API_PREFIX}{path}", self.base_url)
    }

    /// Send a request and return the status with the raw body.
    async fn execute(&self, request: reqwest::RequestBuilder) -> JiraResult<(StatusCode, String)> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!("Jira responded {status} ({} bytes)", body.len());
        Ok((status, body))
    }

    /// Send a request, failing on any non-2xx status.
    async fn execute_ok(&self, request: reqwest::RequestBuilder) -> JiraResult<String> {
        let (status, body) = self.execute(request).await?;
        if status.is_success() {
            Ok(body)
        } else {
            Err(remote_error(status, body))
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> JiraResult<T> {
        let url = self.url(path);
        debug!("GET {url}");
        let body = self.execute_ok(self.http.get(&url).query(query)).await?;
        parse(&body)
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        payload: &serde_json::Value,
    ) -> JiraResult<T> {
        let url = self.url(path);
        debug!("POST {url}");
        let body = self.execute_ok(self.http.post(&url).json(payload)).await?;
        parse(&body)
    }

    /// Create up to [`MAX_BULK_ISSUES`] issues in one request.
    ///
    /// Returns one outcome per input, in input order. A response that
    /// rejects some elements is a partial success, not an error, even when
    /// the remote answers with a non-2xx status.
    pub async fn bulk_create(&self, issues: &[IssueUpdate]) -> JiraResult<Vec<ItemOutcome>> {
        if issues.is_empty() {
            return Err(Error::validation("No issues to create"));
        }
        if issues.len() > MAX_BULK_ISSUES {
            return Err(Error::validation(format!(
                "Cannot create more than {MAX_BULK_ISSUES} issues at once, got {}",
                issues.len()
            )));
        }

        let url = self.url("/issue/bulk");
        debug!("POST {url} with {} issue(s)", issues.len());

        let payload = serde_json::json!({ "issueUpdates": issues });
        let (status, body) = self.execute(self.http.post(&url).json(&payload)).await?;

        let response = match BulkCreateResponse::from_body(&body) {
            Some(response) if status.is_success() || !response.errors.is_empty() => response,
            _ if status.is_success() => {
                return Err(Error::Transport(
                    "Failed to parse Jira bulk create response".into(),
                ))
            }
            _ => return Err(remote_error(status, body)),
        };

        Ok(reconcile_bulk_response(issues.len(), response))
    }

    pub async fn create_issue(&self, issue: &IssueUpdate) -> JiraResult<CreatedIssue> {
        let payload = serde_json::to_value(issue)
            .map_err(|e| Error::Transport(format!("Failed to encode issue: {e}")))?;
        self.post_json("/issue", &payload).await
    }

    /// Fetch one issue with its comments.
    pub async fn get_issue(&self, issue_key: &str) -> JiraResult<JiraIssueResponse> {
        let key = require_key(issue_key)?;
        let path = format!("/issue/{}", urlencoding::encode(key));
        self.get_json(&path, &[("fields", format!("{ISSUE_FIELDS},comment"))])
            .await
    }

    /// Fetch one page of `GET /search/jql`.
    pub async fn search_issues(
        &self,
        jql: &str,
        max_results: usize,
        next_page_token: Option<&str>,
    ) -> JiraResult<JiraSearchResponse> {
        let max_results = max_results.clamp(1, SEARCH_PAGE_MAX);
        let mut query = vec![
            ("jql", jql.to_string()),
            ("maxResults", max_results.to_string()),
            ("fields", ISSUE_FIELDS.to_string()),
        ];
        if let Some(token) = next_page_token {
            query.push(("nextPageToken", token.to_string()));
        }

        self.get_json("/search/jql", &query).await
    }

    pub async fn add_comment(&self, issue_key: &str, text: &str) -> JiraResult<JiraComment> {
        let key = require_key(issue_key)?;
        let path = format!("/issue/{}/comment", urlencoding::encode(key));
        self.post_json(&path, &comment_payload(text)).await
    }

    pub async fn get_transitions(&self, issue_key: &str) -> JiraResult<JiraTransitionsResponse> {
        let key = require_key(issue_key)?;
        let path = format!("/issue/{}/transitions", urlencoding::encode(key));
        self.get_json(&path, &[]).await
    }

    /// Move an issue through a workflow transition. Jira answers `204 No Content`.
    pub async fn transition_issue(
        &self,
        issue_key: &str,
        transition_id: &str,
        comment: Option<&str>,
        fields: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> JiraResult<()> {
        let key = require_key(issue_key)?;
        let payload = transition_payload(transition_id, comment, fields)?;
        let url = self.url(&format!("/issue/{}/transitions", urlencoding::encode(key)));
        debug!("POST {url}");
        self.execute_ok(self.http.post(&url).json(&payload)).await?;
        Ok(())
    }

    /// Every project visible to the caller, across all pages.
    pub async fn get_projects(&self) -> JiraResult<Vec<JiraProject>> {
        let mut projects = Vec::new();
        let mut start_at = 0usize;

        loop {
            let page: JiraProjectPage = self
                .get_json(
                    "/project/search",
                    &[
                        ("startAt", start_at.to_string()),
                        ("maxResults", PROJECT_PAGE_SIZE.to_string()),
                        ("expand", "lead".to_string()),
                    ],
                )
                .await?;

            let fetched = page.values.len();
            projects.extend(page.values);

            if fetched == 0 || page.is_last.unwrap_or(true) {
                break;
            }
            start_at += fetched;
        }

        Ok(projects)
    }

    pub async fn get_project_issue_types(
        &self,
        project_key: &str,
    ) -> JiraResult<JiraIssueTypePage> {
        let project = project_key.trim();
        if project.is_empty() {
            return Err(Error::validation("project_key must not be empty"));
        }
        let path = format!("/issue/createmeta/{}/issuetypes", urlencoding::encode(project));
        self.get_json(&path, &[]).await
    }

    pub async fn create_project(&self, request: &ProjectRequest) -> JiraResult<JiraProject> {
        let payload = request.to_payload()?;
        self.post_json("/project", &payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcp_jira_core::jira::fields::normalize;
    use mcp_jira_core::jira::ItemFailure;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn basic() -> AuthStrategy {
        AuthStrategy::Basic {
            username: "user@example.com".into(),
            secret: "api-token".into(),
        }
    }

    fn client(server: &MockServer) -> JiraClient {
        JiraClient::new(&server.uri(), &basic(), Duration::from_secs(5)).unwrap()
    }

    fn update(summary: &str) -> IssueUpdate {
        let raw = json!({"project": "PROJ", "summary": summary, "issuetype": "Task"});
        normalize(raw.as_object().cloned().unwrap()).unwrap().into()
    }

    #[test]
    fn test_new_rejects_empty_base_url() {
        let err = JiraClient::new("  ", &basic(), Duration::from_secs(5)).unwrap_err();

        assert!(matches!(
            err,
            Error::Core(mcp_jira_core::Error::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_basic_auth_header_is_sent() {
        // Arrange
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/api/3/issue/PROJ-1/transitions"))
            // base64("user@example.com:api-token")
            .and(header(
                "authorization",
                "Basic dXNlckBleGFtcGxlLmNvbTphcGktdG9rZW4=",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"transitions": []})))
            .expect(1)
            .mount(&server)
            .await;

        // Act
        let result = client(&server).get_transitions("PROJ-1").await;

        // Assert
        assert!(result.unwrap().transitions.is_empty());
    }

    #[tokio::test]
    async fn test_token_auth_header_is_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/api/3/issue/PROJ-1/transitions"))
            .and(header("authorization", "Bearer pat-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"transitions": []})))
            .expect(1)
            .mount(&server)
            .await;
        let auth = AuthStrategy::Token {
            token: "pat-123".into(),
        };
        let client = JiraClient::new(&server.uri(), &auth, Duration::from_secs(5)).unwrap();

        assert!(client.get_transitions("PROJ-1").await.is_ok());
    }

    #[tokio::test]
    async fn test_bulk_create_all_created() {
        // Arrange
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/api/3/issue/bulk"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "issues": [
                    {"id": "10001", "key": "PROJ-1", "self": "https://x/rest/api/3/issue/10001"},
                    {"id": "10002", "key": "PROJ-2", "self": "https://x/rest/api/3/issue/10002"}
                ],
                "errors": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        // Act
        let outcomes = client(&server)
            .bulk_create(&[update("one"), update("two")])
            .await
            .unwrap();

        // Assert
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(ItemOutcome::is_created));
        match &outcomes[1] {
            ItemOutcome::Created(issue) => assert_eq!(issue.key, "PROJ-2"),
            other => panic!("expected created, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_bulk_create_sends_issue_updates_envelope() {
        let server = MockServer::start().await;
        let issues = [update("only")];
        Mock::given(method("POST"))
            .and(path("/rest/api/3/issue/bulk"))
            .and(body_json(json!({ "issueUpdates": issues })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "issues": [{"id": "1", "key": "PROJ-1", "self": "s"}],
                "errors": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        let outcomes = client(&server).bulk_create(&issues).await.unwrap();

        assert_eq!(outcomes.len(), 1);
    }

    #[tokio::test]
    async fn test_bulk_create_partial_failure_on_error_status() {
        // Arrange: Jira answers 400 but still reports which element failed
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/api/3/issue/bulk"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "issues": [{"id": "10001", "key": "PROJ-1", "self": "s"}],
                "errors": [{
                    "status": 400,
                    "elementErrors": {"errorMessages": [], "errors": {"issuetype": "valid issue type is required"}},
                    "failedElementNumber": 1
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        // Act
        let outcomes = client(&server)
            .bulk_create(&[update("ok"), update("bad")])
            .await
            .unwrap();

        // Assert
        assert!(outcomes[0].is_created());
        assert_eq!(
            outcomes[1],
            ItemOutcome::Failed(ItemFailure::remote(
                "issuetype: valid issue type is required"
            ))
        );
    }

    #[tokio::test]
    async fn test_bulk_create_whole_call_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/api/3/issue/bulk"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(json!({"errorMessages": ["You are not authenticated"]})),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .bulk_create(&[update("x")])
            .await
            .unwrap_err();

        match err {
            Error::Remote {
                status, message, ..
            } => {
                assert_eq!(status, 401);
                assert_eq!(message, "You are not authenticated");
            }
            other => panic!("expected remote error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_bulk_create_rejects_oversized_batch_without_calling() {
        // Arrange
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;
        let issues: Vec<IssueUpdate> = (0..=MAX_BULK_ISSUES)
            .map(|i| update(&format!("issue {i}")))
            .collect();

        // Act
        let err = client(&server).bulk_create(&issues).await.unwrap_err();

        // Assert
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_bulk_create_rejects_empty_batch() {
        let server = MockServer::start().await;

        let err = client(&server).bulk_create(&[]).await.unwrap_err();

        assert!(err.is_validation());
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        // Port 9 (discard) is not listening in the test environment.
        let client =
            JiraClient::new("http://127.0.0.1:9", &basic(), Duration::from_secs(2)).unwrap();

        let err = client.bulk_create(&[update("x")]).await.unwrap_err();

        assert!(matches!(err, Error::Transport(_)));
    }

    #[tokio::test]
    async fn test_slow_bulk_create_times_out_as_transport_error() {
        // Arrange
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/api/3/issue/bulk"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_delay(Duration::from_secs(3))
                    .set_body_json(json!({
                        "issues": [{"id": "1", "key": "PROJ-1", "self": "https://x/1"}],
                        "errors": []
                    })),
            )
            .mount(&server)
            .await;
        let client =
            JiraClient::new(&server.uri(), &basic(), Duration::from_millis(300)).unwrap();

        // Act
        let err = client.bulk_create(&[update("x")]).await.unwrap_err();

        // Assert
        assert!(matches!(err, Error::Transport(ref message) if message.contains("timed out")));
    }

    #[tokio::test]
    async fn test_add_comment_sends_rich_text_body() {
        // Arrange
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/api/3/issue/PROJ-1/comment"))
            .and(body_json(json!({
                "body": {
                    "type": "doc",
                    "version": 1,
                    "content": [{"type": "paragraph", "content": [{"type": "text", "text": "On it"}]}]
                }
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "10100",
                "body": {"type": "doc", "version": 1, "content": []},
                "created": "2024-01-01T00:00:00.000+0000",
                "author": {"displayName": "Bot"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        // Act
        let comment = client(&server).add_comment("PROJ-1", "On it").await.unwrap();

        // Assert
        assert_eq!(comment.id, "10100");
    }

    #[tokio::test]
    async fn test_transition_issue_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/api/3/issue/PROJ-1/transitions"))
            .and(body_json(json!({
                "transition": {"id": "31"},
                "update": {"comment": [{"add": {"body": {
                    "type": "doc",
                    "version": 1,
                    "content": [{"type": "paragraph", "content": [{"type": "text", "text": "Closing"}]}]
                }}}]}
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let result = client(&server)
            .transition_issue("PROJ-1", "31", Some("Closing"), None)
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_transition_issue_rejects_empty_key() {
        let server = MockServer::start().await;

        let err = client(&server)
            .transition_issue("", "31", None, None)
            .await
            .unwrap_err();

        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_get_issue_not_found_extracts_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/api/3/issue/NOPE-1"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "errorMessages": ["Issue does not exist or you do not have permission to see it."],
                "errors": {}
            })))
            .mount(&server)
            .await;

        let err = client(&server).get_issue("NOPE-1").await.unwrap_err();

        assert!(matches!(
            err,
            Error::Remote { status: 404, ref message, .. }
                if message.starts_with("Issue does not exist")
        ));
    }

    #[tokio::test]
    async fn test_search_passes_token_and_caps_page_size() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/api/3/search/jql"))
            .and(query_param("jql", "project = PROJ"))
            .and(query_param("maxResults", "100"))
            .and(query_param("nextPageToken", "abc"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"issues": [], "isLast": true})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let page = client(&server)
            .search_issues("project = PROJ", 500, Some("abc"))
            .await
            .unwrap();

        assert_eq!(page.is_last, Some(true));
    }

    #[tokio::test]
    async fn test_get_projects_follows_pages() {
        // Arrange
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/api/3/project/search"))
            .and(query_param("startAt", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "values": [{"id": "1", "key": "A", "name": "Alpha"}],
                "isLast": false
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/api/3/project/search"))
            .and(query_param("startAt", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "values": [{"id": "2", "key": "B", "name": "Beta"}],
                "isLast": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        // Act
        let projects = client(&server).get_projects().await.unwrap();

        // Assert
        let keys: Vec<_> = projects.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_undecodable_success_body_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/api/3/issue/PROJ-1/transitions"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
            .mount(&server)
            .await;

        let err = client(&server).get_transitions("PROJ-1").await.unwrap_err();

        assert!(matches!(err, Error::Transport(_)));
    }
}
