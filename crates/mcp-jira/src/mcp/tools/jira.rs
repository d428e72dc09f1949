//! Jira tools exposed over MCP.
//!
//! Malformed or invalid arguments are JSON-RPC errors. Remote and network
//! failures are returned as a tool result with `isError: true` and an
//! `{"error": ...}` body, so the calling model can read them.

use crate::prelude::eprintln;
use mcp_jira_core::jira::payloads::ProjectRequest;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::{
    CallToolResult, Content, JsonRpcError, ServerContext, Tool, INTERNAL_ERROR, INVALID_PARAMS,
};
use crate::error::JiraResult;

const DEFAULT_MAX_RESULTS: usize = 10;

fn tool(name: &str, description: &str, input_schema: serde_json::Value) -> Tool {
    Tool {
        name: name.to_string(),
        description: description.to_string(),
        input_schema,
    }
}

fn issue_key_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "issue_key": {
                "type": "string",
                "description": "The issue key (e.g., PROJECT-123)"
            }
        },
        "required": ["issue_key"]
    })
}

/// Every tool this server advertises in `tools/list`.
pub fn tools() -> Vec<Tool> {
    let id_type = serde_json::json!(["integer", "string"]);

    vec![
        tool(
            "get_jira_projects",
            "Get all accessible Jira projects. Returns key, name, id and lead for each project.",
            serde_json::json!({"type": "object", "properties": {}, "required": []}),
        ),
        tool(
            "get_jira_issue",
            "Get details for a specific Jira issue by key, including its description and comments rendered as plain text.",
            issue_key_schema(),
        ),
        tool(
            "search_jira_issues",
            "Search for Jira issues using JQL (Jira Query Language). Follows pagination until max_results issues are collected.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "jql": {
                        "type": "string",
                        "description": "JQL query string (e.g., 'project = MYPROJ AND status = \"In Progress\"')"
                    },
                    "max_results": {
                        "type": "integer",
                        "description": "Maximum number of results to return (default: 10)"
                    }
                },
                "required": ["jql"]
            }),
        ),
        tool(
            "create_jira_issue",
            "Create a new Jira issue. Common issue types include 'Bug', 'Task', 'Story', 'Epic' (capitalization handled automatically). The description is plain text.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "project": {"type": "string", "description": "Project key (e.g., 'MYPROJ')"},
                    "summary": {"type": "string", "description": "Issue summary/title"},
                    "description": {"type": "string", "description": "Issue description"},
                    "issue_type": {
                        "type": "string",
                        "description": "Issue type (e.g., 'Bug', 'Task', 'Story', 'Epic', 'New Feature', 'Improvement')"
                    },
                    "fields": {
                        "type": "object",
                        "description": "Additional fields for the issue (e.g., {\"labels\": [\"api\"], \"assignee\": \"jsmith\", \"priority\": {\"name\": \"High\"}})"
                    }
                },
                "required": ["project", "summary", "issue_type"]
            }),
        ),
        tool(
            "create_jira_issues",
            "Bulk create up to 50 Jira issues in a single request. Each entry needs 'project', 'summary' and 'issuetype' (or 'issue_type'). Returns one result per entry, in order: {key, id, self, success: true} or {success: false, error}.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "field_list": {
                        "type": "array",
                        "description": "A list of field dictionaries, each representing an issue to create",
                        "items": {"type": "object", "description": "Field dictionary for a single issue"}
                    },
                    "prefetch": {
                        "type": "boolean",
                        "description": "Accepted for compatibility; created issues are not reloaded"
                    }
                },
                "required": ["field_list"]
            }),
        ),
        tool(
            "add_jira_comment",
            "Add a comment to a Jira issue",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "issue_key": {"type": "string", "description": "The issue key (e.g., PROJECT-123)"},
                    "comment": {"type": "string", "description": "The comment text"},
                    "body": {"type": "string", "description": "Alias for 'comment'"}
                },
                "required": ["issue_key"]
            }),
        ),
        tool(
            "get_jira_transitions",
            "Get available workflow transitions for a Jira issue",
            issue_key_schema(),
        ),
        tool(
            "transition_jira_issue",
            "Transition a Jira issue to a new status, optionally adding a comment and setting fields",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "issue_key": {"type": "string", "description": "The issue key (e.g., PROJECT-123)"},
                    "transition_id": {
                        "type": "string",
                        "description": "ID of the transition to perform (get IDs using get_jira_transitions)"
                    },
                    "comment": {"type": "string", "description": "Comment to add during transition (optional)"},
                    "fields": {"type": "object", "description": "Additional fields to update during transition (optional)"}
                },
                "required": ["issue_key", "transition_id"]
            }),
        ),
        tool(
            "get_jira_project_issue_types",
            "Get all available issue types for a specific Jira project",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "project_key": {"type": "string", "description": "The project key (e.g., 'MYPROJ')"}
                },
                "required": ["project_key"]
            }),
        ),
        tool(
            "create_jira_project",
            "Create a new Jira project",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "key": {"type": "string", "description": "Project key, usually 2-10 uppercase characters"},
                    "name": {"type": "string", "description": "Project name (defaults to the key)"},
                    "assignee": {"type": "string", "description": "Lead account ID"},
                    "ptype": {
                        "type": "string",
                        "description": "Project type key: 'software', 'business', or 'service_desk' (default: 'software')"
                    },
                    "template_name": {"type": "string", "description": "Project template key"},
                    "avatarId": {"type": id_type, "description": "ID of the avatar to use for the project"},
                    "issueSecurityScheme": {"type": id_type, "description": "Issue security scheme ID"},
                    "permissionScheme": {"type": id_type, "description": "Permission scheme ID"},
                    "projectCategory": {"type": id_type, "description": "Project category ID"},
                    "notificationScheme": {"type": id_type, "description": "Notification scheme ID"},
                    "categoryId": {"type": id_type, "description": "Same as projectCategory; takes precedence when both are set"},
                    "url": {"type": "string", "description": "A link to information about the project"}
                },
                "required": ["key"]
            }),
        ),
    ]
}

fn parse_args<T: DeserializeOwned>(
    arguments: Option<serde_json::Value>,
) -> Result<T, JsonRpcError> {
    serde_json::from_value(arguments.unwrap_or_else(|| serde_json::json!({})))
        .map_err(|e| JsonRpcError::new(INVALID_PARAMS, format!("Invalid arguments: {e}")))
}

/// Wrap a tool's outcome in an MCP result.
fn respond<T: Serialize>(
    tool_name: &str,
    result: JiraResult<T>,
    context: &ServerContext,
) -> Result<serde_json::Value, JsonRpcError> {
    let (body, is_error) = match result {
        Ok(data) => (
            serde_json::to_string_pretty(&data).map_err(|e| {
                JsonRpcError::new(INTERNAL_ERROR, format!("Serialization error: {e}"))
            })?,
            None,
        ),
        Err(err) if err.is_validation() => {
            return Err(JsonRpcError::new(INVALID_PARAMS, err.to_string()));
        }
        Err(err) => {
            log::warn!("{tool_name} failed: {err}");
            if context.global.verbose {
                eprintln!("{tool_name} failed: {err}");
            }
            let body = serde_json::json!({ "error": err.to_string() });
            (
                serde_json::to_string_pretty(&body).map_err(|e| {
                    JsonRpcError::new(INTERNAL_ERROR, format!("Serialization error: {e}"))
                })?,
                Some(true),
            )
        }
    };

    let result = CallToolResult {
        content: vec![Content::Text { text: body }],
        is_error,
    };

    serde_json::to_value(result)
        .map_err(|e| JsonRpcError::new(INTERNAL_ERROR, format!("Internal error: {e}")))
}

fn require(name: &str, value: &str) -> Result<(), JsonRpcError> {
    if value.trim().is_empty() {
        Err(JsonRpcError::new(
            INVALID_PARAMS,
            format!("Missing required argument: {name}"),
        ))
    } else {
        Ok(())
    }
}

#[derive(Deserialize)]
struct IssueKeyArgs {
    issue_key: String,
}

pub async fn handle_get_projects(
    context: &ServerContext,
) -> Result<serde_json::Value, JsonRpcError> {
    if context.global.verbose {
        eprintln!("Calling get_jira_projects");
    }

    let result = context.service.get_projects().await;
    respond("get_jira_projects", result, context)
}

pub async fn handle_get_issue(
    arguments: Option<serde_json::Value>,
    context: &ServerContext,
) -> Result<serde_json::Value, JsonRpcError> {
    let args: IssueKeyArgs = parse_args(arguments)?;
    require("issue_key", &args.issue_key)?;

    if context.global.verbose {
        eprintln!("Calling get_jira_issue: issue_key={}", args.issue_key);
    }

    let result = context.service.get_issue(&args.issue_key).await;
    respond("get_jira_issue", result, context)
}

pub async fn handle_search_issues(
    arguments: Option<serde_json::Value>,
    context: &ServerContext,
) -> Result<serde_json::Value, JsonRpcError> {
    #[derive(Deserialize)]
    struct SearchArgs {
        jql: String,
        max_results: Option<usize>,
    }

    let args: SearchArgs = parse_args(arguments)?;
    require("jql", &args.jql)?;
    let limit = args.max_results.unwrap_or(DEFAULT_MAX_RESULTS);

    if context.global.verbose {
        eprintln!("Calling search_jira_issues: jql={}, max_results={limit}", args.jql);
    }

    let result = context.service.search_issues(&args.jql, limit).await;
    respond("search_jira_issues", result, context)
}

pub async fn handle_create_issue(
    arguments: Option<serde_json::Value>,
    context: &ServerContext,
) -> Result<serde_json::Value, JsonRpcError> {
    #[derive(Deserialize)]
    struct CreateArgs {
        project: serde_json::Value,
        summary: String,
        #[serde(default)]
        description: Option<String>,
        issue_type: serde_json::Value,
        #[serde(default)]
        fields: serde_json::Map<String, serde_json::Value>,
    }

    let args: CreateArgs = parse_args(arguments)?;

    // Named arguments win over the same keys inside `fields`.
    let mut raw = args.fields;
    raw.insert("project".into(), args.project);
    raw.insert("summary".into(), serde_json::Value::String(args.summary));
    raw.remove("issuetype");
    raw.insert("issue_type".into(), args.issue_type);
    if let Some(description) = args.description {
        raw.insert("description".into(), serde_json::Value::String(description));
    }

    if context.global.verbose {
        eprintln!("Calling create_jira_issue");
    }

    let result = context
        .service
        .create_issue(serde_json::Value::Object(raw))
        .await;
    respond("create_jira_issue", result, context)
}

pub async fn handle_create_issues(
    arguments: Option<serde_json::Value>,
    context: &ServerContext,
) -> Result<serde_json::Value, JsonRpcError> {
    #[derive(Deserialize)]
    struct BulkArgs {
        field_list: Vec<serde_json::Value>,
        #[serde(default)]
        #[allow(dead_code)]
        prefetch: Option<bool>,
    }

    let args: BulkArgs = parse_args(arguments)?;
    if args.field_list.is_empty() {
        return Err(JsonRpcError::new(
            INVALID_PARAMS,
            "Missing required argument: field_list",
        ));
    }

    if context.global.verbose {
        eprintln!("Calling create_jira_issues: {} issue(s)", args.field_list.len());
    }

    let result = context.service.create_issues(args.field_list).await;
    respond("create_jira_issues", result, context)
}

pub async fn handle_add_comment(
    arguments: Option<serde_json::Value>,
    context: &ServerContext,
) -> Result<serde_json::Value, JsonRpcError> {
    #[derive(Deserialize)]
    struct CommentArgs {
        issue_key: String,
        comment: Option<String>,
        body: Option<String>,
    }

    let args: CommentArgs = parse_args(arguments)?;
    require("issue_key", &args.issue_key)?;
    let text = args
        .comment
        .filter(|c| !c.trim().is_empty())
        .or(args.body)
        .unwrap_or_default();
    require("comment (or body)", &text)?;

    if context.global.verbose {
        eprintln!("Calling add_jira_comment: issue_key={}", args.issue_key);
    }

    let result = context.service.add_comment(&args.issue_key, &text).await;
    respond("add_jira_comment", result, context)
}

pub async fn handle_get_transitions(
    arguments: Option<serde_json::Value>,
    context: &ServerContext,
) -> Result<serde_json::Value, JsonRpcError> {
    let args: IssueKeyArgs = parse_args(arguments)?;
    require("issue_key", &args.issue_key)?;

    let result = context.service.get_transitions(&args.issue_key).await;
    respond("get_jira_transitions", result, context)
}

pub async fn handle_transition_issue(
    arguments: Option<serde_json::Value>,
    context: &ServerContext,
) -> Result<serde_json::Value, JsonRpcError> {
    #[derive(Deserialize)]
    struct TransitionArgs {
        issue_key: String,
        transition_id: serde_json::Value,
        comment: Option<String>,
        fields: Option<serde_json::Map<String, serde_json::Value>>,
    }

    let args: TransitionArgs = parse_args(arguments)?;
    require("issue_key", &args.issue_key)?;
    // Transition ids are strings in the API but models often send numbers.
    let transition_id = match &args.transition_id {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => String::new(),
    };
    require("transition_id", &transition_id)?;

    if context.global.verbose {
        eprintln!(
            "Calling transition_jira_issue: issue_key={}, transition_id={transition_id}",
            args.issue_key
        );
    }

    let result = context
        .service
        .transition_issue(
            &args.issue_key,
            &transition_id,
            args.comment.as_deref(),
            args.fields,
        )
        .await
        .map(|()| {
            serde_json::json!({
                "success": true,
                "issue_key": args.issue_key,
                "transition_id": transition_id,
            })
        });
    respond("transition_jira_issue", result, context)
}

pub async fn handle_get_project_issue_types(
    arguments: Option<serde_json::Value>,
    context: &ServerContext,
) -> Result<serde_json::Value, JsonRpcError> {
    #[derive(Deserialize)]
    struct ProjectKeyArgs {
        project_key: String,
    }

    let args: ProjectKeyArgs = parse_args(arguments)?;
    require("project_key", &args.project_key)?;

    let result = context
        .service
        .get_project_issue_types(&args.project_key)
        .await;
    respond("get_jira_project_issue_types", result, context)
}

pub async fn handle_create_project(
    arguments: Option<serde_json::Value>,
    context: &ServerContext,
) -> Result<serde_json::Value, JsonRpcError> {
    let request: ProjectRequest = parse_args(arguments)?;
    require("key", &request.key)?;

    if context.global.verbose {
        eprintln!("Calling create_jira_project: key={}", request.key);
    }

    let result = context.service.create_project(&request).await;
    respond("create_jira_project", result, context)
}
