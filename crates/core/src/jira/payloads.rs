//! Request bodies for the write endpoints other than issue creation.

use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::adf::to_rich_text;
use crate::error::{Error, Result};

pub const DEFAULT_PROJECT_TYPE: &str = "software";
pub const PROJECT_LEAD_ASSIGNEE: &str = "PROJECT_LEAD";

/// `POST /issue/{key}/comment`
pub fn comment_payload(text: &str) -> Value {
    json!({ "body": to_rich_text(text).into_value() })
}

/// `POST /issue/{key}/transitions`
///
/// The comment, when given, is attached through the `update` section so it is
/// added atomically with the transition.
pub fn transition_payload(
    transition_id: &str,
    comment: Option<&str>,
    fields: Option<Map<String, Value>>,
) -> Result<Value> {
    let transition_id = transition_id.trim();
    if transition_id.is_empty() {
        return Err(Error::Validation("transition_id must not be empty".into()));
    }

    let mut payload = Map::new();
    payload.insert("transition".into(), json!({ "id": transition_id }));

    if let Some(fields) = fields.filter(|f| !f.is_empty()) {
        payload.insert("fields".into(), Value::Object(fields));
    }

    if let Some(comment) = comment.filter(|c| !c.trim().is_empty()) {
        payload.insert(
            "update".into(),
            json!({ "comment": [{ "add": { "body": to_rich_text(comment).into_value() } }] }),
        );
    }

    Ok(Value::Object(payload))
}

/// Arguments for `POST /project`.
///
/// Field names follow the tool arguments, so numeric scheme ids may arrive as
/// numbers or digit strings.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ProjectRequest {
    pub key: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Lead account id.
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub ptype: Option<String>,
    #[serde(default)]
    pub template_name: Option<String>,
    #[serde(rename = "avatarId", default)]
    pub avatar_id: Option<Value>,
    #[serde(rename = "issueSecurityScheme", default)]
    pub issue_security_scheme: Option<Value>,
    #[serde(rename = "permissionScheme", default)]
    pub permission_scheme: Option<Value>,
    #[serde(rename = "projectCategory", default)]
    pub project_category: Option<Value>,
    #[serde(rename = "notificationScheme", default)]
    pub notification_scheme: Option<Value>,
    #[serde(rename = "categoryId", default)]
    pub category_id: Option<Value>,
    #[serde(default)]
    pub url: Option<String>,
}

fn numeric_id(name: &str, value: Option<&Value>) -> Result<Option<u64>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| Error::Validation(format!("{name} must be a positive integer"))),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| {
                Error::Validation(format!("{name} must be a positive integer, got '{s}'"))
            }),
        Some(other) => Err(Error::Validation(format!(
            "{name} must be a positive integer, got {other}"
        ))),
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl ProjectRequest {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    /// Build the v3 project creation body.
    pub fn to_payload(&self) -> Result<Value> {
        let key = self.key.trim();
        if key.is_empty() {
            return Err(Error::Validation("Project key is required".into()));
        }

        let mut payload = Map::new();
        payload.insert("key".into(), json!(key));
        payload.insert("name".into(), json!(non_empty(&self.name).unwrap_or(key)));
        payload.insert(
            "projectTypeKey".into(),
            json!(non_empty(&self.ptype).unwrap_or(DEFAULT_PROJECT_TYPE)),
        );

        if let Some(template) = non_empty(&self.template_name) {
            payload.insert("projectTemplateKey".into(), json!(template));
        }
        if let Some(lead) = non_empty(&self.assignee) {
            payload.insert("leadAccountId".into(), json!(lead));
        }

        for (field, value) in [
            ("avatarId", &self.avatar_id),
            ("issueSecurityScheme", &self.issue_security_scheme),
            ("permissionScheme", &self.permission_scheme),
            ("notificationScheme", &self.notification_scheme),
        ] {
            if let Some(id) = numeric_id(field, value.as_ref())? {
                payload.insert(field.into(), json!(id));
            }
        }

        let category = match numeric_id("categoryId", self.category_id.as_ref())? {
            Some(id) => Some(id),
            None => numeric_id("projectCategory", self.project_category.as_ref())?,
        };
        if let Some(id) = category {
            payload.insert("categoryId".into(), json!(id));
        }

        if let Some(url) = non_empty(&self.url) {
            payload.insert("url".into(), json!(url));
        }

        payload.insert("assigneeType".into(), json!(PROJECT_LEAD_ASSIGNEE));

        Ok(Value::Object(payload))
    }
}
