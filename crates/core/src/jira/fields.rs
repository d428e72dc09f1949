//! Field normalization for issue creation.
//!
//! Callers hand us loosely-typed field maps: `"project": "PROJ"` as often as
//! `"project": {"key": "PROJ"}`, `issue_type` as often as `issuetype`. The v3
//! create endpoints only accept the structured form, so every value goes
//! through a [`FieldValue`] and a per-field coercion function before it is
//! sent. Structured values are always passed through untouched, which makes
//! [`normalize`] idempotent.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::adf::to_rich_text;
use crate::error::{Error, Result};

/// Raw, caller-supplied field map for one issue.
pub type RawIssueFields = Map<String, Value>;

pub const PROJECT_FIELD: &str = "project";
pub const SUMMARY_FIELD: &str = "summary";
pub const DESCRIPTION_FIELD: &str = "description";
pub const ISSUE_TYPE_FIELD: &str = "issuetype";
pub const LEGACY_ISSUE_TYPE_FIELD: &str = "issue_type";
pub const LABELS_FIELD: &str = "labels";
pub const ASSIGNEE_FIELD: &str = "assignee";
pub const ASSIGNEES_FIELD: &str = "assignees";
pub const MILESTONE_FIELD: &str = "milestone";

/// Known issue types and their canonical casing, keyed by lowercase name.
const CANONICAL_ISSUE_TYPES: &[(&str, &str)] = &[
    ("bug", "Bug"),
    ("task", "Task"),
    ("story", "Story"),
    ("epic", "Epic"),
    ("improvement", "Improvement"),
    ("new feature", "New Feature"),
    ("newfeature", "New Feature"),
];

/// A single field value, either a bare string or an already-structured JSON value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Scalar(String),
    Structured(Value),
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => FieldValue::Scalar(s),
            other => FieldValue::Structured(other),
        }
    }
}

/// Field map in the shape the v3 API accepts for one create operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedIssueFields(Map<String, Value>);

impl NormalizedIssueFields {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Project key, when the project was given by key.
    pub fn project_key(&self) -> Option<&str> {
        self.0
            .get(PROJECT_FIELD)
            .and_then(|p| p.get("key"))
            .and_then(|k| k.as_str())
    }

    /// Issue type name, when the issue type was given by name.
    pub fn issue_type_name(&self) -> Option<&str> {
        self.0
            .get(ISSUE_TYPE_FIELD)
            .and_then(|t| t.get("name"))
            .and_then(|n| n.as_str())
    }
}

/// One entry of a create request: `{"fields": {...}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueUpdate {
    pub fields: NormalizedIssueFields,
}

impl From<NormalizedIssueFields> for IssueUpdate {
    fn from(fields: NormalizedIssueFields) -> Self {
        Self { fields }
    }
}

/// Canonical casing for a known issue type, or the input unchanged.
pub fn canonical_issue_type(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    CANONICAL_ISSUE_TYPES
        .iter()
        .find(|(known, _)| *known == lower)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or_else(|| name.to_string())
}

/// `"PROJ"` becomes `{"key": "PROJ"}`.
pub fn coerce_project(value: FieldValue) -> Value {
    match value {
        FieldValue::Scalar(key) => serde_json::json!({ "key": key }),
        FieldValue::Structured(v) => v,
    }
}

/// `"bug"` becomes `{"name": "Bug"}`; unknown names keep their spelling.
pub fn coerce_issue_type(value: FieldValue) -> Value {
    match value {
        FieldValue::Scalar(name) => serde_json::json!({ "name": canonical_issue_type(&name) }),
        FieldValue::Structured(v) => v,
    }
}

/// `"ui"` becomes `["ui"]`; an empty string clears the list.
pub fn coerce_labels(value: FieldValue) -> Value {
    match value {
        FieldValue::Scalar(label) if label.is_empty() => Value::Array(Vec::new()),
        FieldValue::Scalar(label) => Value::Array(vec![Value::String(label)]),
        FieldValue::Structured(v) => v,
    }
}

/// `"jsmith"` becomes `{"name": "jsmith"}`; an empty string unassigns.
pub fn coerce_assignee(value: FieldValue) -> Value {
    match value {
        FieldValue::Scalar(name) if name.is_empty() => Value::Null,
        FieldValue::Scalar(name) => serde_json::json!({ "name": name }),
        FieldValue::Structured(Value::Array(mut names)) if !names.is_empty() => {
            match names.swap_remove(0) {
                Value::String(name) => serde_json::json!({ "name": name }),
                other => other,
            }
        }
        FieldValue::Structured(v) => v,
    }
}

/// Plain text becomes a rich-text document; documents pass through.
pub fn coerce_description(value: FieldValue) -> Value {
    match value {
        FieldValue::Scalar(text) => to_rich_text(&text).into_value(),
        FieldValue::Structured(v) => v,
    }
}

/// Digit-only strings become integers.
pub fn coerce_milestone(value: FieldValue) -> Value {
    match value {
        FieldValue::Scalar(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => s
            .parse::<u64>()
            .map(Value::from)
            .unwrap_or(Value::String(s)),
        FieldValue::Scalar(s) => Value::String(s),
        FieldValue::Structured(v) => v,
    }
}

/// Remove a key, treating an explicit `null` as absent.
fn take_present(raw: &mut RawIssueFields, key: &str) -> Option<Value> {
    raw.remove(key).filter(|v| !v.is_null())
}

/// Normalize a raw field map into the strict v3 create payload.
///
/// `issuetype` takes precedence over `issue_type` when both are present; the
/// output always uses `issuetype`.
///
/// # Errors
/// Returns [`Error::Validation`] when `project`, `summary`, or both issue
/// type keys are missing.
pub fn normalize(mut raw: RawIssueFields) -> Result<NormalizedIssueFields> {
    let project = take_present(&mut raw, PROJECT_FIELD)
        .ok_or_else(|| Error::Validation("Each issue must have a 'project' field".into()))?;
    let summary = take_present(&mut raw, SUMMARY_FIELD)
        .ok_or_else(|| Error::Validation("Each issue must have a 'summary' field".into()))?;

    let preferred = take_present(&mut raw, ISSUE_TYPE_FIELD);
    let legacy = take_present(&mut raw, LEGACY_ISSUE_TYPE_FIELD);
    let issue_type = preferred.or(legacy).ok_or_else(|| {
        Error::Validation("Each issue must have an 'issuetype' or 'issue_type' field".into())
    })?;

    let mut fields = Map::new();
    fields.insert(PROJECT_FIELD.into(), coerce_project(project.into()));
    fields.insert(SUMMARY_FIELD.into(), summary);
    fields.insert(ISSUE_TYPE_FIELD.into(), coerce_issue_type(issue_type.into()));

    if let Some(description) = take_present(&mut raw, DESCRIPTION_FIELD) {
        fields.insert(
            DESCRIPTION_FIELD.into(),
            coerce_description(description.into()),
        );
    }

    for (key, value) in raw {
        let value = match key.as_str() {
            LABELS_FIELD | ASSIGNEES_FIELD => coerce_labels(value.into()),
            ASSIGNEE_FIELD => coerce_assignee(value.into()),
            MILESTONE_FIELD => coerce_milestone(value.into()),
            _ => value,
        };
        fields.insert(key, value);
    }

    Ok(NormalizedIssueFields(fields))
}
