//! Bulk creation result reconciliation.
//!
//! The bulk endpoint answers with two separate arrays: `issues` for the items
//! that were created and `errors` for the ones that were rejected, each error
//! carrying the position of the failed element. These functions turn that
//! response back into one outcome per submitted item, in submission order.

use std::collections::HashMap;

use serde::{Deserialize, Serialize, Serializer};

/// Largest batch the remote accepts in a single bulk request.
pub const MAX_BULK_ISSUES: usize = 50;

/// Body of a `POST /rest/api/3/issue/bulk` response.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct BulkCreateResponse {
    #[serde(default)]
    pub issues: Vec<CreatedIssue>,
    #[serde(default)]
    pub errors: Vec<BulkElementError>,
}

impl BulkCreateResponse {
    /// Parse a bulk response body, returning `None` for anything that does not
    /// carry at least one of the `issues` / `errors` arrays.
    pub fn from_body(body: &str) -> Option<Self> {
        let value: serde_json::Value = serde_json::from_str(body).ok()?;
        let object = value.as_object()?;
        if !object.contains_key("issues") && !object.contains_key("errors") {
            return None;
        }
        serde_json::from_value(value).ok()
    }
}

/// Reference to an issue the remote created.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct CreatedIssue {
    pub id: String,
    pub key: String,
    #[serde(rename = "self")]
    pub self_url: String,
}

/// One rejected element of a bulk request.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct BulkElementError {
    #[serde(rename = "failedElementNumber", default)]
    pub failed_element_number: Option<usize>,
    #[serde(rename = "elementErrors", default)]
    pub element_errors: ElementErrors,
    #[serde(default)]
    pub status: Option<u16>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ElementErrors {
    #[serde(rename = "errorMessages", default)]
    pub error_messages: Vec<String>,
    #[serde(default)]
    pub errors: serde_json::Map<String, serde_json::Value>,
}

impl BulkElementError {
    /// Human-readable message for this element.
    ///
    /// Joins the general messages with the per-field ones (`field: message`).
    pub fn message(&self) -> String {
        let mut parts: Vec<String> = self
            .element_errors
            .error_messages
            .iter()
            .filter(|m| !m.trim().is_empty())
            .cloned()
            .collect();

        for (field, detail) in &self.element_errors.errors {
            match detail {
                serde_json::Value::String(s) => parts.push(format!("{field}: {s}")),
                other => parts.push(format!("{field}: {other}")),
            }
        }

        if parts.is_empty() {
            match self.status {
                Some(status) => format!("Issue creation failed with status {status}"),
                None => "Issue creation failed".to_string(),
            }
        } else {
            parts.join("; ")
        }
    }
}

/// Where an item failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    /// Rejected locally before any request was made.
    Validation,
    /// Rejected by the remote service.
    Remote,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    pub stage: FailureStage,
    pub message: String,
}

impl ItemFailure {
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            stage: FailureStage::Validation,
            message: message.into(),
        }
    }

    pub fn remote(message: impl Into<String>) -> Self {
        Self {
            stage: FailureStage::Remote,
            message: message.into(),
        }
    }
}

/// Result for one item of a bulk request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Created(CreatedIssue),
    Failed(ItemFailure),
}

impl ItemOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, ItemOutcome::Created(_))
    }
}

/// Stable per-item tool output.
///
/// Serializes as `{key, id, self, success: true}` or
/// `{success: false, error}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueOutcome(pub ItemOutcome);

impl From<ItemOutcome> for IssueOutcome {
    fn from(outcome: ItemOutcome) -> Self {
        Self(outcome)
    }
}

impl IssueOutcome {
    pub fn is_success(&self) -> bool {
        self.0.is_created()
    }
}

impl Serialize for IssueOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        match &self.0 {
            ItemOutcome::Created(issue) => {
                let mut map = serializer.serialize_map(Some(4))?;
                map.serialize_entry("key", &issue.key)?;
                map.serialize_entry("id", &issue.id)?;
                map.serialize_entry("self", &issue.self_url)?;
                map.serialize_entry("success", &true)?;
                map.end()
            }
            ItemOutcome::Failed(failure) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("success", &false)?;
                map.serialize_entry("error", &failure.message)?;
                map.end()
            }
        }
    }
}

/// Map a bulk response back onto the `submitted` positions of the request.
///
/// `failedElementNumber` is a 0-based index into the submitted batch. Every
/// position without an error consumes the next entry of `issues`. A position
/// that has neither becomes a failure, so the result always has exactly
/// `submitted` entries in request order.
pub fn reconcile_bulk_response(submitted: usize, response: BulkCreateResponse) -> Vec<ItemOutcome> {
    let mut failures: HashMap<usize, String> = HashMap::new();
    let mut unplaced: Vec<String> = Vec::new();

    for error in &response.errors {
        match error.failed_element_number {
            Some(index) if index < submitted && !failures.contains_key(&index) => {
                failures.insert(index, error.message());
            }
            _ => unplaced.push(error.message()),
        }
    }

    let mut created = response.issues.into_iter();
    let mut unplaced = unplaced.into_iter();

    (0..submitted)
        .map(|index| {
            if let Some(message) = failures.remove(&index) {
                return ItemOutcome::Failed(ItemFailure::remote(message));
            }
            match created.next() {
                Some(issue) => ItemOutcome::Created(issue),
                None => ItemOutcome::Failed(ItemFailure::remote(
                    unplaced
                        .next()
                        .unwrap_or_else(|| "no result returned".to_string()),
                )),
            }
        })
        .collect()
}

/// Count created and failed outcomes.
pub fn tally(outcomes: &[ItemOutcome]) -> (usize, usize) {
    let created = outcomes.iter().filter(|o| o.is_created()).count();
    (created, outcomes.len() - created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn created(n: u32) -> CreatedIssue {
        CreatedIssue {
            id: format!("100{n}"),
            key: format!("PROJ-{n}"),
            self_url: format!("https://example.atlassian.net/rest/api/3/issue/100{n}"),
        }
    }

    fn element_error(index: usize, message: &str) -> BulkElementError {
        BulkElementError {
            failed_element_number: Some(index),
            element_errors: ElementErrors {
                error_messages: vec![message.to_string()],
                errors: serde_json::Map::new(),
            },
            status: Some(400),
        }
    }

    #[test]
    fn test_reconcile_all_created() {
        // Arrange
        let response = BulkCreateResponse {
            issues: vec![created(1), created(2)],
            errors: vec![],
        };

        // Act
        let outcomes = reconcile_bulk_response(2, response);

        // Assert
        assert_eq!(
            outcomes,
            vec![
                ItemOutcome::Created(created(1)),
                ItemOutcome::Created(created(2))
            ]
        );
    }

    #[test]
    fn test_reconcile_partial_failure() {
        // Arrange: index 0 created, index 1 rejected
        let response = BulkCreateResponse {
            issues: vec![created(1)],
            errors: vec![element_error(1, "Summary is required")],
        };

        // Act
        let outcomes = reconcile_bulk_response(2, response);

        // Assert
        assert_eq!(outcomes[0], ItemOutcome::Created(created(1)));
        assert_eq!(
            outcomes[1],
            ItemOutcome::Failed(ItemFailure::remote("Summary is required"))
        );
    }

    #[test]
    fn test_reconcile_failure_in_the_middle_keeps_order() {
        let response = BulkCreateResponse {
            issues: vec![created(1), created(3)],
            errors: vec![element_error(1, "bad")],
        };

        let outcomes = reconcile_bulk_response(3, response);

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0], ItemOutcome::Created(created(1)));
        assert!(!outcomes[1].is_created());
        assert_eq!(outcomes[2], ItemOutcome::Created(created(3)));
    }

    #[test]
    fn test_reconcile_missing_results_never_drop_items() {
        // Arrange: remote answered with nothing for the second item
        let response = BulkCreateResponse {
            issues: vec![created(1)],
            errors: vec![],
        };

        // Act
        let outcomes = reconcile_bulk_response(2, response);

        // Assert
        assert_eq!(outcomes.len(), 2);
        assert_eq!(
            outcomes[1],
            ItemOutcome::Failed(ItemFailure::remote("no result returned"))
        );
    }

    #[test]
    fn test_reconcile_unindexed_error_fills_gap() {
        let response = BulkCreateResponse {
            issues: vec![],
            errors: vec![BulkElementError {
                failed_element_number: None,
                element_errors: ElementErrors {
                    error_messages: vec!["Project does not exist".into()],
                    errors: serde_json::Map::new(),
                },
                status: Some(400),
            }],
        };

        let outcomes = reconcile_bulk_response(1, response);

        assert_eq!(
            outcomes,
            vec![ItemOutcome::Failed(ItemFailure::remote(
                "Project does not exist"
            ))]
        );
    }

    #[test]
    fn test_reconcile_ignores_out_of_range_index() {
        let response = BulkCreateResponse {
            issues: vec![created(1)],
            errors: vec![element_error(7, "stale")],
        };

        let outcomes = reconcile_bulk_response(1, response);

        assert_eq!(outcomes, vec![ItemOutcome::Created(created(1))]);
    }

    #[test]
    fn test_element_error_message_includes_field_errors() {
        // Arrange
        let error: BulkElementError = serde_json::from_value(json!({
            "status": 400,
            "elementErrors": {
                "errorMessages": [],
                "errors": {"summary": "You must specify a summary of the issue."}
            },
            "failedElementNumber": 0
        }))
        .unwrap();

        // Act
        let message = error.message();

        // Assert
        assert_eq!(message, "summary: You must specify a summary of the issue.");
    }

    #[test]
    fn test_element_error_message_falls_back_to_status() {
        let error = BulkElementError {
            failed_element_number: Some(0),
            element_errors: ElementErrors::default(),
            status: Some(403),
        };

        assert_eq!(error.message(), "Issue creation failed with status 403");
    }

    #[test]
    fn test_from_body_parses_bulk_shape() {
        let body = r#"{
            "issues": [{"id": "10001", "key": "PROJ-1", "self": "https://x/rest/api/3/issue/10001"}],
            "errors": [{"status": 400, "elementErrors": {"errorMessages": ["nope"]}, "failedElementNumber": 1}]
        }"#;

        let response = BulkCreateResponse::from_body(body).unwrap();

        assert_eq!(response.issues.len(), 1);
        assert_eq!(response.errors[0].failed_element_number, Some(1));
    }

    #[test]
    fn test_from_body_rejects_other_shapes() {
        assert!(BulkCreateResponse::from_body(r#"{"errorMessages": ["Unauthorized"]}"#).is_none());
        assert!(BulkCreateResponse::from_body("<html>oops</html>").is_none());
        assert!(BulkCreateResponse::from_body("[]").is_none());
    }

    #[test]
    fn test_issue_outcome_serialization() {
        // Arrange
        let ok = IssueOutcome(ItemOutcome::Created(created(1)));
        let failed = IssueOutcome(ItemOutcome::Failed(ItemFailure::validation(
            "Each issue must have a 'summary' field",
        )));

        // Act
        let ok_json = serde_json::to_value(&ok).unwrap();
        let failed_json = serde_json::to_value(&failed).unwrap();

        // Assert
        assert_eq!(
            ok_json,
            json!({
                "key": "PROJ-1",
                "id": "1001",
                "self": "https://example.atlassian.net/rest/api/3/issue/1001",
                "success": true
            })
        );
        assert_eq!(
            failed_json,
            json!({"success": false, "error": "Each issue must have a 'summary' field"})
        );
    }

    #[test]
    fn test_tally() {
        let outcomes = vec![
            ItemOutcome::Created(created(1)),
            ItemOutcome::Failed(ItemFailure::remote("x")),
            ItemOutcome::Created(created(2)),
        ];

        assert_eq!(tally(&outcomes), (2, 1));
    }
}
