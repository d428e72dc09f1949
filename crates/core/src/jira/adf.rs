//! Atlassian Document Format (ADF) conversion.
//!
//! Long-text fields in the v3 API (descriptions, comment bodies) must be sent
//! as an ADF tree instead of a plain string. [`to_rich_text`] builds the
//! minimal document for a plain string; [`render_adf`] goes the other way and
//! flattens a remote document back into readable text for tool output.

use serde::{Deserialize, Serialize};

pub const DOC_TYPE: &str = "doc";
pub const DOC_VERSION: u32 = 1;
pub const PARAGRAPH_TYPE: &str = "paragraph";
pub const TEXT_TYPE: &str = "text";

/// Top-level ADF document: `{type: "doc", version: 1, content: [...]}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichTextDocument {
    #[serde(rename = "type")]
    pub doc_type: String,
    pub version: u32,
    pub content: Vec<Block>,
}

/// A block-level node wrapping inline spans
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    #[serde(rename = "type")]
    pub block_type: String,
    pub content: Vec<Span>,
}

/// An inline text node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    #[serde(rename = "type")]
    pub span_type: String,
    pub text: String,
}

impl RichTextDocument {
    /// Convert the document into the JSON value sent on the wire.
    pub fn into_value(self) -> serde_json::Value {
        serde_json::json!({
            "type": self.doc_type,
            "version": self.version,
            "content": self
                .content
                .into_iter()
                .map(|block| serde_json::json!({
                    "type": block.block_type,
                    "content": block
                        .content
                        .into_iter()
                        .map(|span| serde_json::json!({ "type": span.span_type, "text": span.text }))
                        .collect::<Vec<_>>(),
                }))
                .collect::<Vec<_>>(),
        })
    }
}

/// Convert a plain string into a single-paragraph ADF document.
///
/// The input is kept verbatim in exactly one text span, including the empty
/// string. Newlines are not split into separate paragraphs.
pub fn to_rich_text(text: &str) -> RichTextDocument {
    RichTextDocument {
        doc_type: DOC_TYPE.to_string(),
        version: DOC_VERSION,
        content: vec![Block {
            block_type: PARAGRAPH_TYPE.to_string(),
            content: vec![Span {
                span_type: TEXT_TYPE.to_string(),
                text: text.to_string(),
            }],
        }],
    }
}

/// Whether a JSON value looks like an ADF document root.
pub fn is_document(value: &serde_json::Value) -> bool {
    value.get("type").and_then(|t| t.as_str()) == Some(DOC_TYPE)
}

/// Extract description from Jira field (handles both string and ADF)
///
/// # Arguments
/// * `value` - The description field value from Jira API
///
/// # Returns
/// * `Option<String>` - Extracted text, or None if empty/invalid
pub fn extract_description(value: Option<serde_json::Value>) -> Option<String> {
    value.and_then(|v| match &v {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Object(_) if is_document(&v) => render_adf(&v),
        _ => None,
    })
}

/// Render ADF (Atlassian Document Format) to readable text
///
/// Walks the document tree and keeps headings, bullets and code fences in a
/// markdown-like form.
pub fn render_adf(value: &serde_json::Value) -> Option<String> {
    let mut output = String::new();

    if let Some(content) = value.get("content").and_then(|c| c.as_array()) {
        for node in content {
            if let Some(rendered) = render_adf_node(node, 0) {
                output.push_str(&rendered);
                if !rendered.ends_with('\n') {
                    output.push('\n');
                }
            }
        }
    }

    let trimmed = output.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn render_children(node: &serde_json::Value, depth: usize) -> String {
    let mut text = String::new();
    if let Some(content) = node.get("content").and_then(|c| c.as_array()) {
        for child in content {
            if let Some(rendered) = render_adf_node(child, depth) {
                text.push_str(&rendered);
            }
        }
    }
    text
}

fn render_adf_node(node: &serde_json::Value, depth: usize) -> Option<String> {
    let node_type = node.get("type")?.as_str()?;
    let indent = "  ".repeat(depth);

    match node_type {
        "paragraph" => {
            let text = render_children(node, depth);
            if text.is_empty() {
                Some("\n".to_string())
            } else {
                Some(format!("{text}\n"))
            }
        }
        "heading" => {
            let level = node
                .get("attrs")
                .and_then(|a| a.get("level"))
                .and_then(|l| l.as_u64())
                .unwrap_or(1) as usize;
            let marker = "#".repeat(level.clamp(1, 6));
            let text = render_children(node, 0);
            Some(format!("{}{} {}\n", indent, marker, text.trim()))
        }
        "bulletList" | "orderedList" => {
            let mut text = String::new();
            if let Some(items) = node.get("content").and_then(|c| c.as_array()) {
                for item in items {
                    if let Some(rendered) = render_adf_node(item, depth + 1) {
                        text.push_str(&rendered);
                    }
                }
            }
            Some(text)
        }
        "listItem" => {
            let text = render_children(node, depth);
            // Items are rendered one level deeper than their list.
            let item_indent = "  ".repeat(depth.saturating_sub(1));
            Some(format!("{}• {}\n", item_indent, text.trim()))
        }
        "codeBlock" => {
            let text = render_children(node, 0);
            Some(format!("{indent}```\n{}\n{indent}```\n", text.trim_end()))
        }
        "text" => node
            .get("text")
            .and_then(|t| t.as_str())
            .map(|text| text.to_string()),
        "mention" => node
            .get("attrs")
            .and_then(|attrs| attrs.get("text"))
            .and_then(|t| t.as_str())
            .map(|text| {
                if text.starts_with('@') {
                    text.to_string()
                } else {
                    format!("@{text}")
                }
            }),
        "hardBreak" => Some("\n".to_string()),
        _ => {
            let text = render_children(node, depth);
            if text.is_empty() {
                None
            } else {
                Some(text)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_rich_text_single_paragraph() {
        // Act
        let doc = to_rich_text("X");

        // Assert: exactly one block with exactly one span
        assert_eq!(doc.doc_type, "doc");
        assert_eq!(doc.version, 1);
        assert_eq!(doc.content.len(), 1);
        assert_eq!(doc.content[0].block_type, "paragraph");
        assert_eq!(doc.content[0].content.len(), 1);
        assert_eq!(doc.content[0].content[0].span_type, "text");
        assert_eq!(doc.content[0].content[0].text, "X");
    }

    #[test]
    fn test_to_rich_text_empty_string() {
        let doc = to_rich_text("");

        assert_eq!(doc.content.len(), 1);
        assert_eq!(doc.content[0].content.len(), 1);
        assert_eq!(doc.content[0].content[0].text, "");
    }

    #[test]
    fn test_to_rich_text_keeps_newlines_in_one_span() {
        let doc = to_rich_text("line one\nline two");

        assert_eq!(doc.content.len(), 1);
        assert_eq!(doc.content[0].content[0].text, "line one\nline two");
    }

    #[test]
    fn test_to_rich_text_is_deterministic() {
        assert_eq!(to_rich_text("same input"), to_rich_text("same input"));
    }

    #[test]
    fn test_into_value_wire_shape() {
        // Act
        let value = to_rich_text("Test description").into_value();

        // Assert: matches the v3 payload shape
        assert_eq!(
            value,
            serde_json::json!({
                "type": "doc",
                "version": 1,
                "content": [
                    {
                        "type": "paragraph",
                        "content": [{ "type": "text", "text": "Test description" }]
                    }
                ]
            })
        );
    }

    #[test]
    fn test_into_value_matches_serde() {
        let doc = to_rich_text("serde");
        let via_serde = serde_json::to_value(&doc).unwrap();

        assert_eq!(doc.into_value(), via_serde);
    }

    #[test]
    fn test_is_document() {
        assert!(is_document(&to_rich_text("a").into_value()));
        assert!(!is_document(&serde_json::json!({"foo": "bar"})));
        assert!(!is_document(&serde_json::json!("doc")));
    }

    #[test]
    fn test_extract_description_string() {
        let value = Some(serde_json::Value::String(
            "This is a plain text description".to_string(),
        ));

        assert_eq!(
            extract_description(value),
            Some("This is a plain text description".to_string())
        );
    }

    #[test]
    fn test_extract_description_round_trips_formatter_output() {
        let value = Some(to_rich_text("Hello world").into_value());

        assert_eq!(extract_description(value), Some("Hello world".to_string()));
    }

    #[test]
    fn test_extract_description_adf_with_heading() {
        // Arrange
        let adf = serde_json::json!({
            "type": "doc",
            "content": [
                {
                    "type": "heading",
                    "attrs": {"level": 2},
                    "content": [{"type": "text", "text": "Important"}]
                },
                {
                    "type": "paragraph",
                    "content": [{"type": "text", "text": "This is important info"}]
                }
            ]
        });

        // Act
        let result = extract_description(Some(adf));

        // Assert
        assert_eq!(
            result,
            Some("## Important\nThis is important info".to_string())
        );
    }

    #[test]
    fn test_extract_description_adf_with_list() {
        let adf = serde_json::json!({
            "type": "doc",
            "content": [
                {
                    "type": "bulletList",
                    "content": [
                        {
                            "type": "listItem",
                            "content": [
                                {"type": "paragraph", "content": [{"type": "text", "text": "First item"}]}
                            ]
                        },
                        {
                            "type": "listItem",
                            "content": [
                                {"type": "paragraph", "content": [{"type": "text", "text": "Second item"}]}
                            ]
                        }
                    ]
                }
            ]
        });

        assert_eq!(
            extract_description(Some(adf)),
            Some("• First item\n• Second item".to_string())
        );
    }

    #[test]
    fn test_render_adf_mention_and_hard_break() {
        let adf = serde_json::json!({
            "type": "doc",
            "content": [
                {
                    "type": "paragraph",
                    "content": [
                        {"type": "text", "text": "ping "},
                        {"type": "mention", "attrs": {"id": "abc", "text": "@Jane"}},
                        {"type": "hardBreak"},
                        {"type": "text", "text": "thanks"}
                    ]
                }
            ]
        });

        assert_eq!(render_adf(&adf), Some("ping @Jane\nthanks".to_string()));
    }

    #[test]
    fn test_render_adf_code_block() {
        let adf = serde_json::json!({
            "type": "doc",
            "content": [
                {"type": "codeBlock", "content": [{"type": "text", "text": "cargo test"}]}
            ]
        });

        assert_eq!(render_adf(&adf), Some("```\ncargo test\n```".to_string()));
    }

    #[test]
    fn test_render_adf_empty_document() {
        let adf = serde_json::json!({"type": "doc", "version": 1, "content": []});

        assert_eq!(render_adf(&adf), None);
    }

    #[test]
    fn test_extract_description_none() {
        assert_eq!(extract_description(None), None);
    }

    #[test]
    fn test_extract_description_non_adf_object() {
        let value = Some(serde_json::json!({"foo": "bar"}));

        assert_eq!(extract_description(value), None);
    }
}
