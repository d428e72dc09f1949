//! Core library for mcp-jira
//!
//! This crate implements the **Functional Core** of the mcp-jira server,
//! following the Functional Core - Imperative Shell architectural pattern.
//!
//! # Architecture Overview
//!
//! The project uses a two-crate architecture to enforce separation of concerns:
//!
//! - **`mcp_jira_core`** (this crate): Pure transformation functions with zero I/O
//! - **`mcp-jira`**: HTTP calls, orchestration, CLI and MCP server (the Imperative Shell)
//!
//! ## Functional Core Principles
//!
//! All functions in this crate adhere to these principles:
//!
//! - **Pure functions**: Same input always produces the same output
//! - **No side effects**: No I/O operations, no external state mutations
//! - **Testable**: Can be tested with simple fixture data, no mocking required
//!
//! # Module Organization
//!
//! - [`jira::fields`]: Normalizes loosely-typed issue fields into the v3 create shape
//! - [`jira::adf`]: Plain text to Atlassian Document Format and back
//! - [`jira::auth`]: Picks basic or token authentication from configuration
//! - [`jira::bulk`]: Maps bulk-create responses back onto submitted items
//! - [`jira::payloads`]: Comment, transition and project request bodies
//! - [`jira`]: Response types and transforms into the stable tool output
//!
//! # Example Usage
//!
//! ```rust
//! use mcp_jira_core::jira::fields::normalize;
//! use serde_json::json;
//!
//! let raw = json!({
//!     "project": "PROJ",
//!     "summary": "Login fails",
//!     "issue_type": "bug",
//! });
//!
//! let fields = normalize(raw.as_object().cloned().unwrap_or_default()).unwrap();
//!
//! assert_eq!(fields.project_key(), Some("PROJ"));
//! assert_eq!(fields.issue_type_name(), Some("Bug"));
//! ```

pub mod error;
pub mod jira;

pub use error::{Error, Result};
