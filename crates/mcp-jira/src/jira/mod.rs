pub mod client;
pub mod issues;
pub mod projects;
pub mod service;

use std::time::Duration;

use mcp_jira_core::jira::{select_auth, AuthConfig, AuthStrategy};

use crate::prelude::{println, *};

pub use client::JiraClient;
pub use service::IssueService;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Jira commands
#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// List all accessible projects
    #[clap(name = "projects")]
    Projects(projects::ProjectsOptions),

    /// List the issue types available in a project
    #[clap(name = "issue-types")]
    IssueTypes(projects::IssueTypesOptions),

    /// Get detailed information about an issue
    #[clap(name = "get")]
    Get(issues::GetOptions),

    /// Search issues using JQL
    #[clap(name = "search")]
    Search(issues::SearchOptions),

    /// Create a single issue
    #[clap(name = "create")]
    Create(issues::CreateOptions),

    /// Create up to 50 issues from a JSON file in one request
    #[clap(name = "bulk-create")]
    BulkCreate(issues::BulkCreateOptions),

    /// Add a comment to an issue
    #[clap(name = "comment")]
    Comment(issues::CommentOptions),

    /// List the workflow transitions available for an issue
    #[clap(name = "transitions")]
    Transitions(issues::TransitionsOptions),

    /// Move an issue through a workflow transition
    #[clap(name = "transition")]
    Transition(issues::TransitionOptions),
}

/// Jira configuration from environment variables
#[derive(Debug, Clone)]
pub struct JiraConfig {
    pub base_url: String,
    pub auth: AuthConfig,
    pub timeout: Duration,
}

impl JiraConfig {
    /// Load configuration from environment variables
    ///
    /// `JIRA_SERVER_URL` is required. Credentials come from `JIRA_AUTH_METHOD`,
    /// `JIRA_USERNAME`, `JIRA_PASSWORD` and `JIRA_TOKEN` (`JIRA_API_TOKEN` is
    /// accepted as a fallback for the token).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let base_url = non_empty("JIRA_SERVER_URL")
            .ok_or_else(|| eyre!("JIRA_SERVER_URL environment variable not set"))?;

        let timeout_secs = match non_empty("JIRA_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| {
                    eyre!("JIRA_TIMEOUT_SECS must be a positive number of seconds, got '{raw}'")
                })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            base_url,
            auth: AuthConfig {
                method: non_empty("JIRA_AUTH_METHOD"),
                username: non_empty("JIRA_USERNAME"),
                password: non_empty("JIRA_PASSWORD"),
                token: non_empty("JIRA_TOKEN").or_else(|| non_empty("JIRA_API_TOKEN")),
            },
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn auth_strategy(&self) -> Result<AuthStrategy> {
        select_auth(&self.auth).map_err(|e| eyre!(e))
    }

    /// Build the client and service once; the result is shared by every call.
    pub fn into_service(self) -> Result<IssueService> {
        let strategy = self.auth_strategy()?;
        let client = JiraClient::new(&self.base_url, &strategy, self.timeout)
            .context("Failed to create Jira client")?;
        Ok(IssueService::new(client))
    }
}

/// Run Jira commands
pub async fn run(cmd: Commands, global: crate::Global) -> Result<()> {
    if global.verbose {
        println!("Running Jira command...");
    }

    let service = JiraConfig::from_env()?.into_service()?;

    match cmd {
        Commands::Projects(options) => projects::projects_handler(&service, options).await,
        Commands::IssueTypes(options) => projects::issue_types_handler(&service, options).await,
        Commands::Get(options) => issues::get_handler(&service, options).await,
        Commands::Search(options) => issues::search_handler(&service, options).await,
        Commands::Create(options) => issues::create_handler(&service, options).await,
        Commands::BulkCreate(options) => issues::bulk_create_handler(&service, options).await,
        Commands::Comment(options) => issues::comment_handler(&service, options).await,
        Commands::Transitions(options) => issues::transitions_handler(&service, options).await,
        Commands::Transition(options) => issues::transition_handler(&service, options).await,
    }
}
