/// Whole-call failures of the Jira client and orchestrator.
///
/// Per-item bulk failures are not errors; they come back as data in
/// [`mcp_jira_core::jira::ItemOutcome`].
#[derive(thiserror::Error, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] mcp_jira_core::Error),

    #[error("Jira API error [{status}]: {message}")]
    Remote {
        status: u16,
        message: String,
        body: String,
    },

    #[error("Network error: {0}")]
    Transport(String),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Core(mcp_jira_core::Error::Validation(message.into()))
    }

    /// Whether the caller sent something malformed, as opposed to a remote or network failure.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Core(mcp_jira_core::Error::Validation(_)))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Transport(format!("Request timed out: {err}"))
        } else {
            Error::Transport(err.to_string())
        }
    }
}

pub type JiraResult<T> = std::result::Result<T, Error>;
