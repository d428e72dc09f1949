//! Issue commands: get, search, create, bulk-create, comment, transitions.

use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use mcp_jira_core::jira::{IssueOutcome, IssueOutput, ItemOutcome};

use super::IssueService;
use crate::prelude::{eprintln, println, *};

#[derive(Args, Debug, Clone)]
pub struct GetOptions {
    /// Issue key (e.g., PROJ-123)
    pub issue_key: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
#[command(after_help = "EXAMPLES:
  # Issues assigned to you that are still open:
  mcp-jira jira search \"assignee = currentUser() AND status NOT IN (Done, Closed)\"

  # Collect up to 50 issues across pages:
  mcp-jira jira search \"project = PROJ ORDER BY created DESC\" --limit 50")]
pub struct SearchOptions {
    /// JQL query (e.g., "project = PROJ AND status = Open")
    #[clap(env = "JIRA_QUERY")]
    pub jql: String,

    /// Maximum number of issues to collect
    #[arg(short, long, default_value = "10")]
    pub limit: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CreateOptions {
    /// Summary/title of the issue
    pub summary: String,

    /// Project key
    #[arg(long, env = "JIRA_PROJECT")]
    pub project: String,

    /// Issue type (Bug, Task, Story, Epic, ...; case-insensitive)
    #[arg(long, default_value = "Task")]
    pub issue_type: String,

    /// Plain-text description
    #[arg(long)]
    pub description: Option<String>,

    /// Assignee username
    #[arg(long)]
    pub assignee: Option<String>,

    /// Label to add (repeatable)
    #[arg(long = "label")]
    pub labels: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
#[command(after_help = "The file must hold a JSON array of field objects, for example:
  [
    {\"project\": \"PROJ\", \"summary\": \"First\", \"issue_type\": \"Bug\"},
    {\"project\": \"PROJ\", \"summary\": \"Second\", \"issuetype\": \"story\", \"labels\": \"ui\"}
  ]")]
pub struct BulkCreateOptions {
    /// Path to a JSON file with the issues to create ("-" reads stdin)
    pub file: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CommentOptions {
    /// Issue key (e.g., PROJ-123)
    pub issue_key: String,

    /// Comment text
    pub comment: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TransitionsOptions {
    /// Issue key (e.g., PROJ-123)
    pub issue_key: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TransitionOptions {
    /// Issue key (e.g., PROJ-123)
    pub issue_key: String,

    /// Transition id (see `mcp-jira jira transitions`)
    pub transition_id: String,

    /// Comment to add with the transition
    #[arg(long)]
    pub comment: Option<String>,

    /// Extra fields to set, as a JSON object (e.g., '{"resolution": {"name": "Fixed"}}')
    #[arg(long)]
    pub fields: Option<String>,
}

fn display_issue(issue: &IssueOutput) {
    std::println!(
        "\n{} - {}\n",
        issue.key.bold().cyan(),
        issue.summary.bright_white()
    );

    let mut table = new_table();
    table.add_row(prettytable::row![
        "Status".bold().cyan(),
        issue.status.as_deref().unwrap_or("-").green().to_string()
    ]);

    if let Some(issue_type) = &issue.issue_type {
        table.add_row(prettytable::row![
            "Type".bold().cyan(),
            issue_type.bright_blue().to_string()
        ]);
    }

    if let Some(priority) = &issue.priority {
        table.add_row(prettytable::row![
            "Priority".bold().cyan(),
            priority.bright_yellow().to_string()
        ]);
    }

    let assignee = match &issue.assignee {
        Some(name) => name.bright_magenta().to_string(),
        None => "Unassigned".bright_black().to_string(),
    };
    table.add_row(prettytable::row!["Assignee".bold().cyan(), assignee]);

    if let Some(reporter) = &issue.reporter {
        table.add_row(prettytable::row!["Reporter".bold().cyan(), reporter]);
    }

    if let Some(created) = &issue.created {
        table.add_row(prettytable::row![
            "Created".bold().cyan(),
            created.bright_black().to_string()
        ]);
    }

    if let Some(updated) = &issue.updated {
        table.add_row(prettytable::row![
            "Updated".bold().cyan(),
            updated.bright_black().to_string()
        ]);
    }

    table.printstd();

    if let Some(description) = &issue.description {
        std::println!("\n{}:", "Description".bold().cyan());
        std::println!("{}\n", description);
    }

    if !issue.labels.is_empty() {
        std::println!(
            "{}: {}",
            "Labels".bold().cyan(),
            issue.labels.join(", ").bright_green()
        );
    }

    if !issue.comments.is_empty() {
        std::println!("\n{}", "Comments:".bold().cyan());
        for (index, comment) in issue.comments.iter().enumerate() {
            std::println!(
                "{} {} {}",
                format!("{}.", index + 1).green(),
                comment.author.bright_magenta(),
                format!("[{}]", comment.created.as_deref().unwrap_or("")).blue()
            );
            std::println!("   {}", comment.body);
        }
    }
}

fn display_outcomes(outcomes: &[IssueOutcome]) {
    let mut table = new_table();
    table.add_row(prettytable::row!["#", "Result", "Key", "Detail"]);

    for (index, outcome) in outcomes.iter().enumerate() {
        match &outcome.0 {
            ItemOutcome::Created(issue) => table.add_row(prettytable::row![
                index + 1,
                "created".green().to_string(),
                issue.key.cyan().to_string(),
                issue.self_url
            ]),
            ItemOutcome::Failed(failure) => table.add_row(prettytable::row![
                index + 1,
                "failed".red().to_string(),
                "-",
                failure.message
            ]),
        };
    }

    table.printstd();
}

pub async fn get_handler(service: &IssueService, options: GetOptions) -> Result<()> {
    let issue = service.get_issue(&options.issue_key).await?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&issue)?);
    } else {
        display_issue(&issue);
    }

    Ok(())
}

pub async fn search_handler(service: &IssueService, options: SearchOptions) -> Result<()> {
    let data = service.search_issues(&options.jql, options.limit).await?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    println!("Found {} issue(s):\n", data.issues.len());

    if data.issues.is_empty() {
        println!("No issues found.");
        return Ok(());
    }

    let mut table = new_table();
    table.add_row(prettytable::row!["Key", "Summary", "Status", "Assignee"]);

    for issue in &data.issues {
        table.add_row(prettytable::row![
            &issue.key,
            &issue.summary,
            issue.status.as_deref().unwrap_or("-"),
            issue.assignee.as_deref().unwrap_or("Unassigned")
        ]);
    }

    table.printstd();

    if data.next_page_token.is_some() {
        eprintln!(
            "\nMore results available; raise --limit above {} to collect them.",
            options.limit
        );
    }

    Ok(())
}

pub async fn create_handler(service: &IssueService, options: CreateOptions) -> Result<()> {
    let mut fields = serde_json::json!({
        "project": options.project,
        "summary": options.summary,
        "issue_type": options.issue_type,
    });

    if let Some(description) = options.description {
        fields["description"] = serde_json::Value::String(description);
    }
    if let Some(assignee) = options.assignee {
        fields["assignee"] = serde_json::Value::String(assignee);
    }
    if !options.labels.is_empty() {
        fields["labels"] = serde_json::json!(options.labels);
    }

    let created = service.create_issue(fields).await?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&created)?);
    } else {
        println!(
            "{} {} ({})",
            "Created".green().bold(),
            created.key.cyan(),
            created.self_url
        );
    }

    Ok(())
}

pub async fn bulk_create_handler(
    service: &IssueService,
    options: BulkCreateOptions,
) -> Result<()> {
    let raw = if options.file.as_os_str() == "-" {
        std::io::read_to_string(std::io::stdin()).context("Failed to read issues from stdin")?
    } else {
        std::fs::read_to_string(&options.file)
            .with_context(|| format!("Failed to read {}", options.file.display()))?
    };

    let items: Vec<serde_json::Value> =
        serde_json::from_str(&raw).context("Issues file must contain a JSON array of objects")?;

    let outcomes = service.create_issues(items).await?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
    } else {
        display_outcomes(&outcomes);
        let created = outcomes.iter().filter(|o| o.is_success()).count();
        println!(
            "\n{} created, {} failed",
            created.to_string().green(),
            (outcomes.len() - created).to_string().red()
        );
    }

    Ok(())
}

pub async fn comment_handler(service: &IssueService, options: CommentOptions) -> Result<()> {
    let comment = service
        .add_comment(&options.issue_key, &options.comment)
        .await?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&comment)?);
    } else {
        println!(
            "{} comment {} on {}",
            "Added".green().bold(),
            comment.id,
            options.issue_key.cyan()
        );
    }

    Ok(())
}

pub async fn transitions_handler(
    service: &IssueService,
    options: TransitionsOptions,
) -> Result<()> {
    let transitions = service.get_transitions(&options.issue_key).await?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&transitions)?);
        return Ok(());
    }

    let mut table = new_table();
    table.add_row(prettytable::row!["ID", "Name", "To Status"]);
    for transition in &transitions {
        table.add_row(prettytable::row![
            transition.id,
            transition.name,
            transition.to_status.as_deref().unwrap_or("-")
        ]);
    }
    table.printstd();

    Ok(())
}

pub async fn transition_handler(service: &IssueService, options: TransitionOptions) -> Result<()> {
    let fields = match options.fields.as_deref() {
        Some(raw) => Some(
            serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(raw)
                .context("--fields must be a JSON object")?,
        ),
        None => None,
    };

    service
        .transition_issue(
            &options.issue_key,
            &options.transition_id,
            options.comment.as_deref(),
            fields,
        )
        .await?;

    println!(
        "{} {} with transition {}",
        "Transitioned".green().bold(),
        options.issue_key.cyan(),
        options.transition_id
    );

    Ok(())
}
