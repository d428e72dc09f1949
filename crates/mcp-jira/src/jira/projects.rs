use clap::Args;
use colored::Colorize;

use super::IssueService;
use crate::prelude::{println, *};

#[derive(Args, Debug, Clone)]
pub struct ProjectsOptions {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct IssueTypesOptions {
    /// Project key (e.g., PROJ)
    pub project_key: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn projects_handler(service: &IssueService, options: ProjectsOptions) -> Result<()> {
    let projects = service.get_projects().await?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&projects)?);
        return Ok(());
    }

    println!("Found {} project(s):\n", projects.len());

    let mut table = new_table();
    table.add_row(prettytable::row!["Key", "Name", "ID", "Lead"]);
    for project in &projects {
        table.add_row(prettytable::row![
            project.key.cyan().to_string(),
            project.name,
            project.id,
            project.lead.as_deref().unwrap_or("-")
        ]);
    }
    table.printstd();

    Ok(())
}

pub async fn issue_types_handler(service: &IssueService, options: IssueTypesOptions) -> Result<()> {
    let issue_types = service
        .get_project_issue_types(&options.project_key)
        .await?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&issue_types)?);
        return Ok(());
    }

    let mut table = new_table();
    table.add_row(prettytable::row!["ID", "Name", "Subtask", "Description"]);
    for issue_type in &issue_types {
        let subtask = match issue_type.subtask {
            Some(true) => "yes".bright_black().to_string(),
            _ => String::new(),
        };
        table.add_row(prettytable::row![
            issue_type.id,
            issue_type.name.bright_blue().to_string(),
            subtask,
            issue_type.description.as_deref().unwrap_or("")
        ]);
    }
    table.printstd();

    Ok(())
}
