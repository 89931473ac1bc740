//! Project management commands for CLI.

use clap::Subcommand;
use std::path::Path;

use nextaction_core::{ProjectId, ProjectType, TaskStore};

use super::{open_db, print_json, report_created, CliResult};

#[derive(Subcommand)]
pub enum ProjectAction {
    /// Create a new project
    Create {
        /// Project title
        title: String,
        /// sequential (one task at a time) or parallel
        #[arg(long = "type", default_value = "sequential")]
        project_type: ProjectType,
    },
    /// List all projects
    List {
        #[arg(long)]
        json: bool,
    },
    /// Rename a project
    Rename {
        id: ProjectId,
        title: String,
    },
    /// Switch between sequential and parallel
    SetType {
        id: ProjectId,
        project_type: ProjectType,
    },
    /// Delete a project; its tasks move to the inbox
    Delete {
        id: ProjectId,
    },
}

pub fn run(db: Option<&Path>, action: ProjectAction) -> CliResult {
    let db = open_db(db)?;

    match action {
        ProjectAction::Create {
            title,
            project_type,
        } => {
            let id = db.create_project(&title, project_type)?;
            report_created("Project", id);
        }
        ProjectAction::List { json } => {
            let projects = db.load_all_projects()?;
            if json {
                return print_json(&projects);
            }
            let tasks = db.load_all_tasks()?;
            for project in projects {
                let open = tasks
                    .iter()
                    .filter(|t| t.project_id == Some(project.id) && !t.is_done())
                    .count();
                println!(
                    "{:>4} {} [{}] {open} open",
                    project.id, project.title, project.project_type
                );
            }
        }
        ProjectAction::Rename { id, title } => {
            db.update_project_title(id, &title)?;
            println!("Project renamed: {id}");
        }
        ProjectAction::SetType { id, project_type } => {
            db.update_project_type(id, project_type)?;
            println!("Project {id} is now {project_type}");
        }
        ProjectAction::Delete { id } => {
            db.delete_project(id)?;
            println!("Project deleted: {id}");
        }
    }
    Ok(())
}
