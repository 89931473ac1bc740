//! Context management commands for CLI.

use clap::Subcommand;
use std::path::Path;

use nextaction_core::{Config, TaskStore};

use super::{open_db, print_json, report_created, CliResult};

#[derive(Subcommand)]
pub enum ContextAction {
    /// Create a context
    Create {
        /// Name, with or without a leading @
        name: String,
        /// #RRGGBB colour (default: capture.default_context_color)
        #[arg(long)]
        color: Option<String>,
    },
    /// List contexts
    List {
        #[arg(long)]
        json: bool,
    },
    /// Delete a context by id or name
    Delete {
        context: String,
    },
}

pub fn run(db: Option<&Path>, action: ContextAction) -> CliResult {
    let db = open_db(db)?;

    match action {
        ContextAction::Create { name, color } => {
            let color = match color {
                Some(c) => c,
                None => Config::load()?.capture.default_context_color,
            };
            let id = db.create_context(&name, &color)?;
            report_created("Context", id);
        }
        ContextAction::List { json } => {
            let contexts = db.load_all_contexts()?;
            if json {
                return print_json(&contexts);
            }
            for context in contexts {
                println!("{:>4} @{} {}", context.id, context.name, context.color);
            }
        }
        ContextAction::Delete { context } => {
            let id = match context.parse::<i64>() {
                Ok(id) => id,
                Err(_) => {
                    db.find_context_by_name(&context)?
                        .ok_or_else(|| format!("unknown context: {context}"))?
                        .id
                }
            };
            db.delete_context(id)?;
            println!("Context deleted: {id}");
        }
    }
    Ok(())
}
