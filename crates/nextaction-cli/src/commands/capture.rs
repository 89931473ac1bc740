//! Quick capture command.

use std::path::Path;

use super::{open_engine, print_json, report_created, CliResult};

pub fn run(db: Option<&Path>, text: &str, json: bool) -> CliResult {
    let engine = open_engine(db)?;
    let task = engine.capture(text)?;

    if json {
        print_json(&task)?;
    } else {
        report_created("Task", task.id);
    }
    Ok(())
}
