//! `export` and `backup`.

use chrono::Utc;
use clap::Args;
use std::path::{Path, PathBuf};

use nextaction_core::export::{self, ExportFormat};
use nextaction_core::perspective::sort_for_display;
use nextaction_core::Perspective;

use super::{open_engine, CliResult};

#[derive(Args)]
pub struct ExportArgs {
    /// text, markdown or csv
    #[arg(long, default_value = "text")]
    format: ExportFormat,
    /// Write to this file (or a generated name inside this directory) instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,
    /// Export only this perspective (default: every task)
    #[arg(long)]
    perspective: Option<Perspective>,
}

pub fn run(db: Option<&Path>, args: ExportArgs) -> CliResult {
    let engine = open_engine(db)?;
    let snapshot = engine.snapshot()?;
    let now = Utc::now();

    let tasks = match args.perspective {
        Some(p) => engine.perspective_of(&snapshot, p, now),
        None => {
            let mut all = snapshot.tasks.clone();
            sort_for_display(&mut all);
            all
        }
    };

    let rendered = export::render(&tasks, &snapshot, args.format, now);
    match args.output {
        Some(path) => {
            let path = if path.is_dir() {
                path.join(export::export_file_name(args.format, now))
            } else {
                path
            };
            std::fs::write(&path, rendered)?;
            println!("Exported {} task(s) to {}", tasks.len(), path.display());
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

pub fn run_backup(db: Option<&Path>) -> CliResult {
    let engine = open_engine(db)?;
    let dest = export::backup(engine.store(), Utc::now())?;
    println!("Backup written: {}", dest.display());
    Ok(())
}
