use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "nextaction", version, about = "GTD task manager")]
struct Cli {
    /// Database file (default: <data dir>/nextaction.db)
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Quick capture: `nextaction capture Buy milk @errands #tomorrow !flag`
    Capture {
        /// Capture text; tokens are joined with spaces
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
        /// Print the created task as JSON
        #[arg(long)]
        json: bool,
    },
    /// List tasks in a perspective
    List(commands::list::ListArgs),
    /// Task management
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Project management
    Project {
        #[command(subcommand)]
        action: commands::project::ProjectAction,
    },
    /// Context management
    Context {
        #[command(subcommand)]
        action: commands::context::ContextAction,
    },
    /// Edit the batch selection
    Select {
        #[command(subcommand)]
        action: commands::select::SelectAction,
    },
    /// Apply an operation to every selected task
    Batch {
        #[command(subcommand)]
        action: commands::select::BatchAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Export tasks as text, Markdown or CSV
    Export(commands::export::ExportArgs),
    /// Copy the database next to itself with a timestamp
    Backup,
    /// Generate shell completions
    Completions {
        shell: clap_complete::Shell,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("NEXTACTION_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let db = cli.db.as_deref();
    let result = match cli.command {
        Commands::Capture { text, json } => commands::capture::run(db, &text.join(" "), json),
        Commands::List(args) => commands::list::run(db, args),
        Commands::Task { action } => commands::task::run(db, action),
        Commands::Project { action } => commands::project::run(db, action),
        Commands::Context { action } => commands::context::run(db, action),
        Commands::Select { action } => commands::select::run(db, action),
        Commands::Batch { action } => commands::select::run_batch(db, action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Export(args) => commands::export::run(db, args),
        Commands::Backup => commands::export::run_backup(db),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "nextaction", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
