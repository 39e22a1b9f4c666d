mod commands;
mod formatting;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "genlock")]
#[command(about = "Run LLM code and doc generation only when the sources changed")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true, default_value = genlock_core::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Lockfile path (defaults to genlock.lock next to the config)
    #[arg(long, global = true)]
    lock: Option<PathBuf>,

    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[arg(short, long, global = true, action)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    Run {
        tasks: Vec<String>,
        #[arg(long, action)]
        force: bool,
        #[arg(long, action, conflicts_with = "force")]
        dry_run: bool,
    },
    Status {
        tasks: Vec<String>,
        #[arg(long, action)]
        json: bool,
    },
    List {
        #[arg(long, action)]
        json: bool,
    },
    Hash {
        task: String,
        #[arg(long, action)]
        json: bool,
    },
    Init,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.quiet {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(log_level).into())
        .with_env_var("GENLOCK_LOG")
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let ctx = commands::Context::new(cli.config, cli.lock);

    let code = match cli.command {
        Commands::Run {
            tasks,
            force,
            dry_run,
        } => commands::cmd_run(&ctx, tasks, force, dry_run)?,
        Commands::Status { tasks, json } => commands::cmd_status(&ctx, tasks, json)?,
        Commands::List { json } => commands::cmd_list(&ctx, json)?,
        Commands::Hash { task, json } => commands::cmd_hash(&ctx, task, json)?,
        Commands::Init => commands::cmd_init(&ctx)?,
    };

    if code != 0 {
        std::process::exit(code);
    }

    Ok(())
}
