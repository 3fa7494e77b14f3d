mod cmd;
mod output;
mod root;
mod settings;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, repair::ItemKind, run::RunArgs};
use settings::Settings;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "reqflow",
    about = "Draft requirements and test cases with an LLM and file them in Jira",
    version,
    propagate_version = true
)]
struct Cli {
    /// Directory holding reqflow.yaml (default: search upward from cwd)
    #[arg(long, global = true, env = "REQFLOW_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Draft requirements and test cases, then file them as issues
    Run(RunArgs),

    /// Verify the Jira credentials and print the authenticated user
    Check,

    /// Recover a JSON array from a saved model response
    Repair {
        /// File holding the raw response text
        file: PathBuf,

        /// Also check the items as requirements or test cases
        #[arg(long = "as", value_enum)]
        kind: Option<ItemKind>,
    },

    /// Inspect and validate configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    // A missing .env is the normal case.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Run(_) | Commands::Check => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let settings = cli.settings;
    let json = cli.json;
    let result = match cli.command {
        Commands::Repair { file, kind } => cmd::repair::run(&file, kind, json),
        Commands::Run(args) => settings
            .into_config(&root)
            .and_then(|config| cmd::run::run(config, args, json)),
        Commands::Check => settings
            .into_config(&root)
            .and_then(|config| cmd::check::run(&config, json)),
        Commands::Config { subcommand } => settings
            .into_config(&root)
            .and_then(|config| cmd::config::run(&root, &config, subcommand, json)),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
