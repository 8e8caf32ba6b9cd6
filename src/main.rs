use scuttle::cli;
use scuttle::config;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "scuttle", version, about = "Small tool-calling agent runtime")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Model config id to use (overrides the config default)
    #[arg(short, long)]
    model: Option<String>,

    /// Action language: "function-calling" or "json-action"
    #[arg(short, long)]
    language: Option<String>,

    /// Maximum loop iterations per run
    #[arg(long)]
    max_iterations: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Explore a directory tree and answer questions about it
    Explore {
        /// Root directory the agent may inspect
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// Task for the agent (defaults to a project-architecture summary)
        task: Option<String>,
    },
    /// Generate a README for the project in the given directory
    Readme {
        /// Project directory
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
    /// Print the tool catalog the explorer agent exposes
    Tools {
        /// Root directory used to assemble the catalog
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing with an env-filtered fmt subscriber.
    {
        use tracing_subscriber::layer::SubscriberExt;
        use tracing_subscriber::util::SubscriberInitExt;

        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let cli = Cli::parse();
    let config_path = cli
        .config
        .unwrap_or_else(|| scuttle::scuttle_home().join("config.yaml"));

    info!(path = %config_path.display(), "loading configuration");
    let cfg = config::Config::load(&config_path).await?;

    let opts = cli::RunOpts {
        model: cli.model,
        language: cli.language,
        max_iterations: cli.max_iterations,
    };

    match cli.command {
        Command::Explore { root, task } => {
            cli::run_explore(&cfg, &opts, &root, task.as_deref()).await
        }
        Command::Readme { root } => cli::run_readme(&cfg, &opts, &root).await,
        Command::Tools { root } => cli::print_tool_catalog(&root),
    }
}
