//! AceTeam CLI — run AI workflows locally or on the AceTeam Fabric.
//!
//! Local runs drive the `aceteam-nodes` Python runtime as a subprocess;
//! `--remote` runs go through the Fabric HTTP API. Both paths live in
//! aceteam-core; this binary only parses arguments and prints results.

use std::path::PathBuf;

use aceteam_cli::commands;
use clap::{Parser, Subcommand};
use console::style;

/// AceTeam CLI — Run AI workflows locally or on the Fabric
#[derive(Parser)]
#[command(name = "aceteam", version, about = "AceTeam CLI — Run AI workflows locally or on the Fabric")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the managed Python environment and install aceteam-nodes
    Init {
        /// Directory for the environment (default: ~/.ac/venv)
        #[arg(long)]
        venv_dir: Option<PathBuf>,
    },

    /// Run a workflow JSON file
    Run {
        /// Path to the workflow definition
        workflow: PathBuf,
        /// Workflow input as key=value (repeatable)
        #[arg(short = 'i', long = "input")]
        inputs: Vec<String>,
        /// Runtime config file passed through to aceteam-nodes
        #[arg(long)]
        config: Option<PathBuf>,
        /// Echo the runtime's log output
        #[arg(short, long)]
        verbose: bool,
        /// Execute on the AceTeam Fabric instead of locally
        #[arg(long)]
        remote: bool,
    },

    /// Validate a workflow JSON file without running it
    Validate {
        /// Path to the workflow definition
        workflow: PathBuf,
    },

    /// List node types provided by the installed runtime
    ListNodes,

    /// Remote execution on the AceTeam Fabric
    Fabric {
        #[command(subcommand)]
        action: FabricAction,
    },

    /// Inspect the CLI configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum FabricAction {
    /// Save Fabric credentials to the config file
    Login {
        /// Fabric API key
        #[arg(long, env = "ACETEAM_API_KEY")]
        api_key: String,
        /// Fabric base URL
        #[arg(long)]
        url: Option<String>,
    },
    /// List Fabric nodes
    Discover {
        /// Only nodes advertising this capability
        #[arg(long)]
        capability: Option<String>,
    },
    /// Show per-node load
    Status,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration (API key masked)
    Show,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aceteam_core=warn,aceteam_cli=info".into()),
        )
        .init();

    let result = match cli.command {
        Commands::Init { venv_dir } => commands::init::run(venv_dir).await,

        Commands::Run {
            workflow,
            inputs,
            config,
            verbose,
            remote,
        } => {
            commands::run::run(commands::run::RunArgs {
                workflow,
                inputs,
                config_path: config,
                verbose,
                remote,
            })
            .await
        }

        Commands::Validate { workflow } => commands::validate::run(&workflow).await,

        Commands::ListNodes => commands::nodes::list().await,

        Commands::Fabric { action } => match action {
            FabricAction::Login { api_key, url } => {
                commands::fabric::login(&api_key, url.as_deref())
            }
            FabricAction::Discover { capability } => {
                commands::fabric::discover(capability.as_deref()).await
            }
            FabricAction::Status => commands::fabric::status().await,
        },

        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show(),
        },
    };

    if let Err(e) = result {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        if let Some(suggestion) = &e.suggestion {
            eprintln!("{} {}", style("Hint:").yellow(), suggestion);
        }
        std::process::exit(1);
    }
}
