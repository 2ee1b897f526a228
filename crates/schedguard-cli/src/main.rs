//! `schedguard` - database-mediated leader election for a multi-replica
//! scheduler.
//!
//! # Quick start
//!
//! ```bash
//! # Run a coordinator node, supervising the real scheduler binary.
//! schedguard coordinator run --config schedguard.toml -- airflow scheduler
//!
//! # Watch the cluster from an operator terminal.
//! schedguard observer run --config schedguard.toml
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// schedguard - keeps exactly one scheduler replica active across a fleet.
#[derive(Parser)]
#[command(name = "schedguard")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Coordinator node commands (election, liveness, child supervision).
    #[command(subcommand)]
    Coordinator(CoordinatorCommands),

    /// Observer commands (cluster view, start/stop, operator REPL).
    #[command(subcommand)]
    Observer(ObserverCommands),

    /// Configuration inspection.
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum CoordinatorCommands {
    /// Run the coordinator loop forever, supervising PROGRAM [ARGS...].
    Run {
        /// Directory containing schedguard.toml; falls back to layered defaults.
        #[arg(short, long)]
        config: Option<String>,

        /// Skip AWS instance-metadata discovery and use this address.
        #[arg(long)]
        address: Option<String>,

        /// The scheduler binary to supervise while this node is leader.
        #[arg(trailing_var_arg = true, required = true)]
        program: Vec<String>,
    },
}

#[derive(Subcommand)]
enum ObserverCommands {
    /// Connect to the bus and store and open the operator REPL.
    Run {
        /// Directory containing schedguard.toml; falls back to layered defaults.
        #[arg(short, long)]
        config: Option<String>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective, fully-layered configuration.
    Show {
        /// Directory containing schedguard.toml; falls back to layered defaults.
        #[arg(short, long)]
        config: Option<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let runtime = tokio::runtime::Runtime::new()?;
    match cli.command {
        Commands::Coordinator(CoordinatorCommands::Run { config, address, program }) => {
            runtime.block_on(commands::coordinator::run(config, address, program))
        }
        Commands::Observer(ObserverCommands::Run { config }) => {
            runtime.block_on(commands::observer::run(config))
        }
        Commands::Config(ConfigCommands::Show { config }) => commands::config::show(config),
    }
}
