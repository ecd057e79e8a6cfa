//! quizflow CLI — adaptive quiz sessions in the terminal.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "quizflow", version, about = "Adaptive-learning quiz sessions in the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available topics
    Topics {
        /// Backend to query (defaults to the configured default)
        #[arg(long)]
        backend: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Run an interactive quiz session
    Run {
        /// Topic to study
        #[arg(long)]
        subject: String,

        /// Backend to run against (defaults to the configured default)
        #[arg(long)]
        backend: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create a starter config file
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("quizflow=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Topics { backend, config } => commands::topics::execute(backend, config).await,
        Commands::Run {
            subject,
            backend,
            config,
        } => commands::run::execute(subject, backend, config).await,
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
