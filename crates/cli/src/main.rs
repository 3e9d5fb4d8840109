//! Folio CLI: the main entry point.
//!
//! Commands:
//! - `init`: Write a default config file
//! - `ask`: Answer one question about the indexed document
//! - `chat`: Interactive question answering in one session
//! - `history`: Print a session's message log
//! - `status`: Show configuration, index and sessions

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "folio",
    about = "Folio — ask questions about your PDF pages",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file to ~/.folio/config.toml
    Init,

    /// Answer a single question
    Ask {
        /// The question
        question: String,

        /// Session to continue (a new one is started otherwise)
        #[arg(short, long)]
        session: Option<String>,

        /// Reason step by step instead of answering in one pass
        #[arg(long)]
        react: bool,

        /// Attach a page image to the question (repeatable)
        #[arg(long = "image", value_name = "KEY", conflicts_with = "react")]
        images: Vec<String>,
    },

    /// Chat interactively
    Chat {
        /// Session to continue (a new one is started otherwise)
        #[arg(short, long)]
        session: Option<String>,

        /// Reason step by step instead of answering in one pass
        #[arg(long)]
        react: bool,
    },

    /// Show the message log of a session
    History {
        #[arg(short, long)]
        session: String,
    },

    /// Show configuration, index and session status
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init => commands::init::run().await?,
        Commands::Ask {
            question,
            session,
            react,
            images,
        } => commands::ask::run(&question, session, react, &images).await?,
        Commands::Chat { session, react } => commands::chat::run(session, react).await?,
        Commands::History { session } => commands::history::run(&session).await?,
        Commands::Status => commands::status::run().await?,
    }

    Ok(())
}
