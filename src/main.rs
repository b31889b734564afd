//! # Coursebot CLI (`coursebot`)
//!
//! Command-line interface for the course-document assistant.
//!
//! ## Usage
//!
//! ```bash
//! coursebot --config ./config/coursebot.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `coursebot init` | Create the SQLite database and collection |
//! | `coursebot setup` | Ingest the data directory once |
//! | `coursebot chat` | Set up, then start the interactive session |
//! | `coursebot ask "<q>"` | Set up, then answer a single question |
//! | `coursebot query "<text>"` | Show the nearest stored documents |
//! | `coursebot status` | Show collection metadata and entries |
//!
//! Logs go to stderr and are controlled by `RUST_LOG`; answers go to stdout.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use coursebot::app::App;
use coursebot::config::{self, Config};
use coursebot::db;
use coursebot::embedding::Embedder;
use coursebot::ingest::SetupReport;
use coursebot::repl;
use coursebot::store::{SqliteStore, VectorStore};

/// Coursebot: ask questions about your course documents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. When the file does not exist, built-in defaults are used.
#[derive(Parser)]
#[command(
    name = "coursebot",
    about = "Retrieval-augmented chat assistant for course documents",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/coursebot.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema and collection. Idempotent.
    Init,

    /// Embed every document in the data directory into the collection.
    ///
    /// Does nothing once the collection has been set up.
    Setup,

    /// Start an interactive chat session.
    Chat,

    /// Answer a single question and exit.
    Ask {
        /// The question to ask.
        question: String,
    },

    /// Print the nearest stored documents for a piece of text.
    Query {
        /// Text to embed and look up.
        text: String,

        /// Number of documents to return. Defaults to `retrieval.k`.
        #[arg(long)]
        k: Option<usize>,
    },

    /// Show collection metadata, setup state, and stored ids.
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,coursebot=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Init => {
            db::open(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Setup => {
            let app = App::from_config(&cfg).await?;
            let report = app.setup().await?;
            print_setup_report(&report);
        }
        Commands::Chat => {
            let mut app = App::from_config(&cfg).await?;
            let report = app.setup().await?;
            print_setup_report(&report);
            println!();

            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let mut stdout = std::io::stdout();
            repl::run(&mut app, stdin, &mut stdout).await?;
        }
        Commands::Ask { question } => {
            let mut app = App::from_config(&cfg).await?;
            app.setup().await?;

            let result = app.ask(&question).await;
            print!("{}", repl::render_messages(app.session().history()));
            let answer = result?;
            print!("{}", repl::render_sources(&answer));
        }
        Commands::Query { text, k } => {
            run_query(&cfg, &text, k.unwrap_or(cfg.retrieval.k)).await?;
        }
        Commands::Status => {
            run_status(&cfg).await?;
        }
    }

    Ok(())
}

fn print_setup_report(report: &SetupReport) {
    match report {
        SetupReport::AlreadyInitialized { entries } => {
            println!("Vector store already set up ({} documents).", entries);
        }
        SetupReport::Ingested { ingested, skipped } => {
            println!("Ingested {} documents.", ingested.len());
            if !skipped.is_empty() {
                println!("Skipped {} files:", skipped.len());
                for s in skipped {
                    println!("  {}: {}", s.file, s.reason);
                }
            }
        }
    }
}

async fn run_query(cfg: &Config, text: &str, k: usize) -> Result<()> {
    let app = App::from_config(cfg).await?;
    let vector = app.embedder().embed(text).await?;
    let hits = app.store().query(&vector, k).await?;

    if hits.is_empty() {
        println!("No documents stored.");
        return Ok(());
    }

    let threshold = app.settings().distance_threshold;
    for (i, hit) in hits.iter().enumerate() {
        let marker = if hit.distance < threshold { "*" } else { " " };
        println!("{}{}. {} (distance {:.4})", marker, i + 1, hit.id, hit.distance);
    }
    Ok(())
}

async fn run_status(cfg: &Config) -> Result<()> {
    let pool = db::open(cfg).await?;
    let store = SqliteStore::new(pool, cfg.collection.name.clone());

    let info = store.info().await?;
    let ids = store.ids().await?;

    println!("Collection:   {}", info.name);
    println!("Metric:       {}", info.space);
    println!("HNSW M:       {}", info.hnsw_m);
    match info.initialized_at {
        Some(ts) => {
            let when = chrono::DateTime::from_timestamp(ts, 0)
                .map(|d| d.to_rfc3339())
                .unwrap_or_else(|| ts.to_string());
            println!("Set up:       yes ({})", when);
        }
        None => println!("Set up:       no"),
    }
    println!("Documents:    {}", ids.len());
    for id in ids {
        println!("  {}", id);
    }
    Ok(())
}
