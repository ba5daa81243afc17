//! # Finsight CLI
//!
//! The `finsight` binary drives the finance-insight assistant: ask questions
//! from the terminal, manage the knowledge sheet, or start the web chat
//! surface.
//!
//! ## Usage
//!
//! ```bash
//! finsight --config ./config/finsight.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `finsight ask "<question>"` | One-shot answer from the knowledge base |
//! | `finsight records` | List the stored records |
//! | `finsight append [--file <path>]` | Append a JSON paste (file or stdin) |
//! | `finsight repair-header` | Restore missing columns in the header row |
//! | `finsight serve` | Start the web chat surface |
//!
//! Credentials come from the environment: `SHEETS_API_TOKEN` (spreadsheet
//! API bearer token) and `GOOGLE_API_KEY` (Gemini).

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;

use finsight::cache::SheetCache;
use finsight::genai::GeminiClient;
use finsight::{chat, config, ingest, server, sheets};

/// Finsight — a finance-insight chat assistant grounded in a spreadsheet
/// knowledge base of analyzed videos.
#[derive(Parser)]
#[command(
    name = "finsight",
    about = "Finsight — a finance-insight chat assistant over a spreadsheet knowledge base",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/finsight.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a question against the knowledge base and print the answer.
    Ask {
        /// The question to answer.
        question: String,

        /// Also run the critique pass over the answer.
        #[arg(long)]
        critique: bool,
    },

    /// Print the stored records as a numbered list.
    Records,

    /// Append a pasted JSON payload (object or array) to the sheet.
    ///
    /// Reads from `--file` when given, otherwise from stdin. The header row
    /// is self-repaired before appending.
    Append {
        /// Read the payload from this file instead of stdin.
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Restore missing schema columns in the sheet's header row.
    RepairHeader,

    /// Start the web chat surface.
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Ask { question, critique } => {
            let cache = SheetCache::new(cfg.retrieval.cache_ttl_secs);
            let client = GeminiClient::new(&cfg.model)?;

            let outcome = chat::ask(&cfg, &cache, &client, &question).await?;
            println!(
                "{}",
                chat::banner(outcome.matched, outcome.fallback, cfg.retrieval.fallback_recent)
            );
            println!();
            println!("{}", outcome.answer);

            if critique {
                let mut session = chat::Session::default();
                session.record_turn(question.trim(), &outcome);
                let review = chat::critique(&client, &session).await?;
                println!();
                println!("--- Critique ---");
                println!("{}", review);
            }
        }
        Commands::Records => {
            let snapshot = sheets::read_all(&cfg).await?;
            let records = snapshot.records();
            println!("Stored records: {}", records.len());
            for (i, record) in records.iter().enumerate() {
                println!("{:>4}  {}  ({})", i + 1, record.title, record.channel);
            }
        }
        Commands::Append { file } => {
            let text = match file {
                Some(path) => std::fs::read_to_string(&path)?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            let cache = SheetCache::new(cfg.retrieval.cache_ttl_secs);
            let appended = ingest::append_paste(&cfg, &cache, &text).await?;
            println!("Appended {} record(s).", appended);
        }
        Commands::RepairHeader => {
            let header = sheets::repair_header(&cfg).await?;
            println!("Header OK ({} columns): {}", header.len(), header.join(", "));
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
