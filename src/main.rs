//! # Concierge CLI
//!
//! The `concierge` binary drives the guesthouse question-answering
//! pipeline: schema setup, offline indexing, ad-hoc questions from the
//! terminal, and the HTTP query server.
//!
//! ## Usage
//!
//! ```bash
//! concierge --config ./config/concierge.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `concierge init` | Create the content database schema |
//! | `concierge index` | Chunk, embed, and upsert all CMS content |
//! | `concierge ask "<question>"` | Answer one question from the terminal |
//! | `concierge serve` | Start the HTTP query server |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use concierge::{ask, config, embedding, generate, index, migrate, server, store};

/// Retrieval-augmented question answering for a guesthouse CMS.
#[derive(Parser)]
#[command(
    name = "concierge",
    about = "Retrieval-augmented question answering over guesthouse CMS content",
    version,
    long_about = "Concierge indexes localized page content and hotel listings into a vector \
    store and answers visitor questions with a grounded chat-completion call, with locale-aware \
    retrieval and model-tier fallback."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/concierge.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the content database schema.
    ///
    /// Creates the SQLite tables the CMS materializes content into
    /// (`content_entries`, `hotels`). Idempotent.
    Init,

    /// Run the offline indexing job.
    ///
    /// Loads all content, flattens and chunks it, embeds each chunk, and
    /// upserts the batch into the vector store under deterministic point
    /// ids. Safe to re-run; unchanged content lands on the same ids.
    Index {
        /// Show document and chunk counts without writing anything.
        #[arg(long)]
        dry_run: bool,

        /// Maximum number of documents to process.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Answer one question from the terminal.
    Ask {
        /// The question to answer.
        question: String,

        /// Site-locale preference (en, tr, de, ru).
        #[arg(long)]
        locale: Option<String>,

        /// How many hits to retrieve (clamped to 1-12).
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Start the HTTP query server.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Content database initialized successfully.");
        }
        Commands::Index { dry_run, limit } => {
            index::run_index(&cfg, dry_run, limit).await?;
        }
        Commands::Ask {
            question,
            locale,
            top_k,
        } => {
            let embedder = embedding::Embedder::from_config(&cfg.embedding)?;
            let store = store::QdrantStore::new(&cfg.vector_store)?;
            let model = generate::OpenAiChat::new(&cfg.generation)?;

            let request = ask::AskRequest {
                question,
                locale,
                top_k,
                session_id: None,
                history: None,
                retrieval_question: None,
            };
            let response =
                ask::answer_question(&request, &cfg, &embedder, &store, &model).await?;

            println!("[{}] {}", response.answer_locale, response.answer);
            if !response.sources.is_empty() {
                println!();
                println!("sources:");
                for source in &response.sources {
                    println!("  [{:.2}] {} — {}", source.score, source.title, source.url);
                }
            }
            if let Some(model) = &response.model {
                println!();
                println!("model: {}", model);
            }
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
