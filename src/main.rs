//! # Corpus Gate CLI (`cg`)
//!
//! The `cg` binary is the operator interface for Corpus Gate. It provides
//! commands for database initialization, source submission, moderation,
//! search, and corpus maintenance.
//!
//! ## Usage
//!
//! ```bash
//! cg --config ./config/cg.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cg init` | Create the SQLite database and run schema migrations |
//! | `cg submit <file>` | Submit a file as a new pending source and ingest it |
//! | `cg moderate approve <id>` | Approve a source, making it retrievable |
//! | `cg moderate reject <id>` | Reject a source, excluding it from retrieval |
//! | `cg sources` | List sources and their moderation status |
//! | `cg search "<query>"` | Rank the approved corpus against a query |
//! | `cg delete <id>` | Delete a source (cascades to chunks and relations) |
//! | `cg relate <from> <to>` | Record a typed relation between two sources |

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use corpus_gate::config::{self, Config};
use corpus_gate::db;
use corpus_gate::embedding;
use corpus_gate::engine::{Engine, NewSource};
use corpus_gate::migrate;
use corpus_gate::models::{ModerationStatus, RelationKind, SourceKind};
use corpus_gate::store::sqlite::SqliteStore;

/// Corpus Gate CLI: a moderated knowledge ingestion and semantic retrieval
/// engine.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file.
#[derive(Parser)]
#[command(
    name = "cg",
    about = "Corpus Gate: a moderated knowledge ingestion and semantic retrieval engine",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/cg.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables (sources,
    /// chunks, relations). Idempotent; running it multiple times is safe.
    Init,

    /// Submit a text file as a new source and ingest it.
    ///
    /// The source starts in `pending` status and stays invisible to search
    /// until approved.
    Submit {
        /// Path to the text file to ingest.
        file: PathBuf,

        /// Human-readable title for the source.
        #[arg(long)]
        title: String,

        /// Optional description.
        #[arg(long)]
        description: Option<String>,

        /// Source kind: document, image, video, webpage, api, or chat.
        #[arg(long, default_value = "document")]
        kind: String,

        /// Identifier of the submitting user.
        #[arg(long)]
        owner: String,
    },

    /// Moderate a source.
    Moderate {
        #[command(subcommand)]
        action: ModerateAction,
    },

    /// List sources and their moderation status.
    Sources {
        /// Filter by status: pending, approved, or rejected.
        #[arg(long)]
        status: Option<String>,
    },

    /// Rank the approved corpus against a query.
    ///
    /// Requires an embedding provider to be configured.
    Search {
        /// The search query string.
        query: String,

        /// Maximum number of results to return.
        #[arg(long)]
        limit: Option<usize>,

        /// Minimum cosine similarity for a result to be returned.
        #[arg(long)]
        min_similarity: Option<f32>,
    },

    /// Delete a source, cascading to its chunks and relations.
    Delete {
        /// Source UUID.
        id: String,
    },

    /// Record a directed relation between two sources.
    Relate {
        /// Source UUID of the edge origin.
        from: String,

        /// Source UUID of the edge target.
        to: String,

        /// Relation kind: related, part_of, references, contradicts, supports.
        #[arg(long, default_value = "related")]
        kind: String,

        /// Edge strength, 1 to 10.
        #[arg(long, default_value_t = 5)]
        strength: u8,
    },
}

/// Moderation subcommands.
#[derive(Subcommand)]
enum ModerateAction {
    /// Approve a pending (or rejected) source, making it retrievable.
    Approve {
        /// Source UUID.
        id: String,

        /// Identifier of the approving moderator.
        #[arg(long)]
        by: String,
    },

    /// Reject a pending or approved source, excluding it from retrieval.
    Reject {
        /// Source UUID.
        id: String,
    },
}

async fn build_engine(cfg: &Config) -> Result<Engine> {
    let pool = db::connect(&cfg.db.path).await?;
    let store = Arc::new(SqliteStore::new(pool));
    let provider: Arc<dyn embedding::EmbeddingProvider> =
        embedding::create_provider(&cfg.embedding)?.into();
    Ok(Engine::new(store, provider, cfg.chunking.clone()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "corpus_gate=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg.db.path).await?;
            migrate::run_migrations(&pool).await?;
            pool.close().await;
            println!("Database initialized successfully.");
        }
        Commands::Submit {
            file,
            title,
            description,
            kind,
            owner,
        } => {
            let kind = SourceKind::parse(&kind)
                .ok_or_else(|| anyhow::anyhow!("unknown source kind: {}", kind))?;
            let raw_text = std::fs::read_to_string(&file)?;

            let engine = build_engine(&cfg).await?;
            let source = engine
                .create_source(NewSource {
                    title,
                    description,
                    kind,
                    owner_id: owner,
                    metadata: serde_json::json!({
                        "origin_path": file.display().to_string(),
                    }),
                })
                .await?;
            let count = engine
                .ingest(&source.id, &raw_text, &serde_json::json!({}))
                .await?;

            println!("submitted {}", source.id);
            println!("  status: {}", source.status);
            println!("  chunks: {}", count);
        }
        Commands::Moderate { action } => {
            let engine = build_engine(&cfg).await?;
            // The CLI operator is trusted; the authorization decision is
            // made here at the boundary, not inside the engine.
            match action {
                ModerateAction::Approve { id, by } => {
                    let source = engine.approve(&id, &by, true).await?;
                    println!("approved {} (by {})", source.id, by);
                }
                ModerateAction::Reject { id } => {
                    let source = engine.reject(&id, true).await?;
                    println!("rejected {}", source.id);
                }
            }
        }
        Commands::Sources { status } => {
            let filter = match status.as_deref() {
                Some(s) => Some(
                    ModerationStatus::parse(s)
                        .ok_or_else(|| anyhow::anyhow!("unknown status: {}", s))?,
                ),
                None => None,
            };
            let engine = build_engine(&cfg).await?;
            let sources = engine.list_sources(filter).await?;
            if sources.is_empty() {
                println!("No sources.");
            }
            for s in sources {
                println!(
                    "{}  {:<9} {:<9} {}",
                    s.id,
                    s.status.as_str(),
                    s.kind.as_str(),
                    s.title
                );
            }
        }
        Commands::Search {
            query,
            limit,
            min_similarity,
        } => {
            let engine = build_engine(&cfg).await?;
            let results = engine
                .search(
                    &query,
                    limit.unwrap_or(cfg.retrieval.limit),
                    min_similarity.unwrap_or(cfg.retrieval.min_similarity),
                )
                .await?;

            if results.is_empty() {
                println!("No results.");
            }
            for (i, r) in results.iter().enumerate() {
                let excerpt: String = r.chunk.content.chars().take(160).collect();
                println!("{}. [{:.3}] {}", i + 1, r.similarity, r.source.title);
                println!("    source: {} ({})", r.source.id, r.source.kind.as_str());
                println!("    chunk: {} (index {})", r.chunk.id, r.chunk.chunk_index);
                println!("    excerpt: \"{}\"", excerpt.replace('\n', " "));
                println!();
            }
        }
        Commands::Delete { id } => {
            let engine = build_engine(&cfg).await?;
            engine.delete_source(&id).await?;
            println!("deleted {}", id);
        }
        Commands::Relate {
            from,
            to,
            kind,
            strength,
        } => {
            let kind = RelationKind::parse(&kind)
                .ok_or_else(|| anyhow::anyhow!("unknown relation kind: {}", kind))?;
            let engine = build_engine(&cfg).await?;
            let relation = engine.add_relation(&from, &to, kind, strength).await?;
            println!(
                "related {} -[{} {}]-> {}",
                relation.from_source,
                relation.kind.as_str(),
                relation.strength,
                relation.to_source
            );
        }
    }

    Ok(())
}
