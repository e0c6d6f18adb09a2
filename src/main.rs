//! # Dharma CLI (`dharma`)
//!
//! ## Usage
//!
//! ```bash
//! dharma --config ./config/dharma.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `dharma serve` | Start the HTTP server |
//! | `dharma ask "<query>"` | Route one query and print the answer |
//! | `dharma lookup <chapter> <verse>` | Print one verse from the chapter files |
//! | `dharma classify "<query>"` | Show how a query would be routed |
//! | `dharma scriptures` | List scripture profiles and their data health |
//!
//! Without a config file the built-in Bhagavad Gita profile is used, with
//! chapter files under `data/bhagavad-gita`.
//!
//! Log output goes to stderr and is controlled by `RUST_LOG` (default `info`).

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use dharma::config::{self, Config};
use dharma::lookup::{find_verse, render_lookup};
use dharma::models::{QueryResponse, VerseReference};
use dharma::render::{parse_response, render_terminal};
use dharma::router::QueryRouter;
use dharma::scripture::ScriptureRegistry;
use dharma::{server, sources};

/// Dharma: answer questions about scripture from verse files and a
/// document-grounded text-generation service.
#[derive(Parser)]
#[command(name = "dharma", version, about = "Scripture query router")]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/dharma.toml`. A missing file falls back to the
    /// built-in defaults.
    #[arg(long, global = true, default_value = "./config/dharma.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server on `[server].bind`.
    Serve,

    /// Route a single query and print the answer.
    Ask {
        query: String,

        /// Print the raw JSON response instead of rendered sections.
        #[arg(long)]
        json: bool,

        /// Print commentaries in full instead of a preview.
        #[arg(long)]
        full: bool,
    },

    /// Look up an exact verse. Never touches the network.
    Lookup {
        chapter: i64,
        verse: i64,

        /// Scripture profile id. Defaults to `[scriptures].default`.
        #[arg(long)]
        scripture: Option<String>,
    },

    /// Print the scripture and classification for a query.
    Classify { query: String },

    /// List scripture profiles with data directory and store status.
    Scriptures,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        return config::load_config(path);
    }
    tracing::warn!(
        "config file {} not found, using built-in defaults",
        path.display()
    );
    Ok(Config::minimal())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let cfg = load_or_default(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Ask { query, json, full } => {
            let router = QueryRouter::from_config(&cfg)?;
            let response: QueryResponse = router.route(&query).await.into();

            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                println!("[{}] {}\n", response.scripture, response.query_type);
                print!("{}", render_terminal(&parse_response(&response.response), full));
            }
        }
        Commands::Lookup {
            chapter,
            verse,
            scripture,
        } => {
            let registry = ScriptureRegistry::from_config(&cfg)?;
            let profile = match scripture.as_deref() {
                Some(id) => registry
                    .get(id)
                    .ok_or_else(|| anyhow!("unknown scripture '{}'", id))?,
                None => registry.default_profile(),
            };

            let reference = VerseReference::new(chapter, verse);
            let lookup = find_verse(profile, reference).await?;
            let text = render_lookup(profile, reference, &lookup);
            print!("{}", render_terminal(&parse_response(&text), true));
        }
        Commands::Classify { query } => {
            let router = QueryRouter::from_config(&cfg)?;
            let profile = router.registry().detect(&query);
            let classification = router.classifier().classify(&query, profile).await;
            println!("scripture: {}", profile.id);
            println!("mode: {:?}", router.classifier().mode());
            println!("{}", classification);
        }
        Commands::Scriptures => {
            let registry = ScriptureRegistry::from_config(&cfg)?;
            sources::list_sources(&registry);
        }
    }

    Ok(())
}
