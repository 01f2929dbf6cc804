//! # Physician Finder CLI (`finder`)
//!
//! The `finder` binary manages the physician directory database and serves
//! the HTTP API.
//!
//! ## Usage
//!
//! ```bash
//! finder --config ./config/finder.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `finder init` | Create tables, triggers, and indexes |
//! | `finder check` | Verify the `pg_trgm` and `postgis` extensions |
//! | `finder import <path>` | Load NPPES registry records (JSON or JSONL) |
//! | `finder search "<query>"` | Search physicians |
//! | `finder get <npi>` | Show one physician |
//! | `finder stats` | Catalog summary |
//! | `finder serve` | Start the HTTP API |
//!
//! ## Examples
//!
//! ```bash
//! finder init
//! finder import ./data/nppes-il.jsonl
//! finder search "cardio" --state IL --sort-by name
//! finder get 1588667638 --json
//! finder serve
//! ```
//!
//! Logging goes to stderr and is controlled by `RUST_LOG`
//! (default `physician_finder=info`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use physician_finder::{config, get, import, migrate, search, server, stats};
use physician_finder_core::search::{SearchFilters, SearchParams, SortBy, SortOrder};

/// Physician Finder: search the NPPES physician directory.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/finder.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "finder",
    about = "Physician Finder: NPPES physician directory search",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// `DATABASE_URL` in the environment (or `.env`) overrides `db.url`.
    #[arg(long, global = true, default_value = "./config/finder.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Safe to run repeatedly.
    Init,

    /// Check that required Postgres extensions are installed.
    Check,

    /// Import NPPES registry records from a JSON or JSONL file.
    Import {
        /// File to read.
        path: PathBuf,

        /// Overwrite physicians that already exist instead of skipping them.
        #[arg(long)]
        replace: bool,

        /// Parse and normalize only; nothing is written.
        #[arg(long)]
        dry_run: bool,
    },

    /// Search physicians by name or specialty.
    Search {
        /// Free-text query; omit to browse.
        query: Option<String>,

        /// Two-letter state code (exact match, case-insensitive).
        #[arg(long)]
        state: Option<String>,

        /// ZIP prefix filter.
        #[arg(long)]
        zip: Option<String>,

        #[arg(long)]
        page: Option<i64>,

        #[arg(long)]
        limit: Option<i64>,

        /// `name` or `specialty`.
        #[arg(long)]
        sort_by: Option<SortBy>,

        /// `asc` or `desc`.
        #[arg(long)]
        sort_order: Option<SortOrder>,

        /// Print the raw action JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show a physician by NPI.
    Get {
        npi: String,

        /// Print the raw action JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show catalog statistics.
    Stats,

    /// Start the HTTP API on `[server].bind`.
    Serve,
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("physician_finder=info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
        }
        Commands::Check => {
            migrate::check_extensions(&cfg).await?;
        }
        Commands::Import {
            path,
            replace,
            dry_run,
        } => {
            import::run_import(&cfg, &path, replace, dry_run).await?;
        }
        Commands::Search {
            query,
            state,
            zip,
            page,
            limit,
            sort_by,
            sort_order,
            json,
        } => {
            let filters = if state.is_some() || zip.is_some() {
                Some(SearchFilters { state, zip })
            } else {
                None
            };
            let params = SearchParams {
                query,
                filters,
                page,
                limit,
                sort_by,
                sort_order,
            };
            search::run_search(&cfg, params, json).await?;
        }
        Commands::Get { npi, json } => {
            get::run_get(&cfg, &npi, json).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
