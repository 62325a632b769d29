//! # Specimen Catalog CLI (`biocat`)
//!
//! The `biocat` binary manages the catalog database and runs the HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! biocat --config ./biocat.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `biocat init` | Create the SQLite database and run schema migrations |
//! | `biocat bootstrap` | Migrate, then fill empty tables from the CSV feeds |
//! | `biocat import <kind> [file]` | Import one feed (plants or insects) |
//! | `biocat serve` | Bootstrap (unless skipped) and start the HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the database
//! biocat init --config ./biocat.toml
//!
//! # One-off import from a non-default location
//! biocat import insects /data/drop/insects-2023.csv
//!
//! # Start the server, loading feeds on first run
//! biocat serve
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use biocat::{bootstrap, config, db, import, migrate, server};

/// Specimen catalog — CSV feed ingestion, SQLite storage, and a JSON HTTP
/// API for plant and insect specimen records.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file; a missing file means development defaults.
#[derive(Parser)]
#[command(
    name = "biocat",
    about = "Biodiversity specimen catalog — CSV ingestion, SQLite storage, JSON HTTP API",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./biocat.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and both record tables. This command
    /// is idempotent — running it multiple times is safe.
    Init,

    /// Migrate, then fill any empty table from its CSV feed.
    ///
    /// Tables that already hold records are left untouched. A missing or
    /// unreadable feed falls back to a small built-in sample.
    Bootstrap,

    /// Import one CSV feed into its table.
    ///
    /// Unlike `bootstrap`, this always imports — existing records stay and
    /// the feed's rows are appended.
    Import {
        /// Which feed to import.
        kind: FeedKind,

        /// Feed file path. Defaults to the location configured in `[data]`.
        file: Option<PathBuf>,
    },

    /// Start the HTTP server.
    ///
    /// Runs the bootstrap step first so a fresh database comes up populated,
    /// then serves until the process is terminated.
    Serve {
        /// Skip the bootstrap step and serve whatever the database holds.
        #[arg(long)]
        skip_bootstrap: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FeedKind {
    Plants,
    Insects,
}

impl From<FeedKind> for import::Feed {
    fn from(kind: FeedKind) -> Self {
        match kind {
            FeedKind::Plants => import::Feed::Plants,
            FeedKind::Insects => import::Feed::Insects,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg).await?;
            migrate::run_migrations(&pool).await?;
            println!("Database initialized successfully.");
        }
        Commands::Bootstrap => {
            let pool = db::connect(&cfg).await?;
            bootstrap::run_bootstrap(&cfg, &pool).await?;
        }
        Commands::Import { kind, file } => {
            let pool = db::connect(&cfg).await?;
            migrate::run_migrations(&pool).await?;
            let feed: import::Feed = kind.into();
            let path = file.unwrap_or_else(|| match feed {
                import::Feed::Plants => cfg.data.plants_csv.clone(),
                import::Feed::Insects => cfg.data.insects_csv.clone(),
            });
            let report = import::import_file(&pool, feed, &path).await?;
            println!(
                "{}: imported {} records, {} failed, {} commits",
                feed.name(),
                report.imported,
                report.failed,
                report.commits
            );
        }
        Commands::Serve { skip_bootstrap } => {
            let pool = db::connect(&cfg).await?;
            if skip_bootstrap {
                migrate::run_migrations(&pool).await?;
            } else {
                bootstrap::run_bootstrap(&cfg, &pool).await?;
            }
            server::run_server(&cfg, pool).await?;
        }
    }

    Ok(())
}
