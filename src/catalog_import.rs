//! Catalog Import Tool
//!
//! Loads a JSON catalog (an array of song rows with their album, artists,
//! writers and monthly play counts) into the SQLite catalog database.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use swiftcloud_server::catalog_store::{CatalogStore, ImportSong, SqliteCatalogStore};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "catalog-import")]
#[command(about = "Import a JSON song catalog into the SQLite database")]
struct Args {
    /// Path to the JSON catalog file
    #[arg(value_name = "CATALOG_JSON")]
    catalog_json: PathBuf,

    /// Path to the output SQLite database file
    #[arg(value_name = "OUTPUT_DB")]
    output_db: PathBuf,

    /// Parse and validate the catalog without writing anything
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

fn load_rows(path: &Path) -> Result<Vec<ImportSong>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog file {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse catalog file {:?}", path))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    info!("Catalog Import Tool");
    info!("===================");
    info!("Catalog file: {}", args.catalog_json.display());
    info!("Output database: {}", args.output_db.display());

    let rows = load_rows(&args.catalog_json)?;
    let untitled = rows.iter().filter(|r| r.title.trim().is_empty()).count();
    if untitled > 0 {
        warn!("Skipping {} rows without a title", untitled);
    }
    let rows: Vec<ImportSong> = rows
        .into_iter()
        .filter(|r| !r.title.trim().is_empty())
        .collect();
    info!("Loaded {} song rows", rows.len());

    if args.dry_run {
        info!("Dry run, nothing written");
        return Ok(());
    }

    if args.output_db.exists() {
        warn!(
            "Output database already exists: {}, rows will be added to it",
            args.output_db.display()
        );
    }

    let store = SqliteCatalogStore::new(&args.output_db, 1)?;
    let stats = store.import_songs(&rows)?;

    info!("");
    info!("Import Summary");
    info!("==============");
    info!("Songs imported: {}", stats.songs_created);
    info!("Albums created: {}", stats.albums_created);
    info!("Artists created: {}", stats.artists_created);
    info!("Writers created: {}", stats.writers_created);
    info!("Monthly plays recorded: {}", stats.plays_recorded);

    let counts = store.get_counts()?;
    info!("");
    info!("Database contains:");
    info!("  Songs: {}", counts.songs);
    info!("  Albums: {}", counts.albums);
    info!("  Artists: {}", counts.artists);
    info!("  Writers: {}", counts.writers);
    info!("  Monthly plays: {}", counts.monthly_plays);

    Ok(())
}
