use clap::Parser;
use kinship::db::{self, migrate, Db};
use kinship::{Config, FamilySnapshot, FamilyStore};
use std::path::PathBuf;
use anyhow::{Context, Result};

#[derive(Parser, Debug)]
#[command(name = "kinimport")]
#[command(about = "Validate a JSON family snapshot and store it in the database")]
struct Args {
    /// JSON file with `people`/`relations` (or `nodes`/`links`)
    snapshot: PathBuf,

    /// Database file (defaults to kinship.db_path from config.toml)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Only validate, do not write
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", "info")
    ).init();

    let args = Args::parse();

    let json = std::fs::read_to_string(&args.snapshot)
        .with_context(|| format!("Failed to read {}", args.snapshot.display()))?;
    let snapshot = FamilySnapshot::from_json(&json)?;

    // Restoring re-checks endpoints, duplicates and parent counts.
    let store = FamilyStore::from_snapshot(snapshot)
        .with_context(|| format!("{} is not a valid family", args.snapshot.display()))?;
    log::info!(
        "Snapshot valid: {} people, {} relations",
        store.person_count(),
        store.relation_count()
    );

    if args.dry_run {
        return Ok(());
    }

    let (db_path, migrations_dir) = match args.db {
        Some(path) => (path, PathBuf::from("migrations")),
        None => {
            let config = Config::load()?;
            let path = config
                .db_path()
                .context("Pass --db or set kinship.db_path in config.toml")?
                .to_path_buf();
            (path, config.migrations_dir().to_path_buf())
        }
    };

    let db = Db::new(&db_path);
    db.with_connection(move |conn| migrate::run_migrations_or_embedded(conn, &migrations_dir))
        .await?;

    let stats = db::save_snapshot(&db, store.snapshot()).await?;
    log::info!(
        "Imported {} people and {} relations into {}",
        stats.people,
        stats.relations,
        db_path.display()
    );

    Ok(())
}
