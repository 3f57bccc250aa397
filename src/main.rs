use kinship::db::{self, migrate, Db};
use kinship::http::{AppState, KinshipHttpServer};
use kinship::{Config, FamilySnapshot, FamilyStore, KinshipService};
use std::sync::Arc;
use anyhow::{Context, Result};

/// Open the configured database and bring its schema up to date.
async fn open_database(config: &Config) -> Result<Option<Db>> {
    let Some(path) = config.db_path() else {
        log::warn!("No kinship.db_path configured; running in memory only");
        return Ok(None);
    };

    let db = Db::new(path);
    let migrations_dir = config.migrations_dir().to_path_buf();
    db.with_connection(move |conn| migrate::run_migrations_or_embedded(conn, &migrations_dir))
        .await?;
    log::info!("Database ready at {}", db.path().display());
    Ok(Some(db))
}

async fn load_store(db: Option<&Db>) -> Result<FamilyStore> {
    let snapshot = match db {
        Some(db) => db::load_snapshot(db).await?,
        None => FamilySnapshot::default(),
    };
    FamilyStore::from_snapshot(snapshot).context("Stored family data violates relation invariants")
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", config.kinship.log_level.as_str())
    ).init();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("verify");

    match command {
        "serve" | "serve-http" => run_http_server(config).await?,
        _ => run_verification(config).await?,
    }

    Ok(())
}

/// Run the REST server
async fn run_http_server(config: Config) -> Result<()> {
    log::info!("Starting Kinship HTTP Server v{}", env!("CARGO_PKG_VERSION"));

    if !config.http_server.enabled {
        anyhow::bail!("http_server.enabled is false in config.toml");
    }

    let db = open_database(&config).await?;
    let store = load_store(db.as_ref()).await?;
    log::info!(
        "Loaded {} people and {} relations",
        store.person_count(),
        store.relation_count()
    );

    let service = Arc::new(KinshipService::with_cache_capacity(store, config.cache.graph_capacity));
    let state = AppState::new(service, db, config.default_algorithm()?);
    let server = KinshipHttpServer::new(state, config.http_server.allowed_origins.clone());
    server.run(config.http_server.port).await?;

    Ok(())
}

/// Check the configuration and the stored family data
async fn run_verification(config: Config) -> Result<()> {
    log::info!("Starting Kinship v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Default algorithm: {}", config.default_algorithm()?);

    let db = open_database(&config).await?;
    let Some(db) = db else {
        log::info!("Nothing to verify without a database");
        return Ok(());
    };

    let applied = db
        .with_connection(|conn| migrate::get_applied_migrations(conn))
        .await?;
    log::info!("✓ {} migrations applied", applied.len());

    let store = load_store(Some(&db)).await?;
    let graph = KinshipService::new(store).graph();
    log::info!(
        "✓ Family graph: {} people, {} links, {} skipped relations",
        graph.len(),
        graph.link_count(),
        graph.skipped_relations().len()
    );

    match db::last_saved_at(&db).await? {
        Some(at) => log::info!("Last saved at {}", at),
        None => log::info!("Database is empty"),
    }

    log::info!("✓ Verification complete");
    Ok(())
}
