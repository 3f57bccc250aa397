use rusqlite::{Connection, params};
use std::fs;
use std::path::Path;
use crate::error::{Result, KinshipError};

/// Migrations compiled into the binary, used when no migrations directory
/// is available at runtime.
const EMBEDDED: &[(&str, &str)] = &[
    ("001_family_tables", include_str!("../../migrations/001_family_tables.sql")),
    ("002_relation_indexes", include_str!("../../migrations/002_relation_indexes.sql")),
    ("003_family_meta", include_str!("../../migrations/003_family_meta.sql")),
];

/// Migration metadata
#[derive(Debug)]
struct Migration {
    version: u32,
    name: String,
    sql: String,
}

/// Create schema_migrations table if it doesn't exist
fn ensure_migrations_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;
    Ok(())
}

/// Get list of applied migrations
pub fn get_applied_migrations(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM schema_migrations ORDER BY version")?;
    let names: Vec<String> = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()
        .map_err(KinshipError::Database)?;
    Ok(names)
}

/// Parse the version prefix of a migration name ("001_family_tables" -> 1)
fn parse_version(name: &str) -> Result<u32> {
    let version_str = name
        .split('_')
        .next()
        .ok_or_else(|| KinshipError::Config(format!("Invalid migration name: {}", name)))?;
    version_str
        .parse()
        .map_err(|_| KinshipError::Config(format!("Invalid migration version: {}", version_str)))
}

/// Load migration files from a migrations directory
fn load_migrations(migrations_dir: &Path) -> Result<Vec<Migration>> {
    let entries = fs::read_dir(migrations_dir).map_err(KinshipError::Io)?;

    let mut migrations = Vec::new();
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("sql") {
            continue;
        }
        let name = path
            .file_stem()
            .and_then(|n| n.to_str())
            .ok_or_else(|| KinshipError::Config("Invalid migration filename".to_string()))?
            .to_string();
        let version = parse_version(&name)?;
        let sql = fs::read_to_string(&path).map_err(KinshipError::Io)?;
        migrations.push(Migration { version, name, sql });
    }

    migrations.sort_by_key(|m| m.version);
    Ok(migrations)
}

fn embedded_migrations() -> Result<Vec<Migration>> {
    EMBEDDED
        .iter()
        .map(|(name, sql)| {
            Ok(Migration {
                version: parse_version(name)?,
                name: name.to_string(),
                sql: sql.to_string(),
            })
        })
        .collect()
}

/// Run all pending migrations found in `migrations_dir`
pub fn run_migrations(conn: &mut Connection, migrations_dir: &Path) -> Result<()> {
    let migrations = load_migrations(migrations_dir)?;
    apply(conn, migrations)
}

/// Run the migrations bundled with the crate
pub fn run_embedded_migrations(conn: &mut Connection) -> Result<()> {
    apply(conn, embedded_migrations()?)
}

/// Prefer the directory when it exists, fall back to the bundled set
pub fn run_migrations_or_embedded(conn: &mut Connection, migrations_dir: &Path) -> Result<()> {
    if migrations_dir.is_dir() {
        run_migrations(conn, migrations_dir)
    } else {
        log::debug!(
            "Migrations directory {} not found, using bundled migrations",
            migrations_dir.display()
        );
        run_embedded_migrations(conn)
    }
}

fn apply(conn: &mut Connection, migrations: Vec<Migration>) -> Result<()> {
    ensure_migrations_table(conn)?;
    let applied = get_applied_migrations(conn)?;

    for migration in migrations {
        if applied.contains(&migration.name) {
            log::debug!("Migration {} already applied, skipping", migration.name);
            continue;
        }

        log::info!("Applying migration: {} (version {})", migration.name, migration.version);

        let tx = conn.transaction()?;
        tx.execute_batch(&migration.sql).map_err(|e| {
            KinshipError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
                Some(format!("Failed to execute migration {}: {}", migration.name, e)),
            ))
        })?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
            params![migration.version, migration.name],
        )?;
        tx.commit()?;

        log::info!("Migration {} applied successfully", migration.name);
    }

    Ok(())
}
