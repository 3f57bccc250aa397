use clap::Parser;
use kinship::db::{self, migrate, Db};
use kinship::family::parse_person_id;
use kinship::query::find_path;
use kinship::graph::describe_path;
use kinship::{Algorithm, Config, FamilySnapshot, FamilyStore, KinshipService};
use std::path::PathBuf;
use std::time::Instant;
use anyhow::{Context, Result};

#[derive(Parser, Debug)]
#[command(name = "kinpath")]
#[command(about = "Find the relationship path between two people")]
struct Args {
    /// Start person id
    from: String,

    /// Goal person id
    to: String,

    /// dfs, bfs or dijkstra (defaults to kinship.default_algorithm, then bfs)
    #[arg(short, long)]
    algorithm: Option<String>,

    /// Read the family from a JSON snapshot instead of the configured database
    #[arg(short, long)]
    snapshot: Option<PathBuf>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

async fn load_snapshot(args: &Args, config: Option<&Config>) -> Result<FamilySnapshot> {
    if let Some(ref path) = args.snapshot {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
        return Ok(FamilySnapshot::from_json(&json)?);
    }

    let config = config.context("No --snapshot given and no config.toml found")?;
    let db_path = config
        .db_path()
        .context("No --snapshot given and kinship.db_path is not configured")?;
    let db = Db::new(db_path);
    let migrations_dir = config.migrations_dir().to_path_buf();
    db.with_connection(move |conn| migrate::run_migrations_or_embedded(conn, &migrations_dir))
        .await?;
    Ok(db::load_snapshot(&db).await?)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let config = Config::load().ok();

    let start = parse_person_id(&args.from)?;
    let goal = parse_person_id(&args.to)?;
    let algorithm = match (&args.algorithm, &config) {
        (Some(name), _) => name.parse::<Algorithm>()?,
        (None, Some(config)) => config.default_algorithm()?,
        (None, None) => Algorithm::default(),
    };

    let snapshot = load_snapshot(&args, config.as_ref()).await?;
    let service = KinshipService::new(FamilyStore::from_snapshot(snapshot)?);
    let graph = service.graph();

    let started = Instant::now();
    let path = find_path(&graph, start, goal, algorithm).into_path();
    let elapsed = started.elapsed();
    let steps = describe_path(&graph, &path)?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "algorithm": algorithm,
                "found": !path.is_empty(),
                "path": path,
                "steps": steps,
            }))?
        );
        return Ok(());
    }

    let name = |id| {
        graph
            .node(id)
            .map(|n| n.person.name.clone())
            .unwrap_or_else(|| format!("#{}", id))
    };

    println!("Algorithm: {}", algorithm);
    if path.is_empty() {
        println!("No relationship found between {} and {}.", name(start), name(goal));
    } else {
        println!("{} hop(s):", steps.len());
        println!("  {}", name(start));
        for step in &steps {
            println!("  -> {} ({:?} of {})", name(step.to), step.role, name(step.from));
        }
    }
    println!("Search time: {:?}", elapsed);

    Ok(())
}
