use anyhow::{Context, Result};
use clap::Parser;
use flavorgraph::db::Db;
use flavorgraph::import::{run_import, ImportOptions, ImportSource};
use flavorgraph::Config;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "import")]
#[command(about = "Load entities and relationships from JSON into the FlavorGraph database")]
struct Args {
    /// JSON file with {"entities": [...]}
    #[arg(long)]
    entities: Option<PathBuf>,

    /// JSON file with {"relationships": [...]}
    #[arg(long)]
    relationships: Option<PathBuf>,

    /// Delete every stored entity and relationship first
    #[arg(long)]
    drop_existing: bool,

    /// Records per transaction (defaults to import.batch_size)
    #[arg(long)]
    batch_size: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load()?;

    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", config.flavorgraph.log_level.as_str())
    ).init();

    if args.entities.is_none() && args.relationships.is_none() {
        anyhow::bail!("Nothing to import: pass --entities and/or --relationships");
    }

    let source = ImportSource::from_files(args.entities.as_deref(), args.relationships.as_deref())
        .context("Failed to read import files")?;
    let options = ImportOptions {
        batch_size: args.batch_size.unwrap_or(config.import.batch_size),
        drop_existing: args.drop_existing,
    };

    log::info!("Database path: {}", config.db_path().display());
    if options.drop_existing {
        log::warn!("Dropping existing graph data before import");
    }

    let db = Db::new(config.db_path());
    db.migrate().await.context("Failed to apply migrations")?;

    let started = Instant::now();
    let report = db.with_connection(move |conn| run_import(conn, &source, options)).await?;

    println!("\n=== FlavorGraph Import Report ===\n");
    println!(
        "{:<15} {:>8} {:>10} {:>9} {:>11} {:>11} {:>10} {:>7}",
        "Kind", "Source", "Inserted", "Invalid", "Malformed", "Duplicates", "In store", "Match"
    );
    println!("{:-<88}", "");
    for (kind, counts) in [("entities", &report.entities), ("relationships", &report.relationships)] {
        println!(
            "{:<15} {:>8} {:>10} {:>9} {:>11} {:>11} {:>10} {:>7}",
            kind,
            counts.source_count,
            counts.inserted,
            counts.invalid,
            counts.malformed,
            counts.duplicates,
            counts.db_count,
            if counts.matches_source() { "yes" } else { "no" }
        );
    }
    println!("{:-<88}", "");
    println!("Dangling relationships: {}", report.dangling_relationships);
    println!("Elapsed: {:.2}s", started.elapsed().as_secs_f64());

    for warning in report.warnings() {
        log::warn!("{}", warning);
    }

    Ok(())
}
