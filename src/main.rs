use anyhow::{Context, Result};
use flavorgraph::api::HttpServer;
use flavorgraph::db::{migrate, Db};
use flavorgraph::{Config, FlavorError};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", config.flavorgraph.log_level.as_str())
    ).init();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("serve");

    match command {
        "serve" => run_server(config).await?,
        "verify" => run_schema_verification(config).await?,
        other => anyhow::bail!("Unknown command '{}'. Expected 'serve' or 'verify'.", other),
    }

    Ok(())
}

/// Migrate, then serve the HTTP API
async fn run_server(config: Config) -> Result<()> {
    log::info!("Starting FlavorGraph v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Database path: {}", config.db_path().display());

    let db = Db::new(config.db_path());
    db.migrate().await.context("Failed to apply migrations")?;
    log::info!("Database initialized successfully");

    HttpServer::new(db, &config).run().await?;
    Ok(())
}

/// Migrate, then check that every expected database object exists
async fn run_schema_verification(config: Config) -> Result<()> {
    log::info!("Verifying FlavorGraph database at {}", config.db_path().display());

    let db = Db::new(config.db_path());
    db.migrate().await.context("Failed to apply migrations")?;

    db.with_connection(|conn| {
        let tables = migrate::table_names(conn)?;
        for table in migrate::EXPECTED_TABLES {
            if !tables.iter().any(|t| t == table) {
                return Err(FlavorError::Config(format!("Missing table: {}", table)));
            }
            log::debug!("✓ Table exists: {}", table);
        }

        let indexes = migrate::index_names(conn)?;
        for index in migrate::EXPECTED_INDEXES {
            if indexes.iter().any(|i| i == index) {
                log::debug!("✓ Index exists: {}", index);
            } else {
                log::warn!("Index not found: {} (edge lookups will scan the table)", index);
            }
        }

        let applied = migrate::applied_versions(conn)?;
        if applied.last().copied() != Some(migrate::latest_version()) {
            return Err(FlavorError::Config(format!(
                "Expected schema version {}, found {:?}",
                migrate::latest_version(),
                applied
            )));
        }
        log::debug!("✓ {} migrations applied", applied.len());

        let journal_mode: String = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
        if journal_mode.to_uppercase() != "WAL" {
            return Err(FlavorError::Config(format!("Journal mode is not WAL: {}", journal_mode)));
        }
        log::debug!("✓ Journal mode: WAL");

        let integrity: String = conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        if integrity != "ok" {
            return Err(FlavorError::Config(format!("Database integrity check failed: {}", integrity)));
        }
        log::info!("✓ Database integrity: OK");

        Ok(())
    })
    .await?;

    log::info!("✓ Database schema verification complete");
    Ok(())
}
