use flavorgraph::store::{entities, relationships};
use flavorgraph::{config::Config, db::Db, error::FlavorError};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::load()?;
    let db = Db::new(config.db_path());
    db.migrate().await?;

    let (entity_stats, relationship_stats, dangling) = db
        .with_connection(|conn| {
            Ok::<_, FlavorError>((
                entities::entity_statistics(conn)?,
                relationships::relationship_statistics(conn)?,
                relationships::count_dangling(conn)?,
            ))
        })
        .await?;

    println!("\n=== FlavorGraph Statistics ===\n");

    if entity_stats.total_entities == 0 && relationship_stats.total_relationships == 0 {
        println!("The graph is empty.");
        println!("\nRun the import binary to load entities and relationships.");
        return Ok(());
    }

    println!("Entities by Classification:\n");
    println!("{:-<50}", "");
    println!("{:<35} {:>12}", "Classification", "Count");
    println!("{:-<50}", "");
    for (classification, count) in &entity_stats.by_classification {
        println!("{:<35} {:>12}", classification, count);
    }
    println!("{:-<50}", "");
    println!("{:<35} {:>12}", "Total", entity_stats.total_entities);
    println!("{:<35} {:>12}", "Added in the last 30 days", entity_stats.recent_additions);

    println!("\nRelationships by Type:\n");
    println!("{:-<50}", "");
    println!("{:<35} {:>12}", "Type", "Count");
    println!("{:-<50}", "");
    for (relationship_type, count) in &relationship_stats.by_type {
        println!("{:<35} {:>12}", relationship_type, count);
    }
    println!("{:-<50}", "");
    println!("{:<35} {:>12}", "Total", relationship_stats.total_relationships);

    println!("\nRelationships by Confidence:\n");
    for (score, count) in &relationship_stats.by_confidence {
        println!("  {:<33} {:>12}", score, count);
    }

    println!("\nQuality:");
    println!("  Average confidence: {:.2}", relationship_stats.avg_confidence);
    println!("  Dangling relationships: {}", dangling);

    let last_updated = entity_stats
        .last_updated
        .into_iter()
        .chain(relationship_stats.last_updated)
        .max();
    if let Some(ts) = last_updated {
        println!("  Last updated: {}", ts.format("%Y-%m-%d %H:%M:%S UTC"));
    }

    Ok(())
}
