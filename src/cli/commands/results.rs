use crate::config::Config;
use crate::db::{ResultStore, Store};

pub async fn cmd_results(config: &Config, limit: u64) -> anyhow::Result<()> {
    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;
    let entries = store.list(limit).await?;

    if entries.is_empty() {
        println!("No cached searches.");
        return Ok(());
    }

    println!("Cached searches (last {}):", entries.len());
    println!("{:-<70}", "");

    for entry in entries {
        let failed = entry.result.failed_platforms();
        println!(
            "• {} - {} products",
            entry.key,
            entry.result.total_results()
        );
        println!(
            "  Stored: {}{}",
            entry.stored_at.format("%Y-%m-%d %H:%M"),
            if failed.is_empty() {
                String::new()
            } else {
                format!(" | failed: {}", failed.len())
            }
        );
    }

    Ok(())
}
