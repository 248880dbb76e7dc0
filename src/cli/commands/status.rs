use crate::config::Config;
use crate::db::{ResultStore, Store};

pub async fn cmd_status(config: &Config) -> anyhow::Result<()> {
    println!("shopscout v{}", env!("CARGO_PKG_VERSION"));
    println!("{:-<40}", "");
    println!("Scraper service: {}", config.scrapers.service_url);
    println!(
        "Platforms:       {}",
        config
            .scrapers
            .platforms
            .iter()
            .map(|p| p.slug())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("Search expiry:   {}", describe_hours(config.cache.search_expiry_hours));
    println!("Deals expiry:    {}", describe_hours(config.cache.deals_expiry_hours));

    match Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await
    {
        Ok(store) => {
            let cached = store.count().await?;
            println!("Store:           connected ({cached} cached searches)");
        }
        Err(e) => println!("Store:           disconnected ({e})"),
    }

    Ok(())
}

fn describe_hours(hours: u32) -> String {
    if hours == 0 {
        "never".to_string()
    } else {
        format!("{hours}h")
    }
}
