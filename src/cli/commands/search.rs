use crate::config::Config;
use crate::domain::{PlatformFilter, ResultSource};
use crate::state::SharedState;

pub async fn cmd_search(
    config: Config,
    query: &str,
    platform: Option<&str>,
    force: bool,
) -> anyhow::Result<()> {
    let filter = PlatformFilter::parse(platform)?;
    let state = SharedState::new(config).await?;

    println!("Searching for: {query} ({filter})");

    let result = state.engine.search(query, filter, force).await?;

    let origin = match (result.source, result.cached_at) {
        (ResultSource::Cache, Some(at)) => format!("cache, stored {}", at.format("%Y-%m-%d %H:%M")),
        _ => "live".to_string(),
    };
    println!("{} [{origin}]", result.message());
    println!("{:-<70}", "");

    for group in &result.groups {
        match &group.error {
            Some(error) => println!("{} - failed: {error}", group.platform),
            None => println!("{} - {} products", group.platform, group.listings.len()),
        }

        for listing in &group.listings {
            let discount = listing
                .discount
                .as_deref()
                .map_or_else(String::new, |d| format!(" ({d})"));
            println!("  • {} | {}{discount}", listing.title, listing.price);
            if !listing.link.is_empty() {
                println!("    {}", listing.link);
            }
        }
        println!();
    }

    println!("Total: {} products", result.total_results());

    Ok(())
}
