use crate::config::Config;
use crate::state::SharedState;

pub async fn cmd_deals(config: Config) -> anyhow::Result<()> {
    let state = SharedState::new(config).await?;
    let view = state.deals.get_deals().await?;

    let snapshot = &view.snapshot;
    println!(
        "Amazon deals ({} items, fetched {}, {}{})",
        snapshot.listings.len(),
        snapshot.fetched_at.format("%Y-%m-%d %H:%M"),
        view.source.as_str(),
        if view.stale { ", stale" } else { "" }
    );
    println!("{:-<70}", "");

    for deal in &snapshot.listings {
        let discount = deal.discount.as_deref().unwrap_or("");
        println!("• {} | {} {discount}", deal.title, deal.price);
    }

    Ok(())
}
