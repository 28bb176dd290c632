use crate::config::Config;
use crate::recent::RecentStore;

pub fn cmd_recent(config: &Config) -> anyhow::Result<()> {
    let store = RecentStore::new(config.recent_path());
    let entries = store.list();

    if entries.is_empty() {
        println!("No recently viewed shows.");
        println!();
        println!("View one with: heatarr show \"show name\"");
        return Ok(());
    }

    println!("Recently Viewed ({} total)", entries.len());
    println!("{:-<60}", "");

    for entry in entries {
        let title = entry.title.as_deref().unwrap_or("Unknown");
        let year = entry.year.as_deref().unwrap_or("?");
        println!("• {title} ({year})");
        println!("  ID: {} | Viewed: {}", entry.imdb_id, entry.viewed_at);
    }

    Ok(())
}
