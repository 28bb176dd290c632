use crate::config::Config;

use super::build_client;

pub async fn cmd_search(config: &Config, query: &str) -> anyhow::Result<()> {
    println!("Searching for: {query}");

    let client = build_client(config)?;
    let results = client.search(query).await?;

    if results.is_empty() {
        println!("No shows found matching '{query}'");
        return Ok(());
    }

    println!();
    println!("Search Results:");
    println!("{:-<60}", "");

    for suggestion in results.iter().take(10) {
        let title = suggestion.title.as_deref().unwrap_or("Unknown");
        let year = suggestion.year.as_deref().unwrap_or("?");
        let id = suggestion.imdb_id.as_deref().unwrap_or("-");
        println!("• {title} ({year})");
        println!("  ID: {id}");
    }

    println!();
    println!("To view a show: heatarr show <id>");

    Ok(())
}
