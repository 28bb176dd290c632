use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::Config;
use crate::models::ShowIdentity;
use crate::sync::ShowSnapshot;

use super::{build_client, build_controller, wait_for_load};

pub async fn cmd_show(config: &Config, query: &str, follow: bool) -> anyhow::Result<()> {
    let identity = resolve_query(config, query).await?;
    let controller = build_controller(config, true)?;

    let mut updates = controller.subscribe();
    controller.set_identity(Some(identity.clone())).await;
    wait_for_load(&controller).await;

    let snap = controller.snapshot().await;
    if let Some(error) = &snap.error {
        println!("✗ {error}");
        if snap.dataset.is_none() {
            return Ok(());
        }
    }

    print_show(&snap);

    if follow && snap.should_poll() {
        println!();
        println!("Enrichment still running; waiting for updates...");

        // Worst case the poller runs out its full attempt budget.
        let budget = Duration::from_millis(
            config.sync.poll_interval_ms * (u64::from(config.sync.max_poll_attempts) + 2),
        );
        let deadline = tokio::time::Instant::now() + budget;

        loop {
            tokio::select! {
                changed = updates.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snap = controller.snapshot().await;
                    let (rated, total) = rated_count(&snap);
                    println!("  {rated}/{total} episodes rated");
                    if !snap.should_poll() {
                        println!();
                        print_show(&snap);
                        break;
                    }
                }
                () = tokio::time::sleep_until(deadline) => {
                    println!("Still enriching server-side; check back later.");
                    break;
                }
            }
        }
    }

    controller.set_identity(None).await;
    Ok(())
}

async fn resolve_query(config: &Config, query: &str) -> anyhow::Result<ShowIdentity> {
    if ShowIdentity::looks_like_imdb_id(query) {
        return Ok(ShowIdentity::new(query));
    }

    println!("Resolving title: {query}");
    let client = build_client(config)?;
    let meta = client.show_meta_by_title(query).await?;
    let Some(id) = meta.imdb_id else {
        anyhow::bail!("No IMDb id found for '{query}'");
    };
    if let Some(title) = &meta.title {
        println!("Found: {title} ({id})");
    }
    Ok(ShowIdentity::new(id))
}

fn rated_count(snap: &ShowSnapshot) -> (usize, usize) {
    snap.dataset.as_ref().map_or((0, 0), |data| {
        let rated = data.episodes.iter().filter(|e| e.rating.is_some()).count();
        (rated, data.episodes.len())
    })
}

fn print_show(snap: &ShowSnapshot) {
    if let Some(meta) = &snap.metadata {
        let title = meta.title.as_deref().unwrap_or("Unknown");
        let year = meta.year.as_deref().unwrap_or("?");
        println!("{title} ({year})");
        if !meta.genres.is_empty() {
            println!("  {}", meta.genres.join(" / "));
        }
        if let Some(rating) = meta.imdb_rating {
            println!("  Overall: {rating:.1}");
        }
    }

    let Some(data) = &snap.dataset else {
        println!("No episode data.");
        return;
    };

    let mut by_season: BTreeMap<u32, Vec<(u32, Option<f64>)>> = BTreeMap::new();
    for ep in &data.episodes {
        by_season
            .entry(ep.season)
            .or_default()
            .push((ep.episode, ep.rating));
    }

    println!("{:-<60}", "");
    for (season, mut episodes) in by_season {
        episodes.sort_unstable_by_key(|(number, _)| *number);
        print!("S{season:<2}");
        for (_, rating) in episodes {
            match rating {
                Some(r) => print!(" {r:>4.1}"),
                None => print!("    -"),
            }
        }
        println!();
    }
    println!("{:-<60}", "");

    let (rated, total) = rated_count(snap);
    println!("{rated}/{total} episodes rated");

    if data.partial_data {
        println!("• Enrichment in progress");
    }
    if data.incomplete {
        println!("• Some ratings unavailable (try: heatarr refresh missing {})", data.imdb_id);
    }
    if data.episodes_stale_count > 0 {
        println!("• {} episodes past freshness threshold", data.episodes_stale_count);
    }
}
