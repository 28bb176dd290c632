use crate::clients::RefreshKind;
use crate::config::Config;
use crate::models::ShowIdentity;

use super::{build_controller, wait_for_load};

pub async fn cmd_refresh(config: &Config, kind: RefreshKind, id: &str) -> anyhow::Result<()> {
    if !ShowIdentity::looks_like_imdb_id(id) {
        anyhow::bail!("'{id}' does not look like an IMDb id (expected tt...)");
    }

    let controller = build_controller(config, false)?;
    controller.set_identity(Some(ShowIdentity::new(id))).await;
    wait_for_load(&controller).await;

    let before = controller.snapshot().await;
    if before.dataset.is_none() {
        if let Some(error) = &before.error {
            anyhow::bail!("Could not load {id}: {error}");
        }
        anyhow::bail!("Could not load {id}");
    }

    match kind {
        RefreshKind::Missing => controller.refresh_missing().await?,
        RefreshKind::Show => controller.refresh_all().await?,
        RefreshKind::Metadata => controller.refresh_metadata().await?,
    }

    let after = controller.snapshot().await;
    println!("✓ Refresh triggered for {id}");

    if kind == RefreshKind::Metadata {
        if let Some(meta) = &after.metadata {
            let title = meta.title.as_deref().unwrap_or("Unknown");
            println!("  Metadata: {title} ({} seasons)", meta.total_seasons.unwrap_or(0));
        }
    } else if let Some(data) = &after.dataset {
        let rated = data.episodes.iter().filter(|e| e.rating.is_some()).count();
        println!("  {rated}/{} episodes rated", data.episodes.len());
        if after.should_poll() {
            println!("  Server still enriching; watch with: heatarr show {id} --follow");
        }
    }

    controller.set_identity(None).await;
    Ok(())
}
