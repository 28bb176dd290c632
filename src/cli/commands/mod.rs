mod recent;
mod refresh;
mod search;
mod show;

pub use recent::cmd_recent;
pub use refresh::cmd_refresh;
pub use search::cmd_search;
pub use show::cmd_show;

use anyhow::Result;

use crate::clients::{HeatmapClient, build_http_client};
use crate::config::Config;
use crate::recent::RecentStore;
use crate::sync::ShowSyncController;

pub(crate) fn build_client(config: &Config) -> Result<HeatmapClient> {
    let http = build_http_client(config.server.http_timeout_seconds)?;
    Ok(HeatmapClient::new(http, &config.server.base_url))
}

pub(crate) fn build_controller(
    config: &Config,
    record_views: bool,
) -> Result<ShowSyncController> {
    let client = build_client(config)?;
    let recent = record_views.then(|| RecentStore::new(config.recent_path()));
    Ok(ShowSyncController::new(client, recent, &config.sync))
}

/// Block until the initial metadata + episode resolution settles.
pub(crate) async fn wait_for_load(controller: &ShowSyncController) {
    let mut updates = controller.subscribe();
    loop {
        if !controller.snapshot().await.still_loading() {
            return;
        }
        if updates.changed().await.is_err() {
            return;
        }
    }
}
