//! The public-facing synchronization state machine.
//!
//! `ShowSyncController` owns all mutable show state for the currently
//! selected identity: metadata, the episode dataset, the revalidation token,
//! and the loading/refresh flags. External callers read snapshots and invoke
//! operations; nothing outside this module mutates the held records.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{RwLock, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::clients::{HeatmapClient, RefreshKind, ShowFetch};
use crate::config::SyncConfig;
use crate::models::{ShowDataset, ShowIdentity, ShowMetadata};
use crate::recent::RecentStore;
use crate::sync::cancel::{RequestCanceller, Slot};
use crate::sync::merge::merge;
use crate::sync::poller::PollScheduler;

/// Errors surfaced to callers. Transient poll failures and cancelled
/// results never appear here; they are private recoverable conditions.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    #[error("Metadata resolution failed: {0}")]
    MetadataResolution(String),

    #[error("Episode fetch failed: {0}")]
    EpisodeFetch(String),

    #[error("Refresh failed: {0}")]
    Refresh(String),
}

/// Read-only copy of the controller's observable state. Cheap to clone:
/// episode rows are shared `Arc`s.
#[derive(Debug, Clone, Default)]
pub struct ShowSnapshot {
    pub identity: Option<ShowIdentity>,
    pub metadata: Option<ShowMetadata>,
    pub dataset: Option<ShowDataset>,
    pub error: Option<String>,
    pub loading_meta: bool,
    pub loading_episodes: bool,
    pub refresh_pending: bool,
}

impl ShowSnapshot {
    #[must_use]
    pub fn still_loading(&self) -> bool {
        self.loading_meta || self.loading_episodes
    }

    /// Some ratings are permanently unavailable on the server side.
    #[must_use]
    pub fn has_missing_ratings(&self) -> bool {
        self.dataset.as_ref().is_some_and(|d| d.incomplete)
    }

    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.dataset
            .as_ref()
            .is_some_and(|d| d.metadata_stale || d.episodes_stale_count > 0)
    }

    /// Whether the poll loop has a reason to run.
    #[must_use]
    pub fn should_poll(&self) -> bool {
        self.refresh_pending
            || self
                .dataset
                .as_ref()
                .is_some_and(ShowDataset::enrichment_pending)
    }
}

#[derive(Default)]
struct SyncState {
    identity: Option<ShowIdentity>,
    metadata: Option<ShowMetadata>,
    dataset: Option<ShowDataset>,
    etag: Option<String>,
    error: Option<String>,
    loading_meta: bool,
    loading_episodes: bool,
    refresh_pending: bool,
}

pub(crate) struct MergeApplied {
    pub(crate) changed: bool,
    pub(crate) dataset: ShowDataset,
}

pub(crate) struct SyncShared {
    pub(crate) client: HeatmapClient,
    pub(crate) poll_interval: Duration,
    pub(crate) max_poll_attempts: u32,
    recent: Option<RecentStore>,
    canceller: RequestCanceller,
    state: RwLock<SyncState>,
    version: watch::Sender<u64>,
}

impl SyncShared {
    /// Bump the observer channel. Called only when something observable
    /// actually changed; this is what keeps downstream renders quiet while
    /// identical payloads trickle in.
    fn bump(&self) {
        self.version.send_modify(|v| *v += 1);
    }

    pub(crate) async fn current_etag(&self, id: &ShowIdentity) -> Option<String> {
        let state = self.state.read().await;
        if state.identity.as_ref() == Some(id) {
            state.etag.clone()
        } else {
            None
        }
    }

    /// Merge a fresh payload into the held dataset, provided `id` is still
    /// the current identity. Returns `None` when the result arrived for a
    /// superseded identity and was discarded.
    pub(crate) async fn apply_payload(
        &self,
        id: &ShowIdentity,
        payload: crate::models::ShowPayload,
        new_etag: Option<String>,
    ) -> Option<MergeApplied> {
        let mut state = self.state.write().await;
        if state.identity.as_ref() != Some(id) {
            debug!(show = %id, "discarding dataset for superseded identity");
            return None;
        }

        let outcome = merge(state.dataset.as_ref(), payload.into());
        if let Some(tag) = new_etag {
            state.etag = Some(tag);
        }
        let dataset = outcome.dataset.clone();
        state.dataset = Some(outcome.dataset);
        drop(state);

        if outcome.changed {
            self.bump();
        }
        Some(MergeApplied {
            changed: outcome.changed,
            dataset,
        })
    }

    async fn record_recent(&self, dataset: &ShowDataset) {
        let Some(recent) = &self.recent else { return };
        if dataset.imdb_id.is_empty() {
            return;
        }
        let (poster, meta_title, meta_year) = {
            let state = self.state.read().await;
            match &state.metadata {
                Some(meta) => (meta.poster.clone(), meta.title.clone(), meta.year.clone()),
                None => (None, None, None),
            }
        };
        if let Err(e) = recent.record(
            &dataset.imdb_id,
            dataset.title.clone().or(meta_title),
            poster,
            dataset.year.clone().or(meta_year),
        ) {
            warn!("Failed to record recent show: {e}");
        }
    }
}

/// Start a poll sequence when the held dataset (or a pending refresh)
/// warrants one. Replaces any running sequence: the new token cancels the
/// previous poll slot, so at most one loop is live per controller.
pub(crate) async fn maybe_start_poll(shared: &Arc<SyncShared>) {
    let (identity, wanted) = {
        let state = shared.state.read().await;
        let wanted = state.refresh_pending
            || state
                .dataset
                .as_ref()
                .is_some_and(ShowDataset::enrichment_pending);
        (state.identity.clone(), wanted)
    };
    let Some(id) = identity else { return };
    if !wanted {
        return;
    }

    let token = shared.canceller.begin(Slot::Poll).await;
    debug!(show = %id, "starting poll sequence");
    tokio::spawn(PollScheduler::new(Arc::clone(shared), id, token).run());
}

#[derive(Clone)]
pub struct ShowSyncController {
    shared: Arc<SyncShared>,
}

impl ShowSyncController {
    #[must_use]
    pub fn new(client: HeatmapClient, recent: Option<RecentStore>, sync: &SyncConfig) -> Self {
        let (version, _) = watch::channel(0);
        Self {
            shared: Arc::new(SyncShared {
                client,
                poll_interval: Duration::from_millis(sync.poll_interval_ms),
                max_poll_attempts: sync.max_poll_attempts,
                recent,
                canceller: RequestCanceller::new(),
                state: RwLock::new(SyncState::default()),
                version,
            }),
        }
    }

    /// Observer channel; the value is a bare version counter. Subscribers
    /// re-read `snapshot()` whenever it moves.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.version.subscribe()
    }

    pub async fn snapshot(&self) -> ShowSnapshot {
        let state = self.shared.state.read().await;
        ShowSnapshot {
            identity: state.identity.clone(),
            metadata: state.metadata.clone(),
            dataset: state.dataset.clone(),
            error: state.error.clone(),
            loading_meta: state.loading_meta,
            loading_episodes: state.loading_episodes,
            refresh_pending: state.refresh_pending,
        }
    }

    /// Switch to a new show (or to nothing). All outstanding work for the
    /// previous identity is cancelled synchronously and its records are torn
    /// down before the new resolution starts; results from the old identity
    /// can never land afterwards.
    pub async fn set_identity(&self, identity: Option<ShowIdentity>) {
        self.shared.canceller.cancel_all().await;

        {
            let mut state = self.shared.state.write().await;
            state.identity = identity.clone();
            state.metadata = None;
            state.dataset = None;
            state.etag = None;
            state.error = None;
            state.refresh_pending = false;
            state.loading_meta = identity.is_some();
            state.loading_episodes = identity.is_some();
        }
        self.shared.bump();

        let Some(id) = identity else { return };
        info!(show = %id, "resolving show");

        let meta_token = self.shared.canceller.begin(Slot::Metadata).await;
        let episodes_token = self.shared.canceller.begin(Slot::Episodes).await;
        let shared = Arc::clone(&self.shared);
        tokio::spawn(resolve_identity(shared, id, meta_token, episodes_token));
    }

    /// Trigger server-side enrichment of permanently-missing ratings, then
    /// apply one authoritative re-fetch. Idempotent while pending.
    pub async fn refresh_missing(&self) -> Result<(), SyncError> {
        self.refresh(RefreshKind::Missing).await
    }

    /// Trigger a full re-enrichment of the show, then apply one
    /// authoritative re-fetch. Idempotent while pending.
    pub async fn refresh_all(&self) -> Result<(), SyncError> {
        self.refresh(RefreshKind::Show).await
    }

    /// Trigger a metadata-only refresh and superset-merge the result.
    pub async fn refresh_metadata(&self) -> Result<(), SyncError> {
        self.refresh(RefreshKind::Metadata).await
    }

    async fn refresh(&self, kind: RefreshKind) -> Result<(), SyncError> {
        let id = {
            let mut state = self.shared.state.write().await;
            let Some(id) = state.identity.clone() else {
                return Ok(());
            };
            if state.refresh_pending {
                return Ok(());
            }
            state.refresh_pending = true;
            id
        };
        self.shared.bump();

        let result = self.run_refresh(kind, &id).await;

        // Pending always clears, success or failure; a failed refresh leaves
        // the previously held records intact.
        {
            let mut state = self.shared.state.write().await;
            state.refresh_pending = false;
        }
        self.shared.bump();

        if result.is_ok() {
            maybe_start_poll(&self.shared).await;
        }
        result
    }

    async fn run_refresh(&self, kind: RefreshKind, id: &ShowIdentity) -> Result<(), SyncError> {
        self.shared
            .client
            .trigger_refresh(kind, id)
            .await
            .map_err(|e| SyncError::Refresh(e.to_string()))?;

        if kind == RefreshKind::Metadata {
            let meta = self
                .shared
                .client
                .show_meta(id)
                .await
                .map_err(|e| SyncError::Refresh(e.to_string()))?;
            let mut state = self.shared.state.write().await;
            if state.identity.as_ref() == Some(id) {
                match &mut state.metadata {
                    Some(held) => held.absorb(meta),
                    None => state.metadata = Some(meta),
                }
                drop(state);
                self.shared.bump();
            }
            return Ok(());
        }

        // Authoritative re-fetch: no revalidation token, the body is wanted
        // even if it would have revalidated.
        let fetch = self
            .shared
            .client
            .fetch_show(id, false, None)
            .await
            .map_err(|e| SyncError::Refresh(e.to_string()))?;

        if let ShowFetch::Fresh { payload, etag } = fetch {
            self.shared.apply_payload(id, payload, etag).await;
        }
        Ok(())
    }
}

/// Resolve metadata and episodes for `id` concurrently. Each completion
/// re-checks its cancellation token and the current identity before touching
/// state, so a stale resolution is discarded no matter when it lands.
async fn resolve_identity(
    shared: Arc<SyncShared>,
    id: ShowIdentity,
    meta_token: CancellationToken,
    episodes_token: CancellationToken,
) {
    let (meta_res, episodes_res) = tokio::join!(
        shared.client.show_meta(&id),
        shared.client.fetch_show(&id, true, None),
    );

    let mut meta_failed = false;
    if !meta_token.is_cancelled() {
        let mut state = shared.state.write().await;
        if state.identity.as_ref() == Some(&id) {
            state.loading_meta = false;
            match meta_res {
                Ok(meta) => match &mut state.metadata {
                    Some(held) => held.absorb(meta),
                    None => state.metadata = Some(meta),
                },
                Err(e) => {
                    warn!(show = %id, "metadata resolution failed: {e}");
                    meta_failed = true;
                    state.error = Some(SyncError::MetadataResolution(e.to_string()).to_string());
                }
            }
        }
    }

    let mut loaded = None;
    if !episodes_token.is_cancelled() {
        let mut state = shared.state.write().await;
        if state.identity.as_ref() == Some(&id) {
            state.loading_episodes = false;
            match episodes_res {
                Ok(ShowFetch::Fresh { payload, etag }) => {
                    let outcome = merge(state.dataset.as_ref(), payload.into());
                    if let Some(tag) = etag {
                        state.etag = Some(tag);
                    }
                    loaded = Some(outcome.dataset.clone());
                    state.dataset = Some(outcome.dataset);
                }
                // No token was sent on the initial fetch, so a 304 carries
                // no information here; nothing to apply.
                Ok(ShowFetch::NotModified) => {}
                Err(e) => {
                    // The metadata error already covers the user-visible
                    // failure; don't clobber it with a second message.
                    if meta_failed {
                        debug!(show = %id, "episode fetch failed after metadata failure: {e}");
                    } else {
                        warn!(show = %id, "episode fetch failed: {e}");
                        state.error = Some(SyncError::EpisodeFetch(e.to_string()).to_string());
                    }
                }
            }
        }
    }

    shared.bump();

    if let Some(dataset) = loaded {
        shared.record_recent(&dataset).await;
        maybe_start_poll(&shared).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ShowPayload;

    fn snapshot_with_flags(incomplete: bool, stale_count: u32, metadata_stale: bool) -> ShowSnapshot {
        let payload: ShowPayload = serde_json::from_value(serde_json::json!({
            "imdbID": "tt0903747",
            "incomplete": incomplete,
            "metadataStale": metadata_stale,
            "episodesStaleCount": stale_count,
            "episodes": []
        }))
        .unwrap();
        ShowSnapshot {
            dataset: Some(ShowDataset::from(payload)),
            ..Default::default()
        }
    }

    #[test]
    fn derived_flags_follow_the_dataset() {
        let snap = snapshot_with_flags(true, 0, false);
        assert!(snap.has_missing_ratings());
        assert!(!snap.is_stale());

        let snap = snapshot_with_flags(false, 3, false);
        assert!(!snap.has_missing_ratings());
        assert!(snap.is_stale());

        let snap = snapshot_with_flags(false, 0, true);
        assert!(snap.is_stale());
    }

    #[test]
    fn empty_snapshot_derives_nothing() {
        let snap = ShowSnapshot::default();
        assert!(!snap.has_missing_ratings());
        assert!(!snap.is_stale());
        assert!(!snap.should_poll());
        assert!(!snap.still_loading());
    }

    #[test]
    fn pending_refresh_alone_wants_polling() {
        let snap = ShowSnapshot {
            refresh_pending: true,
            ..Default::default()
        };
        assert!(snap.should_poll());
    }
}
