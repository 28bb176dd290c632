//! Bounded fixed-interval poll loop for datasets still being enriched.
//!
//! One scheduler instance serves one show identity and is terminal once
//! stopped; a new sequence only starts from a fresh identity resolution or
//! an explicit refresh. Transient tick failures are swallowed and retried,
//! only the attempt cap or a clean no-more-work signal ends the loop.

use std::sync::Arc;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::clients::ShowFetch;
use crate::models::{ShowDataset, ShowIdentity};
use crate::sync::controller::SyncShared;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollState {
    Idle,
    Waiting,
    InFlight,
    Stopped,
}

/// Decision after a tick whose merge completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TickVerdict {
    Converged,
    KeepPolling,
}

/// The loop stops only when the merge saw nothing new *and* every
/// work-in-progress flag is down. `incomplete` alone keeps the loop alive
/// (literal flag semantics); the attempt cap bounds that case.
pub(crate) fn tick_verdict(changed: bool, dataset: &ShowDataset) -> TickVerdict {
    if !changed
        && !dataset.partial_data
        && !dataset.missing_refresh_in_progress
        && !dataset.incomplete
    {
        TickVerdict::Converged
    } else {
        TickVerdict::KeepPolling
    }
}

pub(crate) struct PollScheduler {
    shared: Arc<SyncShared>,
    identity: ShowIdentity,
    token: CancellationToken,
    state: PollState,
}

impl PollScheduler {
    pub(crate) fn new(
        shared: Arc<SyncShared>,
        identity: ShowIdentity,
        token: CancellationToken,
    ) -> Self {
        Self {
            shared,
            identity,
            token,
            state: PollState::Idle,
        }
    }

    fn transition(&mut self, next: PollState) {
        trace!(show = %self.identity, from = ?self.state, to = ?next, "poll state transition");
        self.state = next;
    }

    pub(crate) async fn run(mut self) {
        let interval = self.shared.poll_interval;
        let max_attempts = self.shared.max_poll_attempts;
        let mut attempts = 0u32;

        self.transition(PollState::Waiting);

        while attempts < max_attempts {
            tokio::select! {
                () = self.token.cancelled() => {
                    self.transition(PollState::Stopped);
                    return;
                }
                () = sleep(interval) => {}
            }

            self.transition(PollState::InFlight);
            attempts += 1;

            let etag = self.shared.current_etag(&self.identity).await;
            let result = self
                .shared
                .client
                .fetch_show(&self.identity, false, etag.as_deref())
                .await;

            // The identity may have changed while the request was in flight;
            // a cancelled token means this result must not touch state.
            if self.token.is_cancelled() {
                self.transition(PollState::Stopped);
                return;
            }

            match result {
                Ok(ShowFetch::Fresh { payload, etag }) => {
                    match self.shared.apply_payload(&self.identity, payload, etag).await {
                        Some(applied) => {
                            if tick_verdict(applied.changed, &applied.dataset)
                                == TickVerdict::Converged
                            {
                                debug!(show = %self.identity, attempts, "enrichment converged");
                                self.transition(PollState::Stopped);
                                return;
                            }
                        }
                        None => {
                            // No longer the current identity.
                            self.transition(PollState::Stopped);
                            return;
                        }
                    }
                }
                Ok(ShowFetch::NotModified) => {
                    trace!(show = %self.identity, attempts, "poll tick: not modified");
                }
                Err(e) => {
                    // A flaky tick must not abandon a converging enrichment.
                    debug!(show = %self.identity, attempts, "poll tick failed: {e}");
                }
            }

            self.transition(PollState::Waiting);
        }

        debug!(show = %self.identity, attempts, "poll attempt cap reached");
        self.transition(PollState::Stopped);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ShowPayload;

    fn dataset(partial: bool, incomplete: bool, refresh_in_progress: bool) -> ShowDataset {
        let payload: ShowPayload = serde_json::from_value(serde_json::json!({
            "imdbID": "tt0903747",
            "partialData": partial,
            "incomplete": incomplete,
            "missingRefreshInProgress": refresh_in_progress,
            "episodes": []
        }))
        .unwrap();
        ShowDataset::from(payload)
    }

    #[test]
    fn converges_only_when_quiet_and_unchanged() {
        assert_eq!(
            tick_verdict(false, &dataset(false, false, false)),
            TickVerdict::Converged
        );
        assert_eq!(
            tick_verdict(true, &dataset(false, false, false)),
            TickVerdict::KeepPolling
        );
    }

    #[test]
    fn any_work_flag_keeps_polling() {
        assert_eq!(
            tick_verdict(false, &dataset(true, false, false)),
            TickVerdict::KeepPolling
        );
        assert_eq!(
            tick_verdict(false, &dataset(false, true, false)),
            TickVerdict::KeepPolling
        );
        assert_eq!(
            tick_verdict(false, &dataset(false, false, true)),
            TickVerdict::KeepPolling
        );
    }
}
