//! Minimal-diff merge of an incoming episode dataset into the held one.
//!
//! Unchanged episodes keep their `Arc` pointer identity across a merge, so
//! observers comparing by pointer only see the cells that actually moved.
//! The returned `changed` flag is the poll loop's termination signal and the
//! sole trigger for notifying observers.

use std::collections::HashMap;
use std::sync::Arc;

use crate::models::{Episode, ShowDataset};

#[derive(Debug)]
pub struct MergeOutcome {
    pub dataset: ShowDataset,
    pub changed: bool,
}

/// Merge `incoming` into `existing`.
///
/// A missing or differently-sized existing dataset is replaced wholesale
/// (the structural shape changed, so the incoming snapshot wins). At equal
/// size, episodes are aligned by their `(season, episode)` key, never by
/// array position. Status flags are mirrored from the server, not
/// recomputed; a flag-only difference still counts as a change.
#[must_use]
pub fn merge(existing: Option<&ShowDataset>, incoming: ShowDataset) -> MergeOutcome {
    let Some(existing) = existing else {
        return MergeOutcome {
            dataset: incoming,
            changed: true,
        };
    };

    if existing.episodes.len() != incoming.episodes.len() {
        return MergeOutcome {
            dataset: incoming,
            changed: true,
        };
    }

    let incoming_by_key: HashMap<(u32, u32), &Arc<Episode>> = incoming
        .episodes
        .iter()
        .map(|ep| (ep.key(), ep))
        .collect();

    let mut changed = false;
    let episodes: Vec<Arc<Episode>> = existing
        .episodes
        .iter()
        .map(|ep| match incoming_by_key.get(&ep.key()) {
            Some(next)
                if ep.rating != next.rating
                    || ep.votes != next.votes
                    || ep.title != next.title =>
            {
                changed = true;
                Arc::new(Episode {
                    title: next.title.clone(),
                    rating: next.rating,
                    votes: next.votes,
                    ..(**ep).clone()
                })
            }
            // Same content, or no incoming counterpart for this key: the
            // existing row survives untouched, pointer and all.
            _ => Arc::clone(ep),
        })
        .collect();

    let flags_differ = existing.partial_data != incoming.partial_data
        || existing.incomplete != incoming.incomplete
        || existing.metadata_stale != incoming.metadata_stale
        || existing.episodes_stale_count != incoming.episodes_stale_count
        || existing.missing_refresh_in_progress != incoming.missing_refresh_in_progress;

    if flags_differ {
        changed = true;
    }

    let mut dataset = ShowDataset {
        episodes,
        ..existing.clone()
    };
    if changed {
        dataset.partial_data = incoming.partial_data;
        dataset.incomplete = incoming.incomplete;
        dataset.metadata_stale = incoming.metadata_stale;
        dataset.episodes_stale_count = incoming.episodes_stale_count;
        dataset.missing_refresh_in_progress = incoming.missing_refresh_in_progress;
    }

    MergeOutcome { dataset, changed }
}
