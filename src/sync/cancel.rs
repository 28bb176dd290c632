//! Slot-keyed cooperative cancellation for in-flight fetches.
//!
//! Each logical fetch slot holds at most one live token. Starting a new
//! request for a slot cancels whatever was outstanding there, so a stale
//! completion can detect it lost the race and discard its result.

use std::collections::HashMap;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Logical fetch slots. One token per slot is live at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Metadata,
    Episodes,
    Poll,
}

#[derive(Default)]
pub struct RequestCanceller {
    slots: Mutex<HashMap<Slot, CancellationToken>>,
}

impl RequestCanceller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh token for `slot`, cancelling any previous one. Cancelled
    /// tokens are never reused; every call mints a new token.
    pub async fn begin(&self, slot: Slot) -> CancellationToken {
        let mut slots = self.slots.lock().await;
        if let Some(previous) = slots.get(&slot) {
            previous.cancel();
        }
        let token = CancellationToken::new();
        slots.insert(slot, token.clone());
        token
    }

    /// Cancel every slot at once. Used on identity change and teardown.
    pub async fn cancel_all(&self) {
        let slots = self.slots.lock().await;
        for token in slots.values() {
            token.cancel();
        }
    }
}
