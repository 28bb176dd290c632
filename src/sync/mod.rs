pub mod cancel;
pub mod controller;
pub mod merge;
pub mod poller;

pub use cancel::{RequestCanceller, Slot};
pub use controller::{ShowSnapshot, ShowSyncController, SyncError};
pub use merge::{MergeOutcome, merge};
