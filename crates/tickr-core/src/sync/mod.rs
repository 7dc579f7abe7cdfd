//! Client-side synchronization
//!
//! [`SyncController`] keeps the user's list consistent across the remote
//! store, the offline snapshot and realtime push events. Which side an
//! operation touches depends on the connectivity signal at the time of the
//! call.
//!
//! ```ignore
//! let connectivity = Connectivity::new(true);
//! let mut controller = SyncController::new(store, cache, user_id, connectivity.subscribe());
//! controller.fetch().await;
//! controller.add("Buy milk").await?;
//! ```

mod controller;
mod live;

pub use controller::SyncController;
pub use live::LiveList;

/// How an operation was carried out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The remote store accepted the request
    Synced,
    /// Applied to memory and the offline snapshot, or read from it
    Cached,
    /// Nothing to do
    Skipped,
    /// Remote or cache failure; logged and state left as it was
    Failed,
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed)
    }
}

/// Input rejected before any I/O
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Title cannot be empty")]
    EmptyTitle,
}
