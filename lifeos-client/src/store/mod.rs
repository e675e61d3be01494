/// Task store
///
/// # Modules
///
/// - [`task_store`]: The store and its operations
/// - [`cache`]: Snapshot channel, load states and the epoch guard
/// - [`ranking`]: Next-task order and priority sorting
/// - `sync`: Initial load and notification-driven refetch
///
/// # State Machine (per collection)
///
/// ```text
/// Uninitialized ──(store opened)──> Loading ──(first fetch)──> Ready
///       ^                                                         │
///       └────────────────────(session change)─────────────────────┘
/// ```

pub mod cache;
pub mod ranking;
mod sync;
pub mod task_store;

pub use cache::{CollectionState, LoadState, Snapshot, Snapshots};
pub use task_store::TaskStore;
