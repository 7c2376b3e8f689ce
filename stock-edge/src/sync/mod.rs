//! External mirror synchronisation
//!
//! ```text
//! InventoryService / MoveManager
//!     ↓ notify() (non-blocking)
//! SyncDispatcher ──mpsc──→ SyncWorker (coalesce per sku+color) ──POST──→ mirror
//! ```
//!
//! The coalescing state lives only in the worker and resets on restart.

mod dispatcher;
mod mirror;
mod worker;

pub use dispatcher::{SyncDispatcher, SyncKey, SyncTask};
pub use mirror::{HttpMirror, MirrorClient, MirrorError};
pub use worker::{DEFAULT_WINDOW_MS, SyncPolicy, SyncWorker};

#[cfg(test)]
pub(crate) use mirror::testing;
