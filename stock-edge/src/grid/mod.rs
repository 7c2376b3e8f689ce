//! Grid model
//!
//! - [`GridState`]: pure shelf/position/product state with its structural rules
//! - [`GridReplica`]: confirmed store state plus the local pending overlay
//! - [`GridError`]: rule violations

pub mod error;
pub mod model;
pub mod replica;

pub use error::{GridError, GridResult};
pub use model::{GridState, RemovedShelf};
pub use replica::{GridReplica, PendingId, SharedReplica};
