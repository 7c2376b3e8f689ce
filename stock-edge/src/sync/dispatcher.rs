//! Sync dispatcher
//!
//! `notify` is called right after a change lands. It never blocks and never
//! fails the caller: the task goes onto a channel and the
//! [`SyncWorker`](super::SyncWorker) coalesces and delivers it.

use shared::mirror::signed_quantity;
use shared::{AggregateSnapshot, MirrorPayload, SyncAction};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::settings::SharedSettings;

/// Coalescing key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SyncKey {
    pub sku: String,
    pub color: String,
}

/// One pending change for the mirror
#[derive(Debug, Clone)]
pub struct SyncTask {
    pub key: SyncKey,
    pub snapshot: AggregateSnapshot,
    pub actor_name: String,
    pub action: SyncAction,
    pub previous_quantity: u64,
    pub new_quantity: u64,
    /// Grid-wide total before the first change this task covers
    pub total_before: i64,
    /// Unix millis of the latest covered change
    pub timestamp: i64,
    pub enqueued_at: Instant,
}

impl SyncTask {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sku: impl Into<String>,
        color: impl Into<String>,
        snapshot: AggregateSnapshot,
        actor_name: impl Into<String>,
        action: SyncAction,
        previous_quantity: u64,
        new_quantity: u64,
    ) -> Self {
        let total_before =
            action.total_before(snapshot.total_quantity, previous_quantity, new_quantity);
        Self {
            key: SyncKey {
                sku: sku.into(),
                color: color.into(),
            },
            snapshot,
            actor_name: actor_name.into(),
            action,
            previous_quantity,
            new_quantity,
            total_before,
            timestamp: shared::util::now_millis(),
            enqueued_at: Instant::now(),
        }
    }

    /// Fold a newer task for the same key into this one
    ///
    /// The before-state (`previous_quantity`, `total_before`, `enqueued_at`)
    /// stays from the oldest task; everything else comes from the newest.
    ///
    /// The key is SKU+color, not position. When a burst touches several
    /// positions, `previous_quantity` and `new_quantity` come from different
    /// cells and the action is classified across them, so only
    /// `total_before` and `total_after` describe the burst as a whole.
    pub fn coalesce(self, newer: SyncTask) -> SyncTask {
        let action = match (self.action, newer.action) {
            (SyncAction::Unclassified, _) | (_, SyncAction::Unclassified) => newer.action,
            _ => SyncAction::classify(self.previous_quantity, newer.new_quantity),
        };
        SyncTask {
            action,
            previous_quantity: self.previous_quantity,
            total_before: self.total_before,
            enqueued_at: self.enqueued_at,
            ..newer
        }
    }

    pub fn to_payload(&self) -> MirrorPayload {
        MirrorPayload {
            sku: self.key.sku.clone(),
            color: self.key.color.clone(),
            action: self.action,
            previous_quantity: self.previous_quantity,
            new_quantity: self.new_quantity,
            total_before: self.total_before,
            total_after: signed_quantity(self.snapshot.total_quantity),
            actor_name: self.actor_name.clone(),
            location: self.snapshot.last_location.clone().unwrap_or_default(),
            timestamp: self.timestamp,
        }
    }
}

/// Fire-and-forget entry point to the mirror pipeline
#[derive(Clone)]
pub struct SyncDispatcher {
    /// `None` when no mirror is configured
    tx: Option<mpsc::UnboundedSender<SyncTask>>,
    settings: SharedSettings,
}

impl std::fmt::Debug for SyncDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncDispatcher")
            .field("enabled", &self.tx.is_some())
            .finish()
    }
}

impl SyncDispatcher {
    pub fn new(settings: SharedSettings) -> (Self, mpsc::UnboundedReceiver<SyncTask>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx: Some(tx),
                settings,
            },
            rx,
        )
    }

    /// Dispatcher that drops every notification
    pub fn disabled(settings: SharedSettings) -> Self {
        Self { tx: None, settings }
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some() && self.settings.read().mirror_enabled
    }

    #[allow(clippy::too_many_arguments)]
    pub fn notify(
        &self,
        sku: &str,
        color: &str,
        snapshot: AggregateSnapshot,
        actor_name: &str,
        action: SyncAction,
        previous_quantity: u64,
        new_quantity: u64,
    ) {
        let Some(tx) = &self.tx else {
            return;
        };
        if !self.settings.read().mirror_enabled {
            tracing::trace!(sku = %sku, color = %color, "Mirror disabled, skipping notify");
            return;
        }

        let task = SyncTask::new(
            sku,
            color,
            snapshot,
            actor_name,
            action,
            previous_quantity,
            new_quantity,
        );
        if tx.send(task).is_err() {
            tracing::warn!(sku = %sku, color = %color, "Sync worker gone, notification dropped");
        }
    }
}
