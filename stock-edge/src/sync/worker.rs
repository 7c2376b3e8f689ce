//! SyncWorker: background worker that feeds the mirror
//!
//! Receives [`SyncTask`]s from the dispatcher, coalesces them per
//! `(sku, color)` within the window, and delivers payloads. Delivery is
//! best-effort: failures are logged, never retried or re-queued.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use super::dispatcher::{SyncKey, SyncTask};
use super::mirror::MirrorClient;

/// Default coalescing window per key
pub const DEFAULT_WINDOW_MS: u64 = 1200;

/// How repeated notifications inside the window are handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncPolicy {
    /// Hold the first task of a burst for one window, merge later ones into
    /// it, then deliver the merged task
    #[default]
    Trailing,
    /// Deliver the first task immediately and drop the rest of the window
    Drop,
}

impl FromStr for SyncPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trailing" => Ok(Self::Trailing),
            "drop" => Ok(Self::Drop),
            other => Err(format!("unknown sync policy: {other}")),
        }
    }
}

pub struct SyncWorker {
    mirror: Arc<dyn MirrorClient>,
    window: Duration,
    policy: SyncPolicy,
    shutdown: CancellationToken,
}

impl SyncWorker {
    pub fn new(
        mirror: Arc<dyn MirrorClient>,
        window: Duration,
        policy: SyncPolicy,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            mirror,
            window,
            policy,
            shutdown,
        }
    }

    /// Run until shutdown or until every dispatcher is dropped
    ///
    /// Pending tasks are flushed on the way out and in-flight deliveries
    /// are awaited.
    pub async fn run(self, mut rx: mpsc::UnboundedReceiver<SyncTask>) {
        tracing::info!(
            window_ms = self.window.as_millis() as u64,
            policy = ?self.policy,
            "SyncWorker started"
        );

        // Trailing: key -> (merged task, flush deadline)
        let mut pending: HashMap<SyncKey, (SyncTask, Instant)> = HashMap::new();
        // Drop: key -> last delivery
        let mut last_fired: HashMap<SyncKey, Instant> = HashMap::new();
        let mut in_flight: JoinSet<()> = JoinSet::new();

        loop {
            let next_deadline = pending.values().map(|(_, deadline)| *deadline).min();
            let sleep_until =
                next_deadline.unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));

            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!("SyncWorker shutting down");
                    self.flush_all(&mut pending, &mut in_flight);
                    break;
                }

                _ = tokio::time::sleep_until(sleep_until), if next_deadline.is_some() => {
                    self.flush_due(&mut pending, &mut in_flight);
                }

                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = joined {
                        tracing::error!("Mirror delivery task failed: {e}");
                    }
                }

                task = rx.recv() => {
                    match task {
                        Some(task) => match self.policy {
                            SyncPolicy::Trailing => self.accept_trailing(task, &mut pending),
                            SyncPolicy::Drop => {
                                self.accept_drop(task, &mut last_fired, &mut in_flight)
                            }
                        },
                        None => {
                            tracing::info!("Sync channel closed, SyncWorker stopping");
                            self.flush_all(&mut pending, &mut in_flight);
                            break;
                        }
                    }
                }
            }
        }

        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Mirror delivery task failed: {e}");
            }
        }
        tracing::info!("SyncWorker stopped");
    }

    fn accept_trailing(&self, task: SyncTask, pending: &mut HashMap<SyncKey, (SyncTask, Instant)>) {
        match pending.entry(task.key.clone()) {
            Entry::Occupied(mut slot) => {
                tracing::debug!(
                    sku = %task.key.sku,
                    color = %task.key.color,
                    "Coalescing sync task into pending window"
                );
                let (current, _) = slot.get_mut();
                *current = current.clone().coalesce(task);
            }
            Entry::Vacant(slot) => {
                let deadline = task.enqueued_at + self.window;
                slot.insert((task, deadline));
            }
        }
    }

    fn accept_drop(
        &self,
        task: SyncTask,
        last_fired: &mut HashMap<SyncKey, Instant>,
        in_flight: &mut JoinSet<()>,
    ) {
        let now = Instant::now();
        if let Some(last) = last_fired.get(&task.key)
            && now.duration_since(*last) < self.window
        {
            tracing::debug!(
                sku = %task.key.sku,
                color = %task.key.color,
                "Sync task inside window, dropped"
            );
            return;
        }
        last_fired.insert(task.key.clone(), now);
        self.deliver(task, in_flight);
    }

    fn flush_due(
        &self,
        pending: &mut HashMap<SyncKey, (SyncTask, Instant)>,
        in_flight: &mut JoinSet<()>,
    ) {
        let now = Instant::now();
        let due: Vec<SyncKey> = pending
            .iter()
            .filter(|(_, (_, deadline))| *deadline <= now)
            .map(|(key, _)| key.clone())
            .collect();
        for key in due {
            if let Some((task, _)) = pending.remove(&key) {
                self.deliver(task, in_flight);
            }
        }
    }

    fn flush_all(
        &self,
        pending: &mut HashMap<SyncKey, (SyncTask, Instant)>,
        in_flight: &mut JoinSet<()>,
    ) {
        for (_, (task, _)) in pending.drain() {
            self.deliver(task, in_flight);
        }
    }

    fn deliver(&self, task: SyncTask, in_flight: &mut JoinSet<()>) {
        let payload = task.to_payload();
        let mirror = self.mirror.clone();
        in_flight.spawn(async move {
            match mirror.deliver(&payload).await {
                Ok(()) => {
                    tracing::debug!(
                        sku = %payload.sku,
                        color = %payload.color,
                        action = %payload.action,
                        total_after = payload.total_after,
                        "Mirror updated"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        sku = %payload.sku,
                        color = %payload.color,
                        "Mirror delivery failed, not retrying: {e}"
                    );
                }
            }
        });
    }
}
