//! 审计日志后台 Worker
//!
//! 从 mpsc 通道消费 AuditEvent，追加到存储的 `audit_log` 列表。
//! 通道关闭时自动退出。写入失败只记录日志，不影响业务操作。

use shared::AuditEvent;
use std::sync::Arc;

use crate::store::{StoreAdapter, keys};

pub struct AuditWorker {
    store: Arc<dyn StoreAdapter>,
}

impl AuditWorker {
    pub fn new(store: Arc<dyn StoreAdapter>) -> Self {
        Self { store }
    }

    /// 运行 worker（阻塞直到通道关闭）
    pub async fn run(self, mut rx: tokio::sync::mpsc::Receiver<AuditEvent>) {
        tracing::info!("Audit log worker started");

        while let Some(event) = rx.recv().await {
            self.write(event).await;
        }

        tracing::info!("Audit log channel closed, worker stopping");
    }

    /// 运行 worker，收到 shutdown 信号后写完已排队的事件再退出
    pub async fn run_until(
        self,
        mut rx: tokio::sync::mpsc::Receiver<AuditEvent>,
        shutdown: tokio_util::sync::CancellationToken,
    ) {
        tracing::info!("Audit log worker started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                event = rx.recv() => match event {
                    Some(event) => self.write(event).await,
                    None => {
                        tracing::info!("Audit log channel closed, worker stopping");
                        return;
                    }
                },
            }
        }

        let mut drained = 0usize;
        while let Ok(event) = rx.try_recv() {
            self.write(event).await;
            drained += 1;
        }
        tracing::info!(drained, "Audit log worker stopped");
    }

    async fn write(&self, event: AuditEvent) {
        let value = match serde_json::to_value(&event) {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(action = %event.action, "Failed to encode audit entry: {e}");
                return;
            }
        };

        match self.store.append(keys::AUDIT_LOG, value).await {
            Ok(id) => {
                tracing::debug!(
                    audit_id = %id,
                    action = %event.action,
                    target = %event.target_id,
                    "Audit entry recorded"
                );
            }
            Err(e) => {
                tracing::error!(
                    action = %event.action,
                    target = %event.target_id,
                    "Failed to write audit entry: {e}"
                );
            }
        }
    }
}
