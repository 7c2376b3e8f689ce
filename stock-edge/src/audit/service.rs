//! 审计记录服务
//!
//! `AuditService` 通过 mpsc 通道把审计事件交给 [`AuditWorker`](super::AuditWorker)，
//! 调用方从不等待存储写入。

use shared::{Actor, AuditAction, AuditEvent};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Audit sink used by the inventory and move services
///
/// Fire-and-forget: recording never fails the caller's operation.
pub trait AuditRecorder: Send + Sync + 'static {
    fn record(&self, actor: &Actor, action: AuditAction, details: serde_json::Value, target_id: &str);
}

/// 审计日志服务
///
/// 通道满时不阻塞调用方，改为派生任务等待发送，事件不丢失。
pub struct AuditService {
    tx: mpsc::Sender<AuditEvent>,
}

impl std::fmt::Debug for AuditService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditService")
            .field("capacity", &self.tx.capacity())
            .finish()
    }
}

impl AuditService {
    /// 创建审计服务，返回服务和 worker 使用的接收端
    pub fn new(buffer_size: usize) -> (Arc<Self>, mpsc::Receiver<AuditEvent>) {
        let (tx, rx) = mpsc::channel(buffer_size.max(1));
        (Arc::new(Self { tx }), rx)
    }
}

impl AuditRecorder for AuditService {
    fn record(&self, actor: &Actor, action: AuditAction, details: serde_json::Value, target_id: &str) {
        let event = AuditEvent {
            actor: actor.clone(),
            action,
            details,
            target_id: target_id.to_string(),
            timestamp: shared::util::now_millis(),
        };

        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                tracing::warn!(action = %action, "Audit channel full, deferring entry");
                let Ok(handle) = tokio::runtime::Handle::try_current() else {
                    tracing::error!(action = %action, "No runtime to defer audit entry, entry lost");
                    return;
                };
                let tx = self.tx.clone();
                handle.spawn(async move {
                    if tx.send(event).await.is_err() {
                        tracing::error!("Audit channel closed, entry lost");
                    }
                });
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                tracing::error!(
                    action = %event.action,
                    target = %event.target_id,
                    "Audit channel closed, entry lost"
                );
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn record_hands_event_to_worker_channel() {
        let (service, mut rx) = AuditService::new(8);
        let actor = Actor::new("u1", "Ana", "ana@example.com");
        service.record(&actor, AuditAction::ShelfAdded, json!({"id": 1}), "shelf:1");

        let event = rx.recv().await.unwrap();
        assert_eq!(event.actor, actor);
        assert_eq!(event.action, AuditAction::ShelfAdded);
        assert_eq!(event.target_id, "shelf:1");
        assert!(event.timestamp > 0);
    }

    #[tokio::test]
    async fn full_channel_defers_instead_of_blocking() {
        let (service, mut rx) = AuditService::new(1);
        let actor = Actor::system();
        service.record(&actor, AuditAction::ShelfAdded, json!({}), "shelf:1");
        service.record(&actor, AuditAction::ShelfRemoved, json!({}), "shelf:1");

        assert_eq!(rx.recv().await.unwrap().action, AuditAction::ShelfAdded);
        assert_eq!(rx.recv().await.unwrap().action, AuditAction::ShelfRemoved);
    }

    #[tokio::test]
    async fn closed_channel_is_not_an_error_for_the_caller() {
        let (service, rx) = AuditService::new(1);
        drop(rx);
        service.record(&Actor::system(), AuditAction::ShelfAdded, json!({}), "shelf:1");
    }
}
