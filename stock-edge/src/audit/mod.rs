//! 审计日志模块
//!
//! # 架构
//!
//! ```text
//! InventoryService / MoveManager / SettingsService
//!     ↓ record() (非阻塞)
//! AuditService ──mpsc──→ AuditWorker ──append──→ store `audit_log`
//! ```

mod service;
mod worker;

pub use service::{AuditRecorder, AuditService};
pub use worker::AuditWorker;

#[cfg(test)]
pub(crate) use service::testing;
