//! 核心模块 - 配置、状态、后台任务和服务器
//!
//! # 模块结构
//!
//! - [`Config`] - 服务配置
//! - [`EngineState`] - 引擎状态
//! - [`BackgroundTasks`] - 后台任务管理
//! - [`Server`] - HTTP 服务器
//! - [`ServerError`] - 进程级错误

pub mod config;
pub mod error;
pub mod server;
pub mod state;
pub mod tasks;

pub use config::{Config, StoreBackend};
pub use error::{Result, ServerError};
pub use server::Server;
pub use state::EngineState;
pub use tasks::{BackgroundTasks, TaskKind};
