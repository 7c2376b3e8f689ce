use std::path::PathBuf;
use std::time::Duration;

use crate::sync::{DEFAULT_WINDOW_MS, SyncPolicy};

/// 存储后端
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// 进程内存储 (重启丢失)
    Memory,
    /// redb 单文件存储 (work_dir/database/inventory.redb)
    Redb,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "redb" => Ok(Self::Redb),
            other => Err(format!("unknown store backend: {other}")),
        }
    }
}

/// 服务配置
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | /var/lib/stock/edge | 工作目录 (数据库、日志) |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | LOG_LEVEL | info | 日志级别 |
/// | STORE_BACKEND | redb | memory \| redb |
/// | MIRROR_WEBHOOK_URL | (无) | 外部表格镜像地址，未设置时不同步 |
/// | MIRROR_TIMEOUT_MS | 10000 | 镜像请求超时(毫秒) |
/// | SYNC_WINDOW_MS | 1200 | 同步合并窗口(毫秒) |
/// | SYNC_POLICY | trailing | trailing \| drop |
/// | AUDIT_BUFFER_SIZE | 1024 | 审计通道容量 |
/// | SHUTDOWN_TIMEOUT_MS | 10000 | 关闭超时(毫秒) |
/// | ENVIRONMENT | development | 运行环境 |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/stock HTTP_PORT=8080 MIRROR_WEBHOOK_URL=https://... cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 日志级别
    pub log_level: String,
    /// 存储后端
    pub store_backend: StoreBackend,
    /// 外部镜像 webhook
    pub mirror_webhook_url: Option<String>,
    /// 镜像请求超时 (毫秒)
    pub mirror_timeout_ms: u64,
    /// 同步合并窗口 (毫秒)
    pub sync_window_ms: u64,
    /// 同步合并策略
    pub sync_policy: SyncPolicy,
    /// 审计通道容量
    pub audit_buffer_size: usize,
    /// 关闭超时时间 (毫秒)
    pub shutdown_timeout_ms: u64,
    /// 运行环境: development | staging | production
    pub environment: String,
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 未设置或无法解析的变量使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/stock/edge".into()),
            http_port: env_parse("HTTP_PORT", 3000),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            store_backend: env_parse("STORE_BACKEND", StoreBackend::Redb),
            mirror_webhook_url: std::env::var("MIRROR_WEBHOOK_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            mirror_timeout_ms: env_parse("MIRROR_TIMEOUT_MS", 10_000),
            sync_window_ms: env_parse("SYNC_WINDOW_MS", DEFAULT_WINDOW_MS),
            sync_policy: env_parse("SYNC_POLICY", SyncPolicy::Trailing),
            audit_buffer_size: env_parse("AUDIT_BUFFER_SIZE", 1024),
            shutdown_timeout_ms: env_parse("SHUTDOWN_TIMEOUT_MS", 10_000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景：内存存储、不连接外部镜像
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config.store_backend = StoreBackend::Memory;
        config.mirror_webhook_url = None;
        config
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn database_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("database")
    }

    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("logs")
    }

    /// 确保工作目录结构存在
    pub fn ensure_work_dir_structure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.database_dir())?;
        std::fs::create_dir_all(self.log_dir())?;
        Ok(())
    }

    pub fn sync_window(&self) -> Duration {
        Duration::from_millis(self.sync_window_ms)
    }

    pub fn mirror_timeout(&self) -> Duration {
        Duration::from_millis(self.mirror_timeout_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
