use parking_lot::Mutex;
use shared::{AuditEvent, InventorySettings};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::audit::{AuditRecorder, AuditService, AuditWorker};
use crate::core::config::StoreBackend;
use crate::core::tasks::{BackgroundTasks, TaskKind};
use crate::core::{Config, Result};
use crate::grid::{GridReplica, SharedReplica};
use crate::inventory::{InventoryService, PositionWriter};
use crate::moves::MoveManager;
use crate::settings::{SettingsService, SharedSettings, shared_settings};
use crate::store::{MemoryStore, RedbStore, StoreAdapter, StoreListener};
use crate::sync::{HttpMirror, MirrorClient, SyncDispatcher, SyncTask, SyncWorker};

/// 尚未启动的后台任务的通道接收端
struct PendingWorkers {
    audit_rx: mpsc::Receiver<AuditEvent>,
    sync: Option<(Arc<dyn MirrorClient>, mpsc::UnboundedReceiver<SyncTask>)>,
}

/// 引擎状态 - 持有所有服务的共享引用
///
/// 使用 Arc 实现浅拷贝，作为 axum 的 `State` 传给所有处理器。
///
/// | 字段 | 说明 |
/// |------|------|
/// | store | 实时存储 (权威数据) |
/// | replica | 本地副本 (确认层 + 待确认写入) |
/// | settings | 运行时设置的共享副本 |
/// | inventory | 货架、商品、报表 |
/// | moves | 移库事务 |
/// | settings_service | 设置读写 |
#[derive(Clone)]
pub struct EngineState {
    pub config: Config,
    pub store: Arc<dyn StoreAdapter>,
    pub replica: SharedReplica,
    pub settings: SharedSettings,
    pub inventory: Arc<InventoryService>,
    pub moves: Arc<MoveManager>,
    pub settings_service: Arc<SettingsService>,
    pub sync: SyncDispatcher,
    pub started_at: Instant,
    workers: Arc<Mutex<Option<PendingWorkers>>>,
    shutdown: CancellationToken,
}

impl EngineState {
    /// 初始化引擎状态
    ///
    /// 1. 工作目录结构
    /// 2. 存储 (memory 或 work_dir/database/inventory.redb)
    /// 3. 外部镜像客户端 (配置了 MIRROR_WEBHOOK_URL 时)
    /// 4. 各服务
    pub async fn initialize(config: &Config) -> Result<Self> {
        let store: Arc<dyn StoreAdapter> = match config.store_backend {
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
            StoreBackend::Redb => {
                config.ensure_work_dir_structure()?;
                let path = config.database_dir().join("inventory.redb");
                tracing::info!(path = %path.display(), "Opening redb store");
                Arc::new(RedbStore::open(&path)?)
            }
        };

        let mirror: Option<Arc<dyn MirrorClient>> = match &config.mirror_webhook_url {
            Some(url) => {
                tracing::info!(url = %url, "External mirror enabled");
                Some(Arc::new(HttpMirror::new(url.clone(), config.mirror_timeout())?))
            }
            None => {
                tracing::info!("MIRROR_WEBHOOK_URL not set, external mirror disabled");
                None
            }
        };

        Ok(Self::assemble(config, store, mirror))
    }

    /// 用给定的存储和镜像组装服务 (不启动后台任务)
    pub fn assemble(
        config: &Config,
        store: Arc<dyn StoreAdapter>,
        mirror: Option<Arc<dyn MirrorClient>>,
    ) -> Self {
        let replica = GridReplica::new().shared();
        let settings = shared_settings(InventorySettings::default());

        let (audit_service, audit_rx) = AuditService::new(config.audit_buffer_size);
        let audit: Arc<dyn AuditRecorder> = audit_service;

        let (sync, sync_workers) = match mirror {
            Some(mirror) => {
                let (dispatcher, rx) = SyncDispatcher::new(settings.clone());
                (dispatcher, Some((mirror, rx)))
            }
            None => (SyncDispatcher::disabled(settings.clone()), None),
        };

        let writer = Arc::new(PositionWriter::new(replica.clone(), store.clone()));
        let inventory = Arc::new(InventoryService::new(
            writer.clone(),
            audit.clone(),
            sync.clone(),
            settings.clone(),
        ));
        let moves = Arc::new(MoveManager::new(writer, audit.clone(), sync.clone()));
        let settings_service = Arc::new(SettingsService::new(store.clone(), settings.clone(), audit));

        Self {
            config: config.clone(),
            store,
            replica,
            settings,
            inventory,
            moves,
            settings_service,
            sync,
            started_at: Instant::now(),
            workers: Arc::new(Mutex::new(Some(PendingWorkers {
                audit_rx,
                sync: sync_workers,
            }))),
            shutdown: CancellationToken::new(),
        }
    }

    /// 加载副本并启动后台任务
    ///
    /// 必须在 `Server::run()` 之前调用，且只生效一次。返回时副本已包含
    /// 存储中的全部数据。
    pub async fn start_background_tasks(&self) -> Result<BackgroundTasks> {
        let mut tasks = BackgroundTasks::with_token(self.shutdown.clone());
        let Some(workers) = self.workers.lock().take() else {
            tracing::warn!("Background tasks already started");
            return Ok(tasks);
        };

        // Store listener: subscribe first, then load, then follow
        let listener = StoreListener::new(
            self.store.clone(),
            self.replica.clone(),
            self.settings.clone(),
            tasks.shutdown_token(),
        );
        let subscription = self.store.subscribe("");
        listener.reload().await?;
        tasks.spawn("store_listener", TaskKind::Listener, listener.follow(subscription));

        let audit_worker = AuditWorker::new(self.store.clone());
        tasks.spawn(
            "audit_worker",
            TaskKind::Worker,
            audit_worker.run_until(workers.audit_rx, tasks.shutdown_token()),
        );

        if let Some((mirror, rx)) = workers.sync {
            let worker = SyncWorker::new(
                mirror,
                self.config.sync_window(),
                self.config.sync_policy,
                tasks.shutdown_token(),
            );
            tasks.spawn("sync_worker", TaskKind::Worker, worker.run(rx));
        }

        tasks.log_summary();
        Ok(tasks)
    }

    /// 全局关闭信号
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
