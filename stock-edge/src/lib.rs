//! Stock Edge - 货架库存一致性引擎
//!
//! # 架构概述
//!
//! 多个客户端共享同一个实时存储。每个引擎实例维护一份本地副本，
//! 本地写入先乐观应用，再由存储确认；存储的变更流驱动副本收敛。
//!
//! - **网格** (`grid`): 货架、货位、商品的纯状态与结构规则
//! - **存储** (`store`): 实时存储适配器 (memory / redb) 与变更监听
//! - **库存** (`inventory`): 货架管理、商品写入、数量增减
//! - **移库** (`moves`): 保持总量不变的移库事务
//! - **报表** (`report`): 按 SKU+颜色 汇总
//! - **审计** (`audit`): 非阻塞审计日志
//! - **同步** (`sync`): 外部表格镜像 (按 SKU+颜色 合并)
//! - **HTTP API** (`api`): RESTful 接口
//!
//! # 模块结构
//!
//! ```text
//! stock-edge/src/
//! ├── core/          # 配置、状态、后台任务、服务器
//! ├── grid/          # 网格模型与本地副本
//! ├── store/         # 存储适配器
//! ├── inventory/     # 库存服务
//! ├── moves/         # 移库事务
//! ├── report/        # 汇总报表
//! ├── audit/         # 审计日志
//! ├── sync/          # 外部镜像
//! ├── settings/      # 运行时设置
//! ├── api/           # HTTP 路由和处理器
//! └── utils/         # 日志
//! ```

pub mod api;
pub mod audit;
pub mod core;
pub mod grid;
pub mod inventory;
pub mod moves;
pub mod report;
pub mod settings;
pub mod store;
pub mod sync;
pub mod utils;

// Re-export 公共类型
pub use core::{Config, EngineState, Server, ServerError};
pub use grid::{GridReplica, GridState};
pub use inventory::{InventoryError, InventoryService};
pub use moves::{MoveManager, MoveMode, MoveReceipt, MoveRequest};
pub use store::{MemoryStore, RedbStore, StoreAdapter};
pub use sync::{MirrorClient, MirrorError};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

pub fn print_banner() {
    println!(
        r#"
   _____ __             __
  / ___// /_____  _____/ /__
  \__ \/ __/ __ \/ ___/ //_/
 ___/ / /_/ /_/ / /__/ ,<
/____/\__/\____/\___/_/|_|
    ______    __
   / ____/___/ /___ ____
  / __/ / __  / __ `/ _ \
 / /___/ /_/ / /_/ /  __/
/_____/\__,_/\__, /\___/
            /____/
    "#
    );
}
