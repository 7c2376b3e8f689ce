use thiserror::Error;

use crate::store::StoreError;
use crate::sync::MirrorError;

/// 启动和运行期错误
///
/// 业务错误走 `InventoryError` → `AppError`；这里只覆盖进程级失败。
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("存储初始化失败: {0}")]
    Store(#[from] StoreError),

    #[error("镜像客户端初始化失败: {0}")]
    Mirror(#[from] MirrorError),
}

pub type Result<T> = std::result::Result<T, ServerError>;
