use thiserror::Error;

use crate::db::StoreError;

/// 进程级错误 (启动、监听、关闭)
///
/// 请求级错误走 [`shared::AppError`]，始终以 HTTP 200 + 错误码返回。
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("存储初始化失败: {0}")]
    Store(#[from] StoreError),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("内部服务器错误: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;
