//! 应用程序错误类型
//!
//! 错误分类：
//! - `ConfigError` - 用户可修复的配置问题（如缺少 API Key），不重试
//! - `BackendError` - AI 后端调用失败（非 2xx 或传输错误），由用户手动重新生成
//! - `StoreError` - 本地存储读写失败（存储降级处理，不会中断主流程）
//!
//! 注意："页面上没有检测到问题" 不是错误，是正常的空闲状态。

use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// AI 后端调用错误
    #[error("AI 后端错误: {0}")]
    Backend(#[from] BackendError),

    /// 本地存储错误
    #[error("存储错误: {0}")]
    Store(#[from] StoreError),

    /// 浏览器相关错误
    #[error("浏览器错误: {0}")]
    Browser(String),

    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 未配置 API Key
    #[error("未配置 API Key，请先在设置中填写")]
    MissingApiKey,
}

/// AI 后端调用错误
#[derive(Debug, Error)]
pub enum BackendError {
    /// 网络传输失败
    #[error("{provider} 请求失败: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// 后端返回错误响应（非 2xx）
    #[error("{provider} API 错误: {message}")]
    Api {
        provider: &'static str,
        message: String,
    },

    /// 后端返回内容为空
    #[error("{provider} 返回内容为空")]
    EmptyContent { provider: &'static str },
}

/// 本地存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    /// 读取存储文件失败
    #[error("读取存储文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// 写入存储文件失败
    #[error("写入存储文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// 存储数据解析失败
    #[error("存储数据解析失败: {source}")]
    ParseFailed {
        #[source]
        source: serde_json::Error,
    },
}

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Browser(err.to_string())
    }
}

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
