//! 控制 API 错误类型

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// 请求超时（客户端超时或 Clash 返回的探测超时均归为此类）
    #[error("request timed out")]
    Timeout,

    #[error("unexpected status: {status}")]
    Status { status: u16 },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout
        } else if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}
