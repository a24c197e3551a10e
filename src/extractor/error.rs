//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载识别链路中“真正异常”的来源，避免字符串拼接式错误处理。
//! 校验结果与识别结果本身是值（`ValidationResult` / `ExtractionOutcome`），不走错误通道；
//! 这里只放配置非法、线程执行失败、导出失败等需要上抛的情况。
//!
//! 通过 `thiserror` 保持人类可读错误，同时提供稳定的 `code()` / `stage()`，
//! 便于命令层输出结构化错误。

use std::fmt;

/// 传输层失败类别。
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportErrorKind {
    /// 计时器先于响应触发，请求已被取消。
    Timeout,
    /// 连接失败或非 2xx 状态码。
    Network,
    /// 响应体不符合约定结构。
    BadResponse,
}

impl TransportErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Network => "network",
            Self::BadResponse => "bad_response",
        }
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 识别链路统一错误类型。
///
/// 该类型会在命令层被上转为 `AppError`。
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Transport error ({kind}): {detail}")]
    Transport {
        kind: TransportErrorKind,
        detail: String,
    },

    #[error("Preview error: {0}")]
    Preview(String),

    #[error("Clipboard error: {0}")]
    Clipboard(String),

    #[error("File error: {0}")]
    FileSystem(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Task error: {0}")]
    Task(String),
}

impl ExtractError {
    /// 稳定错误码，供命令层与 JSON 输出使用。
    pub fn code(&self) -> &'static str {
        match self {
            Self::Transport { kind, .. } => match kind {
                TransportErrorKind::Timeout => "E_TIMEOUT",
                TransportErrorKind::Network => "E_NETWORK",
                TransportErrorKind::BadResponse => "E_BAD_RESPONSE",
            },
            Self::Preview(_) => "E_PREVIEW",
            Self::Clipboard(_) => "E_CLIPBOARD",
            Self::FileSystem(_) => "E_FILE",
            Self::Config(_) => "E_CONFIG",
            Self::Task(_) => "E_TASK",
        }
    }

    /// 出错所在的流水线阶段。
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Preview(_) => "preview",
            Self::Transport { .. } => "upload",
            Self::Clipboard(_) | Self::FileSystem(_) => "export",
            Self::Config(_) => "config",
            Self::Task(_) => "runtime",
        }
    }
}
