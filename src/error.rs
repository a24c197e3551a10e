//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义应用级 `AppError`，命令层与 `main` 统一返回它，
//! 避免各处分散的 `.map_err(|e| e.to_string())`。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `ExtractError` 与 `std::io::Error` 提供 `From` 转换，无需手动 map。
//! - 实现 `Serialize` 将错误序列化为字符串，`--json` 输出时直接嵌入。

use serde::Serialize;

use crate::extractor::ExtractError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 识别链路错误（配置 / 上传 / 导出）
    #[error("{0}")]
    Extract(#[from] ExtractError),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 设置文件不可用或内容非法
    #[error("设置错误: {0}")]
    Settings(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Extract(e) => e.code(),
            Self::Io(_) => "E_IO",
            Self::Settings(_) => "E_SETTINGS",
        }
    }
}

/// 将错误序列化为人类可读的字符串。
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_error_keeps_message_and_code() {
        let err: AppError = ExtractError::Config("bad url".to_string()).into();
        assert_eq!(err.code(), "E_CONFIG");
        assert_eq!(
            serde_json::to_value(&err).expect("json"),
            serde_json::Value::String("Invalid configuration: bad url".to_string())
        );
    }
}
