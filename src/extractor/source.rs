//! # 数据源与中间模型
//!
//! ## 设计思路
//!
//! 将“外部输入”和“流水线中间结果”解耦：
//! - `SelectedFile` 表示用户选择/拖入的候选文件
//! - `UploadRequest` 表示已通过校验、准备发送的请求
//! - `ValidationResult` / `ExtractionOutcome` 用和类型表达每条失败路径
//! - `Preview` / `PreviewSlot` 表示可直接展示的预览

use bytes::Bytes;

use super::config::DEFAULT_LANGUAGE;
use super::error::TransportErrorKind;

/// 用户选择的候选文件。
///
/// `bytes` 使用 `Bytes`，预览与上传两条支路共享同一份数据，无需复制。
#[derive(Debug, Clone)]
pub struct SelectedFile {
    /// 原始文件字节。
    pub bytes: Bytes,
    /// 文件名（用于扩展名回退判断与 multipart 文件名）。
    pub name: String,
    /// 声明的 MIME 类型，可能为空或不可信。
    pub mime: String,
}

impl SelectedFile {
    pub fn new(bytes: impl Into<Bytes>, name: impl Into<String>, mime: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            name: name.into(),
            mime: mime.into(),
        }
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// 小写扩展名（含前导 `.`），取最后一个 `.` 之后的部分。
    ///
    /// 没有 `.` 时整个文件名视为扩展名，与浏览器端 `name.split('.').pop()` 一致。
    pub fn extension(&self) -> String {
        let tail = self.name.rsplit('.').next().unwrap_or_default();
        format!(".{}", tail.to_lowercase())
    }
}

/// 识别语言选择器。
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Language(String);

impl Language {
    /// 规范化语言代码：去空白、转小写；空值回退默认语言。
    pub fn new(code: &str) -> Self {
        let normalized = code.trim().to_lowercase();
        if normalized.is_empty() {
            Self::default()
        } else {
            Self(normalized)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Language {
    fn default() -> Self {
        Self(DEFAULT_LANGUAGE.to_string())
    }
}

/// 通过校验后的上传请求，构造后不可变。
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file_bytes: Bytes,
    pub file_name: String,
    pub mime_type: String,
    pub language: Language,
}

impl UploadRequest {
    pub fn from_file(file: &SelectedFile, language: Language) -> Self {
        Self {
            file_bytes: file.bytes.clone(),
            file_name: file.name.clone(),
            mime_type: file.mime.clone(),
            language,
        }
    }
}

/// 校验结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Accepted,
    Rejected(String),
}

impl ValidationResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// 单次请求的最终结果，只会被展示层消费一次。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionOutcome {
    Success(String),
    ServerError(String),
    TransportError {
        kind: TransportErrorKind,
        detail: String,
    },
}

impl ExtractionOutcome {
    pub(crate) fn transport(kind: TransportErrorKind, detail: impl Into<String>) -> Self {
        Self::TransportError {
            kind,
            detail: detail.into(),
        }
    }

    /// 错误横幅展示的文案；成功时为 `None`。
    pub fn banner_message(&self) -> Option<String> {
        match self {
            Self::Success(_) => None,
            Self::ServerError(message) => Some(message.clone()),
            Self::TransportError {
                kind: TransportErrorKind::Timeout,
                detail,
            } => Some(detail.clone()),
            Self::TransportError { detail, .. } => Some(format!("Upload failed: {}", detail)),
        }
    }
}

/// 解码完成、可直接展示的预览。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    /// `data:<mime>;base64,...` 形式的地址。
    pub data_url: String,
    pub width: u32,
    pub height: u32,
    pub mime: String,
}

/// 预览槽位：与识别状态解耦，独立完成。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PreviewSlot {
    #[default]
    Empty,
    Pending,
    Ready(Preview),
    /// 解码失败，展示占位，不影响识别。
    Unavailable,
}

impl PreviewSlot {
    pub fn status(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Pending => "pending",
            Self::Ready(_) => "ready",
            Self::Unavailable => "unavailable",
        }
    }

    pub fn preview(&self) -> Option<&Preview> {
        match self {
            Self::Ready(preview) => Some(preview),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_uses_text_after_last_dot() {
        let file = SelectedFile::new(vec![1u8], "scan.final.PNG", "");
        assert_eq!(file.extension(), ".png");

        let bare = SelectedFile::new(vec![1u8], "README", "");
        assert_eq!(bare.extension(), ".readme");
    }

    #[test]
    fn language_falls_back_to_default() {
        assert_eq!(Language::new("  ").as_str(), "en");
        assert_eq!(Language::new(" CH_SIM ").as_str(), "ch_sim");
    }

    #[test]
    fn banner_message_prefixes_transport_failures() {
        let server = ExtractionOutcome::ServerError("bad image".into());
        assert_eq!(server.banner_message().as_deref(), Some("bad image"));

        let network =
            ExtractionOutcome::transport(TransportErrorKind::Network, "Server error: 502 Bad Gateway");
        assert_eq!(
            network.banner_message().as_deref(),
            Some("Upload failed: Server error: 502 Bad Gateway")
        );

        let timeout = ExtractionOutcome::transport(TransportErrorKind::Timeout, "too slow");
        assert_eq!(timeout.banner_message().as_deref(), Some("too slow"));

        assert_eq!(ExtractionOutcome::Success("ok".into()).banner_message(), None);
    }
}
