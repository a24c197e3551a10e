//! # 命令层
//!
//! ## 设计思路
//!
//! 命令层仅做参数接收与结果返回，不承载业务逻辑。
//! 所有实际处理交由 `ExtractorService`，保持命令函数薄、稳定、易测试。

use std::path::{Path, PathBuf};

use super::{ExtractError, ExtractorService, HealthReport, SelectedFile, UiState, ViewSnapshot};
use crate::error::AppError;

const FALLBACK_MIME: &str = "application/octet-stream";

#[derive(Debug, Clone, serde::Serialize)]
pub struct CommandError {
    pub code: &'static str,
    pub stage: &'static str,
    pub message: String,
}

impl From<ExtractError> for CommandError {
    fn from(error: ExtractError) -> Self {
        Self {
            code: error.code(),
            stage: error.stage(),
            message: error.to_string(),
        }
    }
}

/// 一次识别命令的参数。
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    pub copy: bool,
    pub save_dir: Option<PathBuf>,
}

/// 识别命令的最终结果。
#[derive(Debug, Clone, serde::Serialize)]
pub struct ExtractReport {
    #[serde(flatten)]
    pub snapshot: ViewSnapshot,
    pub copied: bool,
    pub saved_to: Option<PathBuf>,
}

impl ExtractReport {
    pub fn is_success(&self) -> bool {
        matches!(self.snapshot.state, UiState::Result { .. })
    }
}

/// 按内容嗅探 MIME；无法识别时交给扩展名兜底。
pub fn sniff_mime(bytes: &[u8]) -> String {
    infer::get(bytes)
        .map(|kind| kind.mime_type().to_string())
        .unwrap_or_else(|| FALLBACK_MIME.to_string())
}

/// 从磁盘读取文件并构造选择项。
pub fn load_selected_file(path: &Path) -> Result<SelectedFile, AppError> {
    let bytes = std::fs::read(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let mime = sniff_mime(&bytes);

    log::debug!("📂 读取文件 - {} ({} 字节, {})", name, bytes.len(), mime);
    Ok(SelectedFile::new(bytes, name, mime))
}

/// 识别本地图片，等待预览与识别落地后按需复制/保存。
pub async fn extract_image(
    service: &mut ExtractorService,
    path: &Path,
    options: &ExtractOptions,
) -> Result<ExtractReport, AppError> {
    let file = load_selected_file(path)?;
    service.select_file(file);
    service.run_until_settled().await;

    let mut copied = false;
    let mut saved_to = None;
    if service.presenter().extracted_text().is_some() {
        if options.copy {
            copied = service.copy_text().await;
        }
        if let Some(dir) = &options.save_dir {
            saved_to = service.download_text(dir);
        }
    }

    Ok(ExtractReport {
        snapshot: service.snapshot(),
        copied,
        saved_to,
    })
}

/// 查询 OCR 服务健康状态。
pub async fn check_server_health(service: &ExtractorService) -> Result<HealthReport, CommandError> {
    service.check_health().await.map_err(CommandError::from)
}
