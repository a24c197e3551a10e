//! # 导出模块（复制到剪贴板 / 下载为文本文件）
//!
//! ## 设计思路
//!
//! 与操作系统剪贴板交互的逻辑独立出来，便于隔离平台不稳定因素。
//! 写入在阻塞线程中执行，避免阻塞事件循环；剪贴板被其他进程占用时做有限重试
//! （指数退避 + 抖动 + 总预算），预算耗尽即放弃。
//!
//! 复制与下载都是“软失败”：调用方拿到 `Err` 后转换成提示条，不会中断界面。
//!
//! ## 实现思路
//!
//! - `TextClipboard` 抽象出单次写入，系统实现基于 `arboard`，测试可注入假实现。
//! - `TextDownload` 描述下载产物：固定文件名 `extracted_text.txt`、`text/plain;charset=utf-8`。

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use super::{ExtractError, Extractor, ExtractorConfig};

pub const DOWNLOAD_FILE_NAME: &str = "extracted_text.txt";
pub const DOWNLOAD_MIME: &str = "text/plain;charset=utf-8";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardFailureKind {
    Busy,
    Transient,
    Fatal,
}

/// 单次剪贴板写入失败。
#[derive(Debug, Clone)]
pub struct ClipboardWriteFailure {
    kind: ClipboardFailureKind,
    message: String,
}

impl ClipboardWriteFailure {
    pub fn busy(message: impl Into<String>) -> Self {
        Self {
            kind: ClipboardFailureKind::Busy,
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: ClipboardFailureKind::Transient,
            message: message.into(),
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            kind: ClipboardFailureKind::Fatal,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ClipboardFailureKind {
        self.kind
    }

    fn is_retryable(&self) -> bool {
        matches!(self.kind, ClipboardFailureKind::Busy | ClipboardFailureKind::Transient)
    }
}

/// 文字剪贴板的单次写入。
pub trait TextClipboard: Send + 'static {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardWriteFailure>;
}

/// 系统剪贴板（`arboard`）。每次尝试重新打开，避免持有失效句柄。
pub struct SystemClipboard;

impl TextClipboard for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardWriteFailure> {
        let mut clipboard = arboard::Clipboard::new()
            .map_err(|e| ClipboardWriteFailure::busy(format!("clipboard unavailable: {}", e)))?;

        clipboard
            .set_text(text.to_string())
            .map_err(|e| match e {
                arboard::Error::ClipboardOccupied => ClipboardWriteFailure::busy(e.to_string()),
                arboard::Error::ClipboardNotSupported => ClipboardWriteFailure::fatal(e.to_string()),
                other => ClipboardWriteFailure::transient(other.to_string()),
            })
    }
}

/// 重试参数快照。
#[derive(Debug, Clone, Copy)]
pub(crate) struct RetryBudget {
    retries: u32,
    base_delay_ms: u64,
    max_total_ms: u64,
    max_delay_ms: u64,
}

impl RetryBudget {
    pub(crate) fn from_config(config: &ExtractorConfig) -> Self {
        Self {
            retries: config.clipboard_retries,
            base_delay_ms: config.clipboard_retry_delay_ms,
            max_total_ms: config.clipboard_retry_max_total_ms,
            max_delay_ms: config.clipboard_retry_max_delay_ms,
        }
    }

    /// 第 `attempt` 次写入（从 2 起）之前的等待。
    ///
    /// 基础延迟每多一次重试翻一倍，封顶 `max_delay_ms`，再叠加不超过封顶值三分之一的抖动。
    fn delay_before(&self, attempt: u32, jitter: u64) -> Duration {
        let base = self.base_delay_ms.max(1);
        let doublings = attempt.saturating_sub(2).min(8);
        let capped = base
            .saturating_mul(1_u64 << doublings)
            .min(self.max_delay_ms.max(base));
        let spread = capped / 3;
        Duration::from_millis(capped.saturating_add(jitter % (spread + 1)))
    }

    /// 已用时间加上下一次等待是否仍在总预算内。
    fn allows_wait(&self, elapsed: Duration, wait: Duration) -> bool {
        elapsed.saturating_add(wait) <= Duration::from_millis(self.max_total_ms)
    }
}

/// 一次复制过程内的抖动序列（splitmix64），以当前时间播种。
struct Jitter(u64);

impl Jitter {
    fn from_clock() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        Self(seed)
    }

    fn draw(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }
}

/// 下载产物。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDownload {
    pub file_name: &'static str,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

impl TextDownload {
    pub fn from_text(text: &str) -> Self {
        Self {
            file_name: DOWNLOAD_FILE_NAME,
            mime: DOWNLOAD_MIME,
            bytes: text.as_bytes().to_vec(),
        }
    }

    /// 写入目标目录，目录不存在时自动创建；已存在的同名文件会被覆盖。
    pub fn write_to_dir(&self, dir: &Path) -> Result<PathBuf, ExtractError> {
        if !dir.exists() {
            std::fs::create_dir_all(dir).map_err(|e| {
                ExtractError::FileSystem(format!("cannot create directory {}: {}", dir.display(), e))
            })?;
        }

        let path = dir.join(self.file_name);
        std::fs::write(&path, &self.bytes)
            .map_err(|e| ExtractError::FileSystem(format!("cannot write {}: {}", path.display(), e)))?;

        log::info!("💾 已保存识别文本 - {}（{} 字节）", path.display(), self.bytes.len());
        Ok(path)
    }
}

impl Extractor {
    /// 将文字写入剪贴板（含重试），在阻塞线程中执行。
    pub async fn copy_text_with_retry<C: TextClipboard>(
        &self,
        mut clipboard: C,
        text: String,
        config: &ExtractorConfig,
    ) -> Result<(), ExtractError> {
        log::debug!("📋 准备复制到剪贴板 - {} 字符", text.chars().count());

        let budget = RetryBudget::from_config(config);
        tokio::task::spawn_blocking(move || Self::write_text_with_retry(&mut clipboard, &text, budget))
            .await
            .map_err(|e| ExtractError::Task(format!("clipboard worker failed: {}", e)))?
    }

    pub(crate) fn write_text_with_retry<C: TextClipboard>(
        clipboard: &mut C,
        text: &str,
        budget: RetryBudget,
    ) -> Result<(), ExtractError> {
        let attempts = budget.retries.max(1);
        let started = Instant::now();
        let mut jitter = Jitter::from_clock();
        let mut last_error = None;

        for attempt in 1..=attempts {
            if attempt > 1 {
                let wait = budget.delay_before(attempt, jitter.draw());

                if !budget.allows_wait(started.elapsed(), wait) {
                    log::warn!(
                        "⏱️ 放弃第 {} 次写入：再等 {}ms 会超出 {}ms 的总预算",
                        attempt,
                        wait.as_millis(),
                        budget.max_total_ms
                    );
                    break;
                }

                log::debug!("🔄 剪贴板第 {}/{} 次写入，先等待 {}ms", attempt, attempts, wait.as_millis());
                std::thread::sleep(wait);
            }

            match clipboard.set_text(text) {
                Ok(()) => {
                    log::info!("✅ 复制成功 (尝试 {})", attempt);
                    return Ok(());
                }
                Err(failure) => {
                    let retryable = failure.is_retryable();
                    log::warn!(
                        "❌ 尝试 {} 失败: {}（kind={:?}, retryable={}）",
                        attempt,
                        failure.message,
                        failure.kind,
                        retryable
                    );
                    last_error = Some(failure.message);

                    if !retryable {
                        break;
                    }
                }
            }
        }

        Err(ExtractError::Clipboard(
            last_error.unwrap_or_else(|| "unknown clipboard error".to_string()),
        ))
    }
}
