//! # 服务层（事件循环驱动）
//!
//! ## 设计思路
//!
//! `ExtractorService` 把纯同步的 `Presenter` 与真正的异步任务连接起来：
//! reducer 产出 `Effect`，这里负责启动/中止任务；任务完成后把结果作为
//! 带代号的事件送回通道，再交给 reducer。
//!
//! ## 实现思路
//!
//! - 预览、上传、提示计时器各持有一个 `JoinHandle`，新一轮开始时直接 `abort`，
//!   即使有漏网的结果送达，也会被代号检查丢弃。
//! - 配置在构造时固定，所有轮次共享同一个 `Arc<ExtractorConfig>`。
//! - 事件只在调用方 `next_event` / `run_until_settled` 时处理，状态只在一个地方变更。

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::export::{SystemClipboard, TextClipboard, TextDownload};
use super::presenter::{Effect, Presenter, PresenterEvent, UiState, ViewSnapshot};
use super::error::TransportErrorKind;
use super::source::{ExtractionOutcome, Language, PreviewSlot, SelectedFile};
use super::transport::{HealthReport, TIMEOUT_DETAIL};
use super::{ExtractError, Extractor, ExtractorConfig};

pub const COPIED_FEEDBACK: &str = "Copied!";

/// `run_until_settled` 在请求超时之外额外等待的时间。
const SETTLE_MARGIN: Duration = Duration::from_secs(5);

pub struct ExtractorService {
    extractor: Extractor,
    presenter: Presenter,
    config: Arc<ExtractorConfig>,
    events_tx: mpsc::UnboundedSender<PresenterEvent>,
    events_rx: mpsc::UnboundedReceiver<PresenterEvent>,
    preview_task: Option<JoinHandle<()>>,
    upload_task: Option<JoinHandle<()>>,
    notice_timer: Option<JoinHandle<()>>,
}

impl ExtractorService {
    pub fn new(config: ExtractorConfig) -> Result<Self, ExtractError> {
        let presenter = Presenter::new(
            config.policy.clone(),
            Language::new(&config.default_language),
            Duration::from_millis(config.notice_dismiss_ms),
        );
        let extractor = Extractor::new(&config)?;
        let config = Arc::new(config);
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        log::info!(
            "🚀 识别服务已就绪 - endpoint: {} 超时: {}ms",
            Extractor::redact_url_for_log(&config.endpoint),
            config.request_timeout_ms
        );

        Ok(Self {
            extractor,
            presenter,
            config,
            events_tx,
            events_rx,
            preview_task: None,
            upload_task: None,
            notice_timer: None,
        })
    }

    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    pub fn presenter(&self) -> &Presenter {
        &self.presenter
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        self.presenter.snapshot()
    }

    /// 修改识别语言，对下一次选择生效。
    pub fn set_language(&mut self, code: &str) {
        self.presenter.set_language(Language::new(code));
    }

    /// 选择文件：开启新一轮，上一轮的任务立即中止。
    pub fn select_file(&mut self, file: SelectedFile) {
        self.apply(PresenterEvent::FileSelected(file));
    }

    pub fn clear(&mut self) {
        self.apply(PresenterEvent::ClearRequested);
    }

    pub fn dismiss_notice(&mut self, notice_id: u64) {
        self.apply(PresenterEvent::NoticeDismissed { notice_id });
    }

    /// 复制识别结果到系统剪贴板。返回是否成功；失败以提示条呈现。
    pub async fn copy_text(&mut self) -> bool {
        self.copy_text_with(SystemClipboard).await
    }

    pub async fn copy_text_with<C: TextClipboard>(&mut self, clipboard: C) -> bool {
        let Some(text) = self.current_text() else {
            self.apply(PresenterEvent::SoftFailure("No text to copy".to_string()));
            return false;
        };

        let config = Arc::clone(&self.config);
        match self.extractor.copy_text_with_retry(clipboard, text, &config).await {
            Ok(()) => {
                self.apply(PresenterEvent::Feedback(COPIED_FEEDBACK.to_string()));
                true
            }
            Err(e) => {
                log::warn!("⚠️ 复制失败 [{}]: {}", e.code(), e);
                self.apply(PresenterEvent::SoftFailure(format!("Failed to copy: {}", soft_reason(e))));
                false
            }
        }
    }

    /// 把识别结果保存为 `extracted_text.txt`。
    pub fn download_text(&mut self, dir: &Path) -> Option<PathBuf> {
        let Some(text) = self.current_text() else {
            self.apply(PresenterEvent::SoftFailure("No text to download".to_string()));
            return None;
        };

        match TextDownload::from_text(&text).write_to_dir(dir) {
            Ok(path) => Some(path),
            Err(e) => {
                log::warn!("⚠️ 下载失败 [{}]: {}", e.code(), e);
                self.apply(PresenterEvent::SoftFailure(format!(
                    "Error downloading file: {}",
                    soft_reason(e)
                )));
                None
            }
        }
    }

    pub async fn check_health(&self) -> Result<HealthReport, ExtractError> {
        self.extractor
            .check_health(
                &self.config.health_endpoint,
                Duration::from_millis(self.config.request_timeout_ms),
            )
            .await
    }

    /// 等待并处理下一个异步事件；通道关闭时返回 `false`。
    pub async fn next_event(&mut self) -> bool {
        match self.events_rx.recv().await {
            Some(event) => {
                self.apply(event);
                true
            }
            None => false,
        }
    }

    /// 处理事件直到本轮预览与识别都已落地。
    ///
    /// 最多等待 `request_timeout_ms + 5s`；到点仍未落地的任务会被中止，
    /// 识别按超时处理，预览按不可用处理。
    pub async fn run_until_settled(&mut self) -> ViewSnapshot {
        let deadline =
            tokio::time::Instant::now() + Duration::from_millis(self.config.request_timeout_ms) + SETTLE_MARGIN;

        while !self.presenter.is_settled() {
            match tokio::time::timeout_at(deadline, self.events_rx.recv()).await {
                Ok(Some(event)) => self.apply(event),
                Ok(None) => break,
                Err(_) => {
                    self.force_settle();
                    break;
                }
            }
        }
        self.snapshot()
    }

    /// 在给定时间窗内持续处理事件（例如等待提示条自动消失）。
    pub async fn run_for(&mut self, window: Duration) {
        let deadline = tokio::time::Instant::now() + window;
        loop {
            let event = match tokio::time::timeout_at(deadline, self.events_rx.recv()).await {
                Ok(Some(event)) => event,
                Ok(None) | Err(_) => break,
            };
            self.apply(event);
        }
    }

    /// 等待超时后收尾：中止本轮任务，并把未落地的部分按失败处理。
    fn force_settle(&mut self) {
        let generation = self.presenter.generation();
        log::warn!("⏰ 第 {} 轮超过等待上限仍未完成，强制收尾", generation);

        for task in [self.preview_task.take(), self.upload_task.take()].into_iter().flatten() {
            task.abort();
        }

        if self.presenter.state() == &UiState::Loading {
            self.apply(PresenterEvent::TransportResolved {
                generation,
                outcome: ExtractionOutcome::transport(TransportErrorKind::Timeout, TIMEOUT_DETAIL),
            });
        }
        if self.presenter.preview() == &PreviewSlot::Pending {
            self.apply(PresenterEvent::PreviewResolved {
                generation,
                slot: PreviewSlot::Unavailable,
            });
        }
    }

    fn current_text(&self) -> Option<String> {
        self.presenter
            .extracted_text()
            .filter(|text| !text.is_empty())
            .map(str::to_string)
    }

    fn apply(&mut self, event: PresenterEvent) {
        let effects = self.presenter.handle(event);
        for effect in effects {
            self.execute(effect);
        }
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::CancelRun => self.cancel_run(),
            Effect::StartPreview { generation, file } => {
                let extractor = self.extractor.clone();
                let config = Arc::clone(&self.config);
                let tx = self.events_tx.clone();
                self.preview_task = Some(tokio::spawn(async move {
                    let slot = extractor.render_preview(&file, &config).await;
                    if tx.send(PresenterEvent::PreviewResolved { generation, slot }).is_err() {
                        log::debug!("预览结果无人接收 - 第 {} 轮", generation);
                    }
                }));
            }
            Effect::StartUpload { generation, request } => {
                let extractor = self.extractor.clone();
                let config = Arc::clone(&self.config);
                let tx = self.events_tx.clone();
                self.upload_task = Some(tokio::spawn(async move {
                    let outcome = extractor.submit(request, &config).await;
                    if tx.send(PresenterEvent::TransportResolved { generation, outcome }).is_err() {
                        log::debug!("识别结果无人接收 - 第 {} 轮", generation);
                    }
                }));
            }
            Effect::ScheduleNoticeExpiry { notice_id, after } => {
                if let Some(timer) = self.notice_timer.take() {
                    timer.abort();
                }
                let tx = self.events_tx.clone();
                self.notice_timer = Some(tokio::spawn(async move {
                    tokio::time::sleep(after).await;
                    let _ = tx.send(PresenterEvent::NoticeDismissed { notice_id });
                }));
            }
        }
    }

    fn cancel_run(&mut self) {
        let mut aborted = 0;
        for task in [self.preview_task.take(), self.upload_task.take()].into_iter().flatten() {
            if !task.is_finished() {
                task.abort();
                aborted += 1;
            }
        }
        if let Some(timer) = self.notice_timer.take() {
            timer.abort();
        }
        if aborted > 0 {
            log::info!("🛑 已中止上一轮的 {} 个任务", aborted);
        }
    }
}

/// 软失败只展示底层原因，不带错误分类前缀。
fn soft_reason(error: ExtractError) -> String {
    match error {
        ExtractError::Clipboard(reason) | ExtractError::FileSystem(reason) => reason,
        other => other.to_string(),
    }
}

impl Drop for ExtractorService {
    fn drop(&mut self) {
        self.cancel_run();
    }
}
