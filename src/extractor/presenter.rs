//! # 展示状态机（Presenter）
//!
//! ## 设计思路
//!
//! 全局只有一个 `UiState`，且只能通过 `Presenter::handle` 变更（reducer 风格）。
//! 校验、预览、上传三个阶段只通过事件把结果交回来，从不直接改状态。
//!
//! ```text
//! Idle ──文件通过校验──▶ Loading ──Success──▶ Result
//!   │                      │
//!   └──校验失败──▶ Error ◀──┘ ServerError / TransportError
//!
//! Result | Error ──清空──▶ Idle
//! 任意状态 ──新文件──▶ 新一轮（旧一轮的结果全部作废）
//! ```
//!
//! ## 实现思路
//!
//! - 每次选择文件（以及清空）都会递增 `generation`，异步事件携带发起时的代号，
//!   代号不一致的结果直接丢弃：以“最后一次选择”为准，而不是“最后一个完成”。
//! - 需要执行的副作用以 `Effect` 返回，由服务层真正启动/取消任务，reducer 本身保持纯同步。
//! - 预览槽位独立于状态，预览与识别哪个先完成都可以。

use std::time::Duration;

use super::config::ValidationPolicy;
use super::source::{ExtractionOutcome, Language, PreviewSlot, SelectedFile, UploadRequest, ValidationResult};
use super::validator::validate;

/// 当前界面状态。
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum UiState {
    Idle,
    Loading,
    Result { text: String },
    Error { message: String },
}

impl UiState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Result { .. } => "result",
            Self::Error { .. } => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Error,
    Info,
}

/// 可手动关闭、到时自动消失的提示条。同一时刻最多一条。
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Notice {
    pub id: u64,
    pub level: NoticeLevel,
    pub message: String,
    pub raised_at: String,
}

/// 输入事件。
#[derive(Debug, Clone)]
pub enum PresenterEvent {
    /// 点击选择或拖入文件。
    FileSelected(SelectedFile),
    PreviewResolved { generation: u64, slot: PreviewSlot },
    TransportResolved { generation: u64, outcome: ExtractionOutcome },
    ClearRequested,
    /// 手动关闭或计时器到期。
    NoticeDismissed { notice_id: u64 },
    /// 复制/下载等软失败，只提示不改状态。
    SoftFailure(String),
    /// 操作成功的提示（如下载已保存）。
    Feedback(String),
}

/// reducer 产出的副作用，由服务层执行。
#[derive(Debug, Clone)]
pub enum Effect {
    /// 作废并中止上一轮的预览与上传任务。
    CancelRun,
    StartPreview { generation: u64, file: SelectedFile },
    StartUpload { generation: u64, request: UploadRequest },
    ScheduleNoticeExpiry { notice_id: u64, after: Duration },
}

/// 预览的可序列化摘要（不含 data URL 本体）。
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PreviewView {
    pub status: &'static str,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub mime: Option<String>,
}

/// 只读视图快照。
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ViewSnapshot {
    #[serde(flatten)]
    pub state: UiState,
    pub preview: PreviewView,
    pub notice: Option<Notice>,
    pub selected_file: Option<String>,
    pub generation: u64,
}

pub struct Presenter {
    state: UiState,
    preview: PreviewSlot,
    notice: Option<Notice>,
    selected_file: Option<String>,
    generation: u64,
    next_notice_id: u64,
    policy: ValidationPolicy,
    language: Language,
    notice_dismiss: Duration,
}

impl Presenter {
    pub fn new(policy: ValidationPolicy, language: Language, notice_dismiss: Duration) -> Self {
        Self {
            state: UiState::Idle,
            preview: PreviewSlot::Empty,
            notice: None,
            selected_file: None,
            generation: 0,
            next_notice_id: 1,
            policy,
            language,
            notice_dismiss,
        }
    }

    pub fn state(&self) -> &UiState {
        &self.state
    }

    pub fn preview(&self) -> &PreviewSlot {
        &self.preview
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn selected_file(&self) -> Option<&str> {
        self.selected_file.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    /// 仅影响之后的选择，进行中的请求保持原语言。
    pub fn set_language(&mut self, language: Language) {
        self.language = language;
    }

    /// 结果态下识别出的原始文字（未转义）。
    pub fn extracted_text(&self) -> Option<&str> {
        match &self.state {
            UiState::Result { text } => Some(text),
            _ => None,
        }
    }

    /// 流水线是否已无待完成的异步工作。
    pub fn is_settled(&self) -> bool {
        self.state != UiState::Loading && self.preview != PreviewSlot::Pending
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        let preview = self.preview.preview();
        ViewSnapshot {
            state: self.state.clone(),
            preview: PreviewView {
                status: self.preview.status(),
                width: preview.map(|p| p.width),
                height: preview.map(|p| p.height),
                mime: preview.map(|p| p.mime.clone()),
            },
            notice: self.notice.clone(),
            selected_file: self.selected_file.clone(),
            generation: self.generation,
        }
    }

    /// 状态机唯一入口。
    pub fn handle(&mut self, event: PresenterEvent) -> Vec<Effect> {
        match event {
            PresenterEvent::FileSelected(file) => self.on_file_selected(file),
            PresenterEvent::PreviewResolved { generation, slot } => {
                self.on_preview_resolved(generation, slot);
                Vec::new()
            }
            PresenterEvent::TransportResolved { generation, outcome } => {
                self.on_transport_resolved(generation, outcome)
            }
            PresenterEvent::ClearRequested => self.on_clear(),
            PresenterEvent::NoticeDismissed { notice_id } => {
                self.on_notice_dismissed(notice_id);
                Vec::new()
            }
            PresenterEvent::SoftFailure(message) => vec![self.raise_notice(NoticeLevel::Error, message)],
            PresenterEvent::Feedback(message) => vec![self.raise_notice(NoticeLevel::Info, message)],
        }
    }

    fn on_file_selected(&mut self, file: SelectedFile) -> Vec<Effect> {
        self.generation += 1;
        let generation = self.generation;
        let mut effects = vec![Effect::CancelRun];

        self.preview = PreviewSlot::Empty;
        self.notice = None;
        self.selected_file = Some(file.name.clone());

        log::info!(
            "📄 选择文件 - 第 {} 轮 文件: {} 大小: {:.2} KB 类型: {}",
            generation,
            file.name,
            file.len() as f64 / 1024.0,
            if file.mime.is_empty() { "<empty>" } else { &file.mime }
        );

        match validate(&file, &self.policy) {
            ValidationResult::Accepted => {
                self.state = UiState::Loading;
                self.preview = PreviewSlot::Pending;
                let request = UploadRequest::from_file(&file, self.language.clone());
                effects.push(Effect::StartPreview { generation, file });
                effects.push(Effect::StartUpload { generation, request });
            }
            ValidationResult::Rejected(reason) => {
                log::warn!("🚫 文件校验未通过 - 第 {} 轮：{}", generation, reason);
                self.state = UiState::Error {
                    message: reason.clone(),
                };
                effects.push(self.raise_notice(NoticeLevel::Error, reason));
            }
        }

        effects
    }

    fn on_preview_resolved(&mut self, generation: u64, slot: PreviewSlot) {
        if generation != self.generation || self.preview != PreviewSlot::Pending {
            log::debug!(
                "🗑️ 丢弃过期预览 - 第 {} 轮（当前第 {} 轮）",
                generation,
                self.generation
            );
            return;
        }

        self.preview = slot;
    }

    fn on_transport_resolved(&mut self, generation: u64, outcome: ExtractionOutcome) -> Vec<Effect> {
        if generation != self.generation || self.state != UiState::Loading {
            log::debug!(
                "🗑️ 丢弃过期识别结果 - 第 {} 轮（当前第 {} 轮）",
                generation,
                self.generation
            );
            return Vec::new();
        }

        match outcome {
            ExtractionOutcome::Success(text) => {
                self.state = UiState::Result { text };
                Vec::new()
            }
            failure => {
                let message = failure
                    .banner_message()
                    .unwrap_or_else(|| "Unknown error".to_string());
                self.state = UiState::Error {
                    message: message.clone(),
                };
                vec![self.raise_notice(NoticeLevel::Error, message)]
            }
        }
    }

    fn on_clear(&mut self) -> Vec<Effect> {
        self.generation += 1;
        self.state = UiState::Idle;
        self.preview = PreviewSlot::Empty;
        self.notice = None;
        self.selected_file = None;
        log::info!("🧹 已清空界面 - 进入第 {} 轮", self.generation);
        vec![Effect::CancelRun]
    }

    fn on_notice_dismissed(&mut self, notice_id: u64) {
        let is_current = self.notice.as_ref().is_some_and(|n| n.id == notice_id);
        if !is_current {
            return;
        }

        // 只撤下提示条；错误状态连同预览和文件名一直保留到清空或下一次选择
        self.notice = None;
    }

    fn raise_notice(&mut self, level: NoticeLevel, message: String) -> Effect {
        let notice_id = self.next_notice_id;
        self.next_notice_id += 1;
        self.notice = Some(Notice {
            id: notice_id,
            level,
            message,
            raised_at: chrono::Local::now().to_rfc3339(),
        });

        Effect::ScheduleNoticeExpiry {
            notice_id,
            after: self.notice_dismiss,
        }
    }
}
