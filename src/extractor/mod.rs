//! # 图片文字识别模块（extractor）
//!
//! ## 设计思路
//!
//! 该模块将“选择文件 → 校验 → 预览 + 上传 → 结果展示 → 复制/下载”
//! 按职责拆分为多个子模块，避免单文件膨胀与耦合。
//!
//! - `commands`：命令行入口的参数适配（薄封装）
//! - `service`：事件循环，执行 reducer 产出的副作用
//! - `presenter`：唯一的界面状态机
//! - `validator`：纯函数校验（空文件 / 体积 / 类型）
//! - `preview`：解码、像素限制、缩略图
//! - `transport`：multipart 上传、超时赛跑、响应分类
//! - `export`：复制到剪贴板（含重试）与文本下载
//! - `render`：HTML 片段与转义
//! - `config/error/source`：配置、错误、中间数据模型
//!
//! ## 新同事快速上手
//!
//! 可以按下面顺序理解调用链：
//!
//! ```text
//! main.rs（clap 参数）
//!    ↓
//! commands.rs（读文件、嗅探 MIME）
//!    ↓
//! service.rs（事件循环 + 任务句柄）
//!    ↓
//! presenter.rs（状态机，产出 Effect）
//!    ├─ validator.rs（同步校验，失败直接进入 Error）
//!    ├─ preview.rs（spawn_blocking 解码，结果带代号回送）
//!    └─ transport.rs（上传 + 超时，结果带代号回送）
//!    ↓
//! render.rs / export.rs（展示、复制、下载）
//! ```
//!
//! ## 分层职责建议
//!
//! - 命令行参数变更优先改 `commands.rs` 与 `main.rs`
//! - 校验规则与默认值变更优先改 `config.rs`
//! - 状态流转变更只改 `presenter.rs`
//! - 接口协议变更改 `transport.rs`

pub mod commands;
mod config;
mod error;
mod export;
mod handler;
mod presenter;
mod preview;
pub mod render;
mod service;
mod source;
mod transport;
mod validator;

pub use config::{
    DEFAULT_ENDPOINT, DEFAULT_HEALTH_ENDPOINT, DEFAULT_LANGUAGE, DEFAULT_NOTICE_DISMISS_MS,
    DEFAULT_REQUEST_TIMEOUT_MS, ExtractorConfig, PreviewProfile, ValidationPolicy,
};
pub use error::{ExtractError, TransportErrorKind};
pub use export::{
    ClipboardFailureKind, ClipboardWriteFailure, DOWNLOAD_FILE_NAME, DOWNLOAD_MIME, SystemClipboard,
    TextClipboard, TextDownload,
};
pub use handler::Extractor;
pub use presenter::{Effect, Notice, NoticeLevel, Presenter, PresenterEvent, PreviewView, UiState, ViewSnapshot};
pub use service::{COPIED_FEEDBACK, ExtractorService};
pub use source::{
    ExtractionOutcome, Language, Preview, PreviewSlot, SelectedFile, UploadRequest, ValidationResult,
};
pub use transport::{HealthReport, TIMEOUT_DETAIL};
pub use validator::validate;
