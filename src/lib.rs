//! # 图片文字识别客户端 — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  命令行 (clap)                            │
//! │   extract <IMAGE> ── health ── config                    │
//! └───────┼──────────────────────────────────────────────────┘
//!         ↕ Result<T, AppError>
//! ┌───────┼──────────────────────────────────────────────────┐
//! │  ┌─ error ────── AppError (统一错误类型)                  │
//! │  ├─ settings ─── ClientSettings (JSON 持久化)             │
//! │  └─ extractor                                            │
//! │      ├─ service     事件循环 + 任务句柄                   │
//! │      ├─ presenter   唯一状态机 (Idle/Loading/Result/Error)│
//! │      ├─ validator   空文件 / 体积 / 类型                  │
//! │      ├─ preview     解码 + 缩略图 (data URL)              │
//! │      ├─ transport   multipart 上传 + 超时 + 响应分类      │
//! │      ├─ render      HTML 片段 + 转义                      │
//! │      └─ export      剪贴板复制 / 文本下载                 │
//! └───────┼──────────────────────────────────────────────────┘
//!         ↕ HTTP (reqwest)
//!   OCR 服务 POST /api/extract-text · GET /api/health
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError`，命令行与库调用方的返回类型 |
//! | [`settings`] | 客户端设置的读取、保存与应用到识别配置 |
//! | [`extractor`] | 校验、预览、上传、状态机、渲染与导出 |

pub mod error;
pub mod extractor;
pub mod settings;
