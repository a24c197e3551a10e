//! # 核心处理器
//!
//! ## 设计思路
//!
//! `Extractor` 只负责各阶段的具体执行，不持有界面状态，也不持有配置。
//! 各阶段实现分布在独立文件的 `impl Extractor` 块中，配置由调用方按轮传入：
//! - `preview.rs`：预览解码
//! - `transport.rs`：multipart 上传、超时赛跑、响应分类
//! - `export.rs`：复制到剪贴板、文本下载
//!
//! HTTP 客户端在构造时创建，克隆处理器只增加连接池的引用计数。

use std::time::Duration;

use super::{ExtractError, ExtractorConfig};

/// 识别流水线处理器。
#[derive(Clone)]
pub struct Extractor {
    pub(super) client: reqwest::Client,
}

impl Extractor {
    /// 按配置中的连接超时创建处理器。
    ///
    /// # 示例
    /// ```rust
    /// use image_text_extraction::extractor::{Extractor, ExtractorConfig};
    ///
    /// let extractor = Extractor::new(&ExtractorConfig::default())?;
    /// # Ok::<(), image_text_extraction::extractor::ExtractError>(())
    /// ```
    pub fn new(config: &ExtractorConfig) -> Result<Self, ExtractError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .build()
            .map_err(|e| ExtractError::Config(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}
