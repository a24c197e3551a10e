//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到两个结构：
//! - `ValidationPolicy`：上传前的体积/类型策略，进程级只读常量，显式传入校验器，
//!   便于在没有任何界面的情况下单测。
//! - `ExtractorConfig`：接口地址、超时、提示条时长、预览降采样与剪贴板重试参数。
//!
//! 预览档位（quality / balanced / speed）作为高层语义，映射到底层缩略图参数组合。
//!
//! ## 实现思路
//!
//! - `Default` 提供生产可用的配置（5MB 上限、30 秒超时、5 秒自动关闭提示）。
//! - `PreviewProfile` 负责档位字符串解析与反向输出。
//! - 带范围校验的 setter 拒绝明显不合理的值，避免 Loading 永远不退出。

use image::imageops::FilterType;
use once_cell::sync::Lazy;

use super::ExtractError;

/// 默认 OCR 接口地址。
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:5000/api/extract-text";
/// 默认健康检查地址。
pub const DEFAULT_HEALTH_ENDPOINT: &str = "http://127.0.0.1:5000/api/health";
/// 默认请求超时（毫秒）。
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
/// 错误提示自动关闭延迟（毫秒）。
pub const DEFAULT_NOTICE_DISMISS_MS: u64 = 5_000;
/// 默认识别语言。
pub const DEFAULT_LANGUAGE: &str = "en";

const MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;
const ALLOWED_MIME_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/webp", "image/bmp"];
const ALLOWED_EXTENSIONS: [&str; 5] = [".jpg", ".jpeg", ".png", ".webp", ".bmp"];

static DEFAULT_POLICY: Lazy<ValidationPolicy> = Lazy::new(|| ValidationPolicy {
    max_size_bytes: MAX_UPLOAD_BYTES,
    allowed_mime_types: ALLOWED_MIME_TYPES.iter().map(|s| s.to_string()).collect(),
    allowed_extensions: ALLOWED_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
});

/// 上传前的校验策略。
///
/// 扩展名以 `.` 开头并保持声明顺序，拒绝提示按该顺序列出。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationPolicy {
    /// 允许的最大字节数。
    pub max_size_bytes: u64,
    /// 允许的 MIME 类型（小写，不含参数）。
    pub allowed_mime_types: Vec<String>,
    /// 允许的扩展名（小写，含前导 `.`）。
    pub allowed_extensions: Vec<String>,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        DEFAULT_POLICY.clone()
    }
}

impl ValidationPolicy {
    pub fn allows_mime(&self, mime: &str) -> bool {
        let base = mime
            .split(';')
            .next()
            .map(|m| m.trim().to_ascii_lowercase())
            .unwrap_or_default();
        !base.is_empty() && self.allowed_mime_types.iter().any(|m| *m == base)
    }

    pub fn allows_extension(&self, extension: &str) -> bool {
        self.allowed_extensions.iter().any(|e| e == extension)
    }
}

/// 识别客户端配置。
///
/// 字段覆盖了请求、提示条、预览解码降采样与剪贴板写入重试四个阶段。
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// OCR 接口地址（POST multipart）。
    pub endpoint: String,
    /// 健康检查地址（GET）。
    pub health_endpoint: String,
    /// 单次识别请求的总超时（毫秒），与网络调用赛跑。
    pub request_timeout_ms: u64,
    /// 建立连接（TCP/TLS）超时时间（毫秒）。
    pub connect_timeout_ms: u64,
    /// 未指定语言时使用的默认值。
    pub default_language: String,
    /// 错误提示自动关闭延迟（毫秒）。
    pub notice_dismiss_ms: u64,
    /// 上传校验策略。
    pub policy: ValidationPolicy,
    /// 预览解码允许的像素上限（`width * height`）。
    pub preview_max_decoded_pixels: u64,
    /// 是否对预览做自适应降采样。
    pub preview_adaptive_resize: bool,
    /// 降采样后目标像素上限。
    pub preview_target_pixels: u64,
    /// 降采样后宽/高单边最大值。
    pub preview_max_dimension: u32,
    /// 降采样滤镜策略。
    pub resize_filter: FilterType,
    /// 写入剪贴板失败时最大尝试次数。
    pub clipboard_retries: u32,
    /// 重试基础间隔（毫秒）。
    pub clipboard_retry_delay_ms: u64,
    /// 单次写入流程允许的总重试预算（毫秒）。
    pub clipboard_retry_max_total_ms: u64,
    /// 单次退避延迟上限（毫秒）。
    pub clipboard_retry_max_delay_ms: u64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            health_endpoint: DEFAULT_HEALTH_ENDPOINT.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            connect_timeout_ms: 8_000,
            default_language: DEFAULT_LANGUAGE.to_string(),
            notice_dismiss_ms: DEFAULT_NOTICE_DISMISS_MS,
            policy: ValidationPolicy::default(),
            preview_max_decoded_pixels: 40_000_000,
            preview_adaptive_resize: true,
            preview_target_pixels: 1_000_000,
            preview_max_dimension: 1280,
            resize_filter: FilterType::Triangle,
            clipboard_retries: 3,
            clipboard_retry_delay_ms: 100,
            clipboard_retry_max_total_ms: 1_800,
            clipboard_retry_max_delay_ms: 900,
        }
    }
}

/// 预览档位（面向产品/用户语义）。
///
/// - `Quality`：原图直出，不降采样
/// - `Balanced`：清晰度与内存平衡
/// - `Speed`：小缩略图，最快出图
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewProfile {
    Quality,
    Balanced,
    Speed,
}

impl PreviewProfile {
    /// 从外部字符串解析档位。
    ///
    /// # 示例
    /// ```rust
    /// use image_text_extraction::extractor::PreviewProfile;
    ///
    /// let p = PreviewProfile::parse("Balanced")?;
    /// assert_eq!(p.as_str(), "balanced");
    /// # Ok::<(), image_text_extraction::extractor::ExtractError>(())
    /// ```
    pub fn parse(profile: &str) -> Result<Self, ExtractError> {
        match profile.trim().to_lowercase().as_str() {
            "quality" => Ok(Self::Quality),
            "balanced" => Ok(Self::Balanced),
            "speed" => Ok(Self::Speed),
            other => Err(ExtractError::Config(format!(
                "unknown preview profile: {} (expected quality / balanced / speed)",
                other
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quality => "quality",
            Self::Balanced => "balanced",
            Self::Speed => "speed",
        }
    }
}

impl ExtractorConfig {
    /// 应用指定预览档位到实际参数。
    pub fn apply_preview_profile(&mut self, profile: PreviewProfile) {
        match profile {
            PreviewProfile::Quality => {
                self.preview_adaptive_resize = false;
                self.preview_target_pixels = self.preview_max_decoded_pixels;
                self.preview_max_dimension = 8192;
                self.resize_filter = FilterType::CatmullRom;
            }
            PreviewProfile::Balanced => {
                self.preview_adaptive_resize = true;
                self.preview_target_pixels = 1_000_000;
                self.preview_max_dimension = 1280;
                self.resize_filter = FilterType::Triangle;
            }
            PreviewProfile::Speed => {
                self.preview_adaptive_resize = true;
                self.preview_target_pixels = 250_000;
                self.preview_max_dimension = 640;
                self.resize_filter = FilterType::Nearest;
            }
        }
    }

    /// 设置请求超时。超时是 Loading 状态必然退出的唯一保证，因此不允许 0。
    pub fn set_request_timeout_ms(&mut self, timeout_ms: u64) -> Result<(), ExtractError> {
        if !(100..=600_000).contains(&timeout_ms) {
            return Err(ExtractError::Config(
                "request_timeout_ms must be between 100 and 600000".to_string(),
            ));
        }
        self.request_timeout_ms = timeout_ms;
        Ok(())
    }

    pub fn set_notice_dismiss_ms(&mut self, dismiss_ms: u64) -> Result<(), ExtractError> {
        if !(100..=120_000).contains(&dismiss_ms) {
            return Err(ExtractError::Config(
                "notice_dismiss_ms must be between 100 and 120000".to_string(),
            ));
        }
        self.notice_dismiss_ms = dismiss_ms;
        Ok(())
    }

    /// 设置接口地址，仅接受 http/https。
    pub fn set_endpoint(&mut self, endpoint: &str) -> Result<(), ExtractError> {
        self.endpoint = Self::parse_http_url(endpoint)?;
        Ok(())
    }

    pub fn set_health_endpoint(&mut self, endpoint: &str) -> Result<(), ExtractError> {
        self.health_endpoint = Self::parse_http_url(endpoint)?;
        Ok(())
    }

    /// 由识别接口地址推导同源的 `/api/health` 地址。
    pub fn derive_health_endpoint(endpoint: &str) -> Result<String, ExtractError> {
        let parsed = reqwest::Url::parse(endpoint)
            .map_err(|e| ExtractError::Config(format!("invalid endpoint URL: {}", e)))?;
        parsed
            .join("/api/health")
            .map(|url| url.to_string())
            .map_err(|e| ExtractError::Config(format!("invalid endpoint URL: {}", e)))
    }

    fn parse_http_url(endpoint: &str) -> Result<String, ExtractError> {
        let parsed = reqwest::Url::parse(endpoint.trim())
            .map_err(|e| ExtractError::Config(format!("invalid endpoint URL: {}", e)))?;

        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ExtractError::Config(
                "endpoint must use http or https".to_string(),
            ));
        }

        Ok(parsed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_matches_upload_constants() {
        let policy = ValidationPolicy::default();
        assert_eq!(policy.max_size_bytes, 5 * 1024 * 1024);
        assert!(policy.allows_mime("image/webp"));
        assert!(policy.allows_mime("IMAGE/PNG; charset=binary"));
        assert!(!policy.allows_mime("image/gif"));
        assert!(!policy.allows_mime(""));
        assert!(policy.allows_extension(".jpeg"));
    }

    #[test]
    fn profile_switch_rewrites_resize_parameters() {
        let mut config = ExtractorConfig::default();
        assert!(config.preview_adaptive_resize);

        config.apply_preview_profile(PreviewProfile::Speed);
        assert!(config.preview_adaptive_resize);
        assert_eq!(config.preview_max_dimension, 640);

        config.apply_preview_profile(PreviewProfile::Quality);
        assert!(!config.preview_adaptive_resize);
        assert_eq!(config.preview_target_pixels, config.preview_max_decoded_pixels);
    }

    #[test]
    fn unknown_profile_is_rejected() {
        assert!(matches!(
            PreviewProfile::parse("ultra"),
            Err(ExtractError::Config(_))
        ));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut config = ExtractorConfig::default();
        assert!(config.set_request_timeout_ms(0).is_err());
        assert_eq!(config.request_timeout_ms, DEFAULT_REQUEST_TIMEOUT_MS);
        config.set_request_timeout_ms(2_500).expect("valid timeout");
        assert_eq!(config.request_timeout_ms, 2_500);
    }

    #[test]
    fn endpoint_requires_http_scheme() {
        let mut config = ExtractorConfig::default();
        assert!(config.set_endpoint("ftp://example.com/ocr").is_err());
        config
            .set_endpoint("https://ocr.example.com/api/extract-text")
            .expect("https endpoint");
        assert_eq!(config.endpoint, "https://ocr.example.com/api/extract-text");
    }

    #[test]
    fn health_endpoint_is_derived_from_origin() {
        let health =
            ExtractorConfig::derive_health_endpoint("http://10.0.0.5:5000/api/extract-text")
                .expect("derive");
        assert_eq!(health, "http://10.0.0.5:5000/api/health");
    }
}
