//! # 上传与响应分类模块
//!
//! ## 设计思路
//!
//! 一次识别 = 一个 multipart POST（字段 `image` + `language`）。
//! 网络调用与计时器赛跑：计时器先到则丢弃（即取消）进行中的请求 future，
//! 结果固定为 `TransportError(Timeout)`；两条路径互斥，只会产生一个结果。
//!
//! ## 实现思路
//!
//! - 响应分类是纯函数 `classify_response`，严格按以下顺序判断：
//!   1. 非 2xx → `Network("Server error: <status> <statusText>")`
//!   2. 响应体不是约定的 JSON 对象 → `BadResponse("Invalid response format")`
//!   3. JSON 为 `null` → `BadResponse("Empty response")`
//!   4. `success == false` → `ServerError(message | "Unknown server error")`
//!   5. 缺少 `text` → `BadResponse("No extracted text in response")`
//!   6. 否则 `Success(text)`
//! - 服务端在客户端超时后仍可能继续处理，这是已知且接受的限制，不做补偿。

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;

use super::error::TransportErrorKind;
use super::source::{ExtractionOutcome, UploadRequest};
use super::{ExtractError, Extractor, ExtractorConfig};

pub const TIMEOUT_DETAIL: &str = "Request timeout - server took too long to respond";
const INVALID_FORMAT_DETAIL: &str = "Invalid response format";
const EMPTY_RESPONSE_DETAIL: &str = "Empty response";
const NO_TEXT_DETAIL: &str = "No extracted text in response";
const UNKNOWN_SERVER_ERROR: &str = "Unknown server error";

/// 健康检查结果。
#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthReport {
    pub http_status: u16,
    pub status: Option<String>,
    pub mode: Option<String>,
    pub body: serde_json::Value,
}

impl Extractor {
    /// 使用配置中的地址与超时提交识别请求。
    pub async fn submit(&self, request: UploadRequest, config: &ExtractorConfig) -> ExtractionOutcome {
        self.submit_with_timeout(
            request,
            &config.endpoint,
            Duration::from_millis(config.request_timeout_ms),
        )
        .await
    }

    /// 提交识别请求并与计时器赛跑。
    pub async fn submit_with_timeout(
        &self,
        request: UploadRequest,
        endpoint: &str,
        timeout: Duration,
    ) -> ExtractionOutcome {
        log::info!(
            "📤 开始上传 - 文件: {} 大小: {:.2} KB 语言: {} 地址: {}",
            request.file_name,
            request.file_bytes.len() as f64 / 1024.0,
            request.language.as_str(),
            Self::redact_url_for_log(endpoint)
        );

        match tokio::time::timeout(timeout, self.send_and_classify(request, endpoint)).await {
            Ok(outcome) => {
                match &outcome {
                    ExtractionOutcome::Success(text) => {
                        log::info!("✅ 识别成功 - {} 字符", text.chars().count());
                    }
                    other => log::warn!("⚠️ 识别失败：{:?}", other),
                }
                outcome
            }
            Err(_) => {
                log::warn!("⏱️ 请求超时（{}ms），已取消进行中的请求", timeout.as_millis());
                ExtractionOutcome::transport(TransportErrorKind::Timeout, TIMEOUT_DETAIL)
            }
        }
    }

    async fn send_and_classify(&self, request: UploadRequest, endpoint: &str) -> ExtractionOutcome {
        let form = Self::build_form(&request);

        let response = match self.client.post(endpoint).multipart(form).send().await {
            Ok(response) => response,
            Err(err) => {
                return ExtractionOutcome::transport(
                    TransportErrorKind::Network,
                    format!("Network error: {}", Self::sanitize_error_message(&err, endpoint)),
                );
            }
        };

        let status = response.status();
        log::debug!("📥 收到响应 - HTTP {}", status.as_u16());

        if !status.is_success() {
            // 服务端给出非标准原因短语时，hyper 会把原文放进扩展里
            let reason = response
                .extensions()
                .get::<hyper::ext::ReasonPhrase>()
                .map(|phrase| String::from_utf8_lossy(phrase.as_bytes()).into_owned());
            return Self::classify_status(status, reason.as_deref());
        }

        match response.bytes().await {
            Ok(body) => Self::classify_response(status, &body),
            Err(err) => ExtractionOutcome::transport(
                TransportErrorKind::Network,
                format!(
                    "Network error: failed to read response body: {}",
                    Self::sanitize_error_message(&err, endpoint)
                ),
            ),
        }
    }

    /// 组装 multipart 表单。
    ///
    /// 声明的 MIME 无法解析时退化为不带类型的文件字段，由服务端自行识别。
    pub(crate) fn build_form(request: &UploadRequest) -> Form {
        let file_part = || Part::bytes(request.file_bytes.to_vec()).file_name(request.file_name.clone());

        let image_part = if request.mime_type.trim().is_empty() {
            file_part()
        } else {
            file_part().mime_str(&request.mime_type).unwrap_or_else(|err| {
                log::warn!("⚠️ 无法解析 MIME 类型 {}：{}，按未知类型上传", request.mime_type, err);
                file_part()
            })
        };

        Form::new()
            .part("image", image_part)
            .text("language", request.language.as_str().to_string())
    }

    /// 按固定顺序把 HTTP 状态与响应体分类为识别结果。
    pub fn classify_response(status: StatusCode, body: &[u8]) -> ExtractionOutcome {
        if !status.is_success() {
            return Self::classify_status(status, None);
        }

        let value: serde_json::Value = match serde_json::from_slice(body) {
            Ok(value) => value,
            Err(_) => {
                return ExtractionOutcome::transport(TransportErrorKind::BadResponse, INVALID_FORMAT_DETAIL);
            }
        };

        if value.is_null() {
            return ExtractionOutcome::transport(TransportErrorKind::BadResponse, EMPTY_RESPONSE_DETAIL);
        }

        let Some(fields) = value.as_object() else {
            return ExtractionOutcome::transport(TransportErrorKind::BadResponse, INVALID_FORMAT_DETAIL);
        };

        // 逐字段宽松读取：某个字段类型不符只视为缺失，不影响其余字段
        if fields.get("success").and_then(serde_json::Value::as_bool) == Some(false) {
            let message = fields
                .get("message")
                .and_then(serde_json::Value::as_str)
                .filter(|m| !m.is_empty())
                .unwrap_or(UNKNOWN_SERVER_ERROR);
            return ExtractionOutcome::ServerError(message.to_string());
        }

        match fields.get("text").and_then(serde_json::Value::as_str) {
            Some(text) => ExtractionOutcome::Success(text.to_string()),
            None => ExtractionOutcome::transport(TransportErrorKind::BadResponse, NO_TEXT_DETAIL),
        }
    }

    /// 非 2xx 响应的提示文本；优先使用服务端原因短语，缺失时回退到标准短语。
    fn classify_status(status: StatusCode, reason: Option<&str>) -> ExtractionOutcome {
        let reason = reason
            .filter(|r| !r.trim().is_empty())
            .or_else(|| status.canonical_reason())
            .unwrap_or("");
        let detail = format!("Server error: {} {}", status.as_u16(), reason);
        ExtractionOutcome::transport(TransportErrorKind::Network, detail.trim_end().to_string())
    }

    /// 查询服务端健康状态（`GET /api/health`）。
    pub async fn check_health(&self, endpoint: &str, timeout: Duration) -> Result<HealthReport, ExtractError> {
        log::info!("🩺 健康检查 - 地址: {}", Self::redact_url_for_log(endpoint));

        let request = async {
            let response = self.client.get(endpoint).send().await?;
            let http_status = response.status().as_u16();
            let body = response.json::<serde_json::Value>().await?;
            Ok::<_, reqwest::Error>((http_status, body))
        };

        let (http_status, body) = tokio::time::timeout(timeout, request)
            .await
            .map_err(|_| ExtractError::Transport {
                kind: TransportErrorKind::Timeout,
                detail: TIMEOUT_DETAIL.to_string(),
            })?
            .map_err(|err| ExtractError::Transport {
                kind: if err.is_decode() {
                    TransportErrorKind::BadResponse
                } else {
                    TransportErrorKind::Network
                },
                detail: Self::sanitize_error_message(&err, endpoint),
            })?;

        let field = |name: &str| body.get(name).and_then(|v| v.as_str()).map(str::to_string);

        Ok(HealthReport {
            http_status,
            status: field("status"),
            mode: field("mode"),
            body,
        })
    }

    /// 日志中去掉查询串与片段，避免泄露令牌。
    pub(crate) fn redact_url_for_log(url: &str) -> String {
        let Ok(parsed) = reqwest::Url::parse(url) else {
            return "<invalid-url>".to_string();
        };

        let host = parsed.host_str().unwrap_or("<unknown-host>");
        let port = parsed.port().map(|p| format!(":{}", p)).unwrap_or_default();

        format!("{}://{}{}{}", parsed.scheme(), host, port, parsed.path())
    }

    fn sanitize_error_message(err: &reqwest::Error, url: &str) -> String {
        err.to_string().replace(url, &Self::redact_url_for_log(url))
    }
}
