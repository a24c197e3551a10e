//! # 上传前校验
//!
//! 纯函数：无 I/O、无副作用，相同输入必然得到相同结果。
//! 检查顺序固定为 空文件 → 体积 → 类型，尽快失败。

use super::config::ValidationPolicy;
use super::source::{SelectedFile, ValidationResult};

/// 按策略校验候选文件。
///
/// # 示例
/// ```rust
/// use image_text_extraction::extractor::{validate, SelectedFile, ValidationPolicy, ValidationResult};
///
/// let file = SelectedFile::new(vec![0u8; 16], "photo.png", "application/octet-stream");
/// assert_eq!(validate(&file, &ValidationPolicy::default()), ValidationResult::Accepted);
/// ```
pub fn validate(file: &SelectedFile, policy: &ValidationPolicy) -> ValidationResult {
    let size = file.len();

    if size == 0 {
        return ValidationResult::Rejected("File is empty".to_string());
    }

    if size > policy.max_size_bytes {
        return ValidationResult::Rejected(format!(
            "File too large ({:.2}MB). Maximum {}MB allowed.",
            bytes_to_mb(size),
            format_limit_mb(policy.max_size_bytes)
        ));
    }

    if policy.allows_mime(&file.mime) {
        return ValidationResult::Accepted;
    }

    log::debug!(
        "🔎 MIME 类型未命中白名单（{}），回退检查扩展名",
        if file.mime.is_empty() { "<empty>" } else { &file.mime }
    );

    if policy.allows_extension(&file.extension()) {
        return ValidationResult::Accepted;
    }

    ValidationResult::Rejected(format!(
        "Invalid file type. Allowed: {}",
        policy.allowed_extensions.join(", ")
    ))
}

fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / 1024.0 / 1024.0
}

/// 整数 MB 不带小数（`5MB`），否则保留两位。
fn format_limit_mb(bytes: u64) -> String {
    if bytes % (1024 * 1024) == 0 {
        (bytes / (1024 * 1024)).to_string()
    } else {
        format!("{:.2}", bytes_to_mb(bytes))
    }
}
