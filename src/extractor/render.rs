//! # 视图片段渲染
//!
//! 识别出的文字属于不可信内容，插入页面前必须转义（`& < > " '`）。
//! 这里输出的片段可被前端 webview 直接插入，不做任何模板引擎依赖。

use super::presenter::{Notice, UiState};
use super::source::PreviewSlot;

pub const NO_TEXT_DETECTED_HTML: &str = r#"<p class="info-text">No text detected in image</p>"#;
pub const PLACEHOLDER_HTML: &str = r#"<p class="placeholder-text">No text extracted yet</p>"#;
pub const PREVIEW_UNAVAILABLE_ALT: &str = "Preview unavailable";

/// HTML 转义。
///
/// # 示例
/// ```rust
/// use image_text_extraction::extractor::render::escape_html;
///
/// assert_eq!(escape_html("<b>Hi</b>"), "&lt;b&gt;Hi&lt;/b&gt;");
/// ```
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// 文字输出区域。
pub fn text_output_html(state: &UiState) -> String {
    match state {
        UiState::Result { text } if !text.trim().is_empty() => {
            format!("<pre>{}</pre>", escape_html(text))
        }
        UiState::Result { .. } => NO_TEXT_DETECTED_HTML.to_string(),
        _ => PLACEHOLDER_HTML.to_string(),
    }
}

/// 错误横幅，带手动关闭按钮。
pub fn notice_html(notice: &Notice) -> String {
    format!(
        r#"<div class="error-message" data-notice-id="{}"><span>{}</span><button class="dismiss" type="button">×</button></div>"#,
        notice.id,
        escape_html(&notice.message)
    )
}

/// 预览图片；解码失败时输出占位说明，空槽位不输出任何内容。
pub fn preview_html(slot: &PreviewSlot, file_name: Option<&str>) -> Option<String> {
    match slot {
        PreviewSlot::Ready(preview) => Some(format!(
            r#"<img class="preview" src="{}" alt="{}" width="{}" height="{}">"#,
            preview.data_url,
            escape_html(file_name.unwrap_or("Image preview")),
            preview.width,
            preview.height
        )),
        PreviewSlot::Unavailable => Some(format!(
            r#"<img class="preview" alt="{}">"#,
            PREVIEW_UNAVAILABLE_ALT
        )),
        PreviewSlot::Empty | PreviewSlot::Pending => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::presenter::NoticeLevel;
    use crate::extractor::source::Preview;

    #[test]
    fn escapes_all_markup_characters() {
        assert_eq!(
            escape_html(r#"a & b < c > d "e" 'f'"#),
            "a &amp; b &lt; c &gt; d &quot;e&quot; &#039;f&#039;"
        );
    }

    #[test]
    fn result_text_is_wrapped_and_escaped() {
        let state = UiState::Result {
            text: "<b>Hi</b>".to_string(),
        };
        assert_eq!(text_output_html(&state), "<pre>&lt;b&gt;Hi&lt;/b&gt;</pre>");

        let plain = UiState::Result {
            text: "Hello".to_string(),
        };
        assert_eq!(text_output_html(&plain), "<pre>Hello</pre>");
    }

    #[test]
    fn blank_result_shows_no_text_placeholder() {
        let state = UiState::Result {
            text: " \n\t".to_string(),
        };
        assert_eq!(text_output_html(&state), NO_TEXT_DETECTED_HTML);
        assert_eq!(text_output_html(&UiState::Idle), PLACEHOLDER_HTML);
        assert_eq!(text_output_html(&UiState::Loading), PLACEHOLDER_HTML);
    }

    #[test]
    fn notice_message_is_escaped() {
        let notice = Notice {
            id: 3,
            level: NoticeLevel::Error,
            message: "<script>alert(1)</script>".to_string(),
            raised_at: "2026-01-01T00:00:00+00:00".to_string(),
        };
        let html = notice_html(&notice);
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains(r#"data-notice-id="3""#));
    }

    #[test]
    fn preview_fragment_tracks_slot() {
        let ready = PreviewSlot::Ready(Preview {
            data_url: "data:image/png;base64,AAAA".to_string(),
            width: 2,
            height: 1,
            mime: "image/png".to_string(),
        });
        let html = preview_html(&ready, Some("a\"b.png")).expect("img");
        assert!(html.contains(r#"src="data:image/png;base64,AAAA""#));
        assert!(html.contains(r#"alt="a&quot;b.png""#));

        let broken = preview_html(&PreviewSlot::Unavailable, None).expect("placeholder");
        assert!(broken.contains("Preview unavailable"));

        assert_eq!(preview_html(&PreviewSlot::Pending, None), None);
    }
}
