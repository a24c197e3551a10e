mod common;

use std::time::Duration;

use image_text_extraction::extractor::render::{preview_html, text_output_html};
use image_text_extraction::extractor::{
    NoticeLevel, PreviewSlot, SelectedFile, TIMEOUT_DETAIL, UiState,
};

use common::{Reply, contains, png_bytes, service_for, spawn_ocr_server};

#[tokio::test]
async fn successful_upload_shows_text_and_preview() {
    let (url, requests) = spawn_ocr_server(1, |_| Reply::ok(r#"{"success":true,"text":"Hello"}"#));
    let mut service = service_for(&url, 5_000);
    service.set_language("DE");

    service.select_file(SelectedFile::new(png_bytes(4, 3), "receipt.png", "image/png"));
    assert_eq!(service.presenter().state(), &UiState::Loading);

    let snapshot = service.run_until_settled().await;

    assert_eq!(
        snapshot.state,
        UiState::Result {
            text: "Hello".to_string()
        }
    );
    assert_eq!(text_output_html(service.presenter().state()), "<pre>Hello</pre>");
    assert_eq!(snapshot.preview.status, "ready");
    assert_eq!((snapshot.preview.width, snapshot.preview.height), (Some(4), Some(3)));
    let img = preview_html(service.presenter().preview(), service.presenter().selected_file()).expect("img");
    assert!(img.contains("data:image/png;base64,"));

    let request = requests.recv_timeout(Duration::from_secs(2)).expect("request");
    assert!(contains(&request, r#"name="image"; filename="receipt.png""#));
    assert!(contains(&request, r#"name="language""#));
    assert!(contains(&request, "\r\n\r\nde\r\n"));
}

#[tokio::test]
async fn extracted_markup_is_escaped() {
    let (url, _requests) = spawn_ocr_server(1, |_| Reply::ok(r#"{"success":true,"text":"<b>Hi</b>"}"#));
    let mut service = service_for(&url, 5_000);

    service.select_file(SelectedFile::new(png_bytes(2, 2), "a.png", "image/png"));
    service.run_until_settled().await;

    assert_eq!(service.presenter().extracted_text(), Some("<b>Hi</b>"));
    assert_eq!(
        text_output_html(service.presenter().state()),
        "<pre>&lt;b&gt;Hi&lt;/b&gt;</pre>"
    );
}

#[tokio::test]
async fn server_error_message_is_shown_verbatim() {
    let (url, _requests) = spawn_ocr_server(1, |_| Reply::ok(r#"{"success":false,"message":"bad image"}"#));
    let mut service = service_for(&url, 5_000);

    service.select_file(SelectedFile::new(png_bytes(2, 2), "a.png", "image/png"));
    let snapshot = service.run_until_settled().await;

    assert_eq!(
        snapshot.state,
        UiState::Error {
            message: "bad image".to_string()
        }
    );
    let notice = snapshot.notice.expect("notice");
    assert_eq!(notice.message, "bad image");
    assert_eq!(notice.level, NoticeLevel::Error);
}

#[tokio::test]
async fn slow_server_times_out_once() {
    let (url, _requests) = spawn_ocr_server(1, |_| {
        Reply::ok(r#"{"success":true,"text":"too late"}"#).delayed(Duration::from_millis(1_500))
    });
    let mut service = service_for(&url, 200);

    service.select_file(SelectedFile::new(png_bytes(2, 2), "a.png", "image/png"));
    let snapshot = service.run_until_settled().await;

    assert_eq!(
        snapshot.state,
        UiState::Error {
            message: TIMEOUT_DETAIL.to_string()
        }
    );

    service.run_for(Duration::from_millis(1_800)).await;
    assert_eq!(service.presenter().extracted_text(), None);
    assert!(matches!(service.presenter().state(), UiState::Error { .. }));
}

#[tokio::test]
async fn last_selection_wins() {
    let (url, _requests) = spawn_ocr_server(2, |request| {
        if contains(request, r#"filename="a.png""#) {
            Reply::ok(r#"{"success":true,"text":"from A"}"#).delayed(Duration::from_millis(600))
        } else {
            Reply::ok(r#"{"success":true,"text":"from B"}"#)
        }
    });
    let mut service = service_for(&url, 5_000);

    service.select_file(SelectedFile::new(png_bytes(2, 2), "a.png", "image/png"));
    tokio::time::sleep(Duration::from_millis(100)).await;
    service.select_file(SelectedFile::new(png_bytes(5, 5), "b.png", "image/png"));

    let snapshot = service.run_until_settled().await;
    assert_eq!(snapshot.selected_file.as_deref(), Some("b.png"));
    assert_eq!(snapshot.preview.width, Some(5));
    assert_eq!(service.presenter().extracted_text(), Some("from B"));

    service.run_for(Duration::from_millis(900)).await;
    assert_eq!(service.presenter().extracted_text(), Some("from B"));
}

#[tokio::test]
async fn clear_after_result_returns_to_empty_idle() {
    let (url, _requests) = spawn_ocr_server(1, |_| Reply::ok(r#"{"success":true,"text":"Hello"}"#));
    let mut service = service_for(&url, 5_000);

    service.select_file(SelectedFile::new(png_bytes(2, 2), "a.png", "image/png"));
    service.run_until_settled().await;
    service.clear();

    let snapshot = service.snapshot();
    assert_eq!(snapshot.state, UiState::Idle);
    assert_eq!(snapshot.preview.status, "empty");
    assert_eq!(snapshot.selected_file, None);
    assert_eq!(snapshot.notice, None);
    assert_eq!(service.presenter().preview(), &PreviewSlot::Empty);
}

#[tokio::test]
async fn empty_file_is_never_uploaded() {
    let (url, requests) = spawn_ocr_server(1, |_| Reply::ok(r#"{"success":true,"text":"x"}"#));
    let mut service = service_for(&url, 5_000);

    service.select_file(SelectedFile::new(Vec::<u8>::new(), "a.png", "image/png"));
    let snapshot = service.run_until_settled().await;

    assert_eq!(
        snapshot.state,
        UiState::Error {
            message: "File is empty".to_string()
        }
    );
    assert!(requests.recv_timeout(Duration::from_millis(300)).is_err());
}

#[tokio::test]
async fn octet_stream_with_image_extension_is_uploaded() {
    let (url, requests) = spawn_ocr_server(1, |_| Reply::ok(r#"{"success":true,"text":"ok"}"#));
    let mut service = service_for(&url, 5_000);

    service.select_file(SelectedFile::new(png_bytes(2, 2), "photo.png", "application/octet-stream"));
    service.run_until_settled().await;

    assert_eq!(service.presenter().extracted_text(), Some("ok"));
    assert!(requests.recv_timeout(Duration::from_secs(2)).is_ok());
}

#[tokio::test]
async fn undecodable_image_still_gets_text() {
    let (url, _requests) = spawn_ocr_server(1, |_| Reply::ok(r#"{"success":true,"text":""}"#));
    let mut service = service_for(&url, 5_000);

    service.select_file(SelectedFile::new(vec![7u8; 64], "scan.png", "image/png"));
    let snapshot = service.run_until_settled().await;

    assert_eq!(snapshot.preview.status, "unavailable");
    assert_eq!(service.presenter().extracted_text(), Some(""));
    assert!(text_output_html(service.presenter().state()).contains("No text detected in image"));
}

#[tokio::test]
async fn download_writes_extracted_text_file() {
    let (url, _requests) = spawn_ocr_server(1, |_| Reply::ok(r#"{"success":true,"text":"línea 1\nline 2"}"#));
    let mut service = service_for(&url, 5_000);

    service.select_file(SelectedFile::new(png_bytes(2, 2), "a.png", "image/png"));
    service.run_until_settled().await;

    let dir = std::env::temp_dir().join(format!("ite-pipeline-{}", std::process::id()));
    let path = service.download_text(&dir).expect("saved");

    assert!(path.ends_with("extracted_text.txt"));
    assert_eq!(std::fs::read_to_string(&path).expect("read"), "línea 1\nline 2");
    let _ = std::fs::remove_dir_all(&dir);
}
