//! 集成测试共用的假 OCR 服务与样例图片。

#![allow(dead_code)]

use std::io::{Cursor, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use image::{ImageFormat, Rgb, RgbImage};

use image_text_extraction::extractor::{ExtractorConfig, ExtractorService};

/// 假服务对单个请求的应答。
pub struct Reply {
    pub status_line: &'static str,
    pub body: String,
    pub delay: Duration,
}

impl Reply {
    pub fn ok(body: &str) -> Self {
        Self {
            status_line: "200 OK",
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// 启动最多接受 `connections` 个连接的假 OCR 服务；每个请求原文回传给测试。
pub fn spawn_ocr_server<F>(connections: usize, reply: F) -> (String, mpsc::Receiver<Vec<u8>>)
where
    F: Fn(&[u8]) -> Reply + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind test server failed");
    let addr = listener.local_addr().expect("read local addr failed");
    let (tx, rx) = mpsc::channel();
    let reply = Arc::new(reply);

    thread::spawn(move || {
        for _ in 0..connections {
            let Ok((mut stream, _)) = listener.accept() else {
                return;
            };
            let tx = tx.clone();
            let reply = Arc::clone(&reply);

            thread::spawn(move || {
                let request = read_http_request(&mut stream);
                let answer = reply(&request);
                let _ = tx.send(request);

                thread::sleep(answer.delay);
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    answer.status_line,
                    answer.body.len(),
                    answer.body
                );
                let _ = stream.write_all(response.as_bytes());
                let _ = stream.flush();
            });
        }
    });

    (format!("http://{}/api/extract-text", addr), rx)
}

fn read_http_request(stream: &mut TcpStream) -> Vec<u8> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        if let Some(end) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
            let headers = String::from_utf8_lossy(&buffer[..end]).to_ascii_lowercase();
            let content_length = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok());

            match content_length {
                Some(len) if buffer.len() >= end + 4 + len => break,
                None if buffer.ends_with(b"--\r\n") => break,
                _ => {}
            }
        }

        match stream.read(&mut chunk) {
            Ok(0) | Err(_) => break,
            Ok(n) => buffer.extend_from_slice(&chunk[..n]),
        }
    }

    buffer
}

pub fn contains(haystack: &[u8], needle: &str) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle.as_bytes())
}

/// 生成指定尺寸的 PNG。
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, y| Rgb([(x * 40) as u8, (y * 60) as u8, 128]));
    let mut cursor = Cursor::new(Vec::new());
    image
        .write_to(&mut cursor, ImageFormat::Png)
        .expect("encode png");
    cursor.into_inner()
}

pub fn service_for(endpoint: &str, timeout_ms: u64) -> ExtractorService {
    let mut config = ExtractorConfig::default();
    config.set_endpoint(endpoint).expect("endpoint");
    config.set_request_timeout_ms(timeout_ms).expect("timeout");
    ExtractorService::new(config).expect("service")
}
