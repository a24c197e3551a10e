//! # 图片文字识别客户端 — 命令行入口
//!
//! 本文件仅负责日志初始化、参数解析与结果输出。
//! 业务逻辑分布在各子模块中，详见 `lib.rs` 架构文档。

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use image_text_extraction::error::AppError;
use image_text_extraction::extractor::commands::{self, ExtractOptions};
use image_text_extraction::extractor::{ExtractorService, UiState};
use image_text_extraction::settings::{self, ClientSettings};

#[derive(Parser)]
#[command(name = "image-text-extraction")]
#[command(about = "Extract text from images through an OCR HTTP API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// 可覆盖设置文件的公共参数。
#[derive(Args, Debug, Clone, Default)]
struct ClientArgs {
    /// Settings file (defaults to the platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,
    /// OCR endpoint URL
    #[arg(long)]
    endpoint: Option<String>,
    /// Recognition language code
    #[arg(short, long)]
    language: Option<String>,
    /// Request timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Preview profile: quality, balanced or speed
    #[arg(long)]
    profile: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate, preview and upload one image, then print the extracted text
    Extract {
        /// Image file to upload
        image: PathBuf,
        /// Copy the extracted text to the system clipboard
        #[arg(long)]
        copy: bool,
        /// Save the extracted text as extracted_text.txt in this directory
        #[arg(long)]
        save_dir: Option<PathBuf>,
        /// Print the final view snapshot as JSON
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        client: ClientArgs,
    },
    /// Query the OCR server health endpoint
    Health {
        #[command(flatten)]
        client: ClientArgs,
    },
    /// Show the effective settings, optionally persisting them
    Config {
        /// Write the effective settings back to the settings file
        #[arg(long)]
        save: bool,
        #[command(flatten)]
        client: ClientArgs,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            log::error!("❌ 执行失败 [{}]: {}", err.code(), err);
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, AppError> {
    match cli.command {
        Commands::Extract {
            image,
            copy,
            save_dir,
            json,
            client,
        } => {
            let (_, client_settings) = resolve_settings(&client)?;
            let mut service = ExtractorService::new(client_settings.to_config()?)?;
            let options = ExtractOptions { copy, save_dir };

            let report = commands::extract_image(&mut service, &image, &options).await?;

            if json {
                let output = serde_json::to_string_pretty(&report)
                    .map_err(|e| AppError::Settings(format!("序列化结果失败: {}", e)))?;
                println!("{}", output);
            } else {
                match &report.snapshot.state {
                    UiState::Result { text } if text.trim().is_empty() => {
                        eprintln!("No text detected in image");
                    }
                    UiState::Result { text } => println!("{}", text),
                    _ => {}
                }
                if let Some(notice) = &report.snapshot.notice {
                    eprintln!("{}", notice.message);
                }
                if let Some(path) = &report.saved_to {
                    eprintln!("Saved to {}", path.display());
                }
            }

            Ok(if report.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Health { client } => {
            let (_, client_settings) = resolve_settings(&client)?;
            let service = ExtractorService::new(client_settings.to_config()?)?;

            match commands::check_server_health(&service).await {
                Ok(report) => {
                    let output = serde_json::to_string_pretty(&report)
                        .map_err(|e| AppError::Settings(format!("序列化结果失败: {}", e)))?;
                    println!("{}", output);
                    Ok(if (200..300).contains(&report.http_status) {
                        ExitCode::SUCCESS
                    } else {
                        ExitCode::FAILURE
                    })
                }
                Err(err) => {
                    eprintln!("Health check failed [{}/{}]: {}", err.stage, err.code, err.message);
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Commands::Config { save, client } => {
            let (path, client_settings) = resolve_settings(&client)?;
            client_settings.to_config()?;

            let output = serde_json::to_string_pretty(&client_settings)
                .map_err(|e| AppError::Settings(format!("序列化设置失败: {}", e)))?;
            println!("{}", output);

            if save {
                let saved = settings::save_settings(path.as_deref(), &client_settings)?;
                eprintln!("Saved to {}", saved.display());
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// 读取设置文件并叠加命令行覆盖项。
fn resolve_settings(args: &ClientArgs) -> Result<(Option<PathBuf>, ClientSettings), AppError> {
    let mut loaded = settings::load_settings(args.config.as_deref())?;

    if let Some(endpoint) = &args.endpoint {
        loaded.endpoint = endpoint.clone();
        loaded.health_endpoint = None;
    }
    if let Some(language) = &args.language {
        loaded.language = language.clone();
    }
    if let Some(timeout_ms) = args.timeout_ms {
        loaded.timeout_ms = timeout_ms;
    }
    if let Some(profile) = &args.profile {
        loaded.preview_profile = profile.clone();
    }

    Ok((args.config.clone(), loaded))
}
