//! # 客户端设置
//!
//! 设置以 JSON 保存在平台配置目录下（`<config_dir>/image-text-extraction/settings.json`），
//! 也可以通过 `--config` 指定路径。文件不存在时使用默认值；命令行参数最后覆盖。

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::extractor::{
    DEFAULT_ENDPOINT, DEFAULT_LANGUAGE, DEFAULT_NOTICE_DISMISS_MS, DEFAULT_REQUEST_TIMEOUT_MS, ExtractorConfig,
    Language, PreviewProfile,
};

const APP_DIR_NAME: &str = "image-text-extraction";
const SETTINGS_FILE_NAME: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub endpoint: String,
    /// 未设置时由 `endpoint` 推导同源的 `/api/health`。
    pub health_endpoint: Option<String>,
    pub language: String,
    pub timeout_ms: u64,
    pub notice_dismiss_ms: u64,
    pub preview_profile: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            health_endpoint: None,
            language: DEFAULT_LANGUAGE.to_string(),
            timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            notice_dismiss_ms: DEFAULT_NOTICE_DISMISS_MS,
            preview_profile: PreviewProfile::Balanced.as_str().to_string(),
        }
    }
}

impl ClientSettings {
    /// 将设置写入识别配置，任一字段非法则整体失败，`config` 可能已部分修改。
    pub fn apply_to(&self, config: &mut ExtractorConfig) -> Result<(), AppError> {
        config.set_endpoint(&self.endpoint)?;
        match &self.health_endpoint {
            Some(health) => config.set_health_endpoint(health)?,
            None => {
                let derived = ExtractorConfig::derive_health_endpoint(&config.endpoint)?;
                config.set_health_endpoint(&derived)?;
            }
        }
        config.set_request_timeout_ms(self.timeout_ms)?;
        config.set_notice_dismiss_ms(self.notice_dismiss_ms)?;
        config.default_language = Language::new(&self.language).as_str().to_string();
        config.apply_preview_profile(PreviewProfile::parse(&self.preview_profile)?);
        Ok(())
    }

    /// 生成一份完整的识别配置。
    pub fn to_config(&self) -> Result<ExtractorConfig, AppError> {
        let mut config = ExtractorConfig::default();
        self.apply_to(&mut config)?;
        Ok(config)
    }
}

/// 默认设置文件路径。
pub fn default_settings_path() -> Result<PathBuf, AppError> {
    let base = dirs::config_dir()
        .ok_or_else(|| AppError::Settings("无法定位系统配置目录".to_string()))?;
    Ok(base.join(APP_DIR_NAME).join(SETTINGS_FILE_NAME))
}

fn resolve_path(path: Option<&Path>) -> Result<PathBuf, AppError> {
    match path {
        Some(path) => Ok(path.to_path_buf()),
        None => default_settings_path(),
    }
}

/// 读取设置；文件不存在时返回默认值。
pub fn load_settings(path: Option<&Path>) -> Result<ClientSettings, AppError> {
    let settings_path = resolve_path(path)?;
    if !settings_path.exists() {
        log::debug!("未找到设置文件，使用默认值 - {}", settings_path.display());
        return Ok(ClientSettings::default());
    }

    let content = fs::read_to_string(&settings_path)?;
    let parsed = serde_json::from_str::<ClientSettings>(&content)
        .map_err(|e| AppError::Settings(format!("解析设置文件失败 {}: {}", settings_path.display(), e)))?;

    log::info!("⚙️ 已加载设置 - {}", settings_path.display());
    Ok(parsed)
}

/// 保存设置，目录不存在时自动创建。
pub fn save_settings(path: Option<&Path>, settings: &ClientSettings) -> Result<PathBuf, AppError> {
    let settings_path = resolve_path(path)?;
    if let Some(parent) = settings_path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::Settings(format!("创建设置目录失败: {}", e)))?;
    }

    let content = serde_json::to_string_pretty(settings)
        .map_err(|e| AppError::Settings(format!("序列化设置失败: {}", e)))?;
    fs::write(&settings_path, content)?;

    log::info!("💾 已保存设置 - {}", settings_path.display());
    Ok(settings_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_settings_path(tag: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("ite-settings-{}-{}", tag, std::process::id()))
            .join("settings.json")
    }

    #[test]
    fn missing_file_yields_defaults() {
        let path = temp_settings_path("missing");
        let settings = load_settings(Some(&path)).expect("load");
        assert_eq!(settings, ClientSettings::default());
    }

    #[test]
    fn saved_settings_can_be_loaded_back() {
        let path = temp_settings_path("save");
        let settings = ClientSettings {
            endpoint: "http://ocr.local:8080/api/extract-text".to_string(),
            language: "de".to_string(),
            timeout_ms: 10_000,
            ..ClientSettings::default()
        };

        save_settings(Some(&path), &settings).expect("save");
        assert_eq!(load_settings(Some(&path)).expect("load"), settings);

        if let Some(dir) = path.parent() {
            let _ = fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn partial_file_falls_back_to_defaults_per_field() {
        let path = temp_settings_path("partial");
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).expect("dir");
        }
        fs::write(&path, r#"{ "language": "FR" }"#).expect("write");

        let settings = load_settings(Some(&path)).expect("load");
        assert_eq!(settings.language, "FR");
        assert_eq!(settings.timeout_ms, DEFAULT_REQUEST_TIMEOUT_MS);

        let config = settings.to_config().expect("config");
        assert_eq!(config.default_language, "fr");

        if let Some(dir) = path.parent() {
            let _ = fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn health_endpoint_is_derived_from_endpoint() {
        let settings = ClientSettings {
            endpoint: "http://ocr.local:8080/api/extract-text".to_string(),
            ..ClientSettings::default()
        };
        let config = settings.to_config().expect("config");
        assert_eq!(config.health_endpoint, "http://ocr.local:8080/api/health");
    }

    #[test]
    fn invalid_values_are_rejected() {
        let bad_timeout = ClientSettings {
            timeout_ms: 0,
            ..ClientSettings::default()
        };
        assert!(bad_timeout.to_config().is_err());

        let bad_profile = ClientSettings {
            preview_profile: "turbo".to_string(),
            ..ClientSettings::default()
        };
        assert!(bad_profile.to_config().is_err());

        let bad_scheme = ClientSettings {
            endpoint: "ftp://ocr.local/api".to_string(),
            ..ClientSettings::default()
        };
        assert!(bad_scheme.to_config().is_err());
    }
}
