//! # 预览解码模块
//!
//! ## 设计思路
//!
//! 将“字节 → 图像 → 可展示地址”的过程集中管理，并在关键节点增加资源上限控制。
//! 预览与上传相互独立：解码放在阻塞线程池中执行，既不阻塞事件循环，也不阻塞网络请求。
//! 解码失败只会得到 `PreviewSlot::Unavailable`，绝不会中断识别流程。
//!
//! ## 实现思路
//!
//! 1. 文件签名识别（`infer`）
//! 2. 读取 header 尺寸并按像素上限快速拒绝
//! 3. 完整解码
//! 4. 根据配置决定是否降采样（`fast_image_resize`，失败回退 `image::resize_exact`）
//! 5. 生成 base64 data URL

use base64::{Engine as _, engine::general_purpose};
use fast_image_resize as fr;
use image::{DynamicImage, GenericImageView, ImageBuffer, ImageFormat, Rgba};
use std::io::Cursor;

use super::source::{Preview, PreviewSlot, SelectedFile};
use super::{ExtractError, Extractor, ExtractorConfig};

impl Extractor {
    /// 异步生成预览。
    ///
    /// 返回值永远是一个可展示的槽位：成功为 `Ready`，任何失败为 `Unavailable`。
    pub async fn render_preview(&self, file: &SelectedFile, config: &ExtractorConfig) -> PreviewSlot {
        let bytes = file.bytes.clone();
        let name = file.name.clone();
        let config = config.clone();

        let decoded = tokio::task::spawn_blocking(move || Self::decode_preview(&bytes, &config)).await;

        match decoded {
            Ok(Ok(preview)) => {
                log::info!(
                    "🖼️ 预览生成完成 - 文件: {} 尺寸: {}x{} 类型: {}",
                    name,
                    preview.width,
                    preview.height,
                    preview.mime
                );
                PreviewSlot::Ready(preview)
            }
            Ok(Err(err)) => {
                log::warn!("⚠️ 预览不可用 - 文件: {}：{}", name, err);
                PreviewSlot::Unavailable
            }
            Err(err) => {
                log::warn!("⚠️ 预览线程执行失败 - 文件: {}：{}", name, err);
                PreviewSlot::Unavailable
            }
        }
    }

    /// 将原始字节解码为可展示的预览。
    pub(crate) fn decode_preview(bytes: &[u8], config: &ExtractorConfig) -> Result<Preview, ExtractError> {
        let kind = infer::get(bytes)
            .ok_or_else(|| ExtractError::Preview("unrecognised image signature".to_string()))?;

        if kind.matcher_type() != infer::MatcherType::Image {
            return Err(ExtractError::Preview(format!(
                "file signature is not an image: {}",
                kind.mime_type()
            )));
        }

        let (header_width, header_height) = Self::inspect_dimensions_from_memory(bytes)?;
        Self::validate_pixel_limits(config, header_width, header_height)?;

        let decoded = image::load_from_memory(bytes)
            .map_err(|e| ExtractError::Preview(format!("decode failed: {}", e)))?;
        let (width, height) = decoded.dimensions();

        match Self::maybe_downscale_for_preview(&decoded, config)? {
            Some(scaled) => {
                let (scaled_width, scaled_height) = scaled.dimensions();
                let png = Self::encode_png(&scaled)?;
                Ok(Preview {
                    data_url: Self::to_data_url("image/png", &png),
                    width: scaled_width,
                    height: scaled_height,
                    mime: "image/png".to_string(),
                })
            }
            None => Ok(Preview {
                data_url: Self::to_data_url(kind.mime_type(), bytes),
                width,
                height,
                mime: kind.mime_type().to_string(),
            }),
        }
    }

    /// 仅通过内存中的图片头信息读取宽高。
    fn inspect_dimensions_from_memory(bytes: &[u8]) -> Result<(u32, u32), ExtractError> {
        let reader = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| ExtractError::Preview(format!("unknown image format: {}", e)))?;

        reader
            .into_dimensions()
            .map_err(|e| ExtractError::Preview(format!("cannot read image dimensions: {}", e)))
    }

    fn validate_pixel_limits(config: &ExtractorConfig, width: u32, height: u32) -> Result<(), ExtractError> {
        let pixels = (width as u64)
            .checked_mul(height as u64)
            .ok_or_else(|| ExtractError::Preview("pixel count overflow".to_string()))?;

        if pixels > config.preview_max_decoded_pixels {
            return Err(ExtractError::Preview(format!(
                "image too large to preview: {} pixels (limit {})",
                pixels, config.preview_max_decoded_pixels
            )));
        }

        Ok(())
    }

    /// 按配置计算缩略图；无需缩放时返回 `None`，直接使用原始字节。
    fn maybe_downscale_for_preview(
        image: &DynamicImage,
        config: &ExtractorConfig,
    ) -> Result<Option<DynamicImage>, ExtractError> {
        if !config.preview_adaptive_resize {
            return Ok(None);
        }

        let (width, height) = image.dimensions();
        let Some((target_width, target_height)) = Self::preview_target_size(width, height, config) else {
            return Ok(None);
        };

        log::debug!(
            "🧩 预览降采样：{}x{} -> {}x{}（filter={:?}）",
            width,
            height,
            target_width,
            target_height,
            config.resize_filter
        );

        match Self::resize_with_fast_image_resize(image, target_width, target_height, config.resize_filter) {
            Ok(resized) => Ok(Some(resized)),
            Err(err) => {
                log::warn!("⚠️ fast_image_resize 降采样失败，回退 image::resize_exact：{}", err);
                Ok(Some(image.resize_exact(target_width, target_height, config.resize_filter)))
            }
        }
    }

    /// 目标尺寸：同时满足单边上限与像素上限，保持宽高比。
    pub(crate) fn preview_target_size(width: u32, height: u32, config: &ExtractorConfig) -> Option<(u32, u32)> {
        let source_pixels = (width as u64).saturating_mul(height as u64);
        let over_dimension = width > config.preview_max_dimension || height > config.preview_max_dimension;
        let over_pixels = source_pixels > config.preview_target_pixels;

        if width == 0 || height == 0 || (!over_dimension && !over_pixels) {
            return None;
        }

        let dimension_scale = (config.preview_max_dimension as f64 / width as f64)
            .min(config.preview_max_dimension as f64 / height as f64);
        let pixel_scale = (config.preview_target_pixels as f64 / source_pixels as f64).sqrt();
        let scale = dimension_scale.min(pixel_scale).min(1.0);

        let target_width = ((width as f64 * scale).floor() as u32).max(1);
        let target_height = ((height as f64 * scale).floor() as u32).max(1);

        Some((target_width, target_height))
    }

    fn resize_with_fast_image_resize(
        image: &DynamicImage,
        target_width: u32,
        target_height: u32,
        filter: image::imageops::FilterType,
    ) -> Result<DynamicImage, ExtractError> {
        let src = image.to_rgba8();
        let (src_width, src_height) = src.dimensions();

        let src_image = fr::images::Image::from_vec_u8(src_width, src_height, src.into_raw(), fr::PixelType::U8x4)
            .map_err(|e| ExtractError::Preview(format!("source buffer: {}", e)))?;

        let mut dst_image = fr::images::Image::new(target_width, target_height, fr::PixelType::U8x4);

        let mut resizer = fr::Resizer::new();
        let options = fr::ResizeOptions::new().resize_alg(fr::ResizeAlg::Convolution(Self::to_fast_filter(filter)));

        resizer
            .resize(&src_image, &mut dst_image, Some(&options))
            .map_err(|e| ExtractError::Preview(format!("fast_image_resize: {}", e)))?;

        let rgba = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(target_width, target_height, dst_image.into_vec())
            .ok_or_else(|| ExtractError::Preview("resized buffer length mismatch".to_string()))?;

        Ok(DynamicImage::ImageRgba8(rgba))
    }

    fn to_fast_filter(filter: image::imageops::FilterType) -> fr::FilterType {
        match filter {
            image::imageops::FilterType::Nearest => fr::FilterType::Box,
            image::imageops::FilterType::Triangle => fr::FilterType::Bilinear,
            image::imageops::FilterType::CatmullRom => fr::FilterType::CatmullRom,
            image::imageops::FilterType::Gaussian => fr::FilterType::Mitchell,
            image::imageops::FilterType::Lanczos3 => fr::FilterType::Lanczos3,
        }
    }

    fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, ExtractError> {
        let mut cursor = Cursor::new(Vec::new());
        image
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(|e| ExtractError::Preview(format!("png encode failed: {}", e)))?;
        Ok(cursor.into_inner())
    }

    fn to_data_url(mime: &str, bytes: &[u8]) -> String {
        format!("data:{};base64,{}", mime, general_purpose::STANDARD.encode(bytes))
    }
}
