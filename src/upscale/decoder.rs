//! # 解码模块
//!
//! ## 设计思路
//!
//! 将“文件 → 字节 → 图像 → RGBA 位图”的过程集中管理。
//! 输入默认不限分辨率；配置了资源上限时，先做体积与尺寸检查，再进行完整解码。
//!
//! ## 实现思路
//!
//! 1. 存在性 + metadata 体积限制（可选）+ 读取
//! 2. 通过文件签名（magic bytes）确认是图片
//! 3. 读取 header 尺寸并按像素/内存上限快速拒绝（可选）
//! 4. 完整解码并转换为 RGBA（不做色彩管理变换）
//!
//! 解码失败不重试。

use std::io::Cursor;
use std::path::Path;

use image::{GenericImageView, ImageReader};

use super::config::UpscaleConfig;
use super::source::Bitmap;
use super::UpscaleError;

/// 图片解码器。
#[derive(Debug, Clone)]
pub struct ImageDecoder {
    config: UpscaleConfig,
}

impl ImageDecoder {
    pub fn new(config: &UpscaleConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// 从本地路径解码为位图。
    pub fn decode(&self, path: &Path) -> Result<Bitmap, UpscaleError> {
        log::info!("📁 开始读取本地图片 - 路径: {}", path.display());

        let bytes = self.read_file(path)?;
        self.decode_bytes(&bytes, &path.display().to_string())
    }

    /// 解码内存中的图片字节。
    pub fn decode_bytes(&self, bytes: &[u8], source_hint: &str) -> Result<Bitmap, UpscaleError> {
        Self::validate_image_signature(bytes)?;

        let (header_width, header_height) = Self::inspect_dimensions_from_memory(bytes)?;
        self.validate_pixel_limits(header_width, header_height)?;
        self.validate_decoded_memory_limits(header_width, header_height)?;

        let mut reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| UpscaleError::DecodeFailed(format!("无法识别图片格式：{}", e)))?;
        if self.config.max_decoded_bytes.is_none() {
            // 关闭 image 自带的默认分配上限，超大图也能完整解码
            reader.no_limits();
        }
        let decoded = reader
            .decode()
            .map_err(|e| UpscaleError::DecodeFailed(format!("图片解码失败：{}", e)))?;

        let (width, height) = decoded.dimensions();
        self.validate_pixel_limits(width, height)?;
        self.validate_decoded_memory_limits(width, height)?;

        let bitmap = Bitmap::new(decoded.to_rgba8())?;

        log::info!(
            "✅ 图片解码成功 - 来源: {} 尺寸: {}x{}",
            source_hint,
            bitmap.width(),
            bitmap.height()
        );

        Ok(bitmap)
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>, UpscaleError> {
        if !path.exists() {
            return Err(UpscaleError::DecodeFailed(format!(
                "文件不存在：{}",
                path.display()
            )));
        }

        let metadata = std::fs::metadata(path)
            .map_err(|e| UpscaleError::DecodeFailed(format!("无法读取文件信息：{}", e)))?;

        if !metadata.is_file() {
            return Err(UpscaleError::DecodeFailed(format!(
                "不是普通文件：{}",
                path.display()
            )));
        }

        if let Some(limit) = self.config.max_file_size {
            if metadata.len() > limit {
                return Err(UpscaleError::ResourceLimit(format!(
                    "文件过大：{:.2} MB（限制：{:.2} MB）",
                    metadata.len() as f64 / 1024.0 / 1024.0,
                    limit as f64 / 1024.0 / 1024.0
                )));
            }
        }

        std::fs::read(path)
            .map_err(|e| UpscaleError::DecodeFailed(format!("无法读取图片文件：{}", e)))
    }

    /// 通过文件签名（magic bytes）校验输入是否为图片。
    fn validate_image_signature(bytes: &[u8]) -> Result<(), UpscaleError> {
        if bytes.is_empty() {
            return Err(UpscaleError::DecodeFailed("图片内容为空".to_string()));
        }

        let kind = infer::get(bytes)
            .ok_or_else(|| UpscaleError::DecodeFailed("无法识别图片类型".to_string()))?;

        if kind.matcher_type() != infer::MatcherType::Image {
            return Err(UpscaleError::DecodeFailed(format!(
                "文件签名不是图片类型：{}",
                kind.mime_type()
            )));
        }

        Ok(())
    }

    /// 仅通过图片头信息读取宽高，用于完整解码前的像素限制检查。
    fn inspect_dimensions_from_memory(bytes: &[u8]) -> Result<(u32, u32), UpscaleError> {
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| UpscaleError::DecodeFailed(format!("无法识别图片格式：{}", e)))?;

        reader
            .into_dimensions()
            .map_err(|e| UpscaleError::DecodeFailed(format!("无法读取图片尺寸：{}", e)))
    }

    fn validate_pixel_limits(&self, width: u32, height: u32) -> Result<(), UpscaleError> {
        let Some(limit) = self.config.max_decoded_pixels else {
            return Ok(());
        };

        // u32 * u32 不会溢出 u64
        let pixels = width as u64 * height as u64;
        if pixels > limit {
            return Err(UpscaleError::ResourceLimit(format!(
                "图片像素过大：{} 像素（限制：{} 像素）",
                pixels, limit
            )));
        }

        Ok(())
    }

    fn validate_decoded_memory_limits(&self, width: u32, height: u32) -> Result<(), UpscaleError> {
        let Some(limit) = self.config.max_decoded_bytes else {
            return Ok(());
        };

        let estimated = (width as u64)
            .checked_mul(height as u64)
            .and_then(|pixels| pixels.checked_mul(4))
            .ok_or_else(|| UpscaleError::ResourceLimit("图片解码内存估算溢出".to_string()))?;

        if estimated > limit {
            return Err(UpscaleError::ResourceLimit(format!(
                "图片解码预计内存过大：{:.2} MB（限制：{:.2} MB）",
                estimated as f64 / 1024.0 / 1024.0,
                limit as f64 / 1024.0 / 1024.0
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageBuffer, ImageFormat, Rgba};
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_temp_dir(label: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!(
            "simple_image_sr_decoder_{label}_{}_{}",
            std::process::id(),
            nanos
        ));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    fn encode_test_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            Rgba([(x % 255) as u8, (y % 255) as u8, ((x + y) % 255) as u8, 200])
        });

        let dyn_img = match format {
            ImageFormat::Jpeg => DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(img).to_rgb8()),
            _ => DynamicImage::ImageRgba8(img),
        };
        let mut cursor = Cursor::new(Vec::new());
        dyn_img
            .write_to(&mut cursor, format)
            .expect("failed to encode test image");
        cursor.into_inner()
    }

    #[test]
    fn decodes_png_file_with_alpha() {
        let dir = unique_temp_dir("png");
        let path = dir.join("in.png");
        std::fs::write(&path, encode_test_image(5, 3, ImageFormat::Png)).expect("write png");

        let bitmap = ImageDecoder::new(&UpscaleConfig::default())
            .decode(&path)
            .expect("decode should succeed");

        assert_eq!((bitmap.width(), bitmap.height()), (5, 3));
        assert_eq!(bitmap.pixel(4, 2), [4, 2, 6, 200]);
    }

    #[test]
    fn decodes_jpeg_as_opaque_rgba() {
        let bytes = encode_test_image(16, 8, ImageFormat::Jpeg);

        let bitmap = ImageDecoder::new(&UpscaleConfig::default())
            .decode_bytes(&bytes, "jpeg-test")
            .expect("decode should succeed");

        assert_eq!((bitmap.width(), bitmap.height()), (16, 8));
        assert_eq!(bitmap.pixel(0, 0)[3], 255);
    }

    #[test]
    fn missing_file_is_decode_failure() {
        let path = unique_temp_dir("missing").join("absent.png");

        let result = ImageDecoder::new(&UpscaleConfig::default()).decode(&path);

        assert!(matches!(result, Err(UpscaleError::DecodeFailed(_))));
    }

    #[test]
    fn non_image_file_is_decode_failure() {
        let dir = unique_temp_dir("text");
        let path = dir.join("notes.png");
        std::fs::write(&path, b"<html><body>not an image</body></html>").expect("write text");

        let result = ImageDecoder::new(&UpscaleConfig::default()).decode(&path);

        assert!(matches!(result, Err(UpscaleError::DecodeFailed(_))));
    }

    #[test]
    fn truncated_png_is_decode_failure() {
        let mut bytes = encode_test_image(32, 32, ImageFormat::Png);
        bytes.truncate(bytes.len() / 2);

        let result = ImageDecoder::new(&UpscaleConfig::default()).decode_bytes(&bytes, "truncated");

        assert!(matches!(result, Err(UpscaleError::DecodeFailed(_))));
    }

    #[test]
    fn rejects_too_many_pixels_before_decoding() {
        let config = UpscaleConfig::default().with_max_pixels(100);
        let bytes = encode_test_image(20, 20, ImageFormat::Png);

        let result = ImageDecoder::new(&config).decode_bytes(&bytes, "limit");

        assert!(matches!(result, Err(UpscaleError::ResourceLimit(_))));
    }

    #[test]
    fn rejects_oversized_file() {
        let dir = unique_temp_dir("size");
        let path = dir.join("big.png");
        std::fs::write(&path, encode_test_image(8, 8, ImageFormat::Png)).expect("write png");
        let config = UpscaleConfig::default().with_max_file_size(16);

        let result = ImageDecoder::new(&config).decode(&path);

        assert!(matches!(result, Err(UpscaleError::ResourceLimit(_))));
    }

    #[test]
    fn large_image_decodes_when_limits_are_off() {
        // 48 MP 级别的尺寸在默认配置下只校验头信息，不应被拒绝
        let decoder = ImageDecoder::new(&UpscaleConfig::default());

        decoder
            .validate_pixel_limits(8000, 6000)
            .expect("pixel limit is off by default");
        decoder
            .validate_decoded_memory_limits(8000, 6000)
            .expect("memory limit is off by default");

        let bytes = encode_test_image(640, 480, ImageFormat::Png);
        let bitmap = decoder.decode_bytes(&bytes, "large").expect("decode should succeed");
        assert_eq!((bitmap.width(), bitmap.height()), (640, 480));
    }
}
