//! # 编码与写出模块
//!
//! ## 设计思路
//!
//! 将位图无损编码为 PNG（保留 alpha），再写入目标路径。
//! 编码与写出拆成两个步骤，写出失败时不会留下半个文件。
//!
//! ## 实现思路
//!
//! - 编码使用 `image` 的 `PngEncoder`，输入为紧凑 RGBA 字节。
//! - 写出先落到同目录的临时文件，成功后 `rename` 到目标路径；
//!   任一步失败都会删除临时文件再返回 `WriteFailed`。
//! - 不自动创建父目录，目录缺失视为写出失败。

use std::fs;
use std::path::{Path, PathBuf};

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder as _};

use super::source::Bitmap;
use super::UpscaleError;

/// PNG 编码器。
pub struct ImageEncoder;

impl ImageEncoder {
    /// 将位图编码为 PNG 字节。
    pub fn encode(bitmap: &Bitmap) -> Result<Vec<u8>, UpscaleError> {
        let rgba = bitmap.as_image();
        let mut buf = Vec::new();

        PngEncoder::new(&mut buf)
            .write_image(
                rgba.as_raw(),
                bitmap.width(),
                bitmap.height(),
                ExtendedColorType::Rgba8,
            )
            .map_err(|e| UpscaleError::EncodeFailed(format!("PNG 编码失败：{}", e)))?;

        log::debug!(
            "🗜️ PNG 编码完成 - {}x{} -> {} KB",
            bitmap.width(),
            bitmap.height(),
            buf.len() / 1024
        );

        Ok(buf)
    }

    /// 将编码结果写入 `path`。
    pub fn write(bytes: &[u8], path: &Path) -> Result<(), UpscaleError> {
        let partial = Self::partial_path(path)?;

        if let Err(e) = fs::write(&partial, bytes) {
            let _ = fs::remove_file(&partial);
            return Err(UpscaleError::WriteFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            });
        }

        if let Err(e) = fs::rename(&partial, path) {
            let _ = fs::remove_file(&partial);
            return Err(UpscaleError::WriteFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            });
        }

        log::info!(
            "💾 已写出图片 - 路径: {} 大小: {} KB",
            path.display(),
            bytes.len() / 1024
        );

        Ok(())
    }

    /// 同目录下的临时文件路径：`.<name>.partial`。
    fn partial_path(path: &Path) -> Result<PathBuf, UpscaleError> {
        let file_name = path.file_name().ok_or_else(|| UpscaleError::WriteFailed {
            path: path.to_path_buf(),
            reason: "目标路径缺少文件名".to_string(),
        })?;

        Ok(path.with_file_name(format!(".{}.partial", file_name.to_string_lossy())))
    }
}
