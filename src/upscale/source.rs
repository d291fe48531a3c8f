//! # 数据模型与中间结果
//!
//! ## 设计思路
//!
//! 将“流水线各阶段交接的数据”与“处理逻辑”解耦：
//! - `Bitmap` 表示解码后的设备 RGB 图像（RGBA，每通道 8 bit）
//! - `PixelBuffer` 表示交给推理后端的原始字节缓冲（带行跨度与通道顺序）
//! - `FeatureMap` 表示一次推理调用的输入/输出特征集合
//!
//! 所有类型在阶段之间按值移交所有权，不在两个组件间共享。

use std::collections::HashMap;
use std::fmt;

use image::RgbaImage;

use super::config::ChannelOrder;
use super::UpscaleError;

/// 每像素字节数（固定 4 分量、每分量 8 bit）。
pub const BYTES_PER_PIXEL: usize = 4;

/// 解码后的位图。
///
/// 像素按设备 RGB 存储，不做任何色彩管理变换。构造后不可变。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    pixels: RgbaImage,
}

impl Bitmap {
    /// 包装一张 RGBA 图像，宽高必须为正。
    pub fn new(pixels: RgbaImage) -> Result<Self, UpscaleError> {
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(UpscaleError::DecodeFailed(format!(
                "图片尺寸无效：{}x{}",
                pixels.width(),
                pixels.height()
            )));
        }
        Ok(Self { pixels })
    }

    /// 调用方已保证宽高为正（例如来自合法的 `PixelBuffer`）。
    pub(crate) fn from_valid_image(pixels: RgbaImage) -> Self {
        debug_assert!(pixels.width() > 0 && pixels.height() > 0);
        Self { pixels }
    }

    /// 由宽高与按坐标生成像素的函数构建位图。
    pub fn from_fn<F>(width: u32, height: u32, f: F) -> Result<Self, UpscaleError>
    where
        F: FnMut(u32, u32) -> image::Rgba<u8>,
    {
        Self::new(RgbaImage::from_fn(width, height, f))
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// 读取 `(x, y)` 处的 `[R, G, B, A]`。
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.pixels.get_pixel(x, y).0
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn into_image(self) -> RgbaImage {
        self.pixels
    }
}

/// 像素缓冲的物理字节顺序。
///
/// 始终是 4 分量、每分量 8 bit，区别仅在于第一个字节是哪个分量。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 第一个字节为蓝色：`B G R A`。几乎所有平台都能分配。
    Bgra8,
    /// 第一个字节为红色：`R G B A`。
    Rgba8,
    /// 第一个字节为 alpha：`A R G B`。
    Argb8,
}

impl PixelFormat {
    /// `[R, G, B, A]` 各分量在单个像素内的字节偏移。
    pub fn component_offsets(self) -> [usize; 4] {
        match self {
            Self::Bgra8 => [2, 1, 0, 3],
            Self::Rgba8 => [0, 1, 2, 3],
            Self::Argb8 => [1, 2, 3, 0],
        }
    }

    /// 该字节顺序对应的颜色通道顺序（忽略 alpha）。
    pub fn channel_order(self) -> ChannelOrder {
        match self {
            Self::Bgra8 => ChannelOrder::Bgr,
            Self::Rgba8 | Self::Argb8 => ChannelOrder::Rgb,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bgra8 => "bgra",
            Self::Rgba8 => "rgba",
            Self::Argb8 => "argb",
        }
    }

    /// 把一个 `[R, G, B, A]` 像素写成该格式的 4 个字节。
    pub fn encode_pixel(self, rgba: [u8; 4]) -> [u8; 4] {
        let mut out = [0u8; 4];
        for (component, offset) in self.component_offsets().into_iter().enumerate() {
            out[offset] = rgba[component];
        }
        out
    }

    /// 把该格式的 4 个字节还原为 `[R, G, B, A]`。
    pub fn decode_pixel(self, bytes: [u8; 4]) -> [u8; 4] {
        let mut out = [0u8; 4];
        for (component, offset) in self.component_offsets().into_iter().enumerate() {
            out[component] = bytes[offset];
        }
        out
    }
}

/// 推理后端使用的像素缓冲。
///
/// 内存区域大小恒为 `stride * height`，每行末尾可能有对齐填充。
/// 只有持有 [`BufferLock`](crate::upscale::BufferLock) 时才能写入。
pub struct PixelBuffer {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) stride: usize,
    pub(crate) format: PixelFormat,
    pub(crate) data: Vec<u8>,
    pub(crate) locked: bool,
    pub(crate) lock_count: u32,
    pub(crate) unlock_count: u32,
}

impl PixelBuffer {
    /// 由已有字节构建缓冲（推理后端产出结果时使用）。
    ///
    /// 几何信息不自洽时返回 `ConversionContextFailed`。
    pub fn from_raw_parts(
        width: u32,
        height: u32,
        stride: usize,
        format: PixelFormat,
        data: Vec<u8>,
    ) -> Result<Self, UpscaleError> {
        if width == 0 || height == 0 {
            return Err(UpscaleError::ConversionContextFailed(format!(
                "缓冲尺寸无效：{}x{}",
                width, height
            )));
        }

        let min_stride = (width as usize)
            .checked_mul(BYTES_PER_PIXEL)
            .ok_or_else(|| UpscaleError::ConversionContextFailed("缓冲行宽溢出".to_string()))?;
        if stride < min_stride {
            return Err(UpscaleError::ConversionContextFailed(format!(
                "行跨度 {} 小于最小行宽 {}",
                stride, min_stride
            )));
        }

        let expected_len = stride
            .checked_mul(height as usize)
            .ok_or_else(|| UpscaleError::ConversionContextFailed("缓冲大小溢出".to_string()))?;
        if data.len() != expected_len {
            return Err(UpscaleError::ConversionContextFailed(format!(
                "缓冲长度异常：期望 {} 实际 {}",
                expected_len,
                data.len()
            )));
        }

        Ok(Self {
            width,
            height,
            stride,
            format,
            data,
            locked: false,
            lock_count: 0,
            unlock_count: 0,
        })
    }

    /// 无行填充的紧凑缓冲（`stride = width * 4`）。
    pub fn packed(
        width: u32,
        height: u32,
        format: PixelFormat,
        data: Vec<u8>,
    ) -> Result<Self, UpscaleError> {
        let stride = (width as usize).saturating_mul(BYTES_PER_PIXEL);
        Self::from_raw_parts(width, height, stride, format, data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// 行跨度（字节）。
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// 整块内存（含行尾填充）。
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// 第 `y` 行的有效像素字节（不含行尾填充）。
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride;
        &self.data[start..start + self.width as usize * BYTES_PER_PIXEL]
    }

    /// `(x, y)` 处按物理顺序排列的 4 个字节。
    pub fn pixel_bytes(&self, x: u32, y: u32) -> [u8; 4] {
        let offset = y as usize * self.stride + x as usize * BYTES_PER_PIXEL;
        [
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
            self.data[offset + 3],
        ]
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// 累计加锁/解锁次数，用于校验配对。
    pub fn lock_stats(&self) -> (u32, u32) {
        (self.lock_count, self.unlock_count)
    }
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stride", &self.stride)
            .field("format", &self.format)
            .field("bytes", &self.data.len())
            .field("locked", &self.locked)
            .finish()
    }
}

/// 一次推理调用交换的特征集合：键 → 像素缓冲。
#[derive(Debug, Default)]
pub struct FeatureMap {
    features: HashMap<String, PixelBuffer>,
}

impl FeatureMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// 只含一个条目的特征集合。
    pub fn single(key: impl Into<String>, buffer: PixelBuffer) -> Self {
        let mut map = Self::new();
        map.insert(key, buffer);
        map
    }

    pub fn insert(&mut self, key: impl Into<String>, buffer: PixelBuffer) -> Option<PixelBuffer> {
        self.features.insert(key.into(), buffer)
    }

    pub fn get(&self, key: &str) -> Option<&PixelBuffer> {
        self.features.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<PixelBuffer> {
        self.features.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.features.contains_key(key)
    }

    /// 全部键（排序后返回，保证诊断信息稳定）。
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.features.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitmap_rejects_empty_image() {
        let result = Bitmap::new(RgbaImage::new(0, 4));
        assert!(matches!(result, Err(UpscaleError::DecodeFailed(_))));
    }

    #[test]
    fn pixel_format_encode_decode_are_inverse() {
        let rgba = [10, 20, 30, 40];
        for format in [PixelFormat::Bgra8, PixelFormat::Rgba8, PixelFormat::Argb8] {
            assert_eq!(format.decode_pixel(format.encode_pixel(rgba)), rgba);
        }
        assert_eq!(PixelFormat::Bgra8.encode_pixel(rgba), [30, 20, 10, 40]);
        assert_eq!(PixelFormat::Argb8.encode_pixel(rgba), [40, 10, 20, 30]);
    }

    #[test]
    fn from_raw_parts_rejects_inconsistent_geometry() {
        let short_stride = PixelBuffer::from_raw_parts(4, 2, 8, PixelFormat::Bgra8, vec![0; 16]);
        assert!(matches!(short_stride, Err(UpscaleError::ConversionContextFailed(_))));

        let wrong_len = PixelBuffer::from_raw_parts(2, 2, 8, PixelFormat::Bgra8, vec![0; 15]);
        assert!(matches!(wrong_len, Err(UpscaleError::ConversionContextFailed(_))));

        let ok = PixelBuffer::from_raw_parts(2, 2, 12, PixelFormat::Bgra8, vec![0; 24])
            .expect("padded buffer should be accepted");
        assert_eq!(ok.row(1).len(), 8);
    }

    #[test]
    fn feature_map_keys_are_sorted() {
        let mut map = FeatureMap::new();
        map.insert("zeta", PixelBuffer::packed(1, 1, PixelFormat::Rgba8, vec![0; 4]).unwrap());
        map.insert("alpha", PixelBuffer::packed(1, 1, PixelFormat::Rgba8, vec![0; 4]).unwrap());

        assert_eq!(map.keys(), vec!["alpha".to_string(), "zeta".to_string()]);
        assert!(map.contains_key("zeta"));
        assert_eq!(map.len(), 2);
    }
}
