//! # 像素缓冲转换模块
//!
//! ## 设计思路
//!
//! 负责 `Bitmap` 与推理后端 `PixelBuffer` 之间的双向转换：
//! - 入方向（to-device）：按固定布局分配缓冲 → 加锁 → 按通道顺序重排拷贝 → 解锁
//! - 出方向（from-device）：按缓冲自身声明的字节顺序读出，还原为标准 RGBA
//!
//! 通道顺序是跨组件约定，入/出两个方向必须对称遵守，否则颜色会静默反转。
//!
//! ## 实现思路
//!
//! - 缓冲写锁使用 RAII 守卫 `BufferLock`：构造即加锁，`Drop` 必然解锁。
//!   任何提前返回（包括拷贝上下文构建失败）都会在错误向上传播前释放锁。
//! - 分配使用 `try_reserve_exact`，平台拒绝分配时返回 `BufferAllocationFailed`。
//! - 拷贝上下文 `CopyContext` 在加锁后校验几何信息，失败返回 `ConversionContextFailed`。

use image::{Rgba, RgbaImage};

use super::config::{ChannelLayout, UpscaleConfig};
use super::source::{Bitmap, PixelBuffer, PixelFormat, BYTES_PER_PIXEL};
use super::UpscaleError;

/// 像素缓冲写锁。
///
/// 持有期间可写入缓冲内存，离开作用域时自动解锁。
pub struct BufferLock<'a> {
    buffer: &'a mut PixelBuffer,
}

impl<'a> BufferLock<'a> {
    fn acquire(buffer: &'a mut PixelBuffer) -> Result<Self, UpscaleError> {
        if buffer.locked {
            return Err(UpscaleError::ConversionContextFailed(
                "像素缓冲已处于锁定状态".to_string(),
            ));
        }

        buffer.locked = true;
        buffer.lock_count += 1;
        log::trace!("🔒 像素缓冲加锁 - {}x{}", buffer.width, buffer.height);

        Ok(Self { buffer })
    }

    pub fn width(&self) -> u32 {
        self.buffer.width
    }

    pub fn height(&self) -> u32 {
        self.buffer.height
    }

    pub fn stride(&self) -> usize {
        self.buffer.stride
    }

    pub fn format(&self) -> PixelFormat {
        self.buffer.format
    }

    /// 可写的整块缓冲内存（含行尾填充）。
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.buffer.data
    }
}

impl Drop for BufferLock<'_> {
    fn drop(&mut self) {
        self.buffer.locked = false;
        self.buffer.unlock_count += 1;
        log::trace!("🔓 像素缓冲解锁 - {}x{}", self.buffer.width, self.buffer.height);
    }
}

impl PixelBuffer {
    /// 获取独占写锁。
    ///
    /// 同一时刻只能存在一个写锁；若之前的守卫被 `mem::forget`，这里会失败。
    pub fn lock(&mut self) -> Result<BufferLock<'_>, UpscaleError> {
        BufferLock::acquire(self)
    }
}

/// 拷贝上下文：校验位图与缓冲几何一致后，执行逐行重排拷贝。
struct CopyContext {
    width: usize,
    height: usize,
    stride: usize,
    format: PixelFormat,
}

impl CopyContext {
    fn new(
        bitmap: &Bitmap,
        lock: &BufferLock<'_>,
        layout: &ChannelLayout,
    ) -> Result<Self, UpscaleError> {
        if bitmap.width() != lock.width() || bitmap.height() != lock.height() {
            return Err(UpscaleError::ConversionContextFailed(format!(
                "位图 {}x{} 与缓冲 {}x{} 尺寸不一致",
                bitmap.width(),
                bitmap.height(),
                lock.width(),
                lock.height()
            )));
        }

        if lock.format() != layout.buffer_format() {
            return Err(UpscaleError::ConversionContextFailed(format!(
                "缓冲格式 {} 与布局约定 {} 不一致",
                lock.format().as_str(),
                layout.as_str()
            )));
        }

        let width = bitmap.width() as usize;
        let height = bitmap.height() as usize;
        let row_bytes = width * BYTES_PER_PIXEL;
        if lock.stride() < row_bytes || lock.stride() % BYTES_PER_PIXEL != 0 {
            return Err(UpscaleError::ConversionContextFailed(format!(
                "不支持的行跨度：{}（行宽 {}）",
                lock.stride(),
                row_bytes
            )));
        }

        Ok(Self {
            width,
            height,
            stride: lock.stride(),
            format: lock.format(),
        })
    }

    /// `src` 为紧凑 RGBA，`dst` 为带行跨度的目标缓冲。
    fn copy(&self, src: &[u8], dst: &mut [u8]) {
        let row_bytes = self.width * BYTES_PER_PIXEL;
        let offsets = self.format.component_offsets();

        for y in 0..self.height {
            let src_row = &src[y * row_bytes..(y + 1) * row_bytes];
            let dst_row = &mut dst[y * self.stride..y * self.stride + row_bytes];

            for (s, d) in src_row
                .chunks_exact(BYTES_PER_PIXEL)
                .zip(dst_row.chunks_exact_mut(BYTES_PER_PIXEL))
            {
                d[offsets[0]] = s[0];
                d[offsets[1]] = s[1];
                d[offsets[2]] = s[2];
                d[offsets[3]] = s[3];
            }
        }
    }
}

/// 位图与像素缓冲之间的转换器。
#[derive(Debug, Clone)]
pub struct BufferConverter {
    layout: ChannelLayout,
    row_alignment: usize,
}

impl BufferConverter {
    pub fn new(config: &UpscaleConfig) -> Self {
        Self::with_layout(config.channel_layout, config.row_alignment)
    }

    pub fn with_layout(layout: ChannelLayout, row_alignment: usize) -> Self {
        Self {
            layout,
            row_alignment,
        }
    }

    pub fn layout(&self) -> ChannelLayout {
        self.layout
    }

    /// 分配缓冲并将位图像素按布局写入。
    ///
    /// 失败时缓冲在错误返回前已解锁并释放。
    pub fn to_device_buffer(&self, bitmap: &Bitmap) -> Result<PixelBuffer, UpscaleError> {
        let mut buffer = self.allocate(bitmap.width(), bitmap.height())?;
        self.fill_locked(&mut buffer, bitmap)?;

        log::debug!(
            "🧱 像素缓冲已就绪 - {}x{} stride={} format={}",
            buffer.width(),
            buffer.height(),
            buffer.stride(),
            buffer.format().as_str()
        );

        Ok(buffer)
    }

    /// 按缓冲声明的字节顺序读出，生成标准 RGBA 位图（不缩放）。
    pub fn from_device_buffer(buffer: &PixelBuffer) -> Bitmap {
        let format = buffer.format();
        let image = RgbaImage::from_fn(buffer.width(), buffer.height(), |x, y| {
            Rgba(format.decode_pixel(buffer.pixel_bytes(x, y)))
        });
        Bitmap::from_valid_image(image)
    }

    /// 按平台固定格式分配缓冲，行尾按 `row_alignment` 对齐。
    fn allocate(&self, width: u32, height: u32) -> Result<PixelBuffer, UpscaleError> {
        if width == 0 || height == 0 {
            return Err(UpscaleError::BufferAllocationFailed(format!(
                "无法分配 {}x{} 的缓冲",
                width, height
            )));
        }

        let stride = (width as usize)
            .checked_mul(BYTES_PER_PIXEL)
            .and_then(|row| row.checked_next_multiple_of(self.row_alignment))
            .ok_or_else(|| {
                UpscaleError::BufferAllocationFailed(format!(
                    "行跨度计算溢出（width={} alignment={}）",
                    width, self.row_alignment
                ))
            })?;

        let total = stride.checked_mul(height as usize).ok_or_else(|| {
            UpscaleError::BufferAllocationFailed(format!("缓冲大小溢出（{}x{}）", width, height))
        })?;

        let mut data = Vec::new();
        data.try_reserve_exact(total).map_err(|e| {
            UpscaleError::BufferAllocationFailed(format!(
                "申请 {:.2} MB 失败：{}",
                total as f64 / 1024.0 / 1024.0,
                e
            ))
        })?;
        data.resize(total, 0);

        PixelBuffer::from_raw_parts(width, height, stride, self.layout.buffer_format(), data)
            .map_err(|e| UpscaleError::BufferAllocationFailed(e.to_string()))
    }

    /// 在写锁保护下把位图拷入缓冲。
    fn fill_locked(&self, buffer: &mut PixelBuffer, bitmap: &Bitmap) -> Result<(), UpscaleError> {
        let mut lock = buffer.lock()?;
        let context = CopyContext::new(bitmap, &lock, &self.layout)?;
        context.copy(bitmap.as_image().as_raw(), lock.bytes_mut());
        Ok(())
    }
}
