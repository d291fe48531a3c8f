//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到 `UpscaleConfig`，保证运行时行为可观测、可测试。
//! 其中通道布局（`ChannelLayout`）是跨组件的约定，而不是每次调用临时决定：
//! 缓冲字节顺序与模型训练时的通道顺序必须在配置里就一致，运行时不做探测。
//!
//! ## 实现思路
//!
//! - `Default` 提供生产可用配置（BGRA 缓冲 + BGR 模型，所有平台都能分配）。
//! - `ChannelLayout::from_str` / `as_str` 负责字符串解析与反向输出（供命令行使用）。
//! - `validate` 在流水线启动前集中校验参数范围。

use super::source::PixelFormat;
use super::UpscaleError;

/// 模型训练时使用的颜色通道顺序。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelOrder {
    Rgb,
    Bgr,
}

impl ChannelOrder {
    /// `[R, G, B]` 在模型输入平面中的位置。
    ///
    /// 例如 BGR 模型的第 0 个平面是蓝色，因此 R 位于平面 2。
    pub fn plane_of_component(self) -> [usize; 3] {
        match self {
            Self::Rgb => [0, 1, 2],
            Self::Bgr => [2, 1, 0],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rgb => "rgb",
            Self::Bgr => "bgr",
        }
    }
}

/// 缓冲字节顺序与模型通道顺序之间的固定约定。
///
/// 只能通过 [`ChannelLayout::new`] 或预设构造，二者不一致时构造失败。
/// 模型侧的顺序在模型准备阶段就已对齐，这里直接信任。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelLayout {
    buffer_format: PixelFormat,
    model_order: ChannelOrder,
}

impl ChannelLayout {
    pub fn new(
        buffer_format: PixelFormat,
        model_order: ChannelOrder,
    ) -> Result<Self, UpscaleError> {
        if buffer_format.channel_order() != model_order {
            return Err(UpscaleError::InvalidConfig(format!(
                "通道布局不一致：缓冲为 {}，模型为 {}",
                buffer_format.as_str(),
                model_order.as_str()
            )));
        }
        Ok(Self {
            buffer_format,
            model_order,
        })
    }

    /// 平台默认布局：BGRA 缓冲 + BGR 模型。
    ///
    /// 部分硬件/驱动无法分配 RGBA 缓冲，BGRA 在所有受支持主机上都能分配。
    pub fn platform_default() -> Self {
        Self {
            buffer_format: PixelFormat::Bgra8,
            model_order: ChannelOrder::Bgr,
        }
    }

    /// 从外部字符串解析布局（`bgra` / `rgba` / `argb`）。
    ///
    /// # 示例
    /// ```rust
    /// use simple_image_sr::upscale::ChannelLayout;
    ///
    /// let layout = ChannelLayout::from_str("rgba")?;
    /// assert_eq!(layout.as_str(), "rgba");
    /// # Ok::<(), simple_image_sr::upscale::UpscaleError>(())
    /// ```
    pub fn from_str(layout: &str) -> Result<Self, UpscaleError> {
        let format = match layout.trim().to_lowercase().as_str() {
            "bgra" => PixelFormat::Bgra8,
            "rgba" => PixelFormat::Rgba8,
            "argb" => PixelFormat::Argb8,
            other => {
                return Err(UpscaleError::InvalidConfig(format!(
                    "未知通道布局：{}（可选：bgra / rgba / argb）",
                    other
                )));
            }
        };
        Self::new(format, format.channel_order())
    }

    pub fn as_str(&self) -> &'static str {
        self.buffer_format.as_str()
    }

    pub fn buffer_format(&self) -> PixelFormat {
        self.buffer_format
    }

    pub fn model_order(&self) -> ChannelOrder {
        self.model_order
    }
}

impl Default for ChannelLayout {
    fn default() -> Self {
        Self::platform_default()
    }
}

/// 超分流水线配置。
///
/// 字段覆盖了读取、解码与像素缓冲分配三个阶段。
/// 资源上限默认关闭（`None`），输入可以是任意分辨率；需要保护时由调用方显式开启。
#[derive(Debug, Clone)]
pub struct UpscaleConfig {
    /// 读取原始字节时允许的最大文件体积（字节）。
    pub max_file_size: Option<u64>,
    /// 解码后的像素上限（`width * height`）。
    pub max_decoded_pixels: Option<u64>,
    /// 解码阶段允许的预计内存上限（按 RGBA 估算，字节）。
    pub max_decoded_bytes: Option<u64>,
    /// 缓冲字节顺序与模型通道顺序的约定。
    pub channel_layout: ChannelLayout,
    /// 像素缓冲每行的对齐字节数。
    pub row_alignment: usize,
}

impl Default for UpscaleConfig {
    fn default() -> Self {
        Self {
            max_file_size: None,
            max_decoded_pixels: None,
            max_decoded_bytes: None,
            channel_layout: ChannelLayout::platform_default(),
            row_alignment: 64,
        }
    }
}

impl UpscaleConfig {
    /// 开启像素上限，同时按 RGBA 估算开启解码内存上限。
    pub fn with_max_pixels(mut self, max_pixels: u64) -> Self {
        self.max_decoded_pixels = Some(max_pixels);
        self.max_decoded_bytes = Some(max_pixels.saturating_mul(4));
        self
    }

    /// 开启输入文件体积上限。
    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = Some(max_file_size);
        self
    }

    /// 集中校验参数范围。
    pub fn validate(&self) -> Result<(), UpscaleError> {
        if self.max_file_size == Some(0) {
            return Err(UpscaleError::InvalidConfig("max_file_size 不能为 0".to_string()));
        }
        if self.max_decoded_pixels == Some(0) {
            return Err(UpscaleError::InvalidConfig("max_decoded_pixels 不能为 0".to_string()));
        }
        if self.max_decoded_bytes.is_some_and(|bytes| bytes < 4) {
            return Err(UpscaleError::InvalidConfig("max_decoded_bytes 不能小于 4".to_string()));
        }
        if self.row_alignment == 0 || self.row_alignment % 4 != 0 {
            return Err(UpscaleError::InvalidConfig(format!(
                "row_alignment 必须是 4 的正整数倍（当前：{}）",
                self.row_alignment
            )));
        }
        Ok(())
    }
}

/// 推理引擎使用的特征键。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineKeys {
    /// 输入特征键，构造后固定。
    pub input_key: String,
    /// 输出键的初始猜测值。
    pub output_key_hint: String,
    /// 显式指定的输出键；设置后跳过键发现。
    pub pinned_output_key: Option<String>,
}

impl Default for EngineKeys {
    fn default() -> Self {
        Self {
            input_key: "input_image".to_string(),
            output_key_hint: "output_image".to_string(),
            pinned_output_key: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_parses_known_names() {
        assert_eq!(
            ChannelLayout::from_str(" BGRA ").expect("bgra").buffer_format(),
            PixelFormat::Bgra8
        );
        assert_eq!(
            ChannelLayout::from_str("argb").expect("argb").model_order(),
            ChannelOrder::Rgb
        );
        assert!(matches!(
            ChannelLayout::from_str("yuv"),
            Err(UpscaleError::InvalidConfig(_))
        ));
    }

    #[test]
    fn layout_rejects_mismatched_model_order() {
        let result = ChannelLayout::new(PixelFormat::Bgra8, ChannelOrder::Rgb);
        assert!(matches!(result, Err(UpscaleError::InvalidConfig(_))));
    }

    #[test]
    fn default_layout_is_bgra_for_bgr_model() {
        let layout = ChannelLayout::default();
        assert_eq!(layout.buffer_format(), PixelFormat::Bgra8);
        assert_eq!(layout.model_order(), ChannelOrder::Bgr);
        assert_eq!(ChannelOrder::Bgr.plane_of_component(), [2, 1, 0]);
    }

    #[test]
    fn validate_rejects_unaligned_rows() {
        let mut config = UpscaleConfig::default();
        config.validate().expect("default config should be valid");

        config.row_alignment = 6;
        assert!(matches!(config.validate(), Err(UpscaleError::InvalidConfig(_))));

        config.row_alignment = 0;
        assert!(matches!(config.validate(), Err(UpscaleError::InvalidConfig(_))));
    }

    #[test]
    fn limits_are_off_by_default() {
        let config = UpscaleConfig::default();

        assert_eq!(config.max_file_size, None);
        assert_eq!(config.max_decoded_pixels, None);
        assert_eq!(config.max_decoded_bytes, None);
    }

    #[test]
    fn max_pixels_enables_matching_memory_limit() {
        let config = UpscaleConfig::default()
            .with_max_pixels(1_000)
            .with_max_file_size(2_048);

        assert_eq!(config.max_decoded_pixels, Some(1_000));
        assert_eq!(config.max_decoded_bytes, Some(4_000));
        assert_eq!(config.max_file_size, Some(2_048));
        config.validate().expect("limits should be valid");
    }

    #[test]
    fn zero_limits_are_rejected() {
        let config = UpscaleConfig::default().with_max_pixels(0);
        assert!(matches!(config.validate(), Err(UpscaleError::InvalidConfig(_))));

        let config = UpscaleConfig::default().with_max_file_size(0);
        assert!(matches!(config.validate(), Err(UpscaleError::InvalidConfig(_))));
    }
}
