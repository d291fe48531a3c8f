//! # 输出统计模块
//!
//! 推理结果的逐通道 min/max/mean 与 256 档直方图，用于诊断模型输出是否正常
//! （例如全黑、范围被截断、通道顺序颠倒时 R/B 均值异常）。

use serde::Serialize;

use super::source::Bitmap;

/// 单通道统计。
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChannelStats {
    pub min: u8,
    pub max: u8,
    pub mean: f64,
}

/// RGB 三通道统计。alpha 不参与。
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OutputStats {
    pub width: u32,
    pub height: u32,
    pub red: ChannelStats,
    pub green: ChannelStats,
    pub blue: ChannelStats,
}

/// RGB 三通道 256 档直方图。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Histogram {
    pub red: Vec<u64>,
    pub green: Vec<u64>,
    pub blue: Vec<u64>,
}

impl Histogram {
    pub fn from_bitmap(bitmap: &Bitmap) -> Self {
        let mut bins = [[0u64; 256]; 3];
        for pixel in bitmap.as_image().pixels() {
            for (channel, bin) in bins.iter_mut().enumerate() {
                bin[pixel.0[channel] as usize] += 1;
            }
        }

        let [red, green, blue] = bins;
        Self {
            red: red.to_vec(),
            green: green.to_vec(),
            blue: blue.to_vec(),
        }
    }
}

impl OutputStats {
    pub fn from_bitmap(bitmap: &Bitmap) -> Self {
        let mut min = [u8::MAX; 3];
        let mut max = [u8::MIN; 3];
        let mut sum = [0u64; 3];

        for pixel in bitmap.as_image().pixels() {
            for channel in 0..3 {
                let value = pixel.0[channel];
                min[channel] = min[channel].min(value);
                max[channel] = max[channel].max(value);
                sum[channel] += value as u64;
            }
        }

        let count = (bitmap.width() as u64 * bitmap.height() as u64) as f64;
        let channel = |i: usize| ChannelStats {
            min: min[i],
            max: max[i],
            mean: sum[i] as f64 / count,
        };

        Self {
            width: bitmap.width(),
            height: bitmap.height(),
            red: channel(0),
            green: channel(1),
            blue: channel(2),
        }
    }

    /// 输出是否为单一纯色（常见于模型未正常工作）。
    pub fn is_flat(&self) -> bool {
        [self.red, self.green, self.blue]
            .iter()
            .all(|c| c.min == c.max)
    }

    pub fn log(&self) {
        log::info!(
            "📊 输出统计 - {}x{} R[{}..{} 均值 {:.1}] G[{}..{} 均值 {:.1}] B[{}..{} 均值 {:.1}]",
            self.width,
            self.height,
            self.red.min,
            self.red.max,
            self.red.mean,
            self.green.min,
            self.green.max,
            self.green.mean,
            self.blue.min,
            self.blue.max,
            self.blue.mean
        );

        if self.is_flat() {
            log::warn!("⚠️ 输出图像为单一纯色，请检查模型与通道布局是否匹配");
        }
    }
}
