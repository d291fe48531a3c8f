//! # 像素缓冲 ⇄ NCHW 张量
//!
//! ## 设计思路
//!
//! 推理运行时只认 `f32` 的 `[1, 3, H, W]` 张量，这里负责两个方向的换算，
//! 与具体运行时无关，因此不依赖 `onnx` feature，可以直接单测。
//!
//! ## 实现思路
//!
//! - 输入：按缓冲声明的字节顺序读出 RGB，乘 `1/255`，按模型通道顺序写入平面。
//! - 输出：若所有样本都不大于 1.0 视为 0~1 区间并乘 255，否则视为 0~255；
//!   最后四舍五入并截断到 `0..=255`。
//! - 模型不输出 alpha，结果 alpha 由输入 alpha 按最近邻映射到输出尺寸。

use crate::upscale::{ChannelOrder, PixelBuffer, PixelFormat, UpscaleError};

/// 平面数（RGB）。
pub const PLANES: usize = 3;

/// 将缓冲转换为 `[1, 3, H, W]` 的 `f32` 张量。
pub fn buffer_to_nchw(buffer: &PixelBuffer, order: ChannelOrder) -> (Vec<i64>, Vec<f32>) {
    let (width, height) = (buffer.width() as usize, buffer.height() as usize);
    let plane_len = width * height;
    let planes = order.plane_of_component();
    let format = buffer.format();

    let mut data = vec![0f32; PLANES * plane_len];
    for y in 0..height {
        for x in 0..width {
            let rgba = format.decode_pixel(buffer.pixel_bytes(x as u32, y as u32));
            let index = y * width + x;
            for component in 0..PLANES {
                data[planes[component] * plane_len + index] = rgba[component] as f32 / 255.0;
            }
        }
    }

    let dims = vec![1, PLANES as i64, height as i64, width as i64];
    (dims, data)
}

/// 输出样本换算到 0~255 的倍率。
pub fn output_scale(data: &[f32]) -> f32 {
    let max = data.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if max <= 1.0 { 255.0 } else { 1.0 }
}

/// 将 `[1, 3, H, W]` 输出张量转换回缓冲。
///
/// `alpha_source` 是本次推理的输入缓冲，结果 alpha 从中最近邻采样。
pub fn nchw_to_buffer(
    shape: &[i64],
    data: &[f32],
    order: ChannelOrder,
    format: PixelFormat,
    alpha_source: &PixelBuffer,
) -> Result<PixelBuffer, UpscaleError> {
    let (height, width) = match shape {
        [1, planes, h, w] if *planes == PLANES as i64 && *h > 0 && *w > 0 => {
            (*h as usize, *w as usize)
        }
        _ => {
            return Err(UpscaleError::InferenceFailed(format!(
                "输出张量形状不受支持：{:?}（期望 [1, 3, H, W]）",
                shape
            )));
        }
    };

    let plane_len = width * height;
    if data.len() != PLANES * plane_len {
        return Err(UpscaleError::InferenceFailed(format!(
            "输出张量长度异常：期望 {} 实际 {}",
            PLANES * plane_len,
            data.len()
        )));
    }

    let scale = output_scale(data);
    let planes = order.plane_of_component();
    let (src_width, src_height) = (alpha_source.width() as usize, alpha_source.height() as usize);
    let alpha_offset = alpha_source.format().component_offsets()[3];

    let mut bytes = Vec::with_capacity(plane_len * 4);
    for y in 0..height {
        let src_y = y * src_height / height;
        for x in 0..width {
            let src_x = x * src_width / width;
            let index = y * width + x;

            let mut rgba = [0u8; 4];
            for component in 0..PLANES {
                let value = data[planes[component] * plane_len + index] * scale;
                rgba[component] = value.round().clamp(0.0, 255.0) as u8;
            }
            rgba[3] = alpha_source.pixel_bytes(src_x as u32, src_y as u32)[alpha_offset];

            bytes.extend_from_slice(&format.encode_pixel(rgba));
        }
    }

    PixelBuffer::packed(width as u32, height as u32, format, bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bgra_buffer() -> PixelBuffer {
        // 2x1：(R=255,G=0,B=0,A=255) (R=0,G=51,B=102,A=10)
        PixelBuffer::packed(2, 1, PixelFormat::Bgra8, vec![0, 0, 255, 255, 102, 51, 0, 10])
            .expect("buffer")
    }

    #[test]
    fn bgr_model_gets_blue_in_first_plane() {
        let (dims, data) = buffer_to_nchw(&bgra_buffer(), ChannelOrder::Bgr);

        assert_eq!(dims, vec![1, 3, 1, 2]);
        // 平面 0 = B，平面 1 = G，平面 2 = R
        assert_eq!(data, vec![0.0, 0.4, 0.0, 0.2, 1.0, 0.0]);
    }

    #[test]
    fn rgb_model_gets_red_in_first_plane() {
        let (_, data) = buffer_to_nchw(&bgra_buffer(), ChannelOrder::Rgb);

        assert_eq!(data, vec![1.0, 0.0, 0.0, 0.2, 0.0, 0.4]);
    }

    #[test]
    fn unit_range_output_is_scaled_to_bytes() {
        let source = bgra_buffer();
        let (dims, data) = buffer_to_nchw(&source, ChannelOrder::Bgr);

        let buffer = nchw_to_buffer(&dims, &data, ChannelOrder::Bgr, PixelFormat::Bgra8, &source)
            .expect("convert back");

        assert_eq!(buffer.as_bytes(), source.as_bytes());
    }

    #[test]
    fn byte_range_output_is_clamped_not_scaled() {
        let source =
            PixelBuffer::packed(1, 1, PixelFormat::Rgba8, vec![0, 0, 0, 99]).expect("buffer");
        let data = [300.0, 12.4, -5.0];

        let buffer =
            nchw_to_buffer(&[1, 3, 1, 1], &data, ChannelOrder::Rgb, PixelFormat::Rgba8, &source)
                .expect("convert");

        assert_eq!(buffer.as_bytes(), &[255, 12, 0, 99]);
    }

    #[test]
    fn alpha_is_sampled_nearest_into_larger_output() {
        let source = bgra_buffer();
        let data = vec![0.5f32; 3 * 2 * 4];

        let buffer =
            nchw_to_buffer(&[1, 3, 2, 4], &data, ChannelOrder::Bgr, PixelFormat::Bgra8, &source)
                .expect("convert");

        assert_eq!((buffer.width(), buffer.height()), (4, 2));
        let alphas: Vec<u8> = (0..4).map(|x| buffer.pixel_bytes(x, 1)[3]).collect();
        assert_eq!(alphas, vec![255, 255, 10, 10]);
    }

    #[test]
    fn unexpected_shape_is_inference_failure() {
        let source = bgra_buffer();
        let result = nchw_to_buffer(
            &[1, 1, 2, 2],
            &[0.0; 4],
            ChannelOrder::Rgb,
            PixelFormat::Rgba8,
            &source,
        );

        assert!(matches!(result, Err(UpscaleError::InferenceFailed(_))));
    }
}
