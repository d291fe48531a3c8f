//! # 核心编排模块
//!
//! ## 设计思路
//!
//! `UpscaleHandler` 只负责流程编排，不持有推理后端。
//! 处理链路固定为：
//! 1. 解码输入文件为位图
//! 2. 位图 → 像素缓冲（按通道布局）
//! 3. 推理引擎处理
//! 4. 像素缓冲 → 位图
//! 5. 统计输出并编码写出
//!
//! ## 实现思路
//!
//! - 引擎由调用方持有并以 `&mut` 传入，同一实例可顺序处理多张图片，
//!   已解析的输出键在调用之间保留。
//! - 任一阶段失败立即返回，不写出任何文件。
//! - `prepare_file` 只做到编码，`PreparedOutput::commit` 才写盘，
//!   调用方可以把其它可能失败的步骤放在两者之间。
//! - 记录 `decode/to_device/infer/from_device/encode/total` 阶段耗时，便于性能诊断。

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use super::buffer::BufferConverter;
use super::config::UpscaleConfig;
use super::decoder::ImageDecoder;
use super::encoder::ImageEncoder;
use super::engine::{InferenceBackend, InferenceEngine};
use super::source::Bitmap;
use super::stats::{Histogram, OutputStats};
use super::UpscaleError;

/// 各阶段耗时。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageTimings {
    pub decode: Duration,
    pub to_device: Duration,
    pub infer: Duration,
    pub from_device: Duration,
    pub encode: Duration,
    pub total: Duration,
}

/// 单张图片的处理结果摘要。
#[derive(Debug, Clone)]
pub struct UpscaleReport {
    pub output_path: PathBuf,
    pub input_size: (u32, u32),
    pub output_size: (u32, u32),
    pub stats: OutputStats,
    pub histogram: Histogram,
    pub timings: StageTimings,
}

/// 已编码、尚未写出的结果。
pub struct PreparedOutput {
    bytes: Vec<u8>,
    report: UpscaleReport,
}

impl PreparedOutput {
    /// 写出前即可获得的处理摘要（`encode/total` 暂不含写盘耗时）。
    pub fn report(&self) -> &UpscaleReport {
        &self.report
    }

    /// 写出到目标路径并返回最终摘要。
    pub fn commit(self) -> Result<UpscaleReport, UpscaleError> {
        let Self { bytes, mut report } = self;

        let write_start = Instant::now();
        ImageEncoder::write(&bytes, &report.output_path)?;
        let write_elapsed = write_start.elapsed();
        report.timings.encode += write_elapsed;
        report.timings.total += write_elapsed;

        let timings = &report.timings;
        log::info!(
            "✅ 超分处理完成 - decode={}ms to_device={}ms infer={}ms from_device={}ms encode={}ms total={}ms",
            timings.decode.as_millis(),
            timings.to_device.as_millis(),
            timings.infer.as_millis(),
            timings.from_device.as_millis(),
            timings.encode.as_millis(),
            timings.total.as_millis()
        );

        Ok(report)
    }
}

/// 超分处理器。
pub struct UpscaleHandler {
    config: UpscaleConfig,
    decoder: ImageDecoder,
    converter: BufferConverter,
}

impl UpscaleHandler {
    /// 校验配置后创建处理器。
    ///
    /// # 示例
    /// ```rust,ignore
    /// use simple_image_sr::upscale::{UpscaleConfig, UpscaleHandler};
    ///
    /// let handler = UpscaleHandler::new(UpscaleConfig::default())?;
    /// let report = handler.process_file("in.png".as_ref(), "out.png".as_ref(), &mut engine)?;
    /// # Ok::<(), simple_image_sr::upscale::UpscaleError>(())
    /// ```
    pub fn new(config: UpscaleConfig) -> Result<Self, UpscaleError> {
        config.validate()?;
        Ok(Self {
            decoder: ImageDecoder::new(&config),
            converter: BufferConverter::new(&config),
            config,
        })
    }

    pub fn config(&self) -> &UpscaleConfig {
        &self.config
    }

    /// 处理主入口：读取 `input`，推理后写出到 `output`。
    pub fn process_file<B: InferenceBackend>(
        &self,
        input: &Path,
        output: &Path,
        engine: &mut InferenceEngine<B>,
    ) -> Result<UpscaleReport, UpscaleError> {
        self.prepare_file(input, output, engine)?.commit()
    }

    /// 执行到编码为止，不触碰 `output`。
    ///
    /// 调用方可以在写出前完成其它可能失败的步骤（例如生成报告），
    /// 全部成功后再 [`PreparedOutput::commit`]，失败时不会留下输出文件。
    pub fn prepare_file<B: InferenceBackend>(
        &self,
        input: &Path,
        output: &Path,
        engine: &mut InferenceEngine<B>,
    ) -> Result<PreparedOutput, UpscaleError> {
        let total_start = Instant::now();
        let mut timings = StageTimings::default();

        let decode_start = Instant::now();
        let bitmap = self.decoder.decode(input)?;
        timings.decode = decode_start.elapsed();

        let upscaled = self.upscale_bitmap(&bitmap, engine, &mut timings)?;

        let stats = OutputStats::from_bitmap(&upscaled);
        stats.log();
        let histogram = Histogram::from_bitmap(&upscaled);

        let encode_start = Instant::now();
        let bytes = ImageEncoder::encode(&upscaled)?;
        timings.encode = encode_start.elapsed();
        timings.total = total_start.elapsed();

        Ok(PreparedOutput {
            bytes,
            report: UpscaleReport {
                output_path: output.to_path_buf(),
                input_size: (bitmap.width(), bitmap.height()),
                output_size: (upscaled.width(), upscaled.height()),
                stats,
                histogram,
                timings,
            },
        })
    }

    /// 内存中的单次推理：位图 → 缓冲 → 引擎 → 缓冲 → 位图。
    pub fn upscale<B: InferenceBackend>(
        &self,
        bitmap: &Bitmap,
        engine: &mut InferenceEngine<B>,
    ) -> Result<Bitmap, UpscaleError> {
        self.upscale_bitmap(bitmap, engine, &mut StageTimings::default())
    }

    fn upscale_bitmap<B: InferenceBackend>(
        &self,
        bitmap: &Bitmap,
        engine: &mut InferenceEngine<B>,
        timings: &mut StageTimings,
    ) -> Result<Bitmap, UpscaleError> {
        let convert_start = Instant::now();
        let buffer = self.converter.to_device_buffer(bitmap)?;
        timings.to_device = convert_start.elapsed();

        let infer_start = Instant::now();
        let output = engine.process(buffer)?;
        timings.infer = infer_start.elapsed();

        let convert_start = Instant::now();
        let upscaled = BufferConverter::from_device_buffer(&output);
        timings.from_device = convert_start.elapsed();

        log::info!(
            "🔁 推理结果已转换 - {}x{} -> {}x{}（布局：{}）",
            bitmap.width(),
            bitmap.height(),
            upscaled.width(),
            upscaled.height(),
            self.converter.layout().as_str()
        );

        Ok(upscaled)
    }
}
