//! # 单图超分工具：命令行入口
//!
//! 本文件仅负责参数解析、日志初始化与退出码。
//! 业务逻辑分布在各子模块中，详见 `lib.rs` 架构文档。

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use simple_image_sr::backends;
use simple_image_sr::error::AppError;
use simple_image_sr::model_path::resolve_model_path;
use simple_image_sr::report::{self, ReportContext};
use simple_image_sr::upscale::{
    ChannelLayout, EngineKeys, InferenceEngine, UpscaleConfig, UpscaleHandler,
};

#[derive(Parser, Debug)]
#[command(
    name = "simple-image-sr",
    version,
    about = "使用预训练超分模型放大单张图片",
    after_help = concat!(
        "示例:\n",
        "  simple-image-sr --input in.jpg --output out.png\n",
        "  simple-image-sr -i in.png -o out.png --model RealESRGAN_x4plus.onnx --hist-dir hist",
    )
)]
struct Cli {
    /// 输入图片（PNG/JPEG 等常见格式）。
    #[arg(short = 'i', long = "input")]
    input: PathBuf,

    /// 输出 PNG 路径，父目录必须已存在。
    #[arg(short = 'o', long = "output")]
    output: PathBuf,

    /// 模型路径，默认为可执行文件同目录的 RealESRGAN_x4plus.onnx。
    #[arg(short = 'm', long = "model")]
    model: Option<PathBuf>,

    /// 像素缓冲字节顺序（同时决定模型通道顺序）。
    #[arg(long = "layout", value_enum, default_value_t = LayoutArg::Bgra)]
    layout: LayoutArg,

    /// 模型输入特征名。
    #[arg(long = "input-key")]
    input_key: Option<String>,

    /// 指定模型输出特征名，跳过自动识别。
    #[arg(long = "output-key")]
    output_key: Option<String>,

    /// 写出 histogram.json 的目录。
    #[arg(long = "hist-dir")]
    hist_dir: Option<PathBuf>,

    /// 解码像素上限（默认不限）。
    #[arg(long = "max-pixels")]
    max_pixels: Option<u64>,

    /// 输入文件体积上限，单位字节（默认不限）。
    #[arg(long = "max-file-size")]
    max_file_size: Option<u64>,

    /// 输出调试日志。
    #[arg(short = 'v', long = "verbose", default_value_t = false)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LayoutArg {
    Bgra,
    Rgba,
    Argb,
}

impl LayoutArg {
    fn as_str(self) -> &'static str {
        match self {
            Self::Bgra => "bgra",
            Self::Rgba => "rgba",
            Self::Argb => "argb",
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("❌ 处理失败（阶段：{}）: {}", err.stage(), err);
            eprintln!("错误：[{}] {}", err.stage(), err);
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    let layout = ChannelLayout::from_str(cli.layout.as_str())?;

    let mut config = UpscaleConfig {
        channel_layout: layout,
        ..UpscaleConfig::default()
    };
    if let Some(max_pixels) = cli.max_pixels {
        config = config.with_max_pixels(max_pixels);
    }
    if let Some(max_file_size) = cli.max_file_size {
        config = config.with_max_file_size(max_file_size);
    }
    config.validate()?;

    let defaults = EngineKeys::default();
    let keys = EngineKeys {
        input_key: cli.input_key.unwrap_or(defaults.input_key),
        output_key_hint: defaults.output_key_hint,
        pinned_output_key: cli.output_key,
    };

    let model_path = resolve_model_path(cli.model)?;
    log::info!(
        "🚀 开始超分 - 输入: {} 输出: {} 模型: {} 布局: {}",
        cli.input.display(),
        cli.output.display(),
        model_path.display(),
        layout.as_str()
    );

    let mut engine = InferenceEngine::open(&model_path, keys, |path| {
        backends::load_default_backend(path, layout)
    })?;

    let handler = UpscaleHandler::new(config)?;
    let prepared = handler.prepare_file(&cli.input, &cli.output, &mut engine)?;

    // 报告先于输出写出，报告失败时不留下输出文件
    if let Some(dir) = cli.hist_dir {
        report::write_histogram_report(
            &dir,
            prepared.report(),
            ReportContext {
                model: &model_path,
                layout: layout.as_str(),
                input: &cli.input,
            },
        )?;
    }

    let result = prepared.commit()?;

    log::info!(
        "🎉 完成 - {}x{} -> {}x{} 已写入 {}",
        result.input_size.0,
        result.input_size.1,
        result.output_size.0,
        result.output_size.1,
        result.output_path.display()
    );

    Ok(())
}
