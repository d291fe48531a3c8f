//! 直方图报告
//!
//! `--hist-dir` 指定时，把输出图像的 RGB 直方图与统计写成 `histogram.json`，
//! 便于离线比对不同模型/布局的输出分布。目录不存在时自动创建。

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;

use crate::error::AppError;
use crate::upscale::{Histogram, OutputStats, UpscaleReport};

/// 报告文件名。
pub const HISTOGRAM_FILE: &str = "histogram.json";

#[derive(Debug, Serialize)]
struct HistogramReport<'a> {
    created_at: String,
    model: String,
    layout: &'a str,
    input: String,
    output: String,
    input_size: [u32; 2],
    output_size: [u32; 2],
    stats: &'a OutputStats,
    histogram: &'a Histogram,
}

/// 报告中除图像数据之外的上下文信息。
#[derive(Debug, Clone, Copy)]
pub struct ReportContext<'a> {
    pub model: &'a Path,
    pub layout: &'a str,
    pub input: &'a Path,
}

/// 写出直方图报告，返回报告文件路径。
pub fn write_histogram_report(
    dir: &Path,
    report: &UpscaleReport,
    context: ReportContext<'_>,
) -> Result<PathBuf, AppError> {
    fs::create_dir_all(dir)
        .map_err(|e| AppError::Report(format!("创建报告目录失败 {}: {}", dir.display(), e)))?;

    let payload = HistogramReport {
        created_at: Local::now().to_rfc3339(),
        model: context.model.display().to_string(),
        layout: context.layout,
        input: context.input.display().to_string(),
        output: report.output_path.display().to_string(),
        input_size: [report.input_size.0, report.input_size.1],
        output_size: [report.output_size.0, report.output_size.1],
        stats: &report.stats,
        histogram: &report.histogram,
    };

    let content = serde_json::to_string_pretty(&payload)
        .map_err(|e| AppError::Report(format!("序列化报告失败: {}", e)))?;

    let path = dir.join(HISTOGRAM_FILE);
    fs::write(&path, content)?;

    log::info!("📈 直方图报告已写出 - 路径: {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upscale::{Bitmap, StageTimings};
    use image::Rgba;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn sample_report() -> UpscaleReport {
        let bitmap =
            Bitmap::from_fn(2, 2, |x, _| Rgba([x as u8 * 200, 5, 9, 255])).expect("bitmap");
        UpscaleReport {
            output_path: PathBuf::from("out.png"),
            input_size: (1, 1),
            output_size: (2, 2),
            stats: OutputStats::from_bitmap(&bitmap),
            histogram: Histogram::from_bitmap(&bitmap),
            timings: StageTimings::default(),
        }
    }

    #[test]
    fn writes_json_into_new_directory() {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let dir = std::env::temp_dir()
            .join(format!("simple_image_sr_report_{}_{}", std::process::id(), nanos))
            .join("nested");

        let path = write_histogram_report(
            &dir,
            &sample_report(),
            ReportContext {
                model: Path::new("model.onnx"),
                layout: "bgra",
                input: Path::new("in.png"),
            },
        )
        .expect("report should be written");

        assert_eq!(path, dir.join(HISTOGRAM_FILE));
        let text = fs::read_to_string(&path).expect("read report");
        let value: serde_json::Value = serde_json::from_str(&text).expect("valid json");
        assert_eq!(value["layout"], "bgra");
        assert_eq!(value["output_size"], serde_json::json!([2, 2]));
        assert_eq!(value["histogram"]["red"][200], 2);
        assert_eq!(value["histogram"]["green"][5], 4);
        assert_eq!(value["stats"]["red"]["max"], 200);
        assert!(value["created_at"].as_str().is_some());
    }
}
