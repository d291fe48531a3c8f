//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 库内各阶段返回 `UpscaleError`，应用层再包一层 `AppError`，
//! 承载流水线之外的 I/O 与报告错误。命令行入口只需处理这一种类型。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `UpscaleError` / `std::io::Error` 提供 `From` 转换，无需手动 map。

use crate::upscale::UpscaleError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 超分流水线错误（解码 / 转换 / 推理 / 编码）
    #[error("{0}")]
    Upscale(#[from] UpscaleError),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 直方图报告写出失败
    #[error("报告写出失败: {0}")]
    Report(String),
}

impl AppError {
    /// 出错阶段（命令行提示用）。
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Upscale(e) => e.stage(),
            Self::Io(_) => "io",
            Self::Report(_) => "report",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn upscale_error_keeps_its_message_and_stage() {
        let err: AppError = UpscaleError::ModelNotFound {
            path: PathBuf::from("/tmp/missing.onnx"),
        }
        .into();

        assert!(err.to_string().contains("/tmp/missing.onnx"));
        assert_eq!(err.stage(), "model");
    }

    #[test]
    fn io_error_converts() {
        let err: AppError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();

        assert_eq!(err.stage(), "io");
        assert!(err.to_string().contains("denied"));
    }
}
