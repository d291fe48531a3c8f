//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载超分链路中的所有错误来源，避免字符串拼接式错误处理。
//! 通过 `thiserror` 保持人类可读错误，同时让调用侧可按分支匹配。
//!
//! 每个阶段失败即返回，不做本地恢复或重试。唯一的“自愈”情况是首次推理时
//! 输出键不匹配，由引擎的键发现流程处理，不会以错误形式出现。

use std::path::PathBuf;

/// 超分流水线统一错误类型。
///
/// 该类型会在应用层被上转为 `AppError`，最终由命令行输出。
#[derive(Debug, thiserror::Error)]
pub enum UpscaleError {
    #[error("解码失败：{0}")]
    DecodeFailed(String),

    #[error("像素缓冲分配失败：{0}")]
    BufferAllocationFailed(String),

    #[error("像素拷贝上下文创建失败：{0}")]
    ConversionContextFailed(String),

    #[error("模型文件不存在：{}", .path.display())]
    ModelNotFound { path: PathBuf },

    #[error("模型加载失败：{}（{}）", .path.display(), .reason)]
    ModelLoadFailed { path: PathBuf, reason: String },

    #[error("推理后端未就绪：{0}")]
    BackendNotReady(String),

    #[error("推理后端不可用：{0}")]
    BackendUnavailable(String),

    #[error("推理失败：{0}")]
    InferenceFailed(String),

    #[error("推理输出中缺少键 '{key}'（可用：{}）", .available.join(", "))]
    OutputKeyMissing { key: String, available: Vec<String> },

    #[error("编码失败：{0}")]
    EncodeFailed(String),

    #[error("写入失败：{}（{}）", .path.display(), .reason)]
    WriteFailed { path: PathBuf, reason: String },

    #[error("资源限制：{0}")]
    ResourceLimit(String),

    #[error("配置无效：{0}")]
    InvalidConfig(String),
}

impl UpscaleError {
    /// 失败阶段名称，用于日志聚合与命令行提示。
    pub fn stage(&self) -> &'static str {
        match self {
            Self::DecodeFailed(_) | Self::ResourceLimit(_) => "decode",
            Self::BufferAllocationFailed(_) | Self::ConversionContextFailed(_) => "convert",
            Self::ModelNotFound { .. }
            | Self::ModelLoadFailed { .. }
            | Self::BackendNotReady(_)
            | Self::BackendUnavailable(_) => "model",
            Self::InferenceFailed(_) | Self::OutputKeyMissing { .. } => "infer",
            Self::EncodeFailed(_) | Self::WriteFailed { .. } => "encode",
            Self::InvalidConfig(_) => "config",
        }
    }
}
