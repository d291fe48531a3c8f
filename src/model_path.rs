//! 模型路径解析
//!
//! 命令行未指定 `--model` 时，默认使用与可执行文件同目录的 `RealESRGAN_x4plus.onnx`。
//! 这里只负责“算出路径”，是否存在由推理引擎在构造时校验。

use std::path::{Path, PathBuf};

/// 默认模型文件名。
pub const DEFAULT_MODEL_FILE: &str = "RealESRGAN_x4plus.onnx";

/// 解析模型路径：显式指定优先，否则取可执行文件所在目录下的默认模型。
pub fn resolve_model_path(explicit: Option<PathBuf>) -> std::io::Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path),
        None => {
            let exe = std::env::current_exe()?;
            Ok(default_model_path_in(exe.parent().unwrap_or_else(|| Path::new("."))))
        }
    }
}

/// `dir` 下的默认模型路径。
pub fn default_model_path_in(dir: &Path) -> PathBuf {
    dir.join(DEFAULT_MODEL_FILE)
}
