//! # 推理后端
//!
//! ## 设计思路
//!
//! 生产后端绑定 ONNX Runtime，放在 `onnx` feature 之后：
//! 不开启时二进制仍可构建，只是打开模型时返回 `BackendUnavailable`。
//! 两种情况对外都通过 [`DefaultBackend`] 与 [`load_default_backend`] 暴露，调用侧无需 `cfg`。

use std::path::Path;

use crate::upscale::{ChannelLayout, UpscaleError};
#[cfg(not(feature = "onnx"))]
use crate::upscale::{FeatureMap, InferenceBackend};

#[cfg(feature = "onnx")]
mod onnx;
pub mod tensor;

#[cfg(feature = "onnx")]
pub use onnx::OnnxBackend;

#[cfg(feature = "onnx")]
pub type DefaultBackend = OnnxBackend;

#[cfg(not(feature = "onnx"))]
pub type DefaultBackend = UnavailableBackend;

/// 加载当前构建可用的生产后端。
#[cfg(feature = "onnx")]
pub fn load_default_backend(
    path: &Path,
    layout: ChannelLayout,
) -> Result<DefaultBackend, UpscaleError> {
    OnnxBackend::load(path, layout)
}

/// 加载当前构建可用的生产后端。
#[cfg(not(feature = "onnx"))]
pub fn load_default_backend(
    path: &Path,
    layout: ChannelLayout,
) -> Result<DefaultBackend, UpscaleError> {
    log::debug!(
        "未启用 onnx feature，无法加载 {}（布局：{}）",
        path.display(),
        layout.as_str()
    );
    Err(UpscaleError::BackendUnavailable(
        "当前构建未启用 ONNX Runtime，请使用 `--features onnx` 重新构建".to_string(),
    ))
}

/// 未启用任何运行时时的占位后端，不可能被构造。
#[cfg(not(feature = "onnx"))]
pub enum UnavailableBackend {}

#[cfg(not(feature = "onnx"))]
impl InferenceBackend for UnavailableBackend {
    fn declared_input_keys(&self) -> Vec<String> {
        match *self {}
    }

    fn declared_output_keys(&self) -> Vec<String> {
        match *self {}
    }

    fn predict(&mut self, _inputs: FeatureMap) -> Result<FeatureMap, UpscaleError> {
        match *self {}
    }
}

#[cfg(all(test, not(feature = "onnx")))]
mod tests {
    use super::*;

    #[test]
    fn loading_without_runtime_is_unavailable() {
        let result =
            load_default_backend(Path::new("model.onnx"), ChannelLayout::platform_default());

        assert!(matches!(result, Err(UpscaleError::BackendUnavailable(_))));
    }
}
