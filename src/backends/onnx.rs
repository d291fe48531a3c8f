//! # ONNX Runtime 推理后端
//!
//! 加载 `.onnx` 模型，模型声明的输入/输出名即特征键。
//! 每次 `predict` 把唯一的输入缓冲转换为 NCHW 张量，运行后将每个 `f32` 输出转换回缓冲。

use std::borrow::Cow;
use std::path::Path;

use ort::session::{Session, SessionInputs};
use ort::value::TensorRef;

use super::tensor::{buffer_to_nchw, nchw_to_buffer};
use crate::upscale::{ChannelLayout, FeatureMap, InferenceBackend, UpscaleError};

pub struct OnnxBackend {
    session: Session,
    layout: ChannelLayout,
    input_names: Vec<String>,
    output_names: Vec<String>,
}

impl OnnxBackend {
    pub fn load(path: &Path, layout: ChannelLayout) -> Result<Self, UpscaleError> {
        let session = Session::builder()
            .and_then(|builder| builder.commit_from_file(path))
            .map_err(|e| UpscaleError::ModelLoadFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let input_names = session.inputs().iter().map(|i| i.name().to_string()).collect();
        let output_names = session.outputs().iter().map(|o| o.name().to_string()).collect();

        log::debug!(
            "🧩 ONNX 模型签名 - 输入: {:?} 输出: {:?} 布局: {}",
            input_names,
            output_names,
            layout.as_str()
        );

        Ok(Self {
            session,
            layout,
            input_names,
            output_names,
        })
    }
}

impl InferenceBackend for OnnxBackend {
    fn name(&self) -> &str {
        "onnxruntime"
    }

    fn declared_input_keys(&self) -> Vec<String> {
        self.input_names.clone()
    }

    fn declared_output_keys(&self) -> Vec<String> {
        self.output_names.clone()
    }

    fn predict(&mut self, mut inputs: FeatureMap) -> Result<FeatureMap, UpscaleError> {
        let key = match inputs.keys().as_slice() {
            [only] => only.clone(),
            keys => {
                return Err(UpscaleError::InferenceFailed(format!(
                    "ONNX 后端只支持单个输入，收到：{:?}",
                    keys
                )));
            }
        };
        let source = inputs
            .remove(&key)
            .ok_or_else(|| UpscaleError::InferenceFailed(format!("缺少输入 '{}'", key)))?;

        let order = self.layout.model_order();
        let (dims, data) = buffer_to_nchw(&source, order);
        let tensor = TensorRef::from_array_view((dims, data.as_slice()))
            .map_err(|e| UpscaleError::InferenceFailed(format!("创建输入张量失败：{}", e)))?;

        let ort_inputs: SessionInputs<'_, '_, 0> =
            SessionInputs::ValueMap(vec![(Cow::Borrowed(key.as_str()), tensor.into())]);
        let outputs = self
            .session
            .run(ort_inputs)
            .map_err(|e| UpscaleError::InferenceFailed(format!("ONNX 推理失败：{}", e)))?;

        let mut features = FeatureMap::new();
        for name in &self.output_names {
            let Some(value) = outputs.get(name.as_str()) else {
                continue;
            };
            let Ok((shape, samples)) = value.try_extract_tensor::<f32>() else {
                log::debug!("跳过非 f32 输出：{}", name);
                continue;
            };

            let shape: Vec<i64> = shape.iter().copied().collect();
            let format = self.layout.buffer_format();
            let buffer = nchw_to_buffer(&shape, samples, order, format, &source)?;
            features.insert(name.clone(), buffer);
        }

        Ok(features)
    }
}
