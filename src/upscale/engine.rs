//! # 推理引擎模块
//!
//! ## 设计思路
//!
//! 模型本身被视为黑盒，通过 `InferenceBackend` trait 抽象：
//! 生产实现绑定平台推理运行时，测试实现为确定性的假后端。
//!
//! `InferenceEngine` 持有已加载的后端，负责：
//! 1. 构造时校验模型路径可解析、后端声明了所需的输入/输出特征
//! 2. 将像素缓冲包装为单条目特征集合并同步调用后端
//! 3. 解析并缓存“哪个输出键承载结果图像”
//!
//! ## 输出键状态机
//!
//! - `Unresolved`：输出键仍为初始猜测值（默认 `output_image`）
//! - `Resolved`：输出键已被替换为后端声明的实际输出键
//!
//! 键的选择只发生在第一次推理：猜测键存在就沿用猜测键，缺失才执行发现流程。
//! 第一次调用之后（无论沿用猜测键、发现成功还是发现失败）不再探测，
//! 之后的调用只按既定键取值，缺失即 `OutputKeyMissing`。`output_key` 是实例字段而非全局状态，
//! 引擎不做内部同步：多张图片需顺序通过同一实例，或每个线程各持一个实例。

use std::path::{Path, PathBuf};
use std::time::Instant;

use super::config::EngineKeys;
use super::source::{FeatureMap, PixelBuffer};
use super::UpscaleError;

/// 不透明推理后端。
pub trait InferenceBackend {
    /// 后端名称（日志用）。
    fn name(&self) -> &str {
        "backend"
    }

    /// 模型声明的输入特征名。
    fn declared_input_keys(&self) -> Vec<String>;

    /// 模型声明的输出特征名，按后端枚举顺序返回。
    fn declared_output_keys(&self) -> Vec<String>;

    /// 同步执行一次推理。
    fn predict(&mut self, inputs: FeatureMap) -> Result<FeatureMap, UpscaleError>;
}

/// 输出键解析状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKeyState {
    Unresolved,
    Resolved,
}

/// 推理引擎。
pub struct InferenceEngine<B> {
    backend: B,
    model_path: PathBuf,
    input_key: String,
    output_key: String,
    key_state: OutputKeyState,
    /// 第一次推理已决定输出键。
    key_settled: bool,
}

impl<B: InferenceBackend> InferenceEngine<B> {
    /// 校验模型路径后通过 `loader` 加载后端。
    ///
    /// 路径不存在时返回 `ModelNotFound`，此时不会调用 `loader`。
    pub fn open<F>(
        model_path: impl AsRef<Path>,
        keys: EngineKeys,
        loader: F,
    ) -> Result<Self, UpscaleError>
    where
        F: FnOnce(&Path) -> Result<B, UpscaleError>,
    {
        let path = model_path.as_ref();
        if !path.exists() {
            return Err(UpscaleError::ModelNotFound {
                path: path.to_path_buf(),
            });
        }

        log::info!("📦 开始加载模型 - 路径: {}", path.display());
        let load_start = Instant::now();
        let backend = loader(path)?;
        log::info!(
            "✅ 模型加载完成 - 后端: {} 耗时: {}ms",
            backend.name(),
            load_start.elapsed().as_millis()
        );

        Self::from_backend(backend, path, keys)
    }

    /// 直接包装已加载的后端，并校验其就绪状态。
    pub fn from_backend(
        backend: B,
        model_path: impl Into<PathBuf>,
        keys: EngineKeys,
    ) -> Result<Self, UpscaleError> {
        let declared_inputs = backend.declared_input_keys();
        if !declared_inputs.iter().any(|k| *k == keys.input_key) {
            return Err(UpscaleError::BackendNotReady(format!(
                "模型未声明输入 '{}'（已声明：{}）",
                keys.input_key,
                declared_inputs.join(", ")
            )));
        }

        let declared_outputs = backend.declared_output_keys();
        if declared_outputs.is_empty() {
            return Err(UpscaleError::BackendNotReady("模型未声明任何输出".to_string()));
        }

        let (output_key, key_state) = match keys.pinned_output_key {
            Some(pinned) => {
                if !declared_outputs.contains(&pinned) {
                    return Err(UpscaleError::BackendNotReady(format!(
                        "指定的输出 '{}' 不在模型声明中（已声明：{}）",
                        pinned,
                        declared_outputs.join(", ")
                    )));
                }
                (pinned, OutputKeyState::Resolved)
            }
            None => (keys.output_key_hint, OutputKeyState::Unresolved),
        };

        Ok(Self {
            backend,
            model_path: model_path.into(),
            input_key: keys.input_key,
            output_key,
            key_state,
            key_settled: key_state == OutputKeyState::Resolved,
        })
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn input_key(&self) -> &str {
        &self.input_key
    }

    /// 当前输出键（`Unresolved` 时为猜测值）。
    pub fn output_key(&self) -> &str {
        &self.output_key
    }

    pub fn key_state(&self) -> OutputKeyState {
        self.key_state
    }

    /// 输出键是否已由第一次推理（或显式指定）确定。
    pub fn is_key_settled(&self) -> bool {
        self.key_settled
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// 执行一次推理，返回结果缓冲。
    ///
    /// 解析后的键下没有特征时返回 `OutputKeyMissing`，不会返回部分结果。
    /// 后端 `predict` 失败不算作第一次调用，下次仍会决定输出键。
    pub fn process(&mut self, buffer: PixelBuffer) -> Result<PixelBuffer, UpscaleError> {
        let (width, height) = (buffer.width(), buffer.height());
        let inputs = FeatureMap::single(self.input_key.clone(), buffer);

        let infer_start = Instant::now();
        let mut outputs = self.backend.predict(inputs)?;
        log::info!(
            "⚡ 推理完成 - 后端: {} 输入: {}x{} 耗时: {}ms",
            self.backend.name(),
            width,
            height,
            infer_start.elapsed().as_millis()
        );

        let key = self.resolve_output_key(&outputs)?;
        outputs
            .remove(&key)
            .ok_or_else(|| UpscaleError::OutputKeyMissing {
                key,
                available: outputs.keys(),
            })
    }

    fn resolve_output_key(&mut self, outputs: &FeatureMap) -> Result<String, UpscaleError> {
        if self.key_settled {
            return Ok(self.output_key.clone());
        }
        self.key_settled = true;

        if outputs.contains_key(&self.output_key) {
            log::debug!("🔑 使用预设输出键：{}", self.output_key);
            return Ok(self.output_key.clone());
        }

        let discovered = self.discover_output_key(outputs)?;
        self.output_key = discovered;
        self.key_state = OutputKeyState::Resolved;
        Ok(self.output_key.clone())
    }

    /// 从后端声明的输出中选出实际存在的第一个。
    ///
    /// 声明了多个候选时按枚举顺序取第一个，并记录告警。
    fn discover_output_key(&self, outputs: &FeatureMap) -> Result<String, UpscaleError> {
        let declared = self.backend.declared_output_keys();
        let candidates: Vec<&String> =
            declared.iter().filter(|k| outputs.contains_key(k)).collect();

        match candidates.as_slice() {
            [] => Err(UpscaleError::OutputKeyMissing {
                key: self.output_key.clone(),
                available: outputs.keys(),
            }),
            [only] => {
                log::info!("🔎 输出键自动识别：{} -> {}", self.output_key, only);
                Ok((*only).clone())
            }
            [first, ..] => {
                log::warn!(
                    "⚠️ 模型存在多个候选输出 {:?}，按声明顺序采用：{}",
                    candidates,
                    first
                );
                Ok((*first).clone())
            }
        }
    }
}
