//! # 超分处理模块（upscale）
//!
//! ## 设计思路
//!
//! 该模块将“解码 → 位图转缓冲 → 推理 → 缓冲转位图 → 编码写出”
//! 按转换边界拆分为多个子模块，每个子模块只负责一个边界。
//!
//! - `decoder`：文件 → 位图（签名校验 + 资源上限）
//! - `buffer`：位图 ⇄ 像素缓冲（通道布局 + 加锁拷贝）
//! - `engine`：推理后端抽象 + 输出键发现与缓存
//! - `encoder`：位图 → PNG 字节 → 文件
//! - `handler`：编排整条流水线
//! - `config/error/source/stats`：配置、错误、中间数据模型、输出统计
//!
//! ## 实现思路
//!
//! 模型被视为黑盒，通过 `InferenceBackend` trait 注入，
//! 因此整条流水线可以在没有真实模型的情况下用假后端测试。
//!
//! ## 新同事快速上手
//!
//! 可以按下面顺序理解调用链：
//!
//! ```text
//! main.rs（命令行参数）
//!    ↓
//! handler.rs（统一编排 + 阶段耗时日志）
//!    ├─ decoder.rs（读取 + 签名/像素限制 + 解码）
//!    ├─ buffer.rs（to_device：分配 → 加锁 → 按布局拷贝 → 解锁）
//!    ├─ engine.rs（FeatureMap 包装 → predict → 输出键解析）
//!    ├─ buffer.rs（from_device：按缓冲字节顺序还原 RGBA）
//!    └─ encoder.rs（PNG 编码 + 原子写出）
//!    ↓
//! 返回 UpscaleReport / UpscaleError
//! ```
//!
//! ## 分层职责建议
//!
//! - 通道顺序问题（颜色反转）优先看 `config.rs` 与 `buffer.rs`
//! - 模型输出键问题优先看 `engine.rs`
//! - 流程顺序变更优先改 `handler.rs`

mod buffer;
mod config;
mod decoder;
mod encoder;
mod engine;
mod error;
mod handler;
mod source;
mod stats;

pub use buffer::{BufferConverter, BufferLock};
pub use config::{ChannelLayout, ChannelOrder, EngineKeys, UpscaleConfig};
pub use decoder::ImageDecoder;
pub use encoder::ImageEncoder;
pub use engine::{InferenceBackend, InferenceEngine, OutputKeyState};
pub use error::UpscaleError;
pub use handler::{PreparedOutput, StageTimings, UpscaleHandler, UpscaleReport};
pub use source::{Bitmap, FeatureMap, PixelBuffer, PixelFormat, BYTES_PER_PIXEL};
pub use stats::{ChannelStats, Histogram, OutputStats};
