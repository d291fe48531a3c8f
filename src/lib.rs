//! # 单图超分工具：库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │              命令行 (clap) · main.rs                      │
//! │   --input / --output / --model / --layout / --hist-dir    │
//! └───────┬──────────────────────────────────────────────────┘
//!         ↓ Result<(), AppError>
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↓            库 (Rust)                             │
//! │                                                          │
//! │  ┌─ error ────── AppError (统一错误类型)                  │
//! │  │                                                       │
//! │  ├─ model_path ─ 默认模型路径（可执行文件同目录）         │
//! │  │                                                       │
//! │  ├─ upscale ──── 解码 → 缓冲 → 推理 → 缓冲 → 编码          │
//! │  │   ├─ buffer   BufferLock (RAII) + 通道布局拷贝         │
//! │  │   └─ engine   InferenceBackend trait + 输出键发现      │
//! │  │                                                       │
//! │  ├─ backends ─── ONNX Runtime 后端（feature = "onnx"）    │
//! │  └─ report ───── 直方图 JSON 报告                         │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError`，命令行入口的返回类型 |
//! | [`upscale`] | 超分流水线核心：位图/像素缓冲/推理引擎/编解码 |
//! | [`backends`] | 生产推理后端与张量换算 |
//! | [`model_path`] | 默认模型路径解析 |
//! | [`report`] | 输出直方图报告写出 |

pub mod backends;
pub mod error;
pub mod model_path;
pub mod report;
pub mod upscale;
