//! frame_pacing - 帧资源环与 CPU/GPU 同步
//!
//! CPU 最多领先 GPU N 帧：每一帧的常量和命令分配器放在帧资源环的一个槽位中，
//! 提交后用递增的 Fence 值标记槽位，复用槽位前等待 GPU 完成该值。
//! 图形后端通过 `gfx::backend` 中的 trait 抽象，默认使用软件后端，
//! 可选 wgpu 后端。
//!
//! # 模块结构
//!
//! - `core`: 核心功能模块（配置、日志、错误处理、事件、计时器、帧率统计）
//! - `math`: 向量、矩阵和左手坐标系的投影/观察矩阵
//! - `gfx`: 图形后端抽象层和具体后端
//! - `renderer`: 命令列表、Fence 同步、上传缓冲区和帧资源环
//! - `geometry`: 顶点、网格和程序化几何体
//! - `component`: 轨道相机
//! - `scene`: 演示场景
//! - `app`: 主循环和事件来源
//!
//! # 使用示例
//!
//! ```no_run
//! use frame_pacing::app::Application;
//! use frame_pacing::core::Config;
//!
//! let mut config = Config::default();
//! config.run.max_frames = 120;
//!
//! let mut app = Application::from_config(&config)?;
//! let summary = app.run()?;
//! println!("{} frames, last fence {}", summary.frames, summary.final_fence.value());
//! # Ok::<(), frame_pacing::core::DistRenderError>(())
//! ```

pub mod app;
pub mod component;
pub mod core;
pub mod geometry;
pub mod gfx;
pub mod math;
pub mod renderer;
pub mod scene;
