//! 核心功能模块
//!
//! 本模块提供了与图形后端无关的基础功能：配置、错误处理、日志、
//! 输入事件、计时器和帧率统计。
//!
//! # 模块组织
//!
//! - `config`：配置管理，支持从配置文件和命令行加载设置
//! - `error`：错误处理，定义统一的错误类型
//! - `log`：日志系统，基于 tracing 的结构化日志
//! - `event`：鼠标、键盘和窗口尺寸事件
//! - `input`：按键和鼠标按钮的当前状态
//! - `timer`：可暂停的帧计时器
//! - `stats`：每秒一次的帧率统计

pub mod config;
pub mod error;
pub mod event;
pub mod input;
pub mod log;
pub mod stats;
pub mod timer;

// 重新导出常用类型，方便使用
pub use config::{Config, GraphicsBackend, SceneKind};
pub use error::{ConfigError, DistRenderError, GraphicsError, Result};
pub use event::{
    InputEvent, KeyCode, KeyboardEvent, MouseButton, MouseButtonEvent, MouseButtons,
    MouseMoveEvent, WindowResizeEvent,
};
pub use input::InputSystem;
pub use stats::FrameStats;
pub use timer::{Clock, ManualClock, SystemClock, Timer, TimerState};
