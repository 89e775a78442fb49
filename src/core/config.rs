//! 配置管理模块
//!
//! 提供引擎配置的加载、解析和管理功能。
//! 支持从 TOML 配置文件加载，也支持命令行参数覆盖。
//!
//! # 配置文件格式 (config.toml)
//!
//! ```toml
//! [window]
//! width = 800
//! height = 600
//! title = "frame_pacing"
//!
//! [graphics]
//! backend = "soft"          # 或 "wgpu"
//! frame_resources = 3       # 在途帧数量
//! gpu_latency_ms = 4        # 软件后端每个命令列表的模拟执行时间
//! fence_timeout_ms = 0      # 0 表示无限等待
//! strict_validation = false
//!
//! [scene]
//! kind = "shapes"           # init, box, shapes, overlay
//!
//! [run]
//! max_frames = 600
//!
//! [logging]
//! level = "info"            # trace, debug, info, warn, error
//! file_output = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::error::{ConfigError, Result};

/// 允许的最大在途帧数量
pub const MAX_FRAME_RESOURCES: usize = 16;

/// 引擎配置
///
/// 包含了运行所需的所有配置项。
/// 可以从配置文件加载，也可以通过代码构建。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// 窗口配置
    #[serde(default)]
    pub window: WindowConfig,

    /// 图形配置
    #[serde(default)]
    pub graphics: GraphicsConfig,

    /// 场景选择
    #[serde(default)]
    pub scene: SceneConfig,

    /// 主循环配置
    #[serde(default)]
    pub run: RunConfig,

    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 窗口配置（客户区尺寸）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// 窗口宽度
    #[serde(default = "default_width")]
    pub width: u32,

    /// 窗口高度
    #[serde(default = "default_height")]
    pub height: u32,

    /// 窗口标题
    #[serde(default = "default_title")]
    pub title: String,
}

/// 图形配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphicsConfig {
    /// 图形后端选择
    #[serde(default = "default_backend")]
    pub backend: GraphicsBackend,

    /// 帧资源环的大小
    #[serde(default = "default_frame_resources")]
    pub frame_resources: usize,

    /// 软件后端执行一个命令列表所需的模拟时间（毫秒）
    #[serde(default = "default_gpu_latency")]
    pub gpu_latency_ms: u64,

    /// Fence 等待超时（毫秒），0 表示无限等待
    #[serde(default = "default_fence_timeout")]
    pub fence_timeout_ms: u64,

    /// 检测到 CPU 覆盖在途数据时直接返回错误
    #[serde(default)]
    pub strict_validation: bool,
}

/// 图形后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphicsBackend {
    /// 软件后端（工作线程模拟 GPU）
    Soft,
    /// wgpu 后端（需要 `wgpu` feature）
    Wgpu,
}

/// 演示场景类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SceneKind {
    /// 只清屏
    Init,
    /// 彩色立方体
    Box,
    /// 多帧资源的几何体场景
    Shapes,
    /// 立方体 + 统计面板
    Overlay,
}

/// 场景配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneConfig {
    /// 启动时选择的场景
    #[serde(default = "default_scene")]
    pub kind: SceneKind,
}

/// 主循环配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// 运行的最大帧数，0 表示直到收到退出事件
    #[serde(default = "default_max_frames")]
    pub max_frames: u64,

    /// 是否使用脚本化输入驱动相机
    #[serde(default = "default_scripted_input")]
    pub scripted_input: bool,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// 是否输出到文件
    #[serde(default = "default_file_output")]
    pub file_output: bool,

    /// 日志文件路径
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

// 默认值函数
fn default_width() -> u32 { 800 }
fn default_height() -> u32 { 600 }
fn default_title() -> String { "frame_pacing".to_string() }
fn default_backend() -> GraphicsBackend { GraphicsBackend::Soft }
fn default_frame_resources() -> usize { 3 }
fn default_gpu_latency() -> u64 { 4 }
fn default_fence_timeout() -> u64 { 0 }
fn default_scene() -> SceneKind { SceneKind::Shapes }
fn default_max_frames() -> u64 { 600 }
fn default_scripted_input() -> bool { true }
fn default_log_level() -> LogLevel { LogLevel::Info }
fn default_file_output() -> bool { false }
fn default_log_file() -> String { "frame_pacing.log".to_string() }

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            title: default_title(),
        }
    }
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            frame_resources: default_frame_resources(),
            gpu_latency_ms: default_gpu_latency(),
            fence_timeout_ms: default_fence_timeout(),
            strict_validation: false,
        }
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self { kind: default_scene() }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_frames: default_max_frames(),
            scripted_input: default_scripted_input(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_output: default_file_output(),
            log_file: default_log_file(),
        }
    }
}

impl Config {
    /// 从配置文件加载
    ///
    /// # 参数
    ///
    /// * `path` - 配置文件路径
    ///
    /// # 返回值
    ///
    /// 成功返回 `Config` 实例，失败返回错误
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let contents = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path_str.clone()))?;

        Self::from_toml_str(&contents)
    }

    /// 从 TOML 字符串解析
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()).into())
    }

    /// 从配置文件加载，如果文件不存在或无法解析则使用默认配置
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::from_file(path).unwrap_or_default()
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// 从命令行参数覆盖配置
    ///
    /// 支持的参数：
    /// - `--backend <soft|wgpu>` / `--wgpu`: 选择图形后端
    /// - `--scene <init|box|shapes|overlay>`: 选择演示场景
    /// - `--frames <n>`: 帧资源环大小
    /// - `--max-frames <n>`: 运行帧数
    /// - `--gpu-latency-ms <n>`: 软件后端模拟延迟
    /// - `--strict`: 开启严格校验
    /// - `--width <value>` / `--height <value>`: 窗口尺寸
    ///
    /// 无法解析的值会被忽略，保留原配置。
    pub fn apply_args<I>(&mut self, args: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|s| s.as_ref().to_string()).collect();
        let value_of = |flag: &str| flag_value(&args, flag);

        if args.iter().any(|a| a == "--wgpu") {
            self.graphics.backend = GraphicsBackend::Wgpu;
        }
        if let Some(backend) = value_of("--backend").and_then(GraphicsBackend::parse) {
            self.graphics.backend = backend;
        }
        if let Some(kind) = value_of("--scene").and_then(SceneKind::parse) {
            self.scene.kind = kind;
        }
        if let Some(frames) = value_of("--frames").and_then(|s| s.parse().ok()) {
            self.graphics.frame_resources = frames;
        }
        if let Some(max_frames) = value_of("--max-frames").and_then(|s| s.parse().ok()) {
            self.run.max_frames = max_frames;
        }
        if let Some(latency) = value_of("--gpu-latency-ms").and_then(|s| s.parse().ok()) {
            self.graphics.gpu_latency_ms = latency;
        }
        if args.iter().any(|a| a == "--strict") {
            self.graphics.strict_validation = true;
        }
        if let Some(width) = value_of("--width").and_then(|s| s.parse().ok()) {
            self.window.width = width;
        }
        if let Some(height) = value_of("--height").and_then(|s| s.parse().ok()) {
            self.window.height = height;
        }
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::InvalidValue {
                field: "window.width/height".to_string(),
                reason: "Window dimensions must be greater than 0".to_string(),
            }.into());
        }

        if self.graphics.frame_resources == 0 || self.graphics.frame_resources > MAX_FRAME_RESOURCES {
            return Err(ConfigError::InvalidValue {
                field: "graphics.frame_resources".to_string(),
                reason: format!("Frame resource count must be in 1..={}", MAX_FRAME_RESOURCES),
            }.into());
        }

        Ok(())
    }

    /// Fence 等待超时，`None` 表示无限等待
    pub fn fence_timeout(&self) -> Option<Duration> {
        match self.graphics.fence_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}

/// 取得 `flag` 之后的参数值
fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|idx| args.get(idx + 1))
        .map(|s| s.as_str())
}

impl GraphicsBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "soft" | "software" => Some(GraphicsBackend::Soft),
            "wgpu" => Some(GraphicsBackend::Wgpu),
            _ => None,
        }
    }

    /// 获取后端名称
    pub fn name(&self) -> &'static str {
        match self {
            GraphicsBackend::Soft => "Software",
            GraphicsBackend::Wgpu => "wgpu",
        }
    }
}

impl SceneKind {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "init" => Some(SceneKind::Init),
            "box" => Some(SceneKind::Box),
            "shapes" => Some(SceneKind::Shapes),
            "overlay" | "imgui" => Some(SceneKind::Overlay),
            _ => None,
        }
    }

    /// 场景名称
    pub fn name(&self) -> &'static str {
        match self {
            SceneKind::Init => "init",
            SceneKind::Box => "box",
            SceneKind::Shapes => "shapes",
            SceneKind::Overlay => "overlay",
        }
    }
}
