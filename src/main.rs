//! frame_pacing 演示程序
//!
//! 无窗口运行选择的演示场景，由脚本化输入驱动相机和暂停。
//!
//! # 使用方法
//!
//! ```bash
//! # 使用配置文件
//! cargo run
//!
//! # 选择场景和帧资源数量（命令行覆盖）
//! cargo run -- --scene shapes --frames 3 --max-frames 600
//!
//! # 使用 wgpu 后端
//! cargo run --features wgpu -- --wgpu
//! ```
//!
//! # 架构概览
//!
//! ```text
//! ┌─────────────┐
//! │   main.rs   │  应用程序入口
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │ Application │  主循环、计时器、事件
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │    Scene    │  init / box / shapes / overlay
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │  Renderer   │  帧资源环、Fence、命令列表
//! └──────┬──────┘
//!        │
//!   ┌────┴────┐
//!   │         │
//! ┌─▼──┐   ┌──▼─┐
//! │Soft│   │wgpu│  具体后端实现
//! └────┘   └────┘
//! ```

use anyhow::Context;
use frame_pacing::app::Application;
use frame_pacing::core::{log, Config};
use tracing::info;

/// 应用程序入口点
///
/// # 初始化流程
///
/// 1. 加载配置文件（config.toml）
/// 2. 应用命令行参数覆盖
/// 3. 初始化日志系统
/// 4. 创建设备和场景
/// 5. 运行主循环
fn main() {
    // 1. 加载配置（在初始化日志之前）
    let mut config = Config::from_file_or_default("config.toml");

    // 2. 应用命令行参数
    config.apply_args(std::env::args());

    // 3. 验证配置
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    // 4. 初始化日志系统（使用配置中的设置）
    let log_file = if config.logging.file_output {
        Some(config.logging.log_file.as_str())
    } else {
        None
    };
    log::init_logger(config.logging.level, config.logging.file_output, log_file);
    info!("frame_pacing starting...");
    info!(version = env!("CARGO_PKG_VERSION"), "Application initialized");

    info!(
        backend = config.graphics.backend.name(),
        scene = config.scene.kind.name(),
        frame_resources = config.graphics.frame_resources,
        width = config.window.width,
        height = config.window.height,
        "Configuration"
    );

    if let Err(e) = run(&config) {
        frame_pacing::engine_error!("{:#}", e);
        eprintln!("Error: {:?}", e);
        std::process::exit(1);
    }
}

fn run(config: &Config) -> anyhow::Result<()> {
    let mut app = Application::from_config(config).context("Failed to initialize application")?;
    let summary = app.run().context("Main loop failed")?;

    info!(
        frames = summary.frames,
        iterations = summary.iterations,
        fence_value = summary.final_fence.value(),
        fps = summary.fps,
        "Shutting down"
    );
    Ok(())
}
