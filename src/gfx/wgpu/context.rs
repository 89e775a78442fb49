//! wgpu 后端设备管理
//!
//! 本模块负责无窗口 wgpu 设备的初始化，包括：
//! - 创建 wgpu 实例
//! - 选择和创建图形适配器
//! - 创建逻辑设备和命令队列
//! - 创建离屏渲染目标（代替交换链的后台缓冲区）

use std::sync::Arc;

use tracing::{debug, info};

use crate::core::error::{GraphicsError, Result};

/// 离屏渲染目标格式
pub const RENDER_TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// wgpu 图形上下文
///
/// 封装了 wgpu 的核心设备和离屏渲染目标。
pub struct WgpuContext {
    /// wgpu 实例（入口点）
    pub instance: wgpu::Instance,
    /// 图形适配器（GPU）
    pub adapter: wgpu::Adapter,
    /// 逻辑设备
    pub device: Arc<wgpu::Device>,
    /// 命令队列
    pub queue: Arc<wgpu::Queue>,
    /// 离屏渲染目标
    pub render_target: Arc<wgpu::TextureView>,
}

impl WgpuContext {
    /// 创建无窗口的 wgpu 上下文
    ///
    /// # 参数
    ///
    /// * `width` - 渲染目标宽度
    /// * `height` - 渲染目标高度
    pub fn new(width: u32, height: u32) -> Result<Self> {
        info!("Initializing wgpu backend");

        // 1. 创建 wgpu 实例
        debug!("Creating wgpu instance");
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            dx12_shader_compiler: Default::default(),
            flags: wgpu::InstanceFlags::default(),
            gles_minor_version: wgpu::Gles3MinorVersion::Automatic,
        });

        // 2. 请求适配器（不需要兼容任何表面）
        debug!("Requesting adapter");
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| GraphicsError::DeviceCreation("Failed to find suitable adapter".to_string()))?;

        info!("Selected adapter: {:?}", adapter.get_info());

        // 3. 请求设备和队列
        debug!("Requesting device and queue");
        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Main Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
            },
            None,
        ))
        .map_err(|e| GraphicsError::DeviceCreation(format!("Failed to create device: {}", e)))?;

        // 4. 离屏渲染目标
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Back Buffer"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: RENDER_TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let render_target = texture.create_view(&wgpu::TextureViewDescriptor::default());

        info!("wgpu backend initialized successfully");

        Ok(Self {
            instance,
            adapter,
            device: Arc::new(device),
            queue: Arc::new(queue),
            render_target: Arc::new(render_target),
        })
    }
}
