//! 图形后端模块
//!
//! 本模块封装了不同图形后端的底层实现：
//! - 软件后端：工作线程模拟 GPU，总是可用
//! - wgpu：跨平台的高层图形抽象（需要 `wgpu` feature）
//!
//! 所有后端都实现 `backend` 中的 trait，
//! 帧资源环和场景可以在不同的后端之间无缝切换。

pub mod backend;
pub mod soft;
#[cfg(feature = "wgpu")]
pub mod wgpu;

use tracing::info;

use crate::core::config::{Config, GraphicsBackend};
use crate::core::error::Result;

pub use backend::{
    AllocatorId, BufferId, CommandAllocator, CommandQueue, Fence, GraphicsDevice, MappedBuffer,
    StatusCode,
};
pub use soft::{SoftDevice, SoftDeviceDesc, SoftMonitor};

/// 根据配置创建图形设备
pub fn create_device(config: &Config) -> Result<Box<dyn GraphicsDevice>> {
    match config.graphics.backend {
        GraphicsBackend::Soft => {
            info!("Initializing Software Backend");
            let device = SoftDevice::new(SoftDeviceDesc::from_config(&config.graphics))?;
            Ok(Box::new(device))
        }
        #[cfg(feature = "wgpu")]
        GraphicsBackend::Wgpu => {
            info!("Initializing wgpu Backend");
            let device = wgpu::WgpuDevice::new(config.window.width, config.window.height)?;
            Ok(Box::new(device))
        }
        #[cfg(not(feature = "wgpu"))]
        GraphicsBackend::Wgpu => Err(crate::core::error::DistRenderError::Initialization(
            "wgpu backend requires building with the `wgpu` feature".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_soft_device() {
        let mut config = Config::default();
        config.graphics.gpu_latency_ms = 0;
        let device = create_device(&config).unwrap();
        assert_eq!(device.backend_name(), "Software");
    }

    #[cfg(not(feature = "wgpu"))]
    #[test]
    fn test_wgpu_without_feature_fails() {
        let mut config = Config::default();
        config.graphics.backend = GraphicsBackend::Wgpu;
        assert!(create_device(&config).is_err());
    }
}
