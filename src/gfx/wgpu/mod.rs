//! wgpu 图形后端（无窗口）
//!
//! 需要启用 `wgpu` feature。使用 wgpu 跨平台的设备和队列，
//! 以离屏纹理代替交换链。

pub mod context;
pub mod device;

pub use context::WgpuContext;
pub use device::WgpuDevice;
