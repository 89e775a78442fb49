//! 软件图形后端
//!
//! 用一个工作线程模拟 GPU，使帧资源环和 Fence 等待在没有显卡的环境中也真实生效。
//! 附带一个验证层，检测 CPU 覆写在途数据和过早 reset 分配器。
//!
//! - `device`：设备、队列、分配器、上传缓冲区
//! - `fence`：由 GPU 线程推进的 Fence
//! - `gpu`：工作线程和执行统计
//! - `validation`：在途提交跟踪

mod device;
mod fence;
mod gpu;
mod validation;

pub use device::{SoftDevice, SoftDeviceDesc, SoftMonitor};
pub use fence::SoftFence;
pub use gpu::GpuStats;
pub use validation::ValidationLayer;
