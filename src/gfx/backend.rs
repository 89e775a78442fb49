//! 图形后端的统一抽象接口
//!
//! 本模块定义了所有图形后端必须实现的边界：设备、命令队列、Fence、
//! 命令分配器和持久映射的上传缓冲区。上层的帧资源环和场景只依赖这些 trait，
//! 可以在不同的后端之间切换，而不需要修改渲染逻辑。
//!
//! 每个 GPU 资源都由唯一的记录以 `Box<dyn ...>` 独占持有，随记录一起释放。

use std::fmt;
use std::sync::Arc;

use crate::core::error::Result;
use crate::renderer::command::{CommandList, PipelineDesc, PipelineHandle};
use crate::renderer::resource::BufferDescriptor;
use crate::renderer::sync::{FenceEvent, FenceValue};

/// 后端状态码（HRESULT 风格，最高位为 1 表示失败）
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(pub u32);

impl StatusCode {
    pub const S_OK: StatusCode = StatusCode(0x0000_0000);
    pub const E_FAIL: StatusCode = StatusCode(0x8000_4005);
    pub const E_INVALIDARG: StatusCode = StatusCode(0x8007_0057);
    pub const DXGI_ERROR_DEVICE_REMOVED: StatusCode = StatusCode(0x887A_0005);
    pub const WAIT_TIMEOUT: StatusCode = StatusCode(0x0000_0102);

    /// 是否为失败状态
    pub fn is_failure(self) -> bool {
        self.0 & 0x8000_0000 != 0
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

impl fmt::Debug for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StatusCode(0x{:08X})", self.0)
    }
}

/// 上传缓冲区标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u64);

/// 命令分配器标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AllocatorId(pub u64);

/// 持久映射的上传缓冲区
///
/// 创建后一直保持映射；CPU 只写，GPU 只读。
/// 写入 GPU 仍在使用的区域是调用者的错误，由帧资源环的等待来避免。
pub trait MappedBuffer: Send {
    /// 缓冲区标识，命令中通过它引用缓冲区
    fn id(&self) -> BufferId;

    /// 缓冲区字节大小
    fn size(&self) -> u64;

    /// 在 `offset` 处写入字节
    fn write(&mut self, offset: u64, bytes: &[u8]) -> Result<()>;
}

/// 命令分配器
///
/// 命令列表记录的命令存放在分配器中。
/// 只有在 GPU 执行完这些命令后才能 reset。
pub trait CommandAllocator: Send {
    /// 分配器标识
    fn id(&self) -> AllocatorId;

    /// 重置分配器，回收命令内存
    fn reset(&mut self) -> Result<()>;
}

/// 命令队列
pub trait CommandQueue {
    /// 按顺序提交已关闭的命令列表
    fn execute_command_lists(&self, lists: &[&CommandList]) -> Result<()>;

    /// 在队列中插入 signal：之前提交的工作完成后，Fence 完成值变为 `value`
    fn signal(&self, value: FenceValue) -> Result<()>;

    /// 呈现当前后台缓冲区
    fn present(&self) -> Result<()>;
}

/// GPU Fence
pub trait Fence: Send + Sync {
    /// GPU 已完成的最大值
    fn completed_value(&self) -> FenceValue;

    /// 完成值达到 `value` 时置位 `event`（已达到则立即置位）
    fn set_event_on_completion(&self, value: FenceValue, event: Arc<FenceEvent>) -> Result<()>;

    /// 设备被移除时返回原因，此后完成值不会再前进
    fn device_removed_reason(&self) -> Option<StatusCode>;

    /// 完成回调是否需要等待方主动驱动
    fn requires_polling(&self) -> bool {
        false
    }

    /// 非阻塞地驱动一次后端，处理已到达的完成回调
    fn poll(&self) -> Result<()> {
        Ok(())
    }
}

/// 图形设备
///
/// # 示例
///
/// ```ignore
/// let device = gfx::create_device(&config)?;
/// let allocator = device.create_command_allocator()?;
/// let buffer = device.create_upload_buffer(&BufferDescriptor::new(
///     1024,
///     BufferUsageType::Constant,
/// ))?;
/// ```
pub trait GraphicsDevice {
    /// 后端名称，用于日志
    fn backend_name(&self) -> &str;

    /// 创建命令分配器
    fn create_command_allocator(&self) -> Result<Box<dyn CommandAllocator>>;

    /// 创建持久映射的上传缓冲区
    fn create_upload_buffer(&self, desc: &BufferDescriptor) -> Result<Box<dyn MappedBuffer>>;

    /// 创建管线状态对象，返回不透明句柄
    fn create_pipeline_state(&self, desc: &PipelineDesc) -> Result<PipelineHandle>;

    /// 直接命令队列
    fn queue(&self) -> &dyn CommandQueue;

    /// 与队列关联的 Fence
    fn fence(&self) -> Arc<dyn Fence>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{DistRenderError, GraphicsError};

    #[test]
    fn test_status_code_failure_bit() {
        assert!(!StatusCode::S_OK.is_failure());
        assert!(!StatusCode::WAIT_TIMEOUT.is_failure());
        assert!(StatusCode::E_FAIL.is_failure());
        assert!(StatusCode::DXGI_ERROR_DEVICE_REMOVED.is_failure());
    }

    #[test]
    fn test_status_code_display() {
        assert_eq!(StatusCode::E_INVALIDARG.to_string(), "0x80070057");
        assert_eq!(StatusCode::WAIT_TIMEOUT.to_string(), "0x00000102");

        let err: DistRenderError =
            GraphicsError::backend(StatusCode::E_INVALIDARG, "create buffer").into();
        assert_eq!(err.status(), Some(StatusCode::E_INVALIDARG));
    }
}
