//! 软件设备
//!
//! 实现 `gfx::backend` 中的全部 trait。上传缓冲区是 CPU 内存，
//! 命令队列把任务发给 GPU 工作线程，Fence 由工作线程推进。

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::core::config::GraphicsConfig;
use crate::core::error::{GraphicsError, Result};
use crate::gfx::backend::{
    AllocatorId, BufferId, CommandAllocator, CommandQueue, Fence, GraphicsDevice, MappedBuffer,
    StatusCode,
};
use crate::gfx::soft::gpu::{spawn_worker, GpuJob, GpuShared, GpuStats};
use crate::gfx::soft::validation::ValidationLayer;
use crate::renderer::command::{Command, CommandBufferState, CommandList, PipelineDesc, PipelineHandle};
use crate::renderer::resource::BufferDescriptor;
use crate::renderer::sync::FenceValue;

/// 软件设备参数
#[derive(Debug, Clone, Copy)]
pub struct SoftDeviceDesc {
    /// 每个命令列表的模拟执行时间
    pub latency: Duration,
    /// 写入冲突时返回错误
    pub strict: bool,
}

impl Default for SoftDeviceDesc {
    fn default() -> Self {
        Self {
            latency: Duration::from_millis(4),
            strict: false,
        }
    }
}

impl SoftDeviceDesc {
    /// 从图形配置创建
    pub fn from_config(config: &GraphicsConfig) -> Self {
        Self {
            latency: Duration::from_millis(config.gpu_latency_ms),
            strict: config.strict_validation,
        }
    }
}

/// 软件上传缓冲区
struct SoftBuffer {
    id: BufferId,
    name: String,
    data: Vec<u8>,
    shared: Arc<GpuShared>,
}

impl MappedBuffer for SoftBuffer {
    fn id(&self) -> BufferId {
        self.id
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn write(&mut self, offset: u64, bytes: &[u8]) -> Result<()> {
        let end = offset.checked_add(bytes.len() as u64).unwrap_or(u64::MAX);
        if end > self.size() {
            return Err(GraphicsError::backend(
                StatusCode::E_INVALIDARG,
                format!(
                    "write [{}..{}) past the end of '{}' ({} bytes)",
                    offset,
                    end,
                    self.name,
                    self.size()
                ),
            ).into());
        }

        self.shared
            .validation
            .check_write(self.id, offset, bytes.len() as u64, &self.name)?;

        self.data[offset as usize..end as usize].copy_from_slice(bytes);
        Ok(())
    }
}

/// 软件命令分配器
struct SoftAllocator {
    id: AllocatorId,
    shared: Arc<GpuShared>,
}

impl CommandAllocator for SoftAllocator {
    fn id(&self) -> AllocatorId {
        self.id
    }

    fn reset(&mut self) -> Result<()> {
        self.shared.validation.check_allocator_reset(self.id)
    }
}

/// 软件命令队列
struct SoftQueue {
    jobs: Sender<GpuJob>,
    shared: Arc<GpuShared>,
    pipeline_count: Arc<AtomicU32>,
}

impl SoftQueue {
    fn check_device(&self, action: &str) -> Result<()> {
        match self.shared.fence.device_removed_reason() {
            Some(status) => Err(GraphicsError::backend(status, action).into()),
            None => Ok(()),
        }
    }

    fn send(&self, job: GpuJob) -> Result<()> {
        self.jobs.send(job).map_err(|_| {
            GraphicsError::backend(StatusCode::E_FAIL, "GPU thread is not running").into()
        })
    }

    fn validate_list(&self, list: &CommandList) -> Result<()> {
        if list.state() != CommandBufferState::Executable {
            return Err(GraphicsError::backend(
                StatusCode::E_INVALIDARG,
                format!("command list '{}' executed in state {:?}", list.name(), list.state()),
            ).into());
        }

        let pipelines = self.pipeline_count.load(Ordering::Relaxed);
        for command in list.commands() {
            if let Command::SetPipeline(handle) = command {
                if handle.0 >= pipelines {
                    return Err(GraphicsError::backend(
                        StatusCode::E_INVALIDARG,
                        format!("command list '{}' binds unknown pipeline {}", list.name(), handle.0),
                    ).into());
                }
            }
        }
        Ok(())
    }
}

impl CommandQueue for SoftQueue {
    fn execute_command_lists(&self, lists: &[&CommandList]) -> Result<()> {
        self.check_device("execute command lists")?;

        for list in lists {
            self.validate_list(list)?;
        }

        for list in lists {
            let submission = self.shared.validation.begin_submission(list);
            self.send(GpuJob::Execute {
                submission,
                commands: list.commands().len(),
                draws: list.draw_count(),
            })?;
        }
        Ok(())
    }

    fn signal(&self, value: FenceValue) -> Result<()> {
        self.check_device("signal")?;
        self.send(GpuJob::Signal(value))
    }

    fn present(&self) -> Result<()> {
        self.check_device("present")?;
        self.send(GpuJob::Present)
    }
}

/// 软件设备的观察与控制句柄
///
/// 设备被装箱成 `Box<dyn GraphicsDevice>` 之后仍可通过它查询统计、
/// 暂停 GPU 或模拟设备移除。
#[derive(Clone)]
pub struct SoftMonitor {
    shared: Arc<GpuShared>,
}

impl SoftMonitor {
    /// 检测到的写入冲突次数
    pub fn hazard_count(&self) -> u64 {
        self.shared.validation.hazard_count()
    }

    /// 尚未执行完的命令列表数量
    pub fn in_flight_count(&self) -> usize {
        self.shared.validation.in_flight_count()
    }

    /// GPU 执行统计
    pub fn stats(&self) -> GpuStats {
        self.shared.counters.snapshot()
    }

    /// 暂停或恢复 GPU
    pub fn set_suspended(&self, suspended: bool) {
        debug!(suspended, "Software GPU suspend state changed");
        self.shared.gate.set(suspended);
    }

    /// 模拟设备移除
    pub fn remove_device(&self, status: StatusCode) {
        debug_assert!(status.is_failure(), "device removal needs a failure status");
        warn!(status = %status, "Simulating device removal");
        self.shared.fence.remove_device(status);
    }
}

/// 软件图形设备
pub struct SoftDevice {
    queue: SoftQueue,
    shared: Arc<GpuShared>,
    next_id: AtomicU64,
    worker: Option<JoinHandle<()>>,
}

impl SoftDevice {
    /// 创建设备并启动 GPU 工作线程
    pub fn new(desc: SoftDeviceDesc) -> Result<Self> {
        let shared = Arc::new(GpuShared {
            validation: ValidationLayer::new(desc.strict),
            ..GpuShared::default()
        });

        let (sender, receiver) = mpsc::channel();
        let worker = spawn_worker(receiver, shared.clone(), desc.latency)?;

        info!(
            latency_ms = desc.latency.as_millis() as u64,
            strict = desc.strict,
            "Software device created"
        );

        Ok(Self {
            queue: SoftQueue {
                jobs: sender,
                shared: shared.clone(),
                pipeline_count: Arc::new(AtomicU32::new(0)),
            },
            shared,
            next_id: AtomicU64::new(1),
            worker: Some(worker),
        })
    }

    /// 观察与控制句柄
    pub fn monitor(&self) -> SoftMonitor {
        SoftMonitor {
            shared: self.shared.clone(),
        }
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl GraphicsDevice for SoftDevice {
    fn backend_name(&self) -> &str {
        "Software"
    }

    fn create_command_allocator(&self) -> Result<Box<dyn CommandAllocator>> {
        Ok(Box::new(SoftAllocator {
            id: AllocatorId(self.next_id()),
            shared: self.shared.clone(),
        }))
    }

    fn create_upload_buffer(&self, desc: &BufferDescriptor) -> Result<Box<dyn MappedBuffer>> {
        let size = desc.aligned_size();
        if size == 0 {
            return Err(GraphicsError::backend(
                StatusCode::E_INVALIDARG,
                format!("upload buffer '{}' has zero size", desc.label()),
            ).into());
        }

        Ok(Box::new(SoftBuffer {
            id: BufferId(self.next_id()),
            name: desc.label().to_string(),
            data: vec![0; size as usize],
            shared: self.shared.clone(),
        }))
    }

    fn create_pipeline_state(&self, desc: &PipelineDesc) -> Result<PipelineHandle> {
        let handle = PipelineHandle(self.queue.pipeline_count.fetch_add(1, Ordering::Relaxed));
        debug!(name = %desc.name, fill_mode = ?desc.fill_mode, handle = handle.0, "Pipeline state created");
        Ok(handle)
    }

    fn queue(&self) -> &dyn CommandQueue {
        &self.queue
    }

    fn fence(&self) -> Arc<dyn Fence> {
        self.shared.fence.clone()
    }
}

impl Drop for SoftDevice {
    fn drop(&mut self) {
        self.shared.gate.set(false);
        let _ = self.queue.jobs.send(GpuJob::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Software GPU thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::command::BufferView;
    use crate::renderer::resource::BufferUsageType;
    use crate::renderer::sync::FenceManager;

    fn device() -> SoftDevice {
        SoftDevice::new(SoftDeviceDesc {
            latency: Duration::ZERO,
            strict: false,
        })
        .unwrap()
    }

    #[test]
    fn test_signal_advances_fence() {
        let device = device();
        let mut fences = FenceManager::new(device.fence(), Some(Duration::from_secs(5)));

        fences.flush(device.queue()).unwrap();
        assert_eq!(fences.completed_value(), FenceValue::new(1));
        assert_eq!(device.monitor().stats().signals, 1);
    }

    #[test]
    fn test_execute_requires_closed_list() {
        let device = device();
        let allocator = device.create_command_allocator().unwrap();
        let mut list = CommandList::new("open");
        list.reset(allocator.as_ref(), None).unwrap();

        let err = device.queue().execute_command_lists(&[&list]).unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::E_INVALIDARG));
    }

    #[test]
    fn test_unknown_pipeline_is_rejected() {
        let device = device();
        let allocator = device.create_command_allocator().unwrap();
        let mut list = CommandList::new("main");
        list.reset(allocator.as_ref(), Some(PipelineHandle(5))).unwrap();
        list.close().unwrap();

        assert!(device.queue().execute_command_lists(&[&list]).is_err());

        let known = device.create_pipeline_state(&PipelineDesc::solid("opaque")).unwrap();
        list.reset(allocator.as_ref(), Some(known)).unwrap();
        list.close().unwrap();
        assert!(device.queue().execute_command_lists(&[&list]).is_ok());
    }

    #[test]
    fn test_buffer_write_bounds() {
        let device = device();
        let desc = BufferDescriptor::new(16, BufferUsageType::Constant).with_name("cb");
        let mut buffer = device.create_upload_buffer(&desc).unwrap();

        assert_eq!(buffer.size(), 256);
        buffer.write(240, &[1; 16]).unwrap();
        let err = buffer.write(250, &[1; 16]).unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::E_INVALIDARG));

        // offset 加长度溢出同样被拒绝
        let err = buffer.write(u64::MAX - 4, &[1; 16]).unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::E_INVALIDARG));
    }

    #[test]
    fn test_suspended_gpu_keeps_submission_in_flight() {
        let device = device();
        let monitor = device.monitor();
        let mut allocator = device.create_command_allocator().unwrap();
        let mut buffer = device
            .create_upload_buffer(&BufferDescriptor::new(256, BufferUsageType::Constant))
            .unwrap();

        let mut list = CommandList::new("main");
        list.reset(allocator.as_ref(), None).unwrap();
        list.set_constant_buffer(
            0,
            BufferView { buffer: buffer.id(), offset: 0, size: 256 },
        )
        .unwrap();
        list.close().unwrap();

        monitor.set_suspended(true);
        device.queue().execute_command_lists(&[&list]).unwrap();
        assert_eq!(monitor.in_flight_count(), 1);

        buffer.write(0, &[7; 4]).unwrap();
        assert_eq!(monitor.hazard_count(), 1);
        assert!(allocator.reset().is_err());

        monitor.set_suspended(false);
        let mut fences = FenceManager::new(device.fence(), Some(Duration::from_secs(5)));
        fences.flush(device.queue()).unwrap();

        assert_eq!(monitor.in_flight_count(), 0);
        assert!(allocator.reset().is_ok());
        assert_eq!(monitor.stats().command_lists, 1);
    }

    #[test]
    fn test_removed_device_rejects_work() {
        let device = device();
        device.monitor().remove_device(StatusCode::DXGI_ERROR_DEVICE_REMOVED);

        let err = device.queue().signal(FenceValue::new(1)).unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::DXGI_ERROR_DEVICE_REMOVED));
    }
}
