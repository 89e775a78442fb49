//! wgpu 设备
//!
//! 把 `gfx::backend` 映射到 wgpu：
//!
//! - 命令列表翻译成一个 `CommandEncoder` 并提交
//! - signal 通过 `Queue::on_submitted_work_done` 在此前的提交完成后推进 Fence
//! - 等待方按时间片调用 `Device::poll(Maintain::Poll)` 驱动回调，超时和设备丢失都能及时返回
//! - 上传缓冲区用 `Queue::write_buffer` 写入
//!
//! wgpu 没有命令分配器的概念，分配器只提供标识。

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tracing::{debug, trace, warn};

use crate::core::error::{GraphicsError, Result};
use crate::gfx::backend::{
    AllocatorId, BufferId, CommandAllocator, CommandQueue, Fence, GraphicsDevice, MappedBuffer,
    StatusCode,
};
use crate::gfx::wgpu::context::WgpuContext;
use crate::renderer::command::{Command, CommandBufferState, CommandList, PipelineDesc, PipelineHandle};
use crate::renderer::resource::{BufferDescriptor, BufferUsageType};
use crate::renderer::sync::{FenceEvent, FenceValue};

#[derive(Default)]
struct FenceState {
    completed: FenceValue,
    waiters: Vec<(FenceValue, Arc<FenceEvent>)>,
    removed: Option<StatusCode>,
}

/// 以提交完成回调驱动的 Fence
///
/// 完成回调只在 `Device::poll` 中触发，等待方通过 [`Fence::poll`] 非阻塞地驱动。
pub struct WgpuFence {
    device: Arc<wgpu::Device>,
    state: Mutex<FenceState>,
}

impl WgpuFence {
    fn new(device: Arc<wgpu::Device>) -> Arc<Self> {
        let fence = Arc::new(Self {
            device: device.clone(),
            state: Mutex::new(FenceState::default()),
        });

        // 设备持有回调，回调只能弱引用 Fence
        let weak: Weak<WgpuFence> = Arc::downgrade(&fence);
        device.set_device_lost_callback(move |reason, message| {
            if let Some(fence) = weak.upgrade() {
                warn!(?reason, %message, "wgpu device lost");
                fence.remove_device(StatusCode::DXGI_ERROR_DEVICE_REMOVED);
            }
        });

        fence
    }

    fn lock(&self) -> MutexGuard<'_, FenceState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn complete(&self, value: FenceValue) {
        let mut state = self.lock();
        if state.removed.is_some() {
            return;
        }
        if value > state.completed {
            state.completed = value;
        }
        let completed = state.completed;
        state.waiters.retain(|(target, event)| {
            if *target <= completed {
                event.set();
                false
            } else {
                true
            }
        });
    }

    /// 设备丢失：完成值不再前进，唤醒所有等待者
    fn remove_device(&self, status: StatusCode) {
        let mut state = self.lock();
        if state.removed.is_some() {
            return;
        }
        state.removed = Some(status);
        for (_, event) in state.waiters.drain(..) {
            event.set();
        }
    }
}

impl Fence for WgpuFence {
    fn completed_value(&self) -> FenceValue {
        self.lock().completed
    }

    fn set_event_on_completion(&self, value: FenceValue, event: Arc<FenceEvent>) -> Result<()> {
        let mut state = self.lock();
        if let Some(status) = state.removed {
            return Err(GraphicsError::backend(status, "set event on completion").into());
        }
        if state.completed >= value {
            event.set();
        } else {
            state.waiters.push((value, event));
        }
        Ok(())
    }

    fn device_removed_reason(&self) -> Option<StatusCode> {
        self.lock().removed
    }

    fn requires_polling(&self) -> bool {
        true
    }

    fn poll(&self) -> Result<()> {
        let result = self.device.poll(wgpu::Maintain::Poll);
        trace!(queue_empty = result.is_queue_empty(), "wgpu device polled");
        Ok(())
    }
}

/// wgpu 上传缓冲区
struct WgpuBuffer {
    id: BufferId,
    buffer: wgpu::Buffer,
    queue: Arc<wgpu::Queue>,
}

impl MappedBuffer for WgpuBuffer {
    fn id(&self) -> BufferId {
        self.id
    }

    fn size(&self) -> u64 {
        self.buffer.size()
    }

    fn write(&mut self, offset: u64, bytes: &[u8]) -> Result<()> {
        let padded_len = (bytes.len() as u64 + wgpu::COPY_BUFFER_ALIGNMENT - 1)
            & !(wgpu::COPY_BUFFER_ALIGNMENT - 1);
        let in_range = offset
            .checked_add(padded_len)
            .is_some_and(|end| end <= self.size());
        if offset % wgpu::COPY_BUFFER_ALIGNMENT != 0 || !in_range {
            return Err(GraphicsError::backend(
                StatusCode::E_INVALIDARG,
                format!("write of {} bytes at offset {}", bytes.len(), offset),
            ).into());
        }

        if padded_len == bytes.len() as u64 {
            self.queue.write_buffer(&self.buffer, offset, bytes);
        } else {
            let mut padded = bytes.to_vec();
            padded.resize(padded_len as usize, 0);
            self.queue.write_buffer(&self.buffer, offset, &padded);
        }
        Ok(())
    }
}

struct WgpuAllocator {
    id: AllocatorId,
}

impl CommandAllocator for WgpuAllocator {
    fn id(&self) -> AllocatorId {
        self.id
    }

    fn reset(&mut self) -> Result<()> {
        Ok(())
    }
}

struct WgpuQueue {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    fence: Arc<WgpuFence>,
    render_target: Arc<wgpu::TextureView>,
    pipeline_count: AtomicU32,
}

impl WgpuQueue {
    fn encode(&self, list: &CommandList) -> Result<wgpu::CommandBuffer> {
        if list.state() != CommandBufferState::Executable {
            return Err(GraphicsError::backend(
                StatusCode::E_INVALIDARG,
                format!("command list '{}' executed in state {:?}", list.name(), list.state()),
            ).into());
        }

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some(list.name()),
        });

        for command in list.commands() {
            match command {
                Command::ClearRenderTarget { color } => {
                    let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some("Clear"),
                        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                            view: self.render_target.as_ref(),
                            resolve_target: None,
                            ops: wgpu::Operations {
                                load: wgpu::LoadOp::Clear(wgpu::Color {
                                    r: color[0] as f64,
                                    g: color[1] as f64,
                                    b: color[2] as f64,
                                    a: color[3] as f64,
                                }),
                                store: wgpu::StoreOp::Store,
                            },
                        })],
                        depth_stencil_attachment: None,
                        timestamp_writes: None,
                        occlusion_query_set: None,
                    });
                }
                Command::SetPipeline(handle) => {
                    if handle.0 >= self.pipeline_count.load(Ordering::Relaxed) {
                        return Err(GraphicsError::backend(
                            StatusCode::E_INVALIDARG,
                            format!("unknown pipeline {}", handle.0),
                        ).into());
                    }
                }
                // 没有着色器，其余命令只做记录
                _ => {}
            }
        }

        Ok(encoder.finish())
    }
}

impl CommandQueue for WgpuQueue {
    fn execute_command_lists(&self, lists: &[&CommandList]) -> Result<()> {
        let buffers = lists
            .iter()
            .map(|list| self.encode(list))
            .collect::<Result<Vec<_>>>()?;
        let index = self.queue.submit(buffers);
        trace!(?index, lists = lists.len(), "Command lists submitted");
        Ok(())
    }

    fn signal(&self, value: FenceValue) -> Result<()> {
        let fence = self.fence.clone();
        self.queue
            .on_submitted_work_done(move || fence.complete(value));
        Ok(())
    }

    fn present(&self) -> Result<()> {
        Ok(())
    }
}

/// wgpu 图形设备
pub struct WgpuDevice {
    context: WgpuContext,
    queue: WgpuQueue,
    next_id: AtomicU64,
}

impl WgpuDevice {
    /// 创建设备
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let context = WgpuContext::new(width, height)?;
        let fence = WgpuFence::new(context.device.clone());
        let queue = WgpuQueue {
            device: context.device.clone(),
            queue: context.queue.clone(),
            fence,
            render_target: context.render_target.clone(),
            pipeline_count: AtomicU32::new(0),
        };

        Ok(Self {
            context,
            queue,
            next_id: AtomicU64::new(1),
        })
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl GraphicsDevice for WgpuDevice {
    fn backend_name(&self) -> &str {
        "wgpu"
    }

    fn create_command_allocator(&self) -> Result<Box<dyn CommandAllocator>> {
        Ok(Box::new(WgpuAllocator {
            id: AllocatorId(self.next_id()),
        }))
    }

    fn create_upload_buffer(&self, desc: &BufferDescriptor) -> Result<Box<dyn MappedBuffer>> {
        let usage = match desc.usage {
            BufferUsageType::Constant => wgpu::BufferUsages::UNIFORM,
            BufferUsageType::Vertex => wgpu::BufferUsages::VERTEX,
            BufferUsageType::Index => wgpu::BufferUsages::INDEX,
        } | wgpu::BufferUsages::COPY_DST;

        let size = (desc.aligned_size() + wgpu::COPY_BUFFER_ALIGNMENT - 1)
            & !(wgpu::COPY_BUFFER_ALIGNMENT - 1);
        let buffer = self.context.device.create_buffer(&wgpu::BufferDescriptor {
            label: desc.name.as_deref(),
            size,
            usage,
            mapped_at_creation: false,
        });

        Ok(Box::new(WgpuBuffer {
            id: BufferId(self.next_id()),
            buffer,
            queue: self.context.queue.clone(),
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
        self.queue.fence.clone()
    }
}
