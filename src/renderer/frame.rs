//! 每帧上传资源
//!
//! 一个帧资源槽位持有的全部内容：命令分配器、对象常量缓冲区和 Pass 常量缓冲区。
//! 槽位独占这些资源，只有 GPU 完成该槽位上次的提交后才能复用。

use bytemuck::Pod;
use tracing::debug;

use crate::core::error::Result;
use crate::gfx::backend::{CommandAllocator, GraphicsDevice};
use crate::renderer::resource::{BufferUsageType, FrameResourcePool, UploadBuffer};

/// 一帧的上传资源
///
/// # 类型参数
///
/// * `O` - 每个对象的常量记录
/// * `P` - 每个 Pass 的常量记录
pub struct FrameUploads<O, P> {
    /// 本帧命令的存放位置
    pub command_allocator: Box<dyn CommandAllocator>,
    /// 每个渲染项一个元素
    pub object_cb: UploadBuffer<O>,
    /// 单个元素
    pub pass_cb: UploadBuffer<P>,
}

impl<O: Pod, P: Pod> FrameUploads<O, P> {
    /// 为一个槽位创建上传资源
    ///
    /// # 参数
    ///
    /// * `device` - 图形设备
    /// * `object_count` - 对象常量的元素数量
    /// * `slot` - 槽位索引，只用于调试名称
    pub fn new(device: &dyn GraphicsDevice, object_count: usize, slot: usize) -> Result<Self> {
        Ok(Self {
            command_allocator: device.create_command_allocator()?,
            object_cb: UploadBuffer::new(
                device,
                object_count,
                BufferUsageType::Constant,
                &format!("object constants [{}]", slot),
            )?,
            pass_cb: UploadBuffer::new(
                device,
                1,
                BufferUsageType::Constant,
                &format!("pass constants [{}]", slot),
            )?,
        })
    }
}

/// 创建帧资源环
///
/// # 参数
///
/// * `device` - 图形设备
/// * `frame_resource_count` - 槽位数量
/// * `object_count` - 每个槽位中对象常量的元素数量
pub fn create_frame_ring<O: Pod, P: Pod>(
    device: &dyn GraphicsDevice,
    frame_resource_count: usize,
    object_count: usize,
) -> Result<FrameResourcePool<FrameUploads<O, P>>> {
    let pool = FrameResourcePool::from_fn(frame_resource_count, |slot| {
        FrameUploads::new(device, object_count, slot)
    })?;

    debug!(
        frame_resources = frame_resource_count,
        object_count,
        "Frame resource ring created"
    );
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use bytemuck::Zeroable;

    use crate::gfx::backend::GraphicsDevice;
    use crate::gfx::soft::{SoftDevice, SoftDeviceDesc};
    use crate::renderer::command::CommandList;
    use crate::renderer::sync::FenceManager;

    #[repr(C)]
    #[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
    struct Object {
        world: [f32; 16],
    }

    #[repr(C)]
    #[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
    struct Pass {
        time: [f32; 4],
    }

    fn device() -> SoftDevice {
        SoftDevice::new(SoftDeviceDesc {
            latency: Duration::ZERO,
            strict: true,
        })
        .unwrap()
    }

    #[test]
    fn test_frame_uploads_layout() {
        let device = device();
        let ring = create_frame_ring::<Object, Pass>(&device, 3, 5).unwrap();
        assert_eq!(ring.len(), 3);

        let uploads = &ring.current().resources;
        assert_eq!(uploads.object_cb.element_count(), 5);
        assert_eq!(uploads.object_cb.element_byte_size(), 256);
        assert_eq!(uploads.pass_cb.element_count(), 1);

        let view = uploads.object_cb.view(3).unwrap();
        assert_eq!(view.offset, 3 * 256);
        assert_eq!(view.size, 256);
    }

    #[test]
    fn test_copy_data_out_of_range_is_rejected() {
        let device = device();
        let mut ring = create_frame_ring::<Object, Pass>(&device, 1, 2).unwrap();
        let uploads = &mut ring.current_mut().resources;

        assert!(uploads.object_cb.copy_data(1, &Object::zeroed()).is_ok());
        assert!(uploads.object_cb.copy_data(2, &Object::zeroed()).is_err());
        assert!(uploads.pass_cb.view(1).is_err());
    }

    #[test]
    fn test_copy_slice_past_end_is_rejected() {
        let device = device();
        let mut ring = create_frame_ring::<Object, Pass>(&device, 1, 4).unwrap();
        let uploads = &mut ring.current_mut().resources;
        let items = [Object::zeroed(); 2];

        assert!(uploads.object_cb.copy_slice(2, &items).is_ok());
        assert!(uploads.object_cb.copy_slice(3, &items).is_err());
        assert!(uploads.object_cb.copy_slice(usize::MAX, &items).is_err());
        assert!(uploads.object_cb.copy_slice(usize::MAX, &[]).is_ok());
    }

    #[test]
    fn test_advance_and_wait_blocks_until_gpu_catches_up() {
        let device = device();
        let monitor = device.monitor();
        let mut fences = FenceManager::new(device.fence(), None);
        let mut ring = create_frame_ring::<Object, Pass>(&device, 2, 1).unwrap();
        let mut list = CommandList::new("test");

        monitor.set_suspended(true);
        for _ in 0..2 {
            let frame = ring.advance_and_wait(&fences).unwrap();
            frame.resources.command_allocator.reset().unwrap();
            list.reset(frame.resources.command_allocator.as_ref(), None).unwrap();
            list.set_constant_buffer(0, frame.resources.object_cb.view(0).unwrap()).unwrap();
            list.close().unwrap();
            device.queue().execute_command_lists(&[&list]).unwrap();
            let value = fences.signal(device.queue()).unwrap();
            frame.stamp(value);
        }

        let resumer = monitor.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            resumer.set_suspended(false);
        });

        // 第三帧复用第一个槽位，必须等 GPU 完成它的 Fence 值
        let frame = ring.advance_and_wait(&fences).unwrap();
        assert!(frame.is_writable(fences.completed_value()));
        frame.resources.object_cb.copy_data(0, &Object::zeroed()).unwrap();
        handle.join().unwrap();

        fences.flush(device.queue()).unwrap();
        assert_eq!(monitor.hazard_count(), 0);
    }
}
