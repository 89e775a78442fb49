//! 资源管理模块
//!
//! 提供上传缓冲区和帧资源环：
//!
//! - [`UploadBuffer`]：持久映射的类型化上传缓冲区，常量缓冲区按 256 字节对齐
//! - [`FrameResource`]：一帧使用的资源集合及其 Fence 快照
//! - [`FrameResourcePool`]：循环使用的帧资源环，复用前等待 GPU
//! - [`DirtyCounter`]：每个对象还需要写入多少个帧资源
//!
//! # 三缓冲
//!
//! 使用三个帧资源循环使用：
//! - 帧 N: CPU 正在写入
//! - 帧 N-1: GPU 正在处理
//! - 帧 N-2: 完成，可以复用

use std::marker::PhantomData;

use bytemuck::Pod;
use tracing::trace;

use crate::core::error::{DistRenderError, GraphicsError, Result};
use crate::gfx::backend::{GraphicsDevice, MappedBuffer};
use crate::renderer::command::BufferView;
use crate::renderer::sync::{FenceManager, FenceValue};

/// 常量缓冲区的最小硬件分配粒度
pub const CONSTANT_BUFFER_ALIGNMENT: u64 = 256;

/// 计算常量缓冲区的字节大小
///
/// 常量缓冲区的大小必须是 256 字节的整数倍，向上取整。
///
/// ```
/// use frame_pacing::renderer::calc_constant_buffer_byte_size;
///
/// assert_eq!(calc_constant_buffer_byte_size(16), 256);
/// assert_eq!(calc_constant_buffer_byte_size(300), 512);
/// ```
pub fn calc_constant_buffer_byte_size(byte_size: u64) -> u64 {
    (byte_size + (CONSTANT_BUFFER_ALIGNMENT - 1)) & !(CONSTANT_BUFFER_ALIGNMENT - 1)
}

/// 缓冲区使用类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsageType {
    /// 顶点缓冲区
    Vertex,
    /// 索引缓冲区
    Index,
    /// 常量缓冲区
    Constant,
}

/// 缓冲区描述信息
#[derive(Debug, Clone)]
pub struct BufferDescriptor {
    /// 缓冲区大小（字节）
    pub size: u64,
    /// 使用类型
    pub usage: BufferUsageType,
    /// 调试名称（可选）
    pub name: Option<String>,
}

impl BufferDescriptor {
    /// 创建新的缓冲区描述符
    pub fn new(size: u64, usage: BufferUsageType) -> Self {
        Self {
            size,
            usage,
            name: None,
        }
    }

    /// 设置调试名称
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// 计算对齐后的大小（常量缓冲区要求256字节对齐）
    pub fn aligned_size(&self) -> u64 {
        if self.usage == BufferUsageType::Constant {
            calc_constant_buffer_byte_size(self.size)
        } else {
            self.size
        }
    }

    /// 调试名称，未设置时为空串
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }
}

/// 上传缓冲区（CPU -> GPU）
///
/// 创建后一直保持映射，用于每帧更新的数据。
/// 常量缓冲区的元素步长按 256 字节对齐，其他用途按元素大小紧密排列。
///
/// # 类型参数
///
/// * `T` - 缓冲区中存储的记录类型，必须是 `Pod`
///
/// # 示例
///
/// ```ignore
/// let mut buffer = UploadBuffer::<ObjectConstants>::new(
///     device,
///     16, // 最多16个对象
///     BufferUsageType::Constant,
///     "object constants",
/// )?;
///
/// buffer.copy_data(0, &constants)?;
/// ```
pub struct UploadBuffer<T> {
    /// 后端映射缓冲区
    buffer: Box<dyn MappedBuffer>,
    /// 元素数量
    element_count: usize,
    /// 每个元素的大小（对齐后）
    element_byte_size: u64,
    /// 使用类型
    usage: BufferUsageType,
    _phantom: PhantomData<T>,
}

impl<T: Pod> UploadBuffer<T> {
    /// 创建新的上传缓冲区
    ///
    /// # 参数
    ///
    /// * `device` - 图形设备
    /// * `element_count` - 元素数量
    /// * `usage` - 缓冲区使用类型
    /// * `name` - 调试名称
    ///
    /// # 返回值
    ///
    /// 返回新创建的上传缓冲区
    pub fn new(
        device: &dyn GraphicsDevice,
        element_count: usize,
        usage: BufferUsageType,
        name: &str,
    ) -> Result<Self> {
        if element_count == 0 {
            return Err(GraphicsError::ResourceCreation(format!(
                "upload buffer '{}' must hold at least one element",
                name
            )).into());
        }

        let element_size = std::mem::size_of::<T>() as u64;
        let element_byte_size = if usage == BufferUsageType::Constant {
            calc_constant_buffer_byte_size(element_size)
        } else {
            element_size
        };

        let desc = BufferDescriptor::new(element_byte_size * element_count as u64, usage)
            .with_name(name);
        let buffer = device.create_upload_buffer(&desc)?;

        trace!(
            name,
            element_count,
            element_byte_size,
            "Upload buffer created"
        );

        Ok(Self {
            buffer,
            element_count,
            element_byte_size,
            usage,
            _phantom: PhantomData,
        })
    }

    /// 把一条记录写入第 `index` 个元素
    ///
    /// 调用者必须保证 GPU 不再读取该元素（即所在帧资源已完成）。
    pub fn copy_data(&mut self, index: usize, data: &T) -> Result<()> {
        self.check_index(index)?;
        self.buffer
            .write(self.element_offset(index), bytemuck::bytes_of(data))
    }

    /// 从第 `start` 个元素开始写入一组记录
    pub fn copy_slice(&mut self, start: usize, data: &[T]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        let last = start
            .checked_add(data.len() - 1)
            .ok_or(GraphicsError::OutOfBounds {
                index: start,
                count: self.element_count,
            })?;
        self.check_index(last)?;

        if self.element_byte_size == std::mem::size_of::<T>() as u64 {
            return self
                .buffer
                .write(self.element_offset(start), bytemuck::cast_slice(data));
        }

        for (i, item) in data.iter().enumerate() {
            self.buffer
                .write(self.element_offset(start + i), bytemuck::bytes_of(item))?;
        }
        Ok(())
    }

    /// 第 `index` 个元素所在的缓冲区区域，用于绑定
    pub fn view(&self, index: usize) -> Result<BufferView> {
        self.check_index(index)?;
        Ok(BufferView {
            buffer: self.buffer.id(),
            offset: self.element_offset(index),
            size: self.element_byte_size,
        })
    }

    /// 整个缓冲区区域
    pub fn full_view(&self) -> BufferView {
        BufferView {
            buffer: self.buffer.id(),
            offset: 0,
            size: self.total_size(),
        }
    }

    /// 获取元素数量
    pub fn element_count(&self) -> usize {
        self.element_count
    }

    /// 获取每个元素的大小（对齐后）
    pub fn element_byte_size(&self) -> u64 {
        self.element_byte_size
    }

    /// 获取总大小
    pub fn total_size(&self) -> u64 {
        self.element_byte_size * self.element_count as u64
    }

    /// 获取使用类型
    pub fn usage(&self) -> BufferUsageType {
        self.usage
    }

    fn element_offset(&self, index: usize) -> u64 {
        self.element_byte_size * index as u64
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.element_count {
            return Err(GraphicsError::OutOfBounds {
                index,
                count: self.element_count,
            }.into());
        }
        Ok(())
    }
}

/// 帧资源
///
/// 一帧记录命令所需的全部资源，外加 GPU 最后一次使用它们时的 Fence 值。
/// `fence_value` 为 0 表示还没有提交过。
pub struct FrameResource<T> {
    /// 在环中的索引
    pub frame_index: usize,
    /// 最后一次提交使用的Fence值
    pub fence_value: FenceValue,
    /// 本帧独占的资源
    pub resources: T,
}

impl<T> FrameResource<T> {
    /// 创建新的帧资源
    pub fn new(frame_index: usize, resources: T) -> Self {
        Self {
            frame_index,
            fence_value: FenceValue::ZERO,
            resources,
        }
    }

    /// 记录本帧提交后 signal 的 Fence 值
    ///
    /// Fence 值不会减小；较小的值在调试构建中断言失败，在发布构建中被忽略。
    pub fn stamp(&mut self, value: FenceValue) {
        debug_assert!(
            value >= self.fence_value,
            "frame resource {} fence value went backwards ({} -> {})",
            self.frame_index,
            self.fence_value.value(),
            value.value()
        );
        if value < self.fence_value {
            crate::engine_warn!(
                frame_index = self.frame_index,
                current = self.fence_value.value(),
                rejected = value.value(),
                "Ignoring decreasing fence value"
            );
            return;
        }
        self.fence_value = value;
    }

    /// GPU 是否已完成本帧资源上次提交的工作
    pub fn is_writable(&self, completed: FenceValue) -> bool {
        self.fence_value.is_zero() || completed >= self.fence_value
    }
}

/// 帧资源池
///
/// 管理多个帧资源的循环使用。
/// 当前索引从 0 开始，每帧先 [`advance`](Self::advance) 再使用，
/// 所以第一帧使用的是索引 1 的资源（环大小为 1 时始终是 0）。
pub struct FrameResourcePool<T> {
    /// 帧资源列表
    resources: Vec<FrameResource<T>>,
    /// 当前帧索引
    current_index: usize,
}

impl<T> FrameResourcePool<T> {
    /// 用构造函数为每个槽位创建资源
    ///
    /// # 参数
    ///
    /// * `count` - 帧资源数量（至少为 1，通常为 3）
    /// * `create` - 以槽位索引为参数创建资源
    pub fn from_fn<F>(count: usize, mut create: F) -> Result<Self>
    where
        F: FnMut(usize) -> Result<T>,
    {
        if count == 0 {
            return Err(DistRenderError::Initialization(
                "At least 1 frame resource required".to_string(),
            ));
        }

        let resources = (0..count)
            .map(|i| Ok(FrameResource::new(i, create(i)?)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            resources,
            current_index: 0,
        })
    }

    /// 帧资源数量
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// 是否没有任何帧资源
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// 获取当前帧资源
    pub fn current(&self) -> &FrameResource<T> {
        &self.resources[self.current_index]
    }

    /// 获取当前帧资源的可变引用
    pub fn current_mut(&mut self) -> &mut FrameResource<T> {
        &mut self.resources[self.current_index]
    }

    /// 获取当前帧索引
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// 移动到下一帧
    pub fn advance(&mut self) -> &mut FrameResource<T> {
        self.current_index = (self.current_index + 1) % self.resources.len();
        self.current_mut()
    }

    /// 等待 GPU 完成当前帧资源上次提交的工作
    pub fn wait_for_current(&self, fences: &FenceManager) -> Result<()> {
        let resource = self.current();
        if resource.is_writable(fences.completed_value()) {
            return Ok(());
        }

        trace!(
            frame_index = resource.frame_index,
            fence_value = resource.fence_value.value(),
            "Frame resource still in flight"
        );
        fences.wait_for_value(resource.fence_value)
    }

    /// 移动到下一帧，并等待它可以安全复用
    ///
    /// 这是帧循环中唯一的阻塞点。
    pub fn advance_and_wait(&mut self, fences: &FenceManager) -> Result<&mut FrameResource<T>> {
        self.current_index = (self.current_index + 1) % self.resources.len();
        self.wait_for_current(fences)?;
        Ok(self.current_mut())
    }

    /// 遍历所有帧资源
    pub fn iter(&self) -> impl Iterator<Item = &FrameResource<T>> {
        self.resources.iter()
    }
}

/// 脏帧计数器
///
/// 对象数据变化后，每个帧资源里的常量缓冲区都需要更新一次，
/// 所以计数器被重置为帧资源数量，每帧写入后减一，到 0 为止。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyCounter {
    remaining: usize,
    frame_resource_count: usize,
}

impl DirtyCounter {
    /// 新对象需要写入全部帧资源
    pub fn new(frame_resource_count: usize) -> Self {
        Self {
            remaining: frame_resource_count,
            frame_resource_count,
        }
    }

    /// 数据已变化
    pub fn mark_dirty(&mut self) {
        self.remaining = self.frame_resource_count;
    }

    /// 当前帧资源是否需要写入
    pub fn is_dirty(&self) -> bool {
        self.remaining > 0
    }

    /// 还剩多少个帧资源需要写入
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// 当前帧资源已写入
    pub fn consume(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_buffer_byte_size_known_values() {
        assert_eq!(calc_constant_buffer_byte_size(16), 256);
        assert_eq!(calc_constant_buffer_byte_size(256), 256);
        assert_eq!(calc_constant_buffer_byte_size(257), 512);
        assert_eq!(calc_constant_buffer_byte_size(300), 512);
        assert_eq!(calc_constant_buffer_byte_size(0), 0);
    }

    #[test]
    fn test_constant_buffer_byte_size_rounds_up_to_multiple() {
        for x in 1..=1_000_000u64 {
            let size = calc_constant_buffer_byte_size(x);
            assert_eq!(size % 256, 0);
            assert!(size >= x);
            assert!(size - x < 256);
        }
    }

    #[test]
    fn test_buffer_descriptor_alignment() {
        let desc = BufferDescriptor::new(100, BufferUsageType::Constant);
        assert_eq!(desc.aligned_size(), 256); // 对齐到256字节

        let desc2 = BufferDescriptor::new(300, BufferUsageType::Constant).with_name("pass");
        assert_eq!(desc2.aligned_size(), 512); // 对齐到512字节
        assert_eq!(desc2.label(), "pass");

        let desc3 = BufferDescriptor::new(100, BufferUsageType::Vertex);
        assert_eq!(desc3.aligned_size(), 100); // 顶点缓冲区不需要对齐
    }

    #[test]
    fn test_ring_visits_every_slot_with_period_n() {
        for n in 1..=8usize {
            let mut pool = FrameResourcePool::from_fn(n, |i| Ok(i)).unwrap();
            let mut visited = Vec::new();
            for _ in 0..(2 * n) {
                visited.push(pool.advance().frame_index);
            }
            for (k, index) in visited.iter().enumerate() {
                assert_eq!(*index, (k + 1) % n);
                assert_eq!(visited[k], visited[(k + n) % (2 * n)]);
            }
        }
    }

    #[test]
    fn test_pool_requires_one_slot() {
        assert!(FrameResourcePool::from_fn(0, |i| Ok(i)).is_err());
    }

    #[test]
    fn test_pool_propagates_creation_error() {
        let result = FrameResourcePool::from_fn(3, |i| {
            if i == 2 {
                Err(DistRenderError::Runtime("no memory".into()))
            } else {
                Ok(i)
            }
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_stamp_is_monotonic() {
        let mut resource = FrameResource::new(0, ());
        assert!(resource.is_writable(FenceValue::ZERO));

        let mut last = FenceValue::ZERO;
        for v in [1u64, 4, 4, 7, 10] {
            resource.stamp(FenceValue::new(v));
            assert!(resource.fence_value >= last);
            last = resource.fence_value;
        }
        assert_eq!(resource.fence_value.value(), 10);

        assert!(!resource.is_writable(FenceValue::new(9)));
        assert!(resource.is_writable(FenceValue::new(10)));
    }

    #[test]
    fn test_dirty_counter_reaches_zero_after_n_frames() {
        for n in 1..=5usize {
            let mut counter = DirtyCounter::new(n);
            counter.consume();
            counter.mark_dirty();

            for _ in 0..n {
                assert!(counter.is_dirty());
                counter.consume();
            }
            assert!(!counter.is_dirty());
            assert_eq!(counter.remaining(), 0);

            counter.consume();
            assert_eq!(counter.remaining(), 0);
        }
    }
}
