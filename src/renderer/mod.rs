//! 渲染器模块
//!
//! 与具体图形 API 无关的渲染核心：帧资源环、Fence 同步、上传缓冲区和命令列表。
//! 后端通过 `gfx::backend` 中的 trait 接入。
//!
//! # 每帧流程
//!
//! ```text
//! advance_and_wait ─> 写入脏对象 / Pass 常量 ─> reset 分配器和命令列表
//!        ─> 记录命令 ─> execute ─> present ─> signal + stamp
//! ```

pub mod command;
pub mod frame;
pub mod resource;
pub mod sync;

pub use command::{BufferView, Command, CommandBufferState, CommandList, FillMode, PipelineDesc, PipelineHandle};
pub use frame::{create_frame_ring, FrameUploads};
pub use resource::{
    calc_constant_buffer_byte_size, BufferDescriptor, BufferUsageType, DirtyCounter, FrameResource,
    FrameResourcePool, UploadBuffer,
};
pub use sync::{FenceEvent, FenceManager, FenceValue};
