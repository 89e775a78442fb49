//! 命令列表模块
//!
//! 与后端无关的命令记录。命令列表在 reset 时绑定一个命令分配器和可选的
//! 管线状态，记录完成后 close，再交给 [`CommandQueue`](crate::gfx::backend::CommandQueue) 执行。
//! 后端负责把这里的 `Command` 翻译成真正的 API 调用。
//!
//! # 状态机
//!
//! ```text
//! Initial --reset--> Recording --close--> Executable --reset--> Recording ...
//! ```

use crate::core::error::{GraphicsError, Result};
use crate::gfx::backend::{AllocatorId, BufferId, CommandAllocator};

/// 管线状态对象句柄（不透明）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineHandle(pub u32);

/// 光栅化填充模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillMode {
    Solid,
    Wireframe,
}

/// 管线状态描述
#[derive(Debug, Clone)]
pub struct PipelineDesc {
    /// 调试名称
    pub name: String,
    /// 填充模式
    pub fill_mode: FillMode,
}

impl PipelineDesc {
    /// 实心填充的管线
    pub fn solid(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fill_mode: FillMode::Solid,
        }
    }

    /// 线框填充的管线
    pub fn wireframe(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fill_mode: FillMode::Wireframe,
        }
    }
}

/// 缓冲区中的一段区域
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferView {
    pub buffer: BufferId,
    pub offset: u64,
    pub size: u64,
}

impl BufferView {
    /// 与另一段区域是否重叠
    pub fn overlaps(&self, buffer: BufferId, offset: u64, size: u64) -> bool {
        self.buffer == buffer && self.offset < offset + size && offset < self.offset + self.size
    }
}

/// 记录的命令
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetPipeline(PipelineHandle),
    SetViewport { width: u32, height: u32 },
    ClearRenderTarget { color: [f32; 4] },
    ClearDepthStencil { depth: f32, stencil: u8 },
    SetVertexBuffer(BufferView),
    SetIndexBuffer(BufferView),
    SetConstantBuffer { slot: u32, view: BufferView },
    DrawIndexed { index_count: u32, start_index: u32, base_vertex: i32 },
    /// 叠加层文本（统计面板）
    Overlay { lines: Vec<String> },
}

/// 命令列表状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandBufferState {
    /// 初始状态
    Initial,
    /// 正在记录
    Recording,
    /// 已完成记录
    Executable,
}

/// 命令列表
///
/// 整个程序只需要一个命令列表；每帧 reset 到当前帧资源的分配器上。
#[derive(Debug)]
pub struct CommandList {
    name: String,
    state: CommandBufferState,
    allocator: Option<AllocatorId>,
    commands: Vec<Command>,
}

impl CommandList {
    /// 创建新的命令列表
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: CommandBufferState::Initial,
            allocator: None,
            commands: Vec::new(),
        }
    }

    /// 开始记录，命令将存放在 `allocator` 中
    pub fn reset(
        &mut self,
        allocator: &dyn CommandAllocator,
        pipeline: Option<PipelineHandle>,
    ) -> Result<()> {
        if self.state == CommandBufferState::Recording {
            return Err(GraphicsError::CommandRecording(format!(
                "command list '{}' reset while recording",
                self.name
            )).into());
        }

        self.commands.clear();
        self.allocator = Some(allocator.id());
        self.state = CommandBufferState::Recording;

        if let Some(pipeline) = pipeline {
            self.commands.push(Command::SetPipeline(pipeline));
        }
        Ok(())
    }

    /// 结束记录
    pub fn close(&mut self) -> Result<()> {
        self.ensure_recording("close")?;
        self.state = CommandBufferState::Executable;
        Ok(())
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) -> Result<()> {
        self.record(Command::SetViewport { width, height })
    }

    pub fn clear_render_target(&mut self, color: [f32; 4]) -> Result<()> {
        self.record(Command::ClearRenderTarget { color })
    }

    pub fn clear_depth_stencil(&mut self, depth: f32, stencil: u8) -> Result<()> {
        self.record(Command::ClearDepthStencil { depth, stencil })
    }

    pub fn set_vertex_buffer(&mut self, view: BufferView) -> Result<()> {
        self.record(Command::SetVertexBuffer(view))
    }

    pub fn set_index_buffer(&mut self, view: BufferView) -> Result<()> {
        self.record(Command::SetIndexBuffer(view))
    }

    pub fn set_constant_buffer(&mut self, slot: u32, view: BufferView) -> Result<()> {
        self.record(Command::SetConstantBuffer { slot, view })
    }

    pub fn draw_indexed(&mut self, index_count: u32, start_index: u32, base_vertex: i32) -> Result<()> {
        self.record(Command::DrawIndexed {
            index_count,
            start_index,
            base_vertex,
        })
    }

    pub fn overlay(&mut self, lines: Vec<String>) -> Result<()> {
        self.record(Command::Overlay { lines })
    }

    /// 命令列表名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 当前状态
    pub fn state(&self) -> CommandBufferState {
        self.state
    }

    /// 最近一次 reset 绑定的分配器
    pub fn allocator(&self) -> Option<AllocatorId> {
        self.allocator
    }

    /// 已记录的命令
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// 命令引用的所有缓冲区区域
    pub fn referenced_views(&self) -> impl Iterator<Item = BufferView> + '_ {
        self.commands.iter().filter_map(|command| match command {
            Command::SetVertexBuffer(view) | Command::SetIndexBuffer(view) => Some(*view),
            Command::SetConstantBuffer { view, .. } => Some(*view),
            _ => None,
        })
    }

    /// 绘制调用数量
    pub fn draw_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, Command::DrawIndexed { .. }))
            .count()
    }

    fn record(&mut self, command: Command) -> Result<()> {
        self.ensure_recording("record")?;
        self.commands.push(command);
        Ok(())
    }

    fn ensure_recording(&self, action: &str) -> Result<()> {
        if self.state != CommandBufferState::Recording {
            return Err(GraphicsError::CommandRecording(format!(
                "cannot {} command list '{}' in state {:?}",
                action, self.name, self.state
            )).into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestAllocator(u64);

    impl CommandAllocator for TestAllocator {
        fn id(&self) -> AllocatorId {
            AllocatorId(self.0)
        }

        fn reset(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn view(offset: u64) -> BufferView {
        BufferView { buffer: BufferId(1), offset, size: 256 }
    }

    #[test]
    fn test_command_list_state_machine() {
        let allocator = TestAllocator(7);
        let mut list = CommandList::new("main");
        assert_eq!(list.state(), CommandBufferState::Initial);

        // 未 reset 不能记录
        assert!(list.clear_render_target([0.0; 4]).is_err());

        list.reset(&allocator, Some(PipelineHandle(1))).unwrap();
        assert_eq!(list.state(), CommandBufferState::Recording);
        assert_eq!(list.allocator(), Some(AllocatorId(7)));
        assert!(list.reset(&allocator, None).is_err());

        list.clear_render_target([0.0, 0.0, 1.0, 1.0]).unwrap();
        list.draw_indexed(36, 0, 0).unwrap();
        list.close().unwrap();

        assert_eq!(list.state(), CommandBufferState::Executable);
        assert_eq!(list.commands().len(), 3);
        assert_eq!(list.commands()[0], Command::SetPipeline(PipelineHandle(1)));
        assert_eq!(list.draw_count(), 1);

        // 关闭后不能继续记录
        assert!(list.draw_indexed(3, 0, 0).is_err());
        assert!(list.close().is_err());
    }

    #[test]
    fn test_reset_clears_previous_commands() {
        let allocator = TestAllocator(1);
        let mut list = CommandList::new("main");

        list.reset(&allocator, None).unwrap();
        list.draw_indexed(3, 0, 0).unwrap();
        list.close().unwrap();

        list.reset(&allocator, None).unwrap();
        assert!(list.commands().is_empty());
    }

    #[test]
    fn test_referenced_views() {
        let allocator = TestAllocator(1);
        let mut list = CommandList::new("main");
        list.reset(&allocator, None).unwrap();
        list.set_vertex_buffer(view(0)).unwrap();
        list.set_constant_buffer(0, view(512)).unwrap();
        list.draw_indexed(3, 0, 0).unwrap();
        list.close().unwrap();

        let views: Vec<_> = list.referenced_views().collect();
        assert_eq!(views, vec![view(0), view(512)]);
    }

    #[test]
    fn test_buffer_view_overlap() {
        let v = view(256);
        assert!(v.overlaps(BufferId(1), 256, 4));
        assert!(v.overlaps(BufferId(1), 0, 257));
        assert!(!v.overlaps(BufferId(1), 0, 256));
        assert!(!v.overlaps(BufferId(1), 512, 256));
        assert!(!v.overlaps(BufferId(2), 256, 256));
    }
}
