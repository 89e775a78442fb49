//! 初始化演示：只清屏和呈现

use crate::app::AppContext;
use crate::core::error::Result;
use crate::core::timer::Timer;
use crate::math::Color;

use super::Scene;

/// 清屏场景
///
/// 每帧使用直接分配器记录，提交后刷新队列，CPU 与 GPU 完全串行。
#[derive(Debug, Default)]
pub struct InitScene {
    frames: u64,
}

impl InitScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已绘制帧数
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Scene for InitScene {
    fn name(&self) -> &str {
        "init"
    }

    fn initialize(&mut self, ctx: &mut AppContext) -> Result<()> {
        ctx.flush_command_queue()
    }

    fn resize(&mut self, _ctx: &mut AppContext) -> Result<()> {
        Ok(())
    }

    fn update(&mut self, _ctx: &mut AppContext, _timer: &Timer) -> Result<()> {
        Ok(())
    }

    fn draw(&mut self, ctx: &mut AppContext, _timer: &Timer) -> Result<()> {
        // 上一帧已经刷新，分配器可以复用
        ctx.direct_allocator.reset()?;
        ctx.command_list.reset(ctx.direct_allocator.as_ref(), None)?;

        ctx.command_list.set_viewport(ctx.client_width, ctx.client_height)?;
        ctx.command_list.clear_render_target(Color::LIGHT_STEEL_BLUE.to_array())?;
        ctx.command_list.clear_depth_stencil(1.0, 0)?;
        ctx.command_list.close()?;

        ctx.execute()?;
        ctx.present()?;
        ctx.flush_command_queue()?;

        self.frames += 1;
        Ok(())
    }
}
