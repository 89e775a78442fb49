//! 演示场景模块
//!
//! 每个场景实现 [`Scene`]，由 [`Application`](crate::app::Application) 驱动：
//!
//! ```text
//! initialize → (resize) → loop { update → draw } → flush
//! ```
//!
//! - `init`: 只清屏和呈现，每帧刷新队列
//! - `box_scene`: 彩色立方体，每帧刷新队列
//! - `shapes`: 多个渲染项，通过帧资源环与 GPU 并行
//! - `overlay`: 立方体 + 统计面板

pub mod box_scene;
pub mod constants;
pub mod init;
pub mod overlay;
pub mod render_item;
pub mod shapes;

pub use box_scene::BoxScene;
pub use constants::{ObjectConstants, PassConstants, WorldViewProjConstants};
pub use init::InitScene;
pub use overlay::{OverlayPanel, OverlayScene};
pub use render_item::RenderItem;
pub use shapes::ShapesScene;

use tracing::info;

use crate::app::AppContext;
use crate::component::OrbitCamera;
use crate::core::config::SceneKind;
use crate::core::error::Result;
use crate::core::event::{InputEvent, MouseButton};
use crate::core::timer::Timer;

/// 场景
///
/// 所有方法都通过 `ctx` 访问设备、Fence 和命令列表，场景本身只持有自己的资源。
pub trait Scene {
    /// 场景名称
    fn name(&self) -> &str;

    /// 资源创建完成后调用一次
    fn initialize(&mut self, ctx: &mut AppContext) -> Result<()>;

    /// 客户区尺寸变化（队列已刷新）
    fn resize(&mut self, ctx: &mut AppContext) -> Result<()>;

    /// 更新 CPU 侧状态并写入本帧的常量
    fn update(&mut self, ctx: &mut AppContext, timer: &Timer) -> Result<()>;

    /// 记录并提交本帧命令
    fn draw(&mut self, ctx: &mut AppContext, timer: &Timer) -> Result<()>;

    /// 输入事件（`ctx.input` 已更新）
    fn on_input(&mut self, _ctx: &mut AppContext, _event: &InputEvent) -> Result<()> {
        Ok(())
    }
}

/// 根据配置创建场景
///
/// # 参数
///
/// * `kind` - 场景类型
/// * `ctx` - 应用上下文，用于创建 GPU 资源
pub fn create_scene(kind: SceneKind, ctx: &mut AppContext) -> Result<Box<dyn Scene>> {
    info!(scene = kind.name(), "Creating scene");

    let scene: Box<dyn Scene> = match kind {
        SceneKind::Init => Box::new(InitScene::new()),
        SceneKind::Box => Box::new(BoxScene::new(ctx)?),
        SceneKind::Shapes => Box::new(ShapesScene::new(ctx)?),
        SceneKind::Overlay => Box::new(OverlayScene::new(ctx)?),
    };
    Ok(scene)
}

/// 鼠标拖动控制轨道相机：左键旋转，右键缩放
pub(crate) fn drive_orbit_camera(camera: &mut OrbitCamera, ctx: &AppContext, event: &InputEvent) {
    if let InputEvent::MouseMove(_) = event {
        let (dx, dy) = ctx.input.mouse_delta();
        if ctx.input.is_button_down(MouseButton::Left) {
            camera.rotate(dx, dy);
        } else if ctx.input.is_button_down(MouseButton::Right) {
            camera.zoom(dx, dy);
        }
    }
}
