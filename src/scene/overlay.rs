//! 统计面板演示
//!
//! 立方体场景之上叠加一个面板：一个计数按钮、控制相机 φ 的滑块和帧率文本。
//! 面板内容在场景命令之后、关闭命令列表之前以 `Command::Overlay` 记录。

use crate::app::AppContext;
use crate::core::error::Result;
use crate::core::event::{InputEvent, KeyCode};
use crate::core::stats::FrameStats;
use crate::core::timer::Timer;
use crate::math::utils;

use super::box_scene::BoxScene;
use super::Scene;

/// 面板状态
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayPanel {
    /// 按钮被按下的次数
    pub counter: u32,
    /// 滑块值（相机 φ）
    pub phi: f32,
    /// 复选框
    pub show_demo_window: bool,
}

impl OverlayPanel {
    /// 滑块下限
    pub const PHI_MIN: f32 = 0.1;
    /// 滑块上限
    pub const PHI_MAX: f32 = 1.0;
    /// 每次按键的滑块步长
    pub const PHI_STEP: f32 = 0.05;

    pub fn new(phi: f32) -> Self {
        Self {
            counter: 0,
            phi,
            show_demo_window: true,
        }
    }

    /// 处理按键
    ///
    /// # 返回值
    ///
    /// 滑块值被修改时返回 `true`
    pub fn handle_key(&mut self, key: KeyCode) -> bool {
        match key {
            KeyCode::Space => {
                self.counter += 1;
                false
            }
            KeyCode::Enter => {
                self.show_demo_window = !self.show_demo_window;
                false
            }
            KeyCode::Up => self.set_phi(self.phi + Self::PHI_STEP),
            KeyCode::Down => self.set_phi(self.phi - Self::PHI_STEP),
            _ => false,
        }
    }

    fn set_phi(&mut self, phi: f32) -> bool {
        self.phi = utils::clamp(phi, Self::PHI_MIN, Self::PHI_MAX);
        true
    }

    /// 面板的文本行
    pub fn lines(&self, stats: &FrameStats) -> Vec<String> {
        vec![
            "Hello, world!".to_string(),
            "This is some useful text.".to_string(),
            format!("[{}] Demo Window", if self.show_demo_window { "x" } else { " " }),
            format!("float = {:.3}", self.phi),
            format!("Button  counter = {}", self.counter),
            format!(
                "Application average {:.3} ms/frame ({:.1} FPS)",
                stats.frame_time_ms(),
                stats.fps()
            ),
        ]
    }
}

/// 立方体 + 面板
pub struct OverlayScene {
    inner: BoxScene,
    panel: OverlayPanel,
}

impl OverlayScene {
    pub fn new(ctx: &mut AppContext) -> Result<Self> {
        let inner = BoxScene::new(ctx)?;
        let panel = OverlayPanel::new(inner.camera().phi());
        Ok(Self { inner, panel })
    }

    pub fn panel(&self) -> &OverlayPanel {
        &self.panel
    }
}

impl Scene for OverlayScene {
    fn name(&self) -> &str {
        "overlay"
    }

    fn initialize(&mut self, ctx: &mut AppContext) -> Result<()> {
        self.inner.initialize(ctx)
    }

    fn resize(&mut self, ctx: &mut AppContext) -> Result<()> {
        self.inner.resize(ctx)
    }

    fn update(&mut self, ctx: &mut AppContext, timer: &Timer) -> Result<()> {
        self.inner.update(ctx, timer)
    }

    fn draw(&mut self, ctx: &mut AppContext, _timer: &Timer) -> Result<()> {
        self.inner.record(ctx)?;
        ctx.command_list.overlay(self.panel.lines(&ctx.stats))?;
        self.inner.submit(ctx)
    }

    fn on_input(&mut self, ctx: &mut AppContext, event: &InputEvent) -> Result<()> {
        self.inner.on_input(ctx, event)?;

        match event {
            InputEvent::KeyDown(e) => {
                if self.panel.handle_key(e.key_code) {
                    self.inner.camera_mut().set_phi(self.panel.phi);
                }
            }
            // 拖动相机时滑块跟随
            InputEvent::MouseMove(_) => self.panel.phi = self.inner.camera().phi(),
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::core::config::Config;
    use crate::core::event::{KeyboardEvent, MouseButton, MouseButtonEvent, MouseButtons, MouseMoveEvent};
    use crate::gfx::soft::{SoftDevice, SoftDeviceDesc};

    fn context() -> AppContext {
        let device = SoftDevice::new(SoftDeviceDesc {
            latency: Duration::ZERO,
            strict: false,
        })
        .unwrap();
        AppContext::new(Box::new(device), &Config::default()).unwrap()
    }

    /// 先交给输入状态，再交给场景，和主循环的顺序一致
    fn send(scene: &mut OverlayScene, ctx: &mut AppContext, event: InputEvent) {
        ctx.input.handle(&event);
        scene.on_input(ctx, &event).unwrap();
    }

    #[test]
    fn test_slider_moves_camera() {
        let mut ctx = context();
        let mut scene = OverlayScene::new(&mut ctx).unwrap();
        let before = scene.panel().phi;

        send(&mut scene, &mut ctx, InputEvent::KeyDown(KeyboardEvent::new(KeyCode::Up)));

        assert!(utils::approx_eq(scene.panel().phi, before + OverlayPanel::PHI_STEP, 1e-5));
        assert!(utils::approx_eq(scene.inner.camera().phi(), scene.panel().phi, 1e-6));

        // 不改变滑块的按键不影响相机
        let phi = scene.inner.camera().phi();
        send(&mut scene, &mut ctx, InputEvent::KeyDown(KeyboardEvent::new(KeyCode::Space)));
        assert_eq!(scene.inner.camera().phi(), phi);
    }

    #[test]
    fn test_camera_drag_moves_slider() {
        let mut ctx = context();
        let mut scene = OverlayScene::new(&mut ctx).unwrap();
        let before = scene.inner.camera().phi();

        let mut buttons = MouseButtons::default();
        buttons.set(MouseButton::Left, true);
        send(
            &mut scene,
            &mut ctx,
            InputEvent::MouseDown(MouseButtonEvent::new(MouseButton::Left, 10.0, 10.0)),
        );
        send(
            &mut scene,
            &mut ctx,
            InputEvent::MouseMove(MouseMoveEvent::new(10.0, 30.0, buttons)),
        );

        let after = scene.inner.camera().phi();
        assert!(after > before);
        assert_eq!(scene.panel().phi, after);
    }

    #[test]
    fn test_panel_counter_and_checkbox() {
        let mut panel = OverlayPanel::new(0.5);
        assert!(!panel.handle_key(KeyCode::Space));
        assert!(!panel.handle_key(KeyCode::Space));
        assert_eq!(panel.counter, 2);

        panel.handle_key(KeyCode::Enter);
        assert!(!panel.show_demo_window);
    }

    #[test]
    fn test_panel_slider_clamped() {
        let mut panel = OverlayPanel::new(0.95);
        assert!(panel.handle_key(KeyCode::Up));
        assert!(panel.handle_key(KeyCode::Up));
        assert_eq!(panel.phi, OverlayPanel::PHI_MAX);

        let mut panel = OverlayPanel::new(0.12);
        panel.handle_key(KeyCode::Down);
        assert_eq!(panel.phi, OverlayPanel::PHI_MIN);
    }

    #[test]
    fn test_panel_lines() {
        let mut panel = OverlayPanel::new(0.25);
        panel.handle_key(KeyCode::Space);
        let lines = panel.lines(&FrameStats::new());

        assert_eq!(lines[0], "Hello, world!");
        assert!(lines.contains(&"float = 0.250".to_string()));
        assert!(lines.contains(&"Button  counter = 1".to_string()));
        assert_eq!(
            lines.last().unwrap(),
            "Application average 0.000 ms/frame (0.0 FPS)"
        );
    }
}
