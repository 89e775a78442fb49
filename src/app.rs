//! 应用程序驱动
//!
//! `AppContext` 持有所有场景共享的状态（设备、Fence、命令列表、客户区尺寸等），
//! 以引用的方式传给场景，不使用全局变量。
//! `Application` 运行主循环：
//!
//! ```text
//! timer.reset()
//! loop {
//!     处理事件（激活/失活、尺寸变化、输入、退出）
//!     timer.tick()
//!     if !paused { 统计帧率; scene.update(); scene.draw(); }
//!     else       { sleep(100ms) }
//! }
//! flush_command_queue()
//! ```

use std::collections::VecDeque;
use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use crate::core::config::Config;
use crate::core::error::Result;
use crate::core::event::{
    InputEvent, KeyCode, KeyboardEvent, MouseButton, MouseButtonEvent, MouseButtons,
    MouseMoveEvent, WindowResizeEvent,
};
use crate::core::input::InputSystem;
use crate::core::stats::FrameStats;
use crate::core::timer::Timer;
use crate::gfx::{self, CommandAllocator, GraphicsDevice};
use crate::renderer::{CommandList, FenceManager, FenceValue};
use crate::scene::{self, Scene};
use crate::{app_info, engine_info, span_trace};

/// 交换链缓冲区数量
pub const SWAP_CHAIN_BUFFER_COUNT: usize = 2;

/// 暂停时每次循环的休眠时间
const PAUSED_SLEEP: Duration = Duration::from_millis(100);

/// 场景共享的应用状态
pub struct AppContext {
    /// 所有命令共用一个命令列表
    pub command_list: CommandList,
    /// 每帧刷新队列的场景使用的分配器
    pub direct_allocator: Box<dyn CommandAllocator>,
    pub fences: FenceManager,
    pub client_width: u32,
    pub client_height: u32,
    /// 当前后台缓冲区
    pub back_buffer_index: usize,
    pub paused: bool,
    pub minimized: bool,
    pub stats: FrameStats,
    pub input: InputSystem,
    /// 帧资源环大小
    pub frame_resource_count: usize,
    pub title: String,
    pub device: Box<dyn GraphicsDevice>,
}

impl AppContext {
    /// 创建上下文
    ///
    /// # 参数
    ///
    /// * `device` - 图形设备
    /// * `config` - 应用配置
    pub fn new(device: Box<dyn GraphicsDevice>, config: &Config) -> Result<Self> {
        let fences = FenceManager::new(device.fence(), config.fence_timeout());
        let direct_allocator = device.create_command_allocator()?;

        Ok(Self {
            command_list: CommandList::new("main"),
            direct_allocator,
            fences,
            client_width: config.window.width,
            client_height: config.window.height,
            back_buffer_index: 0,
            paused: false,
            minimized: false,
            stats: FrameStats::new(),
            input: InputSystem::new(),
            frame_resource_count: config.graphics.frame_resources,
            title: config.window.title.clone(),
            device,
        })
    }

    /// 客户区宽高比
    pub fn aspect_ratio(&self) -> f32 {
        WindowResizeEvent::new(self.client_width, self.client_height).aspect_ratio()
    }

    /// 提交已关闭的命令列表
    pub fn execute(&self) -> Result<()> {
        self.device
            .queue()
            .execute_command_lists(&[&self.command_list])
    }

    /// 呈现并切换后台缓冲区
    pub fn present(&mut self) -> Result<()> {
        self.device.queue().present()?;
        self.back_buffer_index = (self.back_buffer_index + 1) % SWAP_CHAIN_BUFFER_COUNT;
        Ok(())
    }

    /// 等待所有已提交的工作完成
    ///
    /// signal 下一个 Fence 值并等待 GPU 到达该值。
    pub fn flush_command_queue(&mut self) -> Result<()> {
        self.fences.flush(self.device.queue())
    }
}

/// 窗口事件
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppEvent {
    /// 窗口获得焦点
    Activate,
    /// 窗口失去焦点
    Deactivate,
    /// 客户区尺寸变化，0 × 0 表示最小化
    Resize(WindowResizeEvent),
    Input(InputEvent),
    Quit,
}

/// 事件来源
pub trait EventSource {
    /// 取出第 `iteration` 次循环之前到达的事件
    fn poll(&mut self, iteration: u64) -> Vec<AppEvent>;
}

/// 预先编排的事件序列
///
/// 在无窗口环境下代替消息循环，按循环次数投递事件。
#[derive(Debug, Default)]
pub struct ScriptedInput {
    script: VecDeque<(u64, AppEvent)>,
}

impl ScriptedInput {
    /// 从 `(循环次数, 事件)` 列表创建，同一次循环的事件保持原有顺序
    pub fn new(mut events: Vec<(u64, AppEvent)>) -> Self {
        events.sort_by_key(|(iteration, _)| *iteration);
        Self {
            script: events.into(),
        }
    }

    /// 不产生任何事件
    pub fn empty() -> Self {
        Self::default()
    }

    /// 演示脚本
    ///
    /// 左键拖动旋转相机，右键拖动缩放，按住 `1` 切换线框，
    /// 按面板按钮，失活再激活一次，最后改变窗口尺寸并最小化再恢复。
    pub fn demo() -> Self {
        let mut events = vec![(0, AppEvent::Activate)];

        let mut drag = |start: u64, button: MouseButton, buttons: MouseButtons, step: (f32, f32)| {
            let (x0, y0) = (400.0, 300.0);
            events.push((start, mouse_down(button, x0, y0)));
            for k in 1..=20u64 {
                let (x, y) = (x0 + step.0 * k as f32, y0 + step.1 * k as f32);
                events.push((
                    start + k,
                    AppEvent::Input(InputEvent::MouseMove(MouseMoveEvent::new(x, y, buttons))),
                ));
            }
            events.push((
                start + 21,
                AppEvent::Input(InputEvent::MouseUp(MouseButtonEvent::new(button, x0, y0))),
            ));
        };
        drag(10, MouseButton::Left, MouseButtons::LEFT, (4.0, 2.0));
        drag(50, MouseButton::Right, MouseButtons::RIGHT, (3.0, 0.0));

        events.extend([
            (80, key_down(KeyCode::Digit1)),
            (120, key_up(KeyCode::Digit1)),
            (130, key_down(KeyCode::Space)),
            (131, key_up(KeyCode::Space)),
            (135, key_down(KeyCode::Up)),
            (136, key_up(KeyCode::Up)),
            (150, AppEvent::Deactivate),
            (153, AppEvent::Activate),
            (170, AppEvent::Resize(WindowResizeEvent::new(1024, 768))),
            (200, AppEvent::Resize(WindowResizeEvent::new(0, 0))),
            (203, AppEvent::Resize(WindowResizeEvent::new(1024, 768))),
        ]);

        Self::new(events)
    }

    /// 剩余事件数
    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl EventSource for ScriptedInput {
    fn poll(&mut self, iteration: u64) -> Vec<AppEvent> {
        let mut events = Vec::new();
        while let Some((at, _)) = self.script.front() {
            if *at > iteration {
                break;
            }
            if let Some((_, event)) = self.script.pop_front() {
                events.push(event);
            }
        }
        events
    }
}

fn mouse_down(button: MouseButton, x: f32, y: f32) -> AppEvent {
    AppEvent::Input(InputEvent::MouseDown(MouseButtonEvent::new(button, x, y)))
}

fn key_down(key: KeyCode) -> AppEvent {
    AppEvent::Input(InputEvent::KeyDown(KeyboardEvent::new(key)))
}

fn key_up(key: KeyCode) -> AppEvent {
    AppEvent::Input(InputEvent::KeyUp(KeyboardEvent::new(key)))
}

/// 一次运行的结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    /// 绘制的帧数
    pub frames: u64,
    /// 主循环次数（包括暂停的循环）
    pub iterations: u64,
    /// 最后一次 signal 的 Fence 值
    pub final_fence: FenceValue,
    /// 最近一次统计的帧率
    pub fps: f32,
}

/// 应用程序
pub struct Application {
    scene: Box<dyn Scene>,
    ctx: AppContext,
    events: Box<dyn EventSource>,
    timer: Timer,
    max_frames: u64,
}

impl Application {
    /// 使用给定的设备和事件来源创建应用，场景由配置选择
    pub fn new(
        config: &Config,
        device: Box<dyn GraphicsDevice>,
        events: Box<dyn EventSource>,
    ) -> Result<Self> {
        let mut ctx = AppContext::new(device, config)?;
        let scene = scene::create_scene(config.scene.kind, &mut ctx)?;

        Ok(Self {
            scene,
            ctx,
            events,
            timer: Timer::new(),
            max_frames: config.run.max_frames,
        })
    }

    /// 根据配置创建设备和事件来源
    pub fn from_config(config: &Config) -> Result<Self> {
        let device = gfx::create_device(config)?;
        engine_info!(backend = device.backend_name(), "Graphics device ready");

        let events: Box<dyn EventSource> = if config.run.scripted_input {
            Box::new(ScriptedInput::demo())
        } else {
            Box::new(ScriptedInput::empty())
        };
        Self::new(config, device, events)
    }

    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    pub fn scene(&self) -> &dyn Scene {
        self.scene.as_ref()
    }

    /// 运行主循环直到退出事件或达到最大帧数
    ///
    /// 退出前刷新命令队列，返回时 GPU 已经空闲。
    pub fn run(&mut self) -> Result<RunSummary> {
        app_info!(
            scene = self.scene.name(),
            width = self.ctx.client_width,
            height = self.ctx.client_height,
            frame_resources = self.ctx.frame_resource_count,
            "Entering main loop"
        );

        self.scene.initialize(&mut self.ctx)?;
        self.timer.reset();

        let mut frames = 0u64;
        let mut iterations = 0u64;

        'main: loop {
            for event in self.events.poll(iterations) {
                if !self.handle_event(event)? {
                    info!("Quit requested, shutting down...");
                    break 'main;
                }
            }
            iterations += 1;

            self.timer.tick();

            if self.ctx.paused {
                thread::sleep(PAUSED_SLEEP);
                continue;
            }

            let _frame = span_trace!("frame").entered();
            if self.ctx.stats.record_frame(self.timer.total_time()) {
                debug!(caption = %self.ctx.stats.caption(&self.ctx.title), "Caption updated");
            }
            self.scene.update(&mut self.ctx, &self.timer)?;
            self.scene.draw(&mut self.ctx, &self.timer)?;

            frames += 1;
            if self.max_frames > 0 && frames >= self.max_frames {
                break;
            }
        }

        self.ctx.flush_command_queue()?;

        let summary = RunSummary {
            frames,
            iterations,
            final_fence: self.ctx.fences.current_value(),
            fps: self.ctx.stats.fps(),
        };
        app_info!(
            frames = summary.frames,
            fence_value = summary.final_fence.value(),
            fps = summary.fps,
            stat_samples = self.ctx.stats.samples(),
            "Main loop finished"
        );
        Ok(summary)
    }

    /// 处理一个窗口事件，返回 `false` 表示退出
    fn handle_event(&mut self, event: AppEvent) -> Result<bool> {
        match event {
            AppEvent::Activate => {
                self.ctx.paused = false;
                self.timer.start();
            }
            AppEvent::Deactivate => {
                self.ctx.paused = true;
                self.timer.stop();
            }
            AppEvent::Resize(resize) => self.on_resize(resize)?,
            AppEvent::Input(input) => {
                self.ctx.input.handle(&input);
                if input == InputEvent::KeyUp(KeyboardEvent::new(KeyCode::Escape)) {
                    return Ok(false);
                }
                self.scene.on_input(&mut self.ctx, &input)?;
            }
            AppEvent::Quit => return Ok(false),
        }
        Ok(true)
    }

    fn on_resize(&mut self, resize: WindowResizeEvent) -> Result<()> {
        if resize.is_minimized() {
            debug!("Window minimized");
            self.ctx.paused = true;
            self.ctx.minimized = true;
            return Ok(());
        }

        if self.ctx.minimized {
            debug!("Window restored");
            self.ctx.paused = false;
            self.ctx.minimized = false;
        }

        debug!(width = resize.width, height = resize.height, "Window resized");
        self.ctx.client_width = resize.width;
        self.ctx.client_height = resize.height;

        // 尺寸相关的资源可能仍被 GPU 使用
        self.ctx.flush_command_queue()?;
        self.scene.resize(&mut self.ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SceneKind;
    use crate::core::error::{DistRenderError, GraphicsError};
    use crate::gfx::{SoftDevice, SoftDeviceDesc, SoftMonitor, StatusCode};
    use crate::renderer::create_frame_ring;
    use crate::scene::{ObjectConstants, PassConstants, ShapesScene};

    fn soft_device(latency_ms: u64) -> (Box<dyn GraphicsDevice>, SoftMonitor) {
        let device = SoftDevice::new(SoftDeviceDesc {
            latency: Duration::from_millis(latency_ms),
            strict: false,
        })
        .unwrap();
        let monitor = device.monitor();
        (Box::new(device), monitor)
    }

    fn config(kind: SceneKind, max_frames: u64) -> Config {
        let mut config = Config::default();
        config.scene.kind = kind;
        config.run.max_frames = max_frames;
        config
    }

    #[test]
    fn test_scripted_input_delivers_in_order() {
        let mut input = ScriptedInput::new(vec![
            (2, AppEvent::Quit),
            (0, AppEvent::Activate),
            (0, AppEvent::Deactivate),
        ]);

        assert_eq!(input.poll(0), vec![AppEvent::Activate, AppEvent::Deactivate]);
        assert!(input.poll(1).is_empty());
        assert_eq!(input.poll(5), vec![AppEvent::Quit]);
        assert_eq!(input.remaining(), 0);
    }

    #[test]
    fn test_demo_script_ends_active() {
        let mut input = ScriptedInput::demo();
        let events = input.poll(u64::MAX);

        let deactivations = events.iter().filter(|e| **e == AppEvent::Deactivate).count();
        let activations = events.iter().filter(|e| **e == AppEvent::Activate).count();
        assert_eq!(deactivations, 1);
        assert_eq!(activations, 2);
        assert_eq!(
            events.last(),
            Some(&AppEvent::Resize(WindowResizeEvent::new(1024, 768)))
        );
    }

    #[test]
    fn test_shapes_run_has_no_hazards() {
        let (device, monitor) = soft_device(1);
        let mut app = Application::new(
            &config(SceneKind::Shapes, 60),
            device,
            Box::new(ScriptedInput::demo()),
        )
        .unwrap();

        let summary = app.run().unwrap();

        assert_eq!(summary.frames, 60);
        assert_eq!(monitor.hazard_count(), 0);
        assert_eq!(monitor.in_flight_count(), 0);

        let stats = monitor.stats();
        assert_eq!(stats.presents, 60);
        assert_eq!(stats.draw_calls, 60 * 22);
        // 每帧一次 signal，加上初始化和退出时的刷新
        assert_eq!(stats.signals, 62);
        assert_eq!(summary.final_fence, FenceValue::new(62));
    }

    #[test]
    fn test_box_run_survives_pause_and_resize() {
        let (device, monitor) = soft_device(0);
        let mut app = Application::new(
            &config(SceneKind::Box, 230),
            device,
            Box::new(ScriptedInput::demo()),
        )
        .unwrap();

        let summary = app.run().unwrap();

        assert_eq!(summary.frames, 230);
        // 失活 3 次循环，最小化 3 次循环
        assert_eq!(summary.iterations, 236);
        assert_eq!(monitor.hazard_count(), 0);
        assert_eq!(monitor.stats().presents, 230);

        let ctx = app.context();
        assert_eq!((ctx.client_width, ctx.client_height), (1024, 768));
        assert!(!ctx.paused);
        assert!(!ctx.minimized);
        assert_eq!(ctx.back_buffer_index, 0);
    }

    #[test]
    fn test_overlay_run_records_panel() {
        let (device, _monitor) = soft_device(0);
        let mut app = Application::new(
            &config(SceneKind::Overlay, 5),
            device,
            Box::new(ScriptedInput::empty()),
        )
        .unwrap();

        app.run().unwrap();

        let overlay = app
            .context()
            .command_list
            .commands()
            .iter()
            .find_map(|c| match c {
                crate::renderer::Command::Overlay { lines } => Some(lines.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(overlay[0], "Hello, world!");
        assert_eq!(app.scene().name(), "overlay");
    }

    #[test]
    fn test_escape_quits() {
        let (device, _monitor) = soft_device(0);
        let mut app = Application::new(
            &config(SceneKind::Init, 0),
            device,
            Box::new(ScriptedInput::new(vec![(3, key_up(KeyCode::Escape))])),
        )
        .unwrap();

        let summary = app.run().unwrap();
        assert_eq!(summary.frames, 3);
    }

    #[test]
    fn test_shapes_wireframe_and_dirty_items() {
        let (device, _monitor) = soft_device(0);
        let config = config(SceneKind::Shapes, 0);
        let mut ctx = AppContext::new(device, &config).unwrap();
        let mut scene = ShapesScene::new(&mut ctx).unwrap();
        let timer = Timer::new();

        scene.initialize(&mut ctx).unwrap();
        assert_eq!(scene.items().len(), 22);
        assert!(scene.items().iter().all(|item| item.dirty.remaining() == 3));

        ctx.input.handle(&InputEvent::KeyDown(KeyboardEvent::new(KeyCode::Digit1)));
        for _ in 0..3 {
            scene.update(&mut ctx, &timer).unwrap();
            scene.draw(&mut ctx, &timer).unwrap();
        }

        assert!(scene.is_wireframe());
        assert_eq!(ctx.command_list.draw_count(), 22);
        assert!(scene.items().iter().all(|item| !item.dirty.is_dirty()));

        // 第一帧使用索引 1，三帧之后回到索引 0
        assert_eq!(scene.ring().current_index(), 0);
        assert_eq!(scene.ring().current().fence_value, ctx.fences.current_value());

        scene.items_mut()[0].set_world(crate::math::matrix::translation(1.0, 0.0, 0.0));
        assert_eq!(scene.items()[0].dirty.remaining(), 3);

        ctx.flush_command_queue().unwrap();
    }

    /// 不等待就复用槽位：写入和分配器重置都会碰到 GPU 仍在使用的资源
    #[test]
    fn test_skipping_ring_wait_is_reported() {
        let (device, monitor) = soft_device(0);
        let mut fences = FenceManager::new(device.fence(), None);
        let mut ring =
            create_frame_ring::<ObjectConstants, PassConstants>(device.as_ref(), 3, 4).unwrap();
        let mut list = CommandList::new("test");

        monitor.set_suspended(true);
        for _ in 0..3 {
            let frame = ring.advance();
            frame.resources.object_cb.copy_data(0, &ObjectConstants::default()).unwrap();
            frame.resources.command_allocator.reset().unwrap();
            list.reset(frame.resources.command_allocator.as_ref(), None).unwrap();
            list.set_constant_buffer(0, frame.resources.object_cb.view(0).unwrap()).unwrap();
            list.close().unwrap();
            device.queue().execute_command_lists(&[&list]).unwrap();
            let value = fences.signal(device.queue()).unwrap();
            frame.stamp(value);
        }
        assert_eq!(monitor.hazard_count(), 0);

        let frame = ring.advance();
        assert!(!frame.is_writable(fences.completed_value()));
        frame.resources.object_cb.copy_data(0, &ObjectConstants::default()).unwrap();
        assert_eq!(monitor.hazard_count(), 1);

        let err = frame.resources.command_allocator.reset().unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::E_FAIL));

        monitor.set_suspended(false);
        fences.flush(device.queue()).unwrap();
        assert_eq!(monitor.in_flight_count(), 0);
    }

    #[test]
    fn test_wait_times_out_on_stalled_gpu() {
        let (device, monitor) = soft_device(0);
        let mut fences = FenceManager::new(device.fence(), Some(Duration::from_millis(50)));

        monitor.set_suspended(true);
        let value = fences.signal(device.queue()).unwrap();

        let err = fences.wait_for_value(value).unwrap_err();
        assert!(matches!(
            err,
            DistRenderError::Graphics(GraphicsError::FenceWait(_))
        ));
        assert!(err.to_string().contains("0x00000102"));

        monitor.set_suspended(false);
        fences.wait_for_value(value).unwrap();
    }

    #[test]
    fn test_device_removal_fails_pending_wait() {
        let (device, monitor) = soft_device(0);
        let mut fences = FenceManager::new(device.fence(), None);

        monitor.set_suspended(true);
        let value = fences.signal(device.queue()).unwrap();

        let remover = monitor.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remover.remove_device(StatusCode::DXGI_ERROR_DEVICE_REMOVED);
        });

        let err = fences.wait_for_value(value).unwrap_err();
        handle.join().unwrap();

        assert_eq!(err.status(), Some(StatusCode::DXGI_ERROR_DEVICE_REMOVED));
        assert!(device.queue().present().is_err());
    }
}
