//! 彩色立方体演示
//!
//! 一个对象常量缓冲区保存世界-观察-投影矩阵。
//! 每帧提交后刷新队列，所以 `update` 写入常量时 GPU 一定已经空闲。

use tracing::trace;

use crate::app::AppContext;
use crate::component::{OrbitCamera, ZoomSettings};
use crate::core::error::Result;
use crate::core::event::InputEvent;
use crate::core::timer::Timer;
use crate::geometry::{MeshGeometry, SubmeshGeometry, Vertex};
use crate::math::{constants::PI, matrix, Color, Matrix4};
use crate::renderer::{BufferUsageType, PipelineDesc, PipelineHandle, UploadBuffer};

use super::constants::WorldViewProjConstants;
use super::{drive_orbit_camera, Scene};

/// 立方体的 8 个顶点
fn box_vertices() -> [Vertex; 8] {
    [
        Vertex::new([-1.0, -1.0, -1.0], Color::WHITE),
        Vertex::new([-1.0, 1.0, -1.0], Color::BLACK),
        Vertex::new([1.0, 1.0, -1.0], Color::RED),
        Vertex::new([1.0, -1.0, -1.0], Color::GREEN),
        Vertex::new([-1.0, -1.0, 1.0], Color::BLUE),
        Vertex::new([-1.0, 1.0, 1.0], Color::YELLOW),
        Vertex::new([1.0, 1.0, 1.0], Color::CYAN),
        Vertex::new([1.0, -1.0, 1.0], Color::MAGENTA),
    ]
}

#[rustfmt::skip]
const BOX_INDICES: [u16; 36] = [
    // 前
    0, 1, 2,
    0, 2, 3,
    // 后
    4, 6, 5,
    4, 7, 6,
    // 左
    4, 5, 1,
    4, 1, 0,
    // 右
    3, 2, 6,
    3, 6, 7,
    // 上
    1, 5, 6,
    1, 6, 2,
    // 下
    4, 0, 3,
    4, 3, 7,
];

/// 立方体场景
pub struct BoxScene {
    camera: OrbitCamera,
    geometry: MeshGeometry,
    object_cb: UploadBuffer<WorldViewProjConstants>,
    pipeline: PipelineHandle,
    world: Matrix4,
}

impl BoxScene {
    /// 创建几何体、常量缓冲区和管线
    pub fn new(ctx: &mut AppContext) -> Result<Self> {
        let device = ctx.device.as_ref();

        let mut geometry = MeshGeometry::upload(device, "box", &box_vertices(), &BOX_INDICES)?;
        geometry.add_submesh(
            "box",
            SubmeshGeometry {
                index_count: BOX_INDICES.len() as u32,
                start_index_location: 0,
                base_vertex_location: 0,
            },
        );

        let object_cb = UploadBuffer::new(device, 1, BufferUsageType::Constant, "box constants")?;
        let pipeline = device.create_pipeline_state(&PipelineDesc::solid("box"))?;

        Ok(Self {
            camera: OrbitCamera::new(1.5 * PI, 0.25 * PI, 5.0, ZoomSettings::BOX),
            geometry,
            object_cb,
            pipeline,
            world: Matrix4::identity(),
        })
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut OrbitCamera {
        &mut self.camera
    }

    /// 记录本帧命令，命令列表保持打开
    pub(crate) fn record(&mut self, ctx: &mut AppContext) -> Result<()> {
        ctx.direct_allocator.reset()?;
        ctx.command_list
            .reset(ctx.direct_allocator.as_ref(), Some(self.pipeline))?;

        let list = &mut ctx.command_list;
        list.set_viewport(ctx.client_width, ctx.client_height)?;
        list.clear_render_target(Color::LIGHT_STEEL_BLUE.to_array())?;
        list.clear_depth_stencil(1.0, 0)?;
        list.set_vertex_buffer(self.geometry.vertex_buffer_view())?;
        list.set_index_buffer(self.geometry.index_buffer_view())?;
        list.set_constant_buffer(0, self.object_cb.view(0)?)?;

        let submesh = self.geometry.submesh("box")?;
        list.draw_indexed(
            submesh.index_count,
            submesh.start_index_location,
            submesh.base_vertex_location,
        )
    }

    /// 关闭、提交、呈现并刷新队列
    pub(crate) fn submit(&mut self, ctx: &mut AppContext) -> Result<()> {
        ctx.command_list.close()?;
        ctx.execute()?;
        ctx.present()?;
        ctx.flush_command_queue()
    }
}

impl Scene for BoxScene {
    fn name(&self) -> &str {
        "box"
    }

    fn initialize(&mut self, ctx: &mut AppContext) -> Result<()> {
        self.resize(ctx)?;
        ctx.flush_command_queue()
    }

    fn resize(&mut self, ctx: &mut AppContext) -> Result<()> {
        self.camera.set_lens(0.25 * PI, ctx.aspect_ratio(), 1.0, 1000.0);
        Ok(())
    }

    fn update(&mut self, _ctx: &mut AppContext, _timer: &Timer) -> Result<()> {
        let world_view_proj =
            self.camera.proj_matrix() * self.camera.view_matrix() * self.world;
        self.object_cb.copy_data(
            0,
            &WorldViewProjConstants {
                world_view_proj: matrix::to_array(&world_view_proj),
            },
        )
    }

    fn draw(&mut self, ctx: &mut AppContext, _timer: &Timer) -> Result<()> {
        self.record(ctx)?;
        self.submit(ctx)
    }

    fn on_input(&mut self, ctx: &mut AppContext, event: &InputEvent) -> Result<()> {
        drive_orbit_camera(&mut self.camera, ctx, event);
        trace!(
            theta = self.camera.theta(),
            phi = self.camera.phi(),
            radius = self.camera.radius(),
            "Camera"
        );
        Ok(())
    }
}
