//! 几何体演示
//!
//! 盒子、网格平面以及两排圆柱和球体共享一个合并网格。
//! 每帧的常量写入帧资源环的当前槽位，CPU 最多领先 GPU 环大小帧，
//! 只在复用槽位前等待。

use tracing::{debug, trace};

use crate::app::AppContext;
use crate::component::{OrbitCamera, ZoomSettings};
use crate::core::error::Result;
use crate::core::event::{InputEvent, KeyCode};
use crate::core::timer::Timer;
use crate::geometry::{GeometryGenerator, MeshData, MeshGeometry, SubmeshGeometry, Vertex};
use crate::gfx::GraphicsDevice;
use crate::math::{constants::PI, matrix, Color, Matrix4};
use crate::renderer::{
    create_frame_ring, FrameResourcePool, FrameUploads, PipelineDesc, PipelineHandle,
};

use super::constants::{ObjectConstants, PassConstants};
use super::render_item::RenderItem;
use super::{drive_orbit_camera, Scene};

/// 对象常量绑定槽
const OBJECT_CB_SLOT: u32 = 0;
/// Pass 常量绑定槽
const PASS_CB_SLOT: u32 = 1;

/// 每排圆柱和球体的数量
const COLUMN_ROWS: usize = 5;

type ShapesFrame = FrameUploads<ObjectConstants, PassConstants>;

/// 几何体场景
pub struct ShapesScene {
    ring: FrameResourcePool<ShapesFrame>,
    geometry: MeshGeometry,
    items: Vec<RenderItem>,
    opaque_pipeline: PipelineHandle,
    wireframe_pipeline: PipelineHandle,
    camera: OrbitCamera,
    wireframe: bool,
    main_pass: PassConstants,
}

impl ShapesScene {
    /// 创建几何体、渲染项、帧资源环和管线
    pub fn new(ctx: &mut AppContext) -> Result<Self> {
        let device = ctx.device.as_ref();
        let frame_resource_count = ctx.frame_resource_count;

        let geometry = build_shape_geometry(device)?;
        let items = build_render_items(&geometry, frame_resource_count)?;
        let ring = create_frame_ring(device, frame_resource_count, items.len())?;

        let opaque_pipeline = device.create_pipeline_state(&PipelineDesc::solid("opaque"))?;
        let wireframe_pipeline =
            device.create_pipeline_state(&PipelineDesc::wireframe("opaque_wireframe"))?;

        debug!(
            render_items = items.len(),
            frame_resources = frame_resource_count,
            "Shapes scene built"
        );

        let camera = OrbitCamera::new(1.5 * PI, 0.2 * PI, 15.0, ZoomSettings::SHAPES);
        let main_pass = PassConstants::build(&camera, ctx.client_width, ctx.client_height, 0.0, 0.0);

        Ok(Self {
            ring,
            geometry,
            items,
            opaque_pipeline,
            wireframe_pipeline,
            camera,
            wireframe: false,
            main_pass,
        })
    }

    pub fn ring(&self) -> &FrameResourcePool<ShapesFrame> {
        &self.ring
    }

    pub fn items(&self) -> &[RenderItem] {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut [RenderItem] {
        &mut self.items
    }

    pub fn is_wireframe(&self) -> bool {
        self.wireframe
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    /// 本帧的 Pass 常量
    pub fn main_pass(&self) -> &PassConstants {
        &self.main_pass
    }

    /// 只写入仍然脏的对象常量
    fn update_object_cbs(&mut self) -> Result<()> {
        let frame = self.ring.current_mut();
        for item in self.items.iter_mut().filter(|item| item.dirty.is_dirty()) {
            frame
                .resources
                .object_cb
                .copy_data(item.obj_cb_index, &ObjectConstants::new(item.world()))?;
            item.dirty.consume();
        }
        Ok(())
    }

    fn update_main_pass_cb(&mut self, ctx: &AppContext, timer: &Timer) -> Result<()> {
        self.main_pass = PassConstants::build(
            &self.camera,
            ctx.client_width,
            ctx.client_height,
            timer.total_time(),
            timer.delta_time(),
        );
        self.ring
            .current_mut()
            .resources
            .pass_cb
            .copy_data(0, &self.main_pass)
    }
}

impl Scene for ShapesScene {
    fn name(&self) -> &str {
        "shapes"
    }

    fn initialize(&mut self, ctx: &mut AppContext) -> Result<()> {
        self.resize(ctx)?;
        ctx.flush_command_queue()
    }

    fn resize(&mut self, ctx: &mut AppContext) -> Result<()> {
        self.camera.set_lens(0.25 * PI, ctx.aspect_ratio(), 1.0, 1000.0);
        Ok(())
    }

    fn update(&mut self, ctx: &mut AppContext, timer: &Timer) -> Result<()> {
        self.wireframe = ctx.input.is_key_down(KeyCode::Digit1);

        // 循环到下一个帧资源，GPU 还没用完就等待
        let frame = self.ring.advance_and_wait(&ctx.fences)?;
        trace!(
            frame_index = frame.frame_index,
            fence_value = frame.fence_value.value(),
            "Frame resource acquired"
        );

        self.update_object_cbs()?;
        self.update_main_pass_cb(ctx, timer)
    }

    fn draw(&mut self, ctx: &mut AppContext, _timer: &Timer) -> Result<()> {
        let frame = self.ring.current_mut();
        let uploads = &mut frame.resources;

        // 只有 GPU 执行完这个分配器上的命令才能 reset，advance_and_wait 已经保证
        uploads.command_allocator.reset()?;

        let pipeline = if self.wireframe {
            self.wireframe_pipeline
        } else {
            self.opaque_pipeline
        };
        ctx.command_list
            .reset(uploads.command_allocator.as_ref(), Some(pipeline))?;

        let list = &mut ctx.command_list;
        list.set_viewport(ctx.client_width, ctx.client_height)?;
        list.clear_render_target(Color::LIGHT_STEEL_BLUE.to_array())?;
        list.clear_depth_stencil(1.0, 0)?;
        list.set_constant_buffer(PASS_CB_SLOT, uploads.pass_cb.view(0)?)?;
        list.set_vertex_buffer(self.geometry.vertex_buffer_view())?;
        list.set_index_buffer(self.geometry.index_buffer_view())?;

        for item in &self.items {
            list.set_constant_buffer(OBJECT_CB_SLOT, uploads.object_cb.view(item.obj_cb_index)?)?;
            list.draw_indexed(
                item.submesh.index_count,
                item.submesh.start_index_location,
                item.submesh.base_vertex_location,
            )?;
        }
        list.close()?;

        ctx.execute()?;
        ctx.present()?;

        // 标记到这个值为止的命令，复用本槽位前需要等待它
        let fence_value = ctx.fences.signal(ctx.device.queue())?;
        frame.stamp(fence_value);
        Ok(())
    }

    fn on_input(&mut self, ctx: &mut AppContext, event: &InputEvent) -> Result<()> {
        drive_orbit_camera(&mut self.camera, ctx, event);
        Ok(())
    }
}

/// 生成四种几何体并合并到一个顶点/索引缓冲区
fn build_shape_geometry(device: &dyn GraphicsDevice) -> Result<MeshGeometry> {
    let parts: [(&str, MeshData, Color); 4] = [
        ("box", GeometryGenerator::create_box(1.5, 0.5, 1.5, 3), Color::DARK_GREEN),
        ("grid", GeometryGenerator::create_grid(20.0, 30.0, 60, 40), Color::FOREST_GREEN),
        ("sphere", GeometryGenerator::create_sphere(0.5, 20, 20), Color::CRIMSON),
        (
            "cylinder",
            GeometryGenerator::create_cylinder(0.5, 0.3, 3.0, 20, 20),
            Color::STEEL_BLUE,
        ),
    ];

    let mut vertices = Vec::new();
    let mut indices = Vec::new();
    let mut submeshes = Vec::with_capacity(parts.len());

    for (name, mesh, color) in &parts {
        submeshes.push((
            *name,
            SubmeshGeometry {
                index_count: mesh.indices.len() as u32,
                start_index_location: indices.len() as u32,
                base_vertex_location: vertices.len() as i32,
            },
        ));
        vertices.extend(mesh.positions.iter().map(|p| Vertex::new(*p, *color)));
        indices.extend(mesh.indices16()?);
    }

    let mut geometry = MeshGeometry::upload(device, "shapes", &vertices, &indices)?;
    for (name, submesh) in submeshes {
        geometry.add_submesh(name, submesh);
    }
    Ok(geometry)
}

/// 摆放渲染项，对象常量索引按创建顺序分配
fn build_render_items(geometry: &MeshGeometry, frame_resource_count: usize) -> Result<Vec<RenderItem>> {
    let mut items = Vec::with_capacity(2 + COLUMN_ROWS * 4);

    items.push(RenderItem::new(
        matrix::translation(0.0, 0.5, 0.0) * matrix::scaling(2.0, 2.0, 2.0),
        0,
        geometry.submesh("box")?,
        frame_resource_count,
    ));
    items.push(RenderItem::new(
        Matrix4::identity(),
        1,
        geometry.submesh("grid")?,
        frame_resource_count,
    ));

    let cylinder = geometry.submesh("cylinder")?;
    let sphere = geometry.submesh("sphere")?;

    for i in 0..COLUMN_ROWS {
        let z = -10.0 + i as f32 * 5.0;
        let placements = [
            (matrix::translation(-5.0, 1.5, z), cylinder),
            (matrix::translation(5.0, 1.5, z), cylinder),
            (matrix::translation(-5.0, 3.5, z), sphere),
            (matrix::translation(5.0, 3.5, z), sphere),
        ];
        for (world, submesh) in placements {
            let obj_cb_index = items.len();
            items.push(RenderItem::new(world, obj_cb_index, submesh, frame_resource_count));
        }
    }

    Ok(items)
}
