//! 常量缓冲区记录
//!
//! 所有矩阵按列存储（nalgebra 的内存布局）。

use bytemuck::{Pod, Zeroable};

use crate::component::OrbitCamera;
use crate::math::{matrix, Matrix4};

/// 每个物体的常量
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ObjectConstants {
    pub world: [[f32; 4]; 4],
}

impl ObjectConstants {
    pub fn new(world: &Matrix4) -> Self {
        Self {
            world: matrix::to_array(world),
        }
    }
}

impl Default for ObjectConstants {
    fn default() -> Self {
        Self::new(&Matrix4::identity())
    }
}

/// 单个盒子场景的常量：世界-观察-投影矩阵
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct WorldViewProjConstants {
    pub world_view_proj: [[f32; 4]; 4],
}

/// 每个 Pass 的常量
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PassConstants {
    pub view: [[f32; 4]; 4],
    pub inv_view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub inv_proj: [[f32; 4]; 4],
    pub view_proj: [[f32; 4]; 4],
    pub inv_view_proj: [[f32; 4]; 4],
    pub eye_pos_w: [f32; 3],
    pub _pad0: f32,
    pub render_target_size: [f32; 2],
    pub inv_render_target_size: [f32; 2],
    pub near_z: f32,
    pub far_z: f32,
    pub total_time: f32,
    pub delta_time: f32,
}

impl PassConstants {
    /// 由相机、渲染目标尺寸和时间填充
    pub fn build(
        camera: &OrbitCamera,
        width: u32,
        height: u32,
        total_time: f32,
        delta_time: f32,
    ) -> Self {
        let view = camera.view_matrix();
        let proj = camera.proj_matrix();
        let view_proj = proj * view;
        let eye = camera.position();
        let (w, h) = (width.max(1) as f32, height.max(1) as f32);

        Self {
            view: matrix::to_array(&view),
            inv_view: matrix::to_array(&matrix::inverse(&view)),
            proj: matrix::to_array(&proj),
            inv_proj: matrix::to_array(&matrix::inverse(&proj)),
            view_proj: matrix::to_array(&view_proj),
            inv_view_proj: matrix::to_array(&matrix::inverse(&view_proj)),
            eye_pos_w: [eye.x, eye.y, eye.z],
            _pad0: 0.0,
            render_target_size: [w, h],
            inv_render_target_size: [1.0 / w, 1.0 / h],
            near_z: camera.near_z(),
            far_z: camera.far_z(),
            total_time,
            delta_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ZoomSettings;
    use crate::renderer::calc_constant_buffer_byte_size;

    #[test]
    fn test_constant_sizes() {
        assert_eq!(std::mem::size_of::<ObjectConstants>(), 64);
        assert_eq!(std::mem::size_of::<PassConstants>(), 432);
        assert_eq!(calc_constant_buffer_byte_size(432), 512);
    }

    #[test]
    fn test_pass_constants() {
        let camera = OrbitCamera::new(1.5 * std::f32::consts::PI, 0.2 * std::f32::consts::PI, 15.0, ZoomSettings::SHAPES);
        let pass = PassConstants::build(&camera, 800, 600, 2.0, 0.016);

        assert_eq!(pass.render_target_size, [800.0, 600.0]);
        assert_eq!(pass.inv_render_target_size, [1.0 / 800.0, 1.0 / 600.0]);
        assert_eq!(pass.near_z, 1.0);
        assert_eq!(pass.far_z, 1000.0);
        assert_eq!(pass.total_time, 2.0);

        let eye = camera.position();
        assert_eq!(pass.eye_pos_w, [eye.x, eye.y, eye.z]);
    }
}
