//! Camera 组件
//!
//! 绕原点旋转的轨道相机，用球坐标 (θ, φ, r) 描述位置。
//! 鼠标左键拖拽旋转，右键拖拽缩放。

use std::f32::consts::PI;

use crate::math::{matrix, utils, Matrix4, Vector3};

/// 每像素旋转的角度（度）
pub const ROTATE_DEGREES_PER_PIXEL: f32 = 0.25;

/// 拖拽缩放参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomSettings {
    /// 每像素改变的距离
    pub units_per_pixel: f32,
    /// 最小半径
    pub min_radius: f32,
    /// 最大半径
    pub max_radius: f32,
}

impl ZoomSettings {
    /// 单个盒子的缩放范围
    pub const BOX: ZoomSettings = ZoomSettings {
        units_per_pixel: 0.005,
        min_radius: 3.0,
        max_radius: 15.0,
    };

    /// 多物体场景的缩放范围
    pub const SHAPES: ZoomSettings = ZoomSettings {
        units_per_pixel: 0.05,
        min_radius: 5.0,
        max_radius: 150.0,
    };
}

/// 轨道相机
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    /// 在 XZ 平面上与 +X 的夹角
    theta: f32,

    /// 与 +Y 的夹角
    phi: f32,

    /// 到原点的距离
    radius: f32,

    zoom: ZoomSettings,

    /// 垂直视场角（弧度）
    fov_y: f32,
    near_z: f32,
    far_z: f32,
    aspect: f32,
}

impl OrbitCamera {
    /// φ 的下限
    pub const MIN_PHI: f32 = 0.1;
    /// φ 的上限
    pub const MAX_PHI: f32 = PI - 0.1;

    /// 创建相机
    ///
    /// 默认透视投影：FOV=45度，aspect=1.0，near=1.0，far=1000.0
    pub fn new(theta: f32, phi: f32, radius: f32, zoom: ZoomSettings) -> Self {
        let mut camera = Self {
            theta,
            phi: 0.0,
            radius: utils::clamp(radius, zoom.min_radius, zoom.max_radius),
            zoom,
            fov_y: 0.25 * PI,
            near_z: 1.0,
            far_z: 1000.0,
            aspect: 1.0,
        };
        camera.set_phi(phi);
        camera
    }

    /// 设置投影参数
    pub fn set_lens(&mut self, fov_y: f32, aspect: f32, near_z: f32, far_z: f32) {
        self.fov_y = fov_y;
        self.aspect = aspect;
        self.near_z = near_z;
        self.far_z = far_z;
    }

    /// 左键拖拽：每像素旋转 0.25 度
    pub fn rotate(&mut self, dx_pixels: f32, dy_pixels: f32) {
        let dx = utils::deg_to_rad(ROTATE_DEGREES_PER_PIXEL * dx_pixels);
        let dy = utils::deg_to_rad(ROTATE_DEGREES_PER_PIXEL * dy_pixels);

        self.theta += dx;
        self.set_phi(self.phi + dy);
    }

    /// 右键拖拽：改变到原点的距离
    pub fn zoom(&mut self, dx_pixels: f32, dy_pixels: f32) {
        let dx = self.zoom.units_per_pixel * dx_pixels;
        let dy = self.zoom.units_per_pixel * dy_pixels;

        self.radius = utils::clamp(
            self.radius + dx - dy,
            self.zoom.min_radius,
            self.zoom.max_radius,
        );
    }

    /// 设置 φ，限制在 [0.1, π - 0.1]
    pub fn set_phi(&mut self, phi: f32) {
        self.phi = utils::clamp(phi, Self::MIN_PHI, Self::MAX_PHI);
    }

    pub fn theta(&self) -> f32 {
        self.theta
    }

    pub fn phi(&self) -> f32 {
        self.phi
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn near_z(&self) -> f32 {
        self.near_z
    }

    pub fn far_z(&self) -> f32 {
        self.far_z
    }

    /// 相机位置
    pub fn position(&self) -> Vector3 {
        utils::spherical_to_cartesian(self.radius, self.theta, self.phi)
    }

    /// 看向原点的视图矩阵
    pub fn view_matrix(&self) -> Matrix4 {
        matrix::look_at_lh(&self.position(), &Vector3::zeros(), &Vector3::y())
    }

    /// 投影矩阵
    pub fn proj_matrix(&self) -> Matrix4 {
        matrix::perspective_fov_lh(self.fov_y, self.aspect, self.near_z, self.far_z)
    }
}
