//! 统一的数学库模块
//!
//! 基于 `nalgebra` 的类型别名和演示场景需要的几个辅助函数。
//!
//! # 约定
//!
//! - 左手坐标系，+Y 向上，相机看向 +Z
//! - 列向量：`clip = proj * view * world * v`
//! - 投影矩阵的深度范围为 [0, 1]

pub use nalgebra::{
    Matrix4 as Mat4, Point3, Vector2 as Vec2, Vector3 as Vec3, Vector4 as Vec4,
};

// 类型别名，使用更简洁的名称
pub type Vector2 = Vec2<f32>;
pub type Vector3 = Vec3<f32>;
pub type Vector4 = Vec4<f32>;
pub type Matrix4 = Mat4<f32>;

/// 颜色类型（RGBA，范围 0.0-1.0）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    /// 创建新的颜色
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// 转换为数组，用于顶点和清屏颜色
    pub fn to_array(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    // 预定义颜色
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0, 1.0);
    pub const RED: Color = Color::new(1.0, 0.0, 0.0, 1.0);
    pub const GREEN: Color = Color::new(0.0, 0.5, 0.0, 1.0);
    pub const BLUE: Color = Color::new(0.0, 0.0, 1.0, 1.0);
    pub const YELLOW: Color = Color::new(1.0, 1.0, 0.0, 1.0);
    pub const CYAN: Color = Color::new(0.0, 1.0, 1.0, 1.0);
    pub const MAGENTA: Color = Color::new(1.0, 0.0, 1.0, 1.0);
    pub const DARK_GREEN: Color = Color::new(0.0, 0.392, 0.0, 1.0);
    pub const FOREST_GREEN: Color = Color::new(0.133, 0.545, 0.133, 1.0);
    pub const STEEL_BLUE: Color = Color::new(0.275, 0.510, 0.706, 1.0);
    pub const CRIMSON: Color = Color::new(0.863, 0.078, 0.235, 1.0);
    pub const LIGHT_STEEL_BLUE: Color = Color::new(0.690, 0.769, 0.871, 1.0);
}

/// 数学常量
pub mod constants {
    /// π
    pub const PI: f32 = std::f32::consts::PI;

    /// π/2
    pub const HALF_PI: f32 = std::f32::consts::FRAC_PI_2;

    /// 角度转弧度的系数
    pub const DEG_TO_RAD: f32 = PI / 180.0;
}

/// 数学工具函数
pub mod utils {
    use super::*;

    /// 限制值在范围内
    pub fn clamp<T: PartialOrd>(value: T, min: T, max: T) -> T {
        if value < min {
            min
        } else if value > max {
            max
        } else {
            value
        }
    }

    /// 角度转弧度
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// 检查两个浮点数是否近似相等
    pub fn approx_eq(a: f32, b: f32, epsilon: f32) -> bool {
        (a - b).abs() < epsilon
    }

    /// 球坐标转笛卡尔坐标（+Y 向上）
    ///
    /// # 参数
    ///
    /// * `radius` - 半径
    /// * `theta` - 在 XZ 平面上与 +X 的夹角
    /// * `phi` - 与 +Y 的夹角
    pub fn spherical_to_cartesian(radius: f32, theta: f32, phi: f32) -> Vector3 {
        Vector3::new(
            radius * phi.sin() * theta.cos(),
            radius * phi.cos(),
            radius * phi.sin() * theta.sin(),
        )
    }
}

/// 矩阵辅助函数
pub mod matrix {
    use super::*;

    /// 创建平移矩阵
    pub fn translation(x: f32, y: f32, z: f32) -> Matrix4 {
        Matrix4::new_translation(&Vector3::new(x, y, z))
    }

    /// 创建缩放矩阵
    pub fn scaling(x: f32, y: f32, z: f32) -> Matrix4 {
        Matrix4::new_nonuniform_scaling(&Vector3::new(x, y, z))
    }

    /// 左手坐标系的观察矩阵
    pub fn look_at_lh(eye: &Vector3, target: &Vector3, up: &Vector3) -> Matrix4 {
        Matrix4::look_at_lh(&Point3::from(*eye), &Point3::from(*target), up)
    }

    /// 左手坐标系的透视投影矩阵，深度映射到 [0, 1]
    ///
    /// # 参数
    ///
    /// * `fov_y` - 垂直视场角（弧度）
    /// * `aspect` - 宽高比
    /// * `near` - 近平面
    /// * `far` - 远平面
    pub fn perspective_fov_lh(fov_y: f32, aspect: f32, near: f32, far: f32) -> Matrix4 {
        let h = 1.0 / (fov_y * 0.5).tan();
        let w = h / aspect;
        let range = far / (far - near);

        #[rustfmt::skip]
        let m = Matrix4::new(
            w,   0.0, 0.0,   0.0,
            0.0, h,   0.0,   0.0,
            0.0, 0.0, range, -range * near,
            0.0, 0.0, 1.0,   0.0,
        );
        m
    }

    /// 求逆，不可逆时返回单位矩阵
    pub fn inverse(m: &Matrix4) -> Matrix4 {
        m.try_inverse().unwrap_or_else(Matrix4::identity)
    }

    /// 按列展开，用于写入常量缓冲区
    pub fn to_array(m: &Matrix4) -> [[f32; 4]; 4] {
        (*m).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spherical_to_cartesian() {
        let p = utils::spherical_to_cartesian(5.0, 1.5 * constants::PI, constants::HALF_PI);
        assert!(utils::approx_eq(p.x, 0.0, 1e-5));
        assert!(utils::approx_eq(p.y, 0.0, 1e-5));
        assert!(utils::approx_eq(p.z, -5.0, 1e-5));
    }

    #[test]
    fn test_perspective_depth_range() {
        let proj = matrix::perspective_fov_lh(0.25 * constants::PI, 1.0, 1.0, 1000.0);

        let near = proj * Vector4::new(0.0, 0.0, 1.0, 1.0);
        let far = proj * Vector4::new(0.0, 0.0, 1000.0, 1.0);
        assert!(utils::approx_eq(near.z / near.w, 0.0, 1e-5));
        assert!(utils::approx_eq(far.z / far.w, 1.0, 1e-5));
    }

    #[test]
    fn test_look_at_lh_maps_target_to_positive_z() {
        let eye = Vector3::new(0.0, 0.0, -5.0);
        let view = matrix::look_at_lh(&eye, &Vector3::zeros(), &Vector3::y());
        let target = view * Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert!(utils::approx_eq(target.z, 5.0, 1e-5));
    }

    #[test]
    fn test_clamp() {
        assert_eq!(utils::clamp(0.05, 0.1, 1.0), 0.1);
        assert_eq!(utils::clamp(2.0, 0.1, 1.0), 1.0);
        assert_eq!(utils::clamp(0.5, 0.1, 1.0), 0.5);
    }
}
