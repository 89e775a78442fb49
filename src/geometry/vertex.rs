/// 顶点定义模块
///
/// 演示场景使用的带颜色顶点。

use bytemuck::{Pod, Zeroable};

use crate::math::Color;

/// 位置 + 颜色顶点
///
/// 内存布局与GPU兼容，使用 `#[repr(C)]` 保证顺序和对齐。
///
/// # 内存布局
///
/// - position: 12 bytes (3 * f32)
/// - color: 16 bytes (4 * f32)
/// - **总计**: 28 bytes
#[repr(C)]
#[derive(Default, Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// 顶点位置 (x, y, z)
    pub position: [f32; 3],

    /// 顶点颜色 (r, g, b, a)
    pub color: [f32; 4],
}

impl Vertex {
    /// 创建一个新的顶点
    #[inline]
    pub fn new(position: [f32; 3], color: Color) -> Self {
        Self {
            position,
            color: color.to_array(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_layout() {
        assert_eq!(std::mem::size_of::<Vertex>(), 28);

        let v = Vertex::new([1.0, 2.0, 3.0], Color::RED);
        let bytes = bytemuck::bytes_of(&v);
        assert_eq!(bytes.len(), 28);
        assert_eq!(v.color, [1.0, 0.0, 0.0, 1.0]);
    }
}
