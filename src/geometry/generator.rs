/// 基本几何体生成
///
/// 生成三角形列表形式的盒子、网格平面、球体和圆柱体，左手坐标系，顺时针为正面。

use std::f32::consts::PI;

use super::mesh::MeshData;

/// 最大细分次数
pub const MAX_SUBDIVISIONS: u32 = 6;

/// 几何体生成器
pub struct GeometryGenerator;

impl GeometryGenerator {
    /// 以原点为中心的盒子
    ///
    /// 每个面 4 个独立顶点，再细分 `num_subdivisions` 次（最多 6 次）。
    pub fn create_box(width: f32, height: f32, depth: f32, num_subdivisions: u32) -> MeshData {
        let w = 0.5 * width;
        let h = 0.5 * height;
        let d = 0.5 * depth;

        #[rustfmt::skip]
        let positions = vec![
            // 前面
            [-w, -h, -d], [-w, h, -d], [w, h, -d], [w, -h, -d],
            // 后面
            [-w, -h, d], [w, -h, d], [w, h, d], [-w, h, d],
            // 顶面
            [-w, h, -d], [-w, h, d], [w, h, d], [w, h, -d],
            // 底面
            [-w, -h, -d], [w, -h, -d], [w, -h, d], [-w, -h, d],
            // 左面
            [-w, -h, d], [-w, h, d], [-w, h, -d], [-w, -h, -d],
            // 右面
            [w, -h, -d], [w, h, -d], [w, h, d], [w, -h, d],
        ];

        let indices = (0..6u32)
            .flat_map(|face| {
                let b = face * 4;
                [b, b + 1, b + 2, b, b + 2, b + 3]
            })
            .collect();

        let mut mesh = MeshData { positions, indices };
        for _ in 0..num_subdivisions.min(MAX_SUBDIVISIONS) {
            mesh = Self::subdivide(&mesh);
        }
        mesh
    }

    /// 以原点为中心的球体
    ///
    /// # 参数
    ///
    /// * `radius` - 半径
    /// * `slice_count` - 经线方向的分段数
    /// * `stack_count` - 纬线方向的分段数
    pub fn create_sphere(radius: f32, slice_count: u32, stack_count: u32) -> MeshData {
        let mut positions = vec![[0.0, radius, 0.0]];

        let phi_step = PI / stack_count as f32;
        let theta_step = 2.0 * PI / slice_count as f32;

        // 两极之间的每一圈（两极不是圈）
        for i in 1..stack_count {
            let phi = i as f32 * phi_step;
            for j in 0..=slice_count {
                let theta = j as f32 * theta_step;
                positions.push([
                    radius * phi.sin() * theta.cos(),
                    radius * phi.cos(),
                    radius * phi.sin() * theta.sin(),
                ]);
            }
        }
        positions.push([0.0, -radius, 0.0]);

        let mut indices = Vec::new();

        // 北极
        for i in 1..=slice_count {
            indices.extend_from_slice(&[0, i + 1, i]);
        }

        // 中间各圈，跳过北极顶点
        let base = 1;
        let ring = slice_count + 1;
        for i in 0..stack_count.saturating_sub(2) {
            for j in 0..slice_count {
                indices.extend_from_slice(&[
                    base + i * ring + j,
                    base + i * ring + j + 1,
                    base + (i + 1) * ring + j,
                    base + (i + 1) * ring + j,
                    base + i * ring + j + 1,
                    base + (i + 1) * ring + j + 1,
                ]);
            }
        }

        // 南极
        let south = positions.len() as u32 - 1;
        let base = south - ring;
        for i in 0..slice_count {
            indices.extend_from_slice(&[south, base + i, base + i + 1]);
        }

        MeshData { positions, indices }
    }

    /// 以原点为中心、沿 Y 轴的圆柱体（可以是圆台），带上下盖
    ///
    /// # 参数
    ///
    /// * `bottom_radius` - 底面半径
    /// * `top_radius` - 顶面半径
    /// * `height` - 高度
    /// * `slice_count` - 圆周分段数
    /// * `stack_count` - 高度分段数
    pub fn create_cylinder(
        bottom_radius: f32,
        top_radius: f32,
        height: f32,
        slice_count: u32,
        stack_count: u32,
    ) -> MeshData {
        let stack_height = height / stack_count as f32;
        let radius_step = (top_radius - bottom_radius) / stack_count as f32;
        let d_theta = 2.0 * PI / slice_count as f32;

        let mut positions = Vec::new();
        for i in 0..=stack_count {
            let y = -0.5 * height + i as f32 * stack_height;
            let r = bottom_radius + i as f32 * radius_step;
            for j in 0..=slice_count {
                let theta = j as f32 * d_theta;
                positions.push([r * theta.cos(), y, r * theta.sin()]);
            }
        }

        // 首尾顶点位置重复，纹理坐标不同，所以每圈 slice_count + 1 个顶点
        let ring = slice_count + 1;
        let mut indices = Vec::new();
        for i in 0..stack_count {
            for j in 0..slice_count {
                indices.extend_from_slice(&[
                    i * ring + j,
                    (i + 1) * ring + j,
                    (i + 1) * ring + j + 1,
                    i * ring + j,
                    (i + 1) * ring + j + 1,
                    i * ring + j + 1,
                ]);
            }
        }

        let mut mesh = MeshData { positions, indices };
        Self::build_cylinder_cap(&mut mesh, top_radius, 0.5 * height, slice_count, true);
        Self::build_cylinder_cap(&mut mesh, bottom_radius, -0.5 * height, slice_count, false);
        mesh
    }

    /// XZ 平面上以原点为中心的 m × n 顶点网格
    ///
    /// # 参数
    ///
    /// * `width` - X 方向宽度
    /// * `depth` - Z 方向深度
    /// * `m` - Z 方向顶点行数
    /// * `n` - X 方向顶点列数
    pub fn create_grid(width: f32, depth: f32, m: u32, n: u32) -> MeshData {
        let half_width = 0.5 * width;
        let half_depth = 0.5 * depth;
        let dx = width / (n.max(2) - 1) as f32;
        let dz = depth / (m.max(2) - 1) as f32;

        let mut positions = Vec::with_capacity((m * n) as usize);
        for i in 0..m {
            let z = half_depth - i as f32 * dz;
            for j in 0..n {
                let x = -half_width + j as f32 * dx;
                positions.push([x, 0.0, z]);
            }
        }

        let mut indices = Vec::new();
        for i in 0..m.saturating_sub(1) {
            for j in 0..n.saturating_sub(1) {
                indices.extend_from_slice(&[
                    i * n + j,
                    i * n + j + 1,
                    (i + 1) * n + j,
                    (i + 1) * n + j,
                    i * n + j + 1,
                    (i + 1) * n + j + 1,
                ]);
            }
        }

        MeshData { positions, indices }
    }

    fn build_cylinder_cap(mesh: &mut MeshData, radius: f32, y: f32, slice_count: u32, top: bool) {
        let base = mesh.positions.len() as u32;
        let d_theta = 2.0 * PI / slice_count as f32;

        for i in 0..=slice_count {
            let theta = i as f32 * d_theta;
            mesh.positions.push([radius * theta.cos(), y, radius * theta.sin()]);
        }
        mesh.positions.push([0.0, y, 0.0]);
        let center = mesh.positions.len() as u32 - 1;

        for i in 0..slice_count {
            if top {
                mesh.indices.extend_from_slice(&[center, base + i + 1, base + i]);
            } else {
                mesh.indices.extend_from_slice(&[center, base + i, base + i + 1]);
            }
        }
    }

    /// 每个三角形按边中点分成 4 个
    ///
    /// ```text
    ///        v1
    ///        *
    ///       / \
    ///   m0 *---* m1
    ///     / \ / \
    ///    *---*---*
    ///   v0   m2   v2
    /// ```
    fn subdivide(mesh: &MeshData) -> MeshData {
        let mut out = MeshData::default();
        let midpoint = |a: [f32; 3], b: [f32; 3]| {
            [0.5 * (a[0] + b[0]), 0.5 * (a[1] + b[1]), 0.5 * (a[2] + b[2])]
        };

        for (i, tri) in mesh.indices.chunks_exact(3).enumerate() {
            let v0 = mesh.positions[tri[0] as usize];
            let v1 = mesh.positions[tri[1] as usize];
            let v2 = mesh.positions[tri[2] as usize];

            out.positions.extend_from_slice(&[
                v0,
                v1,
                v2,
                midpoint(v0, v1),
                midpoint(v1, v2),
                midpoint(v0, v2),
            ]);

            let b = i as u32 * 6;
            out.indices.extend_from_slice(&[
                b, b + 3, b + 5,
                b + 3, b + 4, b + 5,
                b + 5, b + 4, b + 2,
                b + 3, b + 1, b + 4,
            ]);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indices_in_range(mesh: &MeshData) -> bool {
        mesh.indices.iter().all(|&i| (i as usize) < mesh.positions.len())
    }

    #[test]
    fn test_box_counts() {
        let mesh = GeometryGenerator::create_box(1.0, 1.0, 1.0, 0);
        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.indices.len(), 36);

        let subdivided = GeometryGenerator::create_box(1.5, 0.5, 1.5, 3);
        assert_eq!(subdivided.triangle_count(), 12 * 64);
        assert!(indices_in_range(&subdivided));
    }

    #[test]
    fn test_sphere_counts() {
        let mesh = GeometryGenerator::create_sphere(0.5, 20, 20);
        assert_eq!(mesh.vertex_count(), 2 + 19 * 21);
        assert_eq!(mesh.indices.len(), 2280);
        assert!(indices_in_range(&mesh));

        for p in &mesh.positions {
            let r = (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt();
            assert!((r - 0.5).abs() < 1e-5);
        }
    }

    #[test]
    fn test_cylinder_counts() {
        let mesh = GeometryGenerator::create_cylinder(0.5, 0.3, 3.0, 20, 20);
        assert_eq!(mesh.vertex_count(), 21 * 21 + 2 * 22);
        assert_eq!(mesh.indices.len(), 20 * 20 * 6 + 2 * 20 * 3);
        assert!(indices_in_range(&mesh));
    }

    #[test]
    fn test_grid_counts() {
        let mesh = GeometryGenerator::create_grid(20.0, 30.0, 60, 40);
        assert_eq!(mesh.vertex_count(), 2400);
        assert_eq!(mesh.indices.len(), 59 * 39 * 6);
        assert!(indices_in_range(&mesh));

        assert_eq!(mesh.positions[0], [-10.0, 0.0, 15.0]);
        let last = mesh.positions[2399];
        assert!((last[0] - 10.0).abs() < 1e-4 && (last[2] + 15.0).abs() < 1e-4);
    }
}
