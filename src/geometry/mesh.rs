/// 网格数据结构模块
///
/// - [`MeshData`]：CPU 侧的位置和索引
/// - [`SubmeshGeometry`]：合并网格中一个子网格的绘制参数
/// - [`MeshGeometry`]：上传到 GPU 的合并网格，按名称查找子网格

use std::collections::HashMap;

use tracing::debug;

use super::vertex::Vertex;
use crate::core::error::{DistRenderError, GraphicsError, Result};
use crate::gfx::backend::GraphicsDevice;
use crate::renderer::command::BufferView;
use crate::renderer::resource::{BufferUsageType, UploadBuffer};

/// CPU侧网格数据
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    /// 顶点位置
    pub positions: Vec<[f32; 3]>,

    /// 三角形列表索引
    pub indices: Vec<u32>,
}

impl MeshData {
    /// 顶点数量
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// 三角形数量
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// 转换为 16 位索引
    ///
    /// 顶点数超过 65536 时返回错误。
    pub fn indices16(&self) -> Result<Vec<u16>> {
        self.indices
            .iter()
            .map(|&i| {
                u16::try_from(i).map_err(|_| {
                    DistRenderError::from(GraphicsError::ResourceCreation(format!(
                        "index {} does not fit in 16 bits",
                        i
                    )))
                })
            })
            .collect()
    }
}

/// 子网格的绘制参数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmeshGeometry {
    /// 索引数量
    pub index_count: u32,
    /// 在合并索引缓冲区中的起始位置
    pub start_index_location: u32,
    /// 加到每个索引上的顶点偏移
    pub base_vertex_location: i32,
}

/// 上传到 GPU 的网格
pub struct MeshGeometry {
    /// 名称
    pub name: String,
    vertex_buffer: UploadBuffer<Vertex>,
    index_buffer: UploadBuffer<u16>,
    draw_args: HashMap<String, SubmeshGeometry>,
}

impl MeshGeometry {
    /// 创建并写入顶点和索引缓冲区
    ///
    /// 只在初始化时写入一次，之后 GPU 只读。
    pub fn upload(
        device: &dyn GraphicsDevice,
        name: &str,
        vertices: &[Vertex],
        indices: &[u16],
    ) -> Result<Self> {
        let mut vertex_buffer = UploadBuffer::new(
            device,
            vertices.len(),
            BufferUsageType::Vertex,
            &format!("{} vertices", name),
        )?;
        vertex_buffer.copy_slice(0, vertices)?;

        let mut index_buffer = UploadBuffer::new(
            device,
            indices.len(),
            BufferUsageType::Index,
            &format!("{} indices", name),
        )?;
        index_buffer.copy_slice(0, indices)?;

        debug!(
            name,
            vertices = vertices.len(),
            indices = indices.len(),
            "Mesh uploaded"
        );

        Ok(Self {
            name: name.to_string(),
            vertex_buffer,
            index_buffer,
            draw_args: HashMap::new(),
        })
    }

    /// 注册子网格
    pub fn add_submesh(&mut self, name: impl Into<String>, submesh: SubmeshGeometry) {
        self.draw_args.insert(name.into(), submesh);
    }

    /// 按名称查找子网格
    pub fn submesh(&self, name: &str) -> Result<SubmeshGeometry> {
        self.draw_args.get(name).copied().ok_or_else(|| {
            GraphicsError::ResourceCreation(format!(
                "mesh '{}' has no submesh '{}'",
                self.name, name
            ))
            .into()
        })
    }

    /// 顶点缓冲区视图
    pub fn vertex_buffer_view(&self) -> BufferView {
        self.vertex_buffer.full_view()
    }

    /// 索引缓冲区视图
    pub fn index_buffer_view(&self) -> BufferView {
        self.index_buffer.full_view()
    }

    /// 顶点缓冲区字节大小
    pub fn vertex_buffer_byte_size(&self) -> u64 {
        self.vertex_buffer.total_size()
    }

    /// 索引数量
    pub fn index_count(&self) -> u32 {
        self.index_buffer.element_count() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices16() {
        let mesh = MeshData {
            positions: vec![[0.0; 3]; 3],
            indices: vec![0, 1, 2],
        };
        assert_eq!(mesh.indices16().unwrap(), vec![0u16, 1, 2]);
        assert_eq!(mesh.triangle_count(), 1);

        let too_big = MeshData {
            positions: Vec::new(),
            indices: vec![70_000],
        };
        assert!(too_big.indices16().is_err());
    }
}
