//! 渲染项
//!
//! 绘制一个物体所需的参数：世界矩阵、在对象常量缓冲区中的位置和子网格。

use crate::geometry::SubmeshGeometry;
use crate::math::Matrix4;
use crate::renderer::DirtyCounter;

/// 渲染项
#[derive(Debug, Clone)]
pub struct RenderItem {
    /// 世界矩阵
    world: Matrix4,

    /// 在对象常量缓冲区中的元素索引
    pub obj_cb_index: usize,

    /// 绘制参数
    pub submesh: SubmeshGeometry,

    /// 还需要写入多少个帧资源
    pub dirty: DirtyCounter,
}

impl RenderItem {
    /// 新渲染项需要写入全部帧资源
    pub fn new(
        world: Matrix4,
        obj_cb_index: usize,
        submesh: SubmeshGeometry,
        frame_resource_count: usize,
    ) -> Self {
        Self {
            world,
            obj_cb_index,
            submesh,
            dirty: DirtyCounter::new(frame_resource_count),
        }
    }

    pub fn world(&self) -> &Matrix4 {
        &self.world
    }

    /// 修改世界矩阵，所有帧资源都要重新写入
    pub fn set_world(&mut self, world: Matrix4) {
        self.world = world;
        self.dirty.mark_dirty();
    }
}
