/// 几何体模块
///
/// 程序化生成的基本几何体和上传到 GPU 的网格。
///
/// # 模块结构
///
/// - `vertex`: 顶点数据结构定义
/// - `mesh`: 网格数据、子网格和 GPU 网格
/// - `generator`: 盒子、网格平面、球体、圆柱体生成
///
/// # 架构设计
///
/// ```text
/// GeometryGenerator
///     ↓
/// MeshData (CPU侧数据)
///     ↓ 着色、合并
/// MeshGeometry (上传缓冲区 + 子网格绘制参数)
/// ```

pub mod generator;
pub mod mesh;
pub mod vertex;

// 重新导出常用类型
pub use generator::GeometryGenerator;
pub use mesh::{MeshData, MeshGeometry, SubmeshGeometry};
pub use vertex::Vertex;
