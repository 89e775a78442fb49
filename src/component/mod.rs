//! 组件模块
//!
//! 演示场景共用的相机组件。

mod camera;

pub use camera::{OrbitCamera, ZoomSettings, ROTATE_DEGREES_PER_PIXEL};
