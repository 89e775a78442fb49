//! 事件系统模块
//!
//! 定义窗口层交给场景的输入事件。窗口系统本身不在本 crate 中，
//! 事件来源（脚本或真实窗口）只需要产生这里的类型。
//!
//! # 设计说明
//!
//! 事件是封闭的枚举 [`InputEvent`]，场景通过模式匹配处理，
//! 类型标识在编译时确定，不需要运行时分发。
//!
//! # 使用示例
//!
//! ```
//! use frame_pacing::core::event::*;
//!
//! let event = InputEvent::MouseMove(MouseMoveEvent::new(120.0, 80.0, MouseButtons::LEFT));
//!
//! match event {
//!     InputEvent::MouseMove(e) if e.buttons.left => println!("拖拽到 ({}, {})", e.x, e.y),
//!     InputEvent::KeyDown(e) => println!("按键按下: {:?}", e.key_code),
//!     other => println!("其他事件: {}", other),
//! }
//! ```

use std::fmt;

/// 鼠标按钮枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// 左键（主按钮）
    ///
    /// 拖拽时绕目标旋转相机
    Left,

    /// 右键（次按钮）
    ///
    /// 拖拽时缩放相机距离
    Right,

    /// 中键（滚轮按钮）
    Middle,
}

/// 鼠标移动时按住的按钮
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MouseButtons {
    pub left: bool,
    pub right: bool,
    pub middle: bool,
}

impl MouseButtons {
    /// 没有按钮按下
    pub const NONE: MouseButtons = MouseButtons { left: false, right: false, middle: false };
    /// 仅左键
    pub const LEFT: MouseButtons = MouseButtons { left: true, right: false, middle: false };
    /// 仅右键
    pub const RIGHT: MouseButtons = MouseButtons { left: false, right: true, middle: false };

    /// 指定按钮是否按下
    pub fn contains(&self, button: MouseButton) -> bool {
        match button {
            MouseButton::Left => self.left,
            MouseButton::Right => self.right,
            MouseButton::Middle => self.middle,
        }
    }

    /// 设置按钮状态
    pub fn set(&mut self, button: MouseButton, down: bool) {
        match button {
            MouseButton::Left => self.left = down,
            MouseButton::Right => self.right = down,
            MouseButton::Middle => self.middle = down,
        }
    }
}

/// 键盘按键枚举（简化版本）
///
/// 仅包含演示场景用到的按键，其他按键使用 `Other` 变体。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// 数字键 1
    ///
    /// 按住时使用线框管线
    Digit1,

    /// 方向键
    Up, Down, Left, Right,

    /// 空格键
    ///
    /// 叠加层面板的按钮
    Space,

    /// Escape 键
    ///
    /// 退出程序
    Escape,

    /// Enter 键（回车键）
    Enter,

    /// 其他按键
    ///
    /// 参数为平台相关的虚拟键码
    Other(u32),
}

/// 鼠标按钮事件
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouseButtonEvent {
    /// 触发事件的按钮
    pub button: MouseButton,

    /// 鼠标 X 坐标（像素）
    ///
    /// 相对于窗口客户区左上角的水平位置
    pub x: f32,

    /// 鼠标 Y 坐标（像素）
    pub y: f32,
}

impl MouseButtonEvent {
    /// 创建鼠标按钮事件
    ///
    /// # 参数
    ///
    /// * `button` - 鼠标按钮
    /// * `x` - 鼠标 X 坐标
    /// * `y` - 鼠标 Y 坐标
    pub fn new(button: MouseButton, x: f32, y: f32) -> Self {
        Self { button, x, y }
    }
}

/// 鼠标移动事件
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouseMoveEvent {
    /// 鼠标 X 坐标（像素）
    pub x: f32,

    /// 鼠标 Y 坐标（像素）
    pub y: f32,

    /// 移动时按住的按钮
    pub buttons: MouseButtons,
}

impl MouseMoveEvent {
    /// 创建鼠标移动事件
    pub fn new(x: f32, y: f32, buttons: MouseButtons) -> Self {
        Self { x, y, buttons }
    }
}

/// 键盘事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyboardEvent {
    /// 按键码
    pub key_code: KeyCode,
}

impl KeyboardEvent {
    pub fn new(key_code: KeyCode) -> Self {
        Self { key_code }
    }
}

/// 窗口调整大小事件
///
/// 宽高都为 0 表示窗口被最小化。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowResizeEvent {
    /// 新的客户区宽度（像素）
    pub width: u32,

    /// 新的客户区高度（像素）
    pub height: u32,
}

impl WindowResizeEvent {
    /// 创建窗口调整大小事件
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// 是否为最小化
    pub fn is_minimized(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// 宽高比
    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            return 1.0;
        }
        self.width as f32 / self.height as f32
    }
}

/// 输入事件
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    MouseDown(MouseButtonEvent),
    MouseUp(MouseButtonEvent),
    MouseMove(MouseMoveEvent),
    KeyDown(KeyboardEvent),
    KeyUp(KeyboardEvent),
}

impl InputEvent {
    /// 事件名称，用于日志
    pub fn name(&self) -> &'static str {
        match self {
            InputEvent::MouseDown(_) => "MouseButtonDown",
            InputEvent::MouseUp(_) => "MouseButtonUp",
            InputEvent::MouseMove(_) => "MouseMove",
            InputEvent::KeyDown(_) => "KeyDown",
            InputEvent::KeyUp(_) => "KeyUp",
        }
    }
}

impl fmt::Display for InputEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputEvent::MouseDown(e) | InputEvent::MouseUp(e) => {
                write!(f, "{}: {:?} at ({}, {})", self.name(), e.button, e.x, e.y)
            }
            InputEvent::MouseMove(e) => write!(f, "{}: ({}, {})", self.name(), e.x, e.y),
            InputEvent::KeyDown(e) | InputEvent::KeyUp(e) => {
                write!(f, "{}: {:?}", self.name(), e.key_code)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mouse_buttons() {
        let mut buttons = MouseButtons::NONE;
        assert!(!buttons.contains(MouseButton::Left));

        buttons.set(MouseButton::Right, true);
        assert_eq!(buttons, MouseButtons::RIGHT);

        buttons.set(MouseButton::Right, false);
        buttons.set(MouseButton::Left, true);
        assert_eq!(buttons, MouseButtons::LEFT);
    }

    #[test]
    fn test_resize_minimized() {
        assert!(WindowResizeEvent::new(0, 0).is_minimized());
        assert!(!WindowResizeEvent::new(800, 600).is_minimized());
        assert_eq!(WindowResizeEvent::new(800, 400).aspect_ratio(), 2.0);
    }

    #[test]
    fn test_event_display() {
        let event = InputEvent::KeyDown(KeyboardEvent::new(KeyCode::Digit1));
        assert_eq!(event.to_string(), "KeyDown: Digit1");

        let event = InputEvent::MouseDown(MouseButtonEvent::new(MouseButton::Left, 1.0, 2.0));
        assert_eq!(event.to_string(), "MouseButtonDown: Left at (1, 2)");
    }
}
