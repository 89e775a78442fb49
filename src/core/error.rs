//! 错误处理模块
//!
//! 定义了引擎中使用的统一错误类型。
//!
//! # 设计原则
//!
//! - 为每种错误类型提供清晰的上下文信息
//! - 图形后端的失败统一携带后端状态码（类似 HRESULT）
//! - 支持错误链（error source）
//! - 易于模式匹配和错误处理

use std::fmt;

use crate::gfx::backend::StatusCode;

/// 引擎统一的 Result 类型
///
/// 所有可能返回错误的函数都应该使用这个类型。
pub type Result<T> = std::result::Result<T, DistRenderError>;

/// 引擎的错误类型
///
/// 包含了运行过程中可能遇到的各种错误情况。
/// 除配置错误外，这一层代码不尝试从错误中恢复，只负责尽早、清晰地失败。
#[derive(Debug)]
pub enum DistRenderError {
    /// 配置错误
    Config(ConfigError),

    /// 图形 API 错误
    Graphics(GraphicsError),

    /// IO 错误
    Io(std::io::Error),

    /// 初始化错误
    Initialization(String),

    /// 运行时错误
    Runtime(String),
}

/// 配置相关的错误
#[derive(Debug)]
pub enum ConfigError {
    /// 配置文件未找到
    FileNotFound(String),

    /// 配置文件解析失败
    ParseError(String),

    /// 配置值无效
    InvalidValue { field: String, reason: String },
}

/// 图形 API 相关的错误
#[derive(Debug)]
pub enum GraphicsError {
    /// 后端调用返回了失败状态码
    Backend { status: StatusCode, context: String },

    /// 设备创建失败
    DeviceCreation(String),

    /// 资源创建失败
    ResourceCreation(String),

    /// 命令列表状态错误（例如未 reset 就记录命令）
    CommandRecording(String),

    /// 写入越界
    OutOfBounds { index: usize, count: usize },

    /// Fence 等待失败（超时或等待原语不可用）
    FenceWait(String),
}

impl GraphicsError {
    /// 以状态码构造后端错误
    pub fn backend(status: StatusCode, context: impl Into<String>) -> Self {
        GraphicsError::Backend {
            status,
            context: context.into(),
        }
    }

    /// 后端状态码（如果有）
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            GraphicsError::Backend { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl DistRenderError {
    /// 错误携带的后端状态码（如果有）
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            DistRenderError::Graphics(e) => e.status(),
            _ => None,
        }
    }
}

impl fmt::Display for DistRenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistRenderError::Config(e) => write!(f, "Configuration error: {}", e),
            DistRenderError::Graphics(e) => write!(f, "Graphics error: {}", e),
            DistRenderError::Io(e) => write!(f, "IO error: {}", e),
            DistRenderError::Initialization(msg) => write!(f, "Initialization error: {}", msg),
            DistRenderError::Runtime(msg) => write!(f, "Runtime error: {}", msg),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {}", path),
            ConfigError::ParseError(msg) => write!(f, "Failed to parse config: {}", msg),
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "Invalid value for '{}': {}", field, reason)
            }
        }
    }
}

impl fmt::Display for GraphicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphicsError::Backend { status, context } => {
                write!(f, "Failure with status {} ({})", status, context)
            }
            GraphicsError::DeviceCreation(msg) => write!(f, "Device creation failed: {}", msg),
            GraphicsError::ResourceCreation(msg) => write!(f, "Resource creation failed: {}", msg),
            GraphicsError::CommandRecording(msg) => write!(f, "Command recording failed: {}", msg),
            GraphicsError::OutOfBounds { index, count } => {
                write!(f, "Element index {} out of bounds (element count {})", index, count)
            }
            GraphicsError::FenceWait(msg) => write!(f, "Fence wait failed: {}", msg),
        }
    }
}

impl std::error::Error for DistRenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DistRenderError::Io(e) => Some(e),
            DistRenderError::Config(e) => Some(e),
            DistRenderError::Graphics(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for ConfigError {}
impl std::error::Error for GraphicsError {}

// 实现 From trait 以便于错误转换
impl From<std::io::Error> for DistRenderError {
    fn from(err: std::io::Error) -> Self {
        DistRenderError::Io(err)
    }
}

impl From<ConfigError> for DistRenderError {
    fn from(err: ConfigError) -> Self {
        DistRenderError::Config(err)
    }
}

impl From<GraphicsError> for DistRenderError {
    fn from(err: GraphicsError) -> Self {
        DistRenderError::Graphics(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_carries_status() {
        let err: DistRenderError =
            GraphicsError::backend(StatusCode::DXGI_ERROR_DEVICE_REMOVED, "wait for fence 3").into();
        assert_eq!(err.status(), Some(StatusCode::DXGI_ERROR_DEVICE_REMOVED));

        let text = err.to_string();
        assert!(text.contains("0x887A0005"));
        assert!(text.contains("wait for fence 3"));
    }

    #[test]
    fn test_non_backend_error_has_no_status() {
        let err: DistRenderError = ConfigError::ParseError("bad".to_string()).into();
        assert_eq!(err.status(), None);
        assert!(std::error::Error::source(&err).is_some());
    }
}
