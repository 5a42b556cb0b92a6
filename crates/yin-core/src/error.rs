//! 统一错误类型定义.
//!
//! 所有 Yin crate 共用的错误类型, 支持跨模块传播.

use thiserror::Error;

/// Yin 框架统一错误类型
#[derive(Debug, Error)]
pub enum YinError {
    /// 无效参数
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 不支持的操作
    #[error("不支持的操作: {0}")]
    Unsupported(String),

    /// 编解码器错误
    #[error("编解码器错误: {0}")]
    Codec(String),

    /// 码流格式错误 (同步字, 版本, 层, 帧长等帧头字段非法)
    #[error("格式错误: {0}")]
    Format(String),

    /// 无效数据 (损坏的帧体等)
    #[error("无效数据: {0}")]
    InvalidData(String),

    /// 读取越过已缓冲帧的末尾
    #[error("已到达数据末尾")]
    Eof,

    /// I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 未找到指定的编解码器
    #[error("未找到编解码器: {0}")]
    CodecNotFound(String),

    /// 内部错误 (不应发生)
    #[error("内部错误: {0}")]
    Internal(String),
}

/// Yin 框架统一 Result 类型
pub type YinResult<T> = Result<T, YinError>;
