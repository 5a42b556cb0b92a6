//! # yin-core
//!
//! Yin 音频解码框架核心库, 提供基础类型定义、错误处理和位流读取.

pub mod bitreader;
pub mod error;
pub mod sample_format;

// 重导出常用类型
pub use bitreader::BitReader;
pub use error::{YinError, YinResult};
pub use sample_format::SampleFormat;
