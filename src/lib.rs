//! # Yin (音)
//!
//! 纯 Rust 实现的流式多编解码音频解码框架.
//!
//! 传输层以任意大小的字节窗口送入数据, 解码器在窗口之间保留未完成的
//! 帧, 每完成一帧就以浮点采样回调输出:
//! - **PCM / WAV**: 原始小端采样与 RIFF 封装
//! - **MPEG**: Layer I/II/III 帧解析, 逐字节重同步
//! - **Opus**: 8 字节长度前缀封装
//! - **混合传输**: 二进制音频与 JSON 元数据交错的单一字节流
//!
//! # 快速开始
//!
//! ```rust
//! use yin::codec::{CodecId, StreamDecoder};
//!
//! let registry = yin::default_codec_registry();
//! let mut decoder = registry.create_decoder(CodecId::PcmS16le).unwrap();
//!
//! let mut samples = Vec::new();
//! for window in [&[0x00u8, 0x40, 0x00][..], &[0xC0][..]] {
//!     decoder
//!         .decode(window, &mut |s: &[f32]| samples.extend_from_slice(s))
//!         .unwrap();
//! }
//! assert_eq!(samples, vec![0.5, -0.5]);
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `yin-core` | 错误类型, 位读取器, 采样格式 |
//! | `yin-codec` | 解码器契约, 注册表, 各格式解码器 |

/// 核心类型与工具
pub use yin_core as core;

/// 解码器框架
pub use yin_codec as codec;

pub mod config;
pub mod logging;

/// 获取 Yin 版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// 创建已注册所有内置解码器的注册表
pub fn default_codec_registry() -> yin_codec::CodecRegistry {
    let mut registry = yin_codec::CodecRegistry::new();
    yin_codec::register_all(&mut registry);
    registry
}
