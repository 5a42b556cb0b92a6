//! # yin-codec
//!
//! Yin 音频解码框架的解码器库: 解码器契约, 注册表, 以及各编码格式的
//! 流式解码器.
//!
//! ## 支持的格式
//!
//! - **PCM**: U8 / S16LE / S24LE / S32LE / F32LE, 无头部
//! - **WAV**: RIFF 封装的 PCM
//! - **MPEG**: Layer I/II/III, MPEG-1/2/2.5
//! - **Opus**: 8 字节长度前缀封装
//! - **混合传输**: 二进制音频与 JSON 元数据交错
//!
//! ## 使用示例
//!
//! ```rust
//! use yin_codec::{CodecId, CodecRegistry};
//!
//! let mut reg = CodecRegistry::new();
//! yin_codec::register_all(&mut reg);
//!
//! let mut decoder = reg.create_decoder(CodecId::PcmS16le).unwrap();
//! let mut samples = Vec::new();
//! decoder
//!     .decode(&[0x00, 0x40, 0x00], &mut |s: &[f32]| samples.extend_from_slice(s))
//!     .unwrap();
//! assert_eq!(samples, vec![0.5]);
//! ```

pub mod buffer;
pub mod codec_id;
pub mod decoder;
pub mod decoders;
pub mod registry;

// 重导出常用类型
pub use buffer::GrowBuffer;
pub use codec_id::CodecId;
pub use decoder::{SampleSink, StreamDecoder};
pub use decoders::mixed::{Chunk, ChunkSplitter, MetadataSink, MixedChunkDecoder, MixedOptions};
pub use decoders::mpeg::{FrameSynthesizer, Mp3Decoder, MpegFrame, MpegHeader};
pub use decoders::opus::{OpusDecoder, OpusOptions, OpusPacketDecoder};
pub use decoders::pcm::PcmDecoder;
pub use decoders::wav::WavDecoder;
pub use registry::{CodecRegistry, DecoderFactory};

/// 注册所有内置解码器
pub fn register_all(registry: &mut CodecRegistry) {
    decoders::register_all_decoders(registry);
}
