//! 解码器实现模块.

pub mod mixed;
pub mod mpeg;
pub mod opus;
pub mod pcm;
pub mod wav;

use crate::codec_id::CodecId;
use crate::registry::CodecRegistry;

/// 注册所有内置解码器
///
/// 混合传输需要内部解码器, 不在此注册, 见 `CodecRegistry::create_mixed_decoder`.
pub fn register_all_decoders(registry: &mut CodecRegistry) {
    registry.register_decoder(CodecId::PcmU8, "pcm_u8", pcm::PcmDecoder::new_u8);
    registry.register_decoder(CodecId::PcmS16le, "pcm_s16le", pcm::PcmDecoder::new_s16le);
    registry.register_decoder(CodecId::PcmS24le, "pcm_s24le", pcm::PcmDecoder::new_s24le);
    registry.register_decoder(CodecId::PcmS32le, "pcm_s32le", pcm::PcmDecoder::new_s32le);
    registry.register_decoder(CodecId::PcmF32le, "pcm_f32le", pcm::PcmDecoder::new_f32le);
    registry.register_decoder(CodecId::Wav, "wav", wav::WavDecoder::create);
    registry.register_decoder(CodecId::Mpeg, "mpeg", mpeg::Mp3Decoder::create);
    registry.register_decoder(CodecId::Opus, "opus", opus::OpusDecoder::create);
}
