//! MPEG 帧体合成.
//!
//! 帧解码器只负责帧头解析与字节累积, 完整帧交给 `FrameSynthesizer`
//! 还原为 PCM. 默认后端基于 symphonia 的 MPEG 音频解码器.

use yin_core::{BitReader, YinResult};

use super::header::MpegHeader;

/// 一个完整的 MPEG 帧
#[derive(Debug, Clone, Copy)]
pub struct MpegFrame<'a> {
    /// 已解析的帧头
    pub header: &'a MpegHeader,
    /// 整帧字节 (含帧头与 CRC)
    pub data: &'a [u8],
    /// 帧序号, 仅用于诊断
    pub index: u64,
}

/// 帧体合成器
pub trait FrameSynthesizer: Send {
    /// 合成一帧, 将交错采样写入 `out`
    ///
    /// `reader` 已定位在帧头 (及 CRC) 之后. `out` 的长度为
    /// `sample_count * channels`. 返回写入的每声道采样数.
    fn synthesize(
        &mut self,
        frame: &MpegFrame<'_>,
        reader: &mut BitReader<'_>,
        out: &mut [f32],
    ) -> YinResult<usize>;

    /// 清空跨帧状态 (比特储备库, 重叠缓冲等)
    fn reset(&mut self) {}
}

#[cfg(feature = "symphonia-backend")]
pub use self::symphonia_backend::SymphoniaSynthesizer;

#[cfg(feature = "symphonia-backend")]
mod symphonia_backend {
    use log::debug;
    use symphonia_bundle_mp3::MpaDecoder as SymMpaDecoder;
    use symphonia_core::audio::SampleBuffer;
    use symphonia_core::codecs::{
        CODEC_TYPE_MP1, CODEC_TYPE_MP2, CODEC_TYPE_MP3, CodecParameters as SymCodecParameters,
        Decoder as SymDecoderTrait, DecoderOptions as SymDecoderOptions,
    };
    use symphonia_core::formats::Packet as SymPacket;
    use yin_core::{BitReader, YinError, YinResult};

    use super::{FrameSynthesizer, MpegFrame};
    use crate::decoders::mpeg::header::MpegLayer;

    /// 基于 symphonia-bundle-mp3 的合成器
    ///
    /// symphonia 解码器按层创建, 流中途切换层时重建.
    #[derive(Default)]
    pub struct SymphoniaSynthesizer {
        decoder: Option<(MpegLayer, SymMpaDecoder)>,
        /// 复用的交错输出缓冲
        interleaved: Option<SampleBuffer<f32>>,
        /// 已送入的采样数, 作为 symphonia 包时间戳
        next_ts: u64,
    }

    impl SymphoniaSynthesizer {
        pub fn new() -> Self {
            Self::default()
        }
    }

    /// 取出与当前层匹配的 symphonia 解码器, 层变化时重建
    fn decoder_for(
        slot: &mut Option<(MpegLayer, SymMpaDecoder)>,
        layer: MpegLayer,
    ) -> YinResult<&mut SymMpaDecoder> {
        if !matches!(slot, Some((current, _)) if *current == layer) {
            let codec = match layer {
                MpegLayer::Layer1 => CODEC_TYPE_MP1,
                MpegLayer::Layer2 => CODEC_TYPE_MP2,
                MpegLayer::Layer3 => CODEC_TYPE_MP3,
            };
            let params = SymCodecParameters {
                codec,
                ..Default::default()
            };
            let decoder = SymMpaDecoder::try_new(&params, &SymDecoderOptions::default())
                .map_err(|e| YinError::Codec(format!("symphonia MPEG 解码器初始化失败: {e}")))?;
            debug!("创建 symphonia 解码器: {:?}", layer);
            *slot = Some((layer, decoder));
        }
        match slot.as_mut() {
            Some((_, decoder)) => Ok(decoder),
            None => Err(YinError::Internal("symphonia 解码器未初始化".into())),
        }
    }

    impl FrameSynthesizer for SymphoniaSynthesizer {
        /// symphonia 自带比特流解析, 直接消费完整的 `frame.data`, 不使用 `reader`
        fn synthesize(
            &mut self,
            frame: &MpegFrame<'_>,
            _reader: &mut BitReader<'_>,
            out: &mut [f32],
        ) -> YinResult<usize> {
            let ts = self.next_ts;
            let duration = frame.header.sample_count as u64;
            self.next_ts += duration;

            let decoder = decoder_for(&mut self.decoder, frame.header.layer)?;
            let packet = SymPacket::new_from_slice(0, ts, duration, frame.data);
            let decoded = decoder
                .decode(&packet)
                .map_err(|e| YinError::Codec(format!("帧 {} 合成失败: {e}", frame.index)))?;

            let spec = *decoded.spec();
            let capacity = decoded.capacity() as u64;
            let reuse = self
                .interleaved
                .as_ref()
                .is_some_and(|buf| buf.capacity() as u64 >= capacity * spec.channels.count() as u64);
            if !reuse {
                self.interleaved = Some(SampleBuffer::<f32>::new(capacity, spec));
            }
            let Some(buf) = self.interleaved.as_mut() else {
                return Ok(0);
            };
            buf.copy_interleaved_ref(decoded);

            let samples = buf.samples();
            let copied = samples.len().min(out.len());
            out[..copied].copy_from_slice(&samples[..copied]);
            let channels = frame.header.channels().max(1) as usize;
            Ok(copied / channels)
        }

        fn reset(&mut self) {
            if let Some((_, decoder)) = self.decoder.as_mut() {
                decoder.reset();
            }
            self.next_ts = 0;
        }
    }
}
