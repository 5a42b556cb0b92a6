//! MPEG 音频 (Layer I/II/III) 流式解码器.
//!
//! `MpegFrameDecoder` 负责跨调用的帧累积与重同步, 完整帧交给
//! `FrameSynthesizer` 合成 PCM. 码流状态 (比特储备库等) 跨帧延续,
//! 因此同一个流必须按顺序送入同一个实例.

pub mod frame;
pub mod header;
pub mod synth;

use yin_core::{YinError, YinResult};

use crate::codec_id::CodecId;
use crate::decoder::{SampleSink, StreamDecoder};

pub use self::frame::MpegFrameDecoder;
pub use self::header::{ChannelMode, MpegHeader, MpegLayer, MpegVersion};
#[cfg(feature = "symphonia-backend")]
pub use self::synth::SymphoniaSynthesizer;
pub use self::synth::{FrameSynthesizer, MpegFrame};

/// MPEG 音频解码器
pub struct Mp3Decoder {
    frames: MpegFrameDecoder,
}

impl Mp3Decoder {
    /// 使用指定的帧体合成器
    pub fn with_synthesizer(synth: Box<dyn FrameSynthesizer>) -> Self {
        Self {
            frames: MpegFrameDecoder::new(synth),
        }
    }

    /// 使用 symphonia 合成器
    #[cfg(feature = "symphonia-backend")]
    pub fn new() -> Self {
        Self::with_synthesizer(Box::new(SymphoniaSynthesizer::new()))
    }

    /// 注册表工厂函数
    pub fn create() -> YinResult<Box<dyn StreamDecoder>> {
        #[cfg(feature = "symphonia-backend")]
        {
            Ok(Box::new(Self::new()))
        }
        #[cfg(not(feature = "symphonia-backend"))]
        {
            Err(YinError::Unsupported(
                "MPEG 解码需要 symphonia-backend 特性或自定义合成器".into(),
            ))
        }
    }

    /// 帧解码器 (只读, 用于诊断)
    pub fn frames(&self) -> &MpegFrameDecoder {
        &self.frames
    }

    /// 最近一帧的采样率, 尚未解析到帧头时为 `None`
    pub fn sample_rate(&self) -> Option<u32> {
        self.frames.last_header().map(|h| h.sample_rate)
    }

    /// 最近一帧的声道数
    pub fn channels(&self) -> Option<u32> {
        self.frames.last_header().map(MpegHeader::channels)
    }
}

#[cfg(feature = "symphonia-backend")]
impl Default for Mp3Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamDecoder for Mp3Decoder {
    fn codec_id(&self) -> CodecId {
        CodecId::Mpeg
    }

    fn name(&self) -> &str {
        "mpeg"
    }

    fn setup(&mut self, channels: u32, _sample_rate: u32) -> YinResult<()> {
        // 声道数与采样率由帧头决定, 这里只拒绝明显错误的参数
        if channels > 2 {
            return Err(YinError::InvalidArgument(format!(
                "MPEG 音频最多 2 个声道, 收到 {}",
                channels
            )));
        }
        Ok(())
    }

    fn decode(&mut self, data: &[u8], on_samples: &mut SampleSink<'_>) -> YinResult<()> {
        self.frames.feed(data, on_samples)
    }

    fn requires_sequential(&self) -> bool {
        true
    }

    fn reset(&mut self) {
        self.frames.reset();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use yin_core::BitReader;

    /// 确定性合成器: 每个采样取帧体首字节 / 255, 首字节为 0xEE 时报错
    pub(crate) struct FirstByteSynth;

    impl FrameSynthesizer for FirstByteSynth {
        fn synthesize(
            &mut self,
            frame: &MpegFrame<'_>,
            reader: &mut BitReader<'_>,
            out: &mut [f32],
        ) -> YinResult<usize> {
            let first = reader.read_bits(8)?;
            if first == 0xEE {
                return Err(YinError::Codec("坏帧".into()));
            }
            out.fill(first as f32 / 255.0);
            Ok(frame.header.sample_count)
        }
    }

    /// 构造单声道 V1 Layer III 帧 (44100 Hz), 帧体全部填 `fill`
    pub(crate) fn mono_frame(bitrate_index: u8, fill: u8) -> Vec<u8> {
        let header = [0xFF, 0xFB, bitrate_index << 4, 0xC0];
        let parsed = MpegHeader::parse(header).unwrap();
        let mut frame = header.to_vec();
        frame.resize(parsed.frame_length, fill);
        frame
    }

    fn decoder() -> Mp3Decoder {
        Mp3Decoder::with_synthesizer(Box::new(FirstByteSynth))
    }

    fn run(dec: &mut Mp3Decoder, windows: &[&[u8]]) -> Vec<Vec<f32>> {
        let mut frames = Vec::new();
        for w in windows {
            dec.decode(w, &mut |s: &[f32]| frames.push(s.to_vec()))
                .unwrap();
        }
        frames
    }

    #[test]
    fn test_单帧解码() {
        let mut dec = decoder();
        let frame = mono_frame(9, 0x80);
        let out = run(&mut dec, &[&frame]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].len(), 1152);
        assert_eq!(out[0][0], 0x80 as f32 / 255.0);
        assert_eq!(dec.sample_rate(), Some(44100));
        assert_eq!(dec.channels(), Some(1));
        assert!(dec.requires_sequential());
    }

    #[test]
    fn test_帧未到齐不输出() {
        let mut dec = decoder();
        let frame = mono_frame(9, 0x10);
        let out = run(&mut dec, &[&frame[..3], &frame[3..200]]);
        assert!(out.is_empty());
        assert!(dec.frames().has_pending());
        let out = run(&mut dec, &[&frame[200..]]);
        assert_eq!(out.len(), 1);
        assert!(!dec.frames().has_pending());
    }

    #[test]
    fn test_逐字节输入结果一致() {
        let mut stream = mono_frame(9, 0x20);
        stream.extend(mono_frame(1, 0x40));
        stream.extend(mono_frame(14, 0x60));

        let whole = run(&mut decoder(), &[&stream]);
        let bytes: Vec<&[u8]> = stream.chunks(1).collect();
        let split = run(&mut decoder(), &bytes);
        assert_eq!(whole.len(), 3);
        assert_eq!(whole, split);
    }

    #[test]
    fn test_坏同步字重同步() {
        let mut stream = mono_frame(9, 0x20);
        let mut bad = mono_frame(9, 0x30);
        bad[0] = 0x12;
        bad[1] = 0x34;
        stream.extend(&bad);
        stream.extend(mono_frame(9, 0x40));

        let mut dec = decoder();
        let out = run(&mut dec, &[&stream]);
        let firsts: Vec<f32> = out.iter().map(|f| f[0]).collect();
        assert_eq!(firsts, vec![0x20 as f32 / 255.0, 0x40 as f32 / 255.0]);
        assert_eq!(dec.frames().frame_index(), 2);
    }

    #[test]
    fn test_合成失败只丢弃该帧() {
        let mut stream = mono_frame(9, 0xEE);
        stream.extend(mono_frame(9, 0x40));
        let out = run(&mut decoder(), &[&stream]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0][0], 0x40 as f32 / 255.0);
    }

    #[test]
    fn test_缓冲容量单调() {
        let mut dec = decoder();
        let mut last = 0;
        for (index, fill) in [(14u8, 1u8), (1, 2), (9, 3), (1, 4)] {
            let frame = mono_frame(index, fill);
            let out = run(&mut dec, &[&frame]);
            assert_eq!(out.len(), 1);
            assert!(out[0].iter().all(|&s| s == fill as f32 / 255.0));
            let cap = dec.frames().frame_capacity();
            assert!(cap >= last);
            assert!(cap >= frame.len());
            last = cap;
        }
    }

    #[test]
    fn test_跳过_id3v2_标签() {
        let mut stream = b"ID3\x04\x00\x00\x00\x00\x00\x05".to_vec();
        stream.extend_from_slice(&[0xFF; 5]);
        stream.extend(mono_frame(9, 0x50));
        let split: Vec<&[u8]> = stream.chunks(3).collect();
        let out = run(&mut decoder(), &split);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0][0], 0x50 as f32 / 255.0);
    }

    #[test]
    fn test_reset_丢弃半帧() {
        let mut dec = decoder();
        let frame = mono_frame(9, 0x10);
        run(&mut dec, &[&frame[..100]]);
        dec.reset();
        let out = run(&mut dec, &[&frame]);
        assert_eq!(out.len(), 1);
        assert_eq!(dec.frames().frame_index(), 1);
    }

    #[cfg(feature = "symphonia-backend")]
    #[test]
    fn test_symphonia_合成静音帧() {
        // 全零帧体: 主数据为空, 合成结果为静音
        let mut dec = Mp3Decoder::new();
        let mut stream = Vec::new();
        for _ in 0..3 {
            let mut frame = vec![0xFF, 0xFB, 0x90, 0xC4];
            frame.resize(417, 0);
            stream.extend(frame);
        }
        let mut total = 0usize;
        dec.decode(&stream, &mut |s: &[f32]| {
            assert!(s.iter().all(|v| v.abs() < 1e-6));
            total += s.len();
        })
        .unwrap();
        assert_eq!(total % 1152, 0);
        assert_eq!(dec.frames().frame_index(), 3);
    }
}
