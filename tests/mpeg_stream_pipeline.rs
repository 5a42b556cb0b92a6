//! 端到端集成测试: MPEG 音频流.
//!
//! 覆盖帧头解析, 坏帧重同步, 缓冲容量单调以及 symphonia 后端.

use std::sync::{Arc, Mutex};

use yin::codec::decoders::mpeg::{ChannelMode, MpegLayer, MpegVersion};
use yin::codec::{FrameSynthesizer, Mp3Decoder, MpegFrame, MpegHeader, StreamDecoder};
use yin::core::{BitReader, YinResult};

/// 记录每帧的帧号与帧体首字节, 输出常量采样
#[derive(Clone, Default)]
struct RecordingSynth {
    seen: Arc<Mutex<Vec<(u64, u8)>>>,
}

impl FrameSynthesizer for RecordingSynth {
    fn synthesize(
        &mut self,
        frame: &MpegFrame<'_>,
        reader: &mut BitReader<'_>,
        out: &mut [f32],
    ) -> YinResult<usize> {
        let first = reader.read_bits(8)? as u8;
        self.seen.lock().unwrap().push((frame.index, first));
        out.fill(first as f32 / 255.0);
        Ok(frame.header.sample_count)
    }
}

fn frame(header: [u8; 4], fill: u8) -> Vec<u8> {
    let parsed = MpegHeader::parse(header).unwrap();
    let mut frame = header.to_vec();
    frame.resize(parsed.frame_length, fill);
    frame
}

fn decode(dec: &mut Mp3Decoder, windows: &[&[u8]]) -> Vec<Vec<f32>> {
    let mut frames = Vec::new();
    for w in windows {
        dec.decode(w, &mut |s: &[f32]| frames.push(s.to_vec()))
            .unwrap();
    }
    frames
}

#[test]
fn test_帧头往返() {
    // sync=0x7FF, 版本 11, 层 01, 无 CRC, 比特率索引 9, 采样率索引 0
    let raw: u32 = (0x7FF << 21) | (0b11 << 19) | (0b01 << 17) | (1 << 16) | (9 << 12);
    let header = MpegHeader::parse_u32(raw).unwrap();
    assert_eq!(header.version, MpegVersion::Version1);
    assert_eq!(header.layer, MpegLayer::Layer3);
    assert_eq!(header.bitrate, 128_000);
    assert_eq!(header.sample_rate, 44100);
    assert_eq!(header.sample_count, 1152);
    assert_eq!(header.frame_length, 144 * 128_000 / 44100);
    assert_eq!(header.mode, ChannelMode::Stereo);
    assert_eq!(header.raw, raw);
}

#[test]
fn test_坏帧夹在两个好帧之间() {
    let good_a = frame([0xFF, 0xFB, 0x90, 0xC0], 0x21);
    let mut bad = frame([0xFF, 0xFB, 0x90, 0xC0], 0x5A);
    bad[1] = 0x00;
    let good_b = frame([0xFF, 0xFB, 0x90, 0xC0], 0x42);

    let mut stream = good_a.clone();
    stream.extend(&bad);
    stream.extend(&good_b);

    let synth = RecordingSynth::default();
    let seen = Arc::clone(&synth.seen);
    let mut dec = Mp3Decoder::with_synthesizer(Box::new(synth));
    let windows: Vec<&[u8]> = stream.chunks(97).collect();
    let out = decode(&mut dec, &windows);

    assert_eq!(out.len(), 2);
    assert!(out[0].iter().all(|&s| s == 0x21 as f32 / 255.0));
    assert!(out[1].iter().all(|&s| s == 0x42 as f32 / 255.0));
    assert_eq!(*seen.lock().unwrap(), vec![(0, 0x21), (1, 0x42)]);
}

#[test]
fn test_带_crc_帧读取起点() {
    // 保护位 0: 帧头后 2 字节 CRC, 位读取器从第 6 字节开始
    let mut f = frame([0xFF, 0xFA, 0x90, 0xC0], 0x30);
    f[4] = 0xAB;
    f[5] = 0xCD;
    let synth = RecordingSynth::default();
    let seen = Arc::clone(&synth.seen);
    let mut dec = Mp3Decoder::with_synthesizer(Box::new(synth));
    decode(&mut dec, &[&f]);
    assert_eq!(*seen.lock().unwrap(), vec![(0, 0x30)]);
}

#[test]
fn test_帧长变化时缓冲单调增长() {
    let mut dec = Mp3Decoder::with_synthesizer(Box::new(RecordingSynth::default()));
    let headers = [
        [0xFF, 0xFB, 0x10, 0xC0], // 32k, 104 字节
        [0xFF, 0xFB, 0xE0, 0x00], // 320k, 1044 字节
        [0xFF, 0xFF, 0xE4, 0xC0], // Layer I 448k@48k, 448 字节, 384 采样
        [0xFF, 0xFB, 0xE0, 0x00],
        [0xFF, 0xFB, 0x10, 0xC0],
    ];
    let mut frame_cap = 0;
    let mut sample_cap = 0;
    for (i, header) in headers.into_iter().enumerate() {
        let fill = 0x10 + i as u8;
        let f = frame(header, fill);
        let expected = MpegHeader::parse(header).unwrap();
        let out = decode(&mut dec, &[&f]);
        assert_eq!(out.len(), 1);
        assert_eq!(
            out[0].len(),
            expected.sample_count * expected.channels() as usize
        );
        assert!(out[0].iter().all(|&s| s == fill as f32 / 255.0));

        let frames = dec.frames();
        assert!(frames.frame_capacity() >= frame_cap);
        assert!(frames.sample_capacity() >= sample_cap);
        frame_cap = frames.frame_capacity();
        sample_cap = frames.sample_capacity();
    }
    assert!(frame_cap >= 1044);
    assert!(sample_cap >= 2304);
}

#[test]
fn test_开头的垃圾字节被跳过() {
    let mut stream = vec![0x00, 0x13, 0xFF, 0x07, 0xFF];
    stream.extend(frame([0xFF, 0xFB, 0x90, 0xC0], 0x66));
    let mut dec = Mp3Decoder::with_synthesizer(Box::new(RecordingSynth::default()));
    let out = decode(&mut dec, &[&stream]);
    assert_eq!(out.len(), 1);
    assert_eq!(dec.sample_rate(), Some(44100));
}

#[cfg(feature = "symphonia-backend")]
#[test]
fn test_注册表创建的解码器合成静音() {
    let registry = yin::default_codec_registry();
    let mut dec = registry
        .create_decoder(yin::codec::CodecId::Mpeg)
        .unwrap();
    assert!(dec.requires_sequential());

    let mut stream = Vec::new();
    for _ in 0..4 {
        stream.extend(frame([0xFF, 0xFB, 0x90, 0xC4], 0));
    }
    let mut total = 0;
    for w in stream.chunks(100) {
        dec.decode(w, &mut |s: &[f32]| {
            assert!(s.iter().all(|v| v.abs() < 1e-6));
            total += s.len();
        })
        .unwrap();
    }
    assert_eq!(total % 1152, 0);
}
