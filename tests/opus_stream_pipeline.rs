//! 端到端集成测试: 长度前缀 Opus 流.
//!
//! Opus 原语以测试替身注入, 只验证封装层的行为.

use std::sync::{Arc, Mutex};

use yin::codec::{CodecId, OpusDecoder, OpusOptions, OpusPacketDecoder, StreamDecoder};
use yin::core::{YinError, YinResult};

/// 记录收到的包, 每包输出 `samples` 个立体声采样
struct PacketLog {
    packets: Arc<Mutex<Vec<Vec<u8>>>>,
    samples: usize,
}

impl OpusPacketDecoder for PacketLog {
    fn decode_float(&mut self, packet: &[u8], out: &mut [f32]) -> YinResult<usize> {
        self.packets.lock().unwrap().push(packet.to_vec());
        out[..self.samples * 2].fill(0.25);
        Ok(self.samples)
    }

    fn channels(&self) -> u32 {
        2
    }
}

fn decoder(options: OpusOptions) -> (OpusDecoder, Arc<Mutex<Vec<Vec<u8>>>>) {
    let packets = Arc::new(Mutex::new(Vec::new()));
    let primitive = PacketLog {
        packets: Arc::clone(&packets),
        samples: 960,
    };
    (
        OpusDecoder::with_primitive(options, Box::new(primitive)),
        packets,
    )
}

fn framed(payload: &[u8]) -> Vec<u8> {
    let mut out = (payload.len() as u32).to_be_bytes().to_vec();
    out.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
    out.extend_from_slice(payload);
    out
}

#[test]
fn test_长度5的帧完整解码一次() {
    let (mut dec, packets) = decoder(OpusOptions::default());
    let stream = [0x00, 0x00, 0x00, 0x05, 0x01, 0x02, 0x03, 0x04, 10, 11, 12, 13, 14];

    let mut calls = Vec::new();
    dec.decode_window(&stream, 0, 6, &mut |s: &[f32]| calls.push(s.len()))
        .unwrap();
    assert!(calls.is_empty());
    dec.decode_window(&stream, 6, 7, &mut |s: &[f32]| calls.push(s.len()))
        .unwrap();

    assert_eq!(calls, vec![960 * 2]);
    assert_eq!(*packets.lock().unwrap(), vec![vec![10, 11, 12, 13, 14]]);
}

#[test]
fn test_保留字节不影响解码() {
    let (mut dec, packets) = decoder(OpusOptions::default());
    let mut stream = framed(&[1, 2, 3]);
    stream[4..8].copy_from_slice(&[0xFF; 4]);
    dec.decode(&stream, &mut |_: &[f32]| {}).unwrap();
    assert_eq!(packets.lock().unwrap().len(), 1);
}

#[test]
fn test_超过上限的帧长是格式错误() {
    let (mut dec, packets) = decoder(OpusOptions::default());
    let mut stream = framed(&[7; 10]);
    stream.extend_from_slice(&4001u32.to_be_bytes());
    stream.extend_from_slice(&[0; 4]);

    let mut frames = 0;
    let err = dec
        .decode(&stream, &mut |_: &[f32]| frames += 1)
        .unwrap_err();
    assert!(matches!(err, YinError::Format(_)));
    // 错误之前的帧已正常投递
    assert_eq!(frames, 1);
    assert_eq!(packets.lock().unwrap().len(), 1);

    // 流失效, 合法数据也不再接受
    let err = dec.decode(&framed(&[1]), &mut |_: &[f32]| {}).unwrap_err();
    assert!(matches!(err, YinError::Format(_)));
    assert_eq!(packets.lock().unwrap().len(), 1);
}

#[test]
fn test_多帧跨窗口() {
    let (mut dec, packets) = decoder(OpusOptions::default());
    let mut stream = Vec::new();
    for len in 1..=20u8 {
        stream.extend(framed(&vec![len; len as usize]));
    }
    let mut frames = 0;
    for w in stream.chunks(13) {
        dec.decode(w, &mut |_: &[f32]| frames += 1).unwrap();
    }
    assert_eq!(frames, 20);
    let packets = packets.lock().unwrap();
    for (i, p) in packets.iter().enumerate() {
        assert_eq!(p.len(), i + 1);
        assert!(p.iter().all(|&b| b as usize == i + 1));
    }
}

#[test]
fn test_注册表创建的解码器() {
    let registry = yin::default_codec_registry();
    let mut dec = registry.create_decoder(CodecId::Opus).unwrap();
    assert!(dec.prefers_background());
    assert!(!dec.requires_sequential());

    #[cfg(not(feature = "opus-backend"))]
    {
        let err = dec.setup(1, 16000).unwrap_err();
        assert!(matches!(err, YinError::Unsupported(_)));
    }

    #[cfg(feature = "opus-backend")]
    {
        dec.setup(1, 16000).unwrap();
        // 仅含 TOC 字节的包: libopus 按丢包补偿处理, 失败也只丢弃该帧
        dec.decode(&framed(&[0xF8]), &mut |_: &[f32]| {}).unwrap();
    }
}
