//! Yin 解码框架性能基准测试.
//!
//! 覆盖 PCM 转换, MPEG 帧头解析与帧累积, 混合传输分块等热路径.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use yin::codec::{
    ChunkSplitter, CodecId, FrameSynthesizer, Mp3Decoder, MpegFrame, MpegHeader, StreamDecoder,
};
use yin::core::{BitReader, YinResult};

/// 生成 S16 单声道 PCM 字节
fn make_s16_pcm(nb_samples: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(nb_samples * 2);
    for i in 0..nb_samples {
        let v = ((i % 256) as i16).wrapping_mul(100);
        data.extend_from_slice(&v.to_le_bytes());
    }
    data
}

/// 只读取侧信息首字节的合成器, 衡量帧累积本身的开销
struct NullSynth;

impl FrameSynthesizer for NullSynth {
    fn synthesize(
        &mut self,
        frame: &MpegFrame<'_>,
        reader: &mut BitReader<'_>,
        out: &mut [f32],
    ) -> YinResult<usize> {
        let v = reader.read_bits(9)?;
        out[0] = v as f32;
        Ok(frame.header.sample_count)
    }
}

fn make_mpeg_stream(frames: usize) -> Vec<u8> {
    let header = [0xFF, 0xFB, 0x90, 0x00];
    let frame_length = MpegHeader::parse(header).map_or(417, |h| h.frame_length);
    let mut stream = Vec::with_capacity(frames * frame_length);
    for i in 0..frames {
        stream.extend_from_slice(&header);
        stream.extend((4..frame_length).map(|j| ((i + j) % 0xF0) as u8));
    }
    stream
}

fn bench_pcm_decode(c: &mut Criterion) {
    let registry = yin::default_codec_registry();
    let data = make_s16_pcm(4096);
    c.bench_function("pcm_decode_4096_s16_in_333b_windows", |b| {
        let mut dec = registry.create_decoder(CodecId::PcmS16le).unwrap();
        b.iter(|| {
            let mut total = 0usize;
            for w in data.chunks(333) {
                dec.decode(black_box(w), &mut |s: &[f32]| total += s.len())
                    .unwrap();
            }
            black_box(total);
        });
    });
}

fn bench_mpeg_header_parse(c: &mut Criterion) {
    c.bench_function("mpeg_header_parse", |b| {
        b.iter(|| {
            let h = MpegHeader::parse_u32(black_box(0xFFFB_9064)).unwrap();
            black_box(h.frame_length);
        });
    });
}

fn bench_mpeg_frame_accumulate(c: &mut Criterion) {
    let stream = make_mpeg_stream(64);
    c.bench_function("mpeg_accumulate_64_frames_in_1k_windows", |b| {
        let mut dec = Mp3Decoder::with_synthesizer(Box::new(NullSynth));
        b.iter(|| {
            let mut frames = 0usize;
            for w in stream.chunks(1024) {
                dec.decode(black_box(w), &mut |_: &[f32]| frames += 1)
                    .unwrap();
            }
            black_box(frames);
        });
    });
}

fn bench_mixed_split(c: &mut Criterion) {
    let mut stream = Vec::new();
    for i in 0..256u32 {
        let json = format!(r#"{{"seq":{i},"type":"tts"}}"#);
        stream.extend_from_slice(&640u32.to_be_bytes());
        stream.extend_from_slice(&(json.len() as u32).to_be_bytes());
        stream.extend(std::iter::repeat_n(0x55u8, 640));
        stream.extend_from_slice(json.as_bytes());
    }
    c.bench_function("mixed_split_256_units", |b| {
        b.iter(|| {
            let mut splitter = ChunkSplitter::default();
            let mut values = 0usize;
            for w in stream.chunks(1500) {
                splitter
                    .split(black_box(w), |chunk| {
                        values += usize::from(chunk.value.is_some());
                        Ok(())
                    })
                    .unwrap();
            }
            black_box(values);
        });
    });
}

criterion_group!(
    benches,
    bench_pcm_decode,
    bench_mpeg_header_parse,
    bench_mpeg_frame_accumulate,
    bench_mixed_split,
);
criterion_main!(benches);
