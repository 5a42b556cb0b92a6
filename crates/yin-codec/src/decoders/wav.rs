//! RIFF/WAV 流式解码器.
//!
//! 不依赖随机访问, 逐字节遍历 RIFF 子块: 只有 `data` 子块的负载
//! 被送入内部的 PCM 解码器, 其余子块原样跳过. `fmt ` 子块在跳过的
//! 同时被记录下来, 用于配置 PCM 格式.
//!
//! WAV 流结构:
//! ```text
//! RIFF 前导:  "RIFF" + file_size-8 + "WAVE"         (12 字节, 视为已消费)
//! 子块头:     4 字节 ASCII 标签 + 4 字节小端长度     (8 字节)
//! 子块负载:   长度字节, 奇数长度后跟 1 个填充字节
//! ```

use log::{debug, warn};
use yin_core::{SampleFormat, YinResult};

use crate::codec_id::CodecId;
use crate::decoder::{SampleSink, StreamDecoder};
use crate::decoders::pcm::PcmDecoder;

/// RIFF 前导长度
const RIFF_PREAMBLE_LEN: u64 = 12;
/// 子块头长度
const CHUNK_HEADER_LEN: usize = 8;
/// `fmt ` 子块最多记录的字节数 (含 WAVE_FORMAT_EXTENSIBLE 子格式 GUID)
const FMT_CAPTURE_LEN: usize = 40;
/// 流式写入端未知总长时使用的 data 长度
const UNBOUNDED_DATA_LEN: u32 = u32::MAX;

/// WAV 音频格式码
const WAV_FORMAT_PCM: u16 = 0x0001;
/// WAV IEEE 浮点格式码
const WAV_FORMAT_IEEE_FLOAT: u16 = 0x0003;
/// WAV 扩展格式码
const WAV_FORMAT_EXTENSIBLE: u16 = 0xFFFE;

/// `fmt ` 子块中解析出的流格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavFormat {
    /// 格式码
    pub audio_format: u16,
    /// 声道数
    pub channels: u16,
    /// 采样率
    pub sample_rate: u32,
    /// 位深
    pub bits_per_sample: u16,
}

impl WavFormat {
    /// 解析 `fmt ` 子块负载, 不足 16 字节返回 None
    fn parse(buf: &[u8]) -> Option<Self> {
        if buf.len() < 16 {
            return None;
        }
        let mut audio_format = u16::from_le_bytes([buf[0], buf[1]]);
        if audio_format == WAV_FORMAT_EXTENSIBLE && buf.len() >= 26 {
            // 子格式 GUID 的前 2 字节即实际格式码
            audio_format = u16::from_le_bytes([buf[24], buf[25]]);
        }
        Some(Self {
            audio_format,
            channels: u16::from_le_bytes([buf[2], buf[3]]),
            sample_rate: u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
            bits_per_sample: u16::from_le_bytes([buf[14], buf[15]]),
        })
    }

    /// 对应的 PCM 采样格式
    pub fn sample_format(&self) -> Option<SampleFormat> {
        match (self.audio_format, self.bits_per_sample) {
            (WAV_FORMAT_PCM, bits) => SampleFormat::from_bits(bits),
            (WAV_FORMAT_IEEE_FLOAT, 32) => Some(SampleFormat::F32),
            _ => None,
        }
    }
}

/// 子块种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkKind {
    /// RIFF/WAVE 前导
    Preamble,
    /// `fmt ` 子块, 跳过但记录
    Format,
    /// `data` 子块, 负载送入 PCM
    Data,
    /// 其他子块, 原样跳过
    Skip,
}

/// 跨调用的解析状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WavState {
    /// 累积 8 字节子块头
    ChunkHeader { filled: usize },
    /// 消费子块负载, `remaining` 为 None 表示持续到流结束
    ChunkBody {
        kind: ChunkKind,
        remaining: Option<u64>,
        padded: bool,
    },
    /// 跳过奇数长度子块后的填充字节
    Pad,
}

impl WavState {
    const fn initial() -> Self {
        WavState::ChunkBody {
            kind: ChunkKind::Preamble,
            remaining: Some(RIFF_PREAMBLE_LEN),
            padded: false,
        }
    }
}

/// WAV 流式解码器
pub struct WavDecoder {
    /// 内部 PCM 解码器
    pcm: PcmDecoder,
    /// 解析状态
    state: WavState,
    /// 子块头缓冲
    header: [u8; CHUNK_HEADER_LEN],
    /// 前导或 `fmt ` 子块的记录
    capture: Vec<u8>,
    /// 已解析的流格式
    format: Option<WavFormat>,
    /// `setup()` 传入的声道数与采样率, reset 后重新应用
    stream_params: Option<(u32, u32)>,
}

impl WavDecoder {
    /// 创建解码器, 在读到 `fmt ` 子块之前按 16 位单声道解释
    pub fn new() -> Self {
        Self {
            pcm: PcmDecoder::new(SampleFormat::S16),
            state: WavState::initial(),
            header: [0; CHUNK_HEADER_LEN],
            capture: Vec::with_capacity(FMT_CAPTURE_LEN),
            format: None,
            stream_params: None,
        }
    }

    /// 创建 WAV 解码器 (工厂函数)
    pub fn create() -> YinResult<Box<dyn StreamDecoder>> {
        Ok(Box::new(Self::new()))
    }

    /// 已从 `fmt ` 子块解析出的格式
    pub fn format(&self) -> Option<WavFormat> {
        self.format
    }

    /// 内部 PCM 解码器
    pub fn pcm(&self) -> &PcmDecoder {
        &self.pcm
    }

    /// 子块头已完整, 进入负载状态
    fn begin_chunk(&mut self) {
        let tag = [self.header[0], self.header[1], self.header[2], self.header[3]];
        let len = u32::from_le_bytes([self.header[4], self.header[5], self.header[6], self.header[7]]);
        let kind = match &tag {
            b"data" => ChunkKind::Data,
            b"fmt " => ChunkKind::Format,
            _ => ChunkKind::Skip,
        };
        debug!(
            "WAV 子块: tag={:?}, len={}",
            String::from_utf8_lossy(&tag),
            len
        );

        self.capture.clear();
        if kind == ChunkKind::Data && len == UNBOUNDED_DATA_LEN {
            self.state = WavState::ChunkBody {
                kind,
                remaining: None,
                padded: false,
            };
            return;
        }
        if len == 0 {
            self.finish_chunk(kind, false);
            return;
        }
        self.state = WavState::ChunkBody {
            kind,
            remaining: Some(u64::from(len)),
            padded: len % 2 == 1,
        };
    }

    /// 子块负载消费完毕
    fn finish_chunk(&mut self, kind: ChunkKind, padded: bool) {
        match kind {
            ChunkKind::Preamble => {
                if self.capture.len() < 12
                    || &self.capture[0..4] != b"RIFF"
                    || &self.capture[8..12] != b"WAVE"
                {
                    warn!("WAV: 流开头不是 RIFF/WAVE 前导, 仍按 12 字节跳过");
                }
            }
            ChunkKind::Format => self.apply_format(),
            ChunkKind::Data | ChunkKind::Skip => {}
        }
        self.capture.clear();
        self.state = if padded {
            WavState::Pad
        } else {
            WavState::ChunkHeader { filled: 0 }
        };
    }

    /// 根据 `fmt ` 子块配置 PCM 解码器
    fn apply_format(&mut self) {
        let Some(format) = WavFormat::parse(&self.capture) else {
            warn!("WAV: fmt 子块过短 ({} 字节), 忽略", self.capture.len());
            return;
        };
        self.format = Some(format);
        let Some(sample_format) = format.sample_format() else {
            warn!(
                "WAV: 不支持的格式码 0x{:04X} / 位深 {}, 保持 {}",
                format.audio_format,
                format.bits_per_sample,
                self.pcm.format(),
            );
            return;
        };
        if let Err(e) = self.pcm.configure(
            sample_format,
            u32::from(format.channels),
            format.sample_rate,
        ) {
            warn!("WAV: fmt 子块参数无效: {}", e);
        }
    }
}

impl Default for WavDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamDecoder for WavDecoder {
    fn codec_id(&self) -> CodecId {
        CodecId::Wav
    }

    fn name(&self) -> &str {
        "wav"
    }

    fn setup(&mut self, channels: u32, sample_rate: u32) -> YinResult<()> {
        self.pcm.setup(channels, sample_rate)?;
        self.stream_params = Some((channels, sample_rate));
        Ok(())
    }

    fn decode(&mut self, data: &[u8], on_samples: &mut SampleSink<'_>) -> YinResult<()> {
        let mut pos = 0usize;
        while pos < data.len() {
            let rest = data.len() - pos;
            match self.state {
                WavState::ChunkHeader { filled } => {
                    let take = (CHUNK_HEADER_LEN - filled).min(rest);
                    self.header[filled..filled + take].copy_from_slice(&data[pos..pos + take]);
                    pos += take;
                    let filled = filled + take;
                    if filled < CHUNK_HEADER_LEN {
                        self.state = WavState::ChunkHeader { filled };
                    } else {
                        self.begin_chunk();
                    }
                }
                WavState::ChunkBody {
                    kind,
                    remaining,
                    padded,
                } => {
                    let take = match remaining {
                        Some(r) => r.min(rest as u64) as usize,
                        None => rest,
                    };
                    let span = &data[pos..pos + take];
                    match kind {
                        ChunkKind::Data => self.pcm.decode(span, on_samples)?,
                        ChunkKind::Preamble | ChunkKind::Format => {
                            let room = FMT_CAPTURE_LEN.saturating_sub(self.capture.len());
                            self.capture.extend_from_slice(&span[..room.min(span.len())]);
                        }
                        ChunkKind::Skip => {}
                    }
                    pos += take;

                    if let Some(r) = remaining {
                        let left = r - take as u64;
                        if left == 0 {
                            self.finish_chunk(kind, padded);
                        } else {
                            self.state = WavState::ChunkBody {
                                kind,
                                remaining: Some(left),
                                padded,
                            };
                        }
                    }
                }
                WavState::Pad => {
                    pos += 1;
                    self.state = WavState::ChunkHeader { filled: 0 };
                }
            }
        }
        Ok(())
    }

    fn reset(&mut self) {
        // 上一个流的 fmt 子块不能影响下一个流
        self.pcm = PcmDecoder::new(SampleFormat::S16);
        if let Some((channels, sample_rate)) = self.stream_params {
            if let Err(e) = self.pcm.setup(channels, sample_rate) {
                warn!("WAV: reset 后重新应用参数失败: {}", e);
            }
        }
        self.state = WavState::initial();
        self.capture.clear();
        self.format = None;
    }
}
