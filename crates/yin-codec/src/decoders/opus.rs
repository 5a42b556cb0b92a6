//! 长度前缀封装的 Opus 解码器.
//!
//! 线上格式为重复的 `[4 字节大端帧长][4 字节保留][帧长字节的 Opus 包]`,
//! 不是 RFC 6716 的原始封装. 封装本身没有同步标记, 帧长非法时无法
//! 重新对齐, 解码器进入失败状态.

use log::{debug, warn};
use yin_core::{YinError, YinResult};

use crate::buffer::GrowBuffer;
use crate::codec_id::CodecId;
use crate::decoder::{SampleSink, StreamDecoder};

/// 帧头长度
pub const FRAME_HEADER_LEN: usize = 8;

/// 默认最大帧长 (字节), 按实际可见的最大 Opus 包而非协议上限设置
pub const DEFAULT_MAX_FRAME_LEN: usize = 4000;

/// 单包最多 120 ms @ 48 kHz
const MAX_SAMPLES_PER_CHANNEL: usize = 5760;

/// Opus 解码选项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpusOptions {
    /// 允许的最大帧长 (字节)
    pub max_frame_len: usize,
    /// 是否建议在后台线程解码
    pub background: bool,
}

impl Default for OpusOptions {
    fn default() -> Self {
        Self {
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            background: true,
        }
    }
}

/// Opus 包解码原语
pub trait OpusPacketDecoder: Send {
    /// 解码一个 Opus 包为交错浮点采样, 返回每声道采样数
    fn decode_float(&mut self, packet: &[u8], out: &mut [f32]) -> YinResult<usize>;

    /// 输出声道数
    fn channels(&self) -> u32;

    /// 清除跨包的解码状态
    fn reset(&mut self) {}
}

/// libopus 绑定
#[cfg(feature = "opus-backend")]
pub struct LibOpusDecoder {
    decoder: opus::Decoder,
    channels: u32,
}

#[cfg(feature = "opus-backend")]
impl LibOpusDecoder {
    pub fn new(sample_rate: u32, channels: u32) -> YinResult<Self> {
        let layout = match channels {
            1 => opus::Channels::Mono,
            2 => opus::Channels::Stereo,
            n => {
                return Err(YinError::InvalidArgument(format!(
                    "Opus 只支持 1 或 2 个声道, 收到 {}",
                    n
                )));
            }
        };
        let decoder = opus::Decoder::new(sample_rate, layout)
            .map_err(|e| YinError::Codec(format!("libopus 初始化失败: {e}")))?;
        Ok(Self { decoder, channels })
    }
}

#[cfg(feature = "opus-backend")]
impl OpusPacketDecoder for LibOpusDecoder {
    fn decode_float(&mut self, packet: &[u8], out: &mut [f32]) -> YinResult<usize> {
        self.decoder
            .decode_float(packet, out, false)
            .map_err(|e| YinError::Codec(format!("libopus 解码失败: {e}")))
    }

    fn channels(&self) -> u32 {
        self.channels
    }

    fn reset(&mut self) {
        if let Err(e) = self.decoder.reset_state() {
            warn!("libopus 状态重置失败: {e}");
        }
    }
}

/// 解析器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpusState {
    /// 累积 8 字节帧头
    Header { filled: usize },
    /// 累积帧体
    Payload { len: usize, filled: usize },
    /// 封装错误后不再接受输入
    Failed,
}

/// 长度前缀 Opus 解码器
pub struct OpusDecoder {
    options: OpusOptions,
    state: OpusState,
    header: [u8; FRAME_HEADER_LEN],
    payload: GrowBuffer<u8>,
    samples: GrowBuffer<f32>,
    primitive: Option<Box<dyn OpusPacketDecoder>>,
    frame_index: u64,
}

impl OpusDecoder {
    /// 创建解码器, Opus 原语在 `setup()` 中创建
    pub fn new(options: OpusOptions) -> Self {
        Self {
            options,
            state: OpusState::Header { filled: 0 },
            header: [0; FRAME_HEADER_LEN],
            payload: GrowBuffer::new(),
            samples: GrowBuffer::new(),
            primitive: None,
            frame_index: 0,
        }
    }

    /// 使用外部提供的 Opus 原语
    pub fn with_primitive(options: OpusOptions, primitive: Box<dyn OpusPacketDecoder>) -> Self {
        let mut decoder = Self::new(options);
        decoder.install(primitive);
        decoder
    }

    /// 注册表工厂函数
    pub fn create() -> YinResult<Box<dyn StreamDecoder>> {
        Ok(Box::new(Self::new(OpusOptions::default())))
    }

    pub fn options(&self) -> &OpusOptions {
        &self.options
    }

    /// 是否因封装错误失效
    pub fn is_failed(&self) -> bool {
        self.state == OpusState::Failed
    }

    /// 已完成的帧数
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    fn install(&mut self, primitive: Box<dyn OpusPacketDecoder>) {
        self.samples
            .ensure(MAX_SAMPLES_PER_CHANNEL * primitive.channels().max(1) as usize);
        self.primitive = Some(primitive);
    }

    fn fail(&mut self, message: String) -> YinError {
        warn!("Opus 帧 {}: {}, 流已失效", self.frame_index, message);
        self.state = OpusState::Failed;
        YinError::Format(message)
    }

    /// 8 字节帧头到齐: 校验帧长
    fn on_header(&mut self) -> YinResult<()> {
        let [a, b, c, d, ..] = self.header;
        let len = u32::from_be_bytes([a, b, c, d]) as usize;
        if len == 0 {
            return Err(self.fail("帧长为 0".into()));
        }
        if len > self.options.max_frame_len {
            return Err(self.fail(format!(
                "帧长 {} 超过上限 {}",
                len, self.options.max_frame_len
            )));
        }
        if self.primitive.is_none() {
            // 帧体无法解码, 也无法跳过后继续保持同步
            self.state = OpusState::Failed;
            return Err(YinError::Codec("Opus 原语未初始化, 需先调用 setup".into()));
        }
        if self.payload.ensure(len) {
            debug!("Opus 帧缓冲扩容至 {} 字节", len);
        }
        self.state = OpusState::Payload { len, filled: 0 };
        Ok(())
    }

    /// 帧体到齐: 调用原语并投递采样
    fn finish_frame(&mut self, len: usize, on_samples: &mut SampleSink<'_>) -> YinResult<()> {
        self.state = OpusState::Header { filled: 0 };
        let index = self.frame_index;
        self.frame_index += 1;
        let Some(primitive) = self.primitive.as_mut() else {
            return Err(YinError::Codec("Opus 原语未初始化, 需先调用 setup".into()));
        };
        let channels = primitive.channels().max(1) as usize;
        let out = self.samples.as_mut_slice();
        match primitive.decode_float(self.payload.slice(len), out) {
            Ok(count) => {
                let total = (count * channels).min(out.len());
                if total > 0 {
                    on_samples(&out[..total]);
                }
            }
            Err(err) => {
                warn!("Opus 帧 {} 解码失败, 丢弃该帧: {}", index, err);
            }
        }
        Ok(())
    }
}

impl StreamDecoder for OpusDecoder {
    fn codec_id(&self) -> CodecId {
        CodecId::Opus
    }

    fn name(&self) -> &str {
        "opus"
    }

    fn setup(&mut self, channels: u32, sample_rate: u32) -> YinResult<()> {
        if self.primitive.is_some() {
            return Ok(());
        }
        #[cfg(feature = "opus-backend")]
        {
            let primitive = LibOpusDecoder::new(sample_rate, channels)?;
            debug!("libopus 解码器: {} 声道, {} Hz", channels, sample_rate);
            self.install(Box::new(primitive));
            Ok(())
        }
        #[cfg(not(feature = "opus-backend"))]
        {
            Err(YinError::Unsupported(format!(
                "Opus 解码 ({} 声道, {} Hz) 需要 opus-backend 特性",
                channels, sample_rate
            )))
        }
    }

    fn decode(&mut self, data: &[u8], on_samples: &mut SampleSink<'_>) -> YinResult<()> {
        let mut pos = 0;
        loop {
            match self.state {
                OpusState::Failed => {
                    return Err(YinError::Format("Opus 流已因封装错误失效".into()));
                }
                _ if pos == data.len() => return Ok(()),
                OpusState::Header { filled } => {
                    let take = (FRAME_HEADER_LEN - filled).min(data.len() - pos);
                    self.header[filled..filled + take].copy_from_slice(&data[pos..pos + take]);
                    pos += take;
                    let filled = filled + take;
                    if filled < FRAME_HEADER_LEN {
                        self.state = OpusState::Header { filled };
                    } else {
                        self.on_header()?;
                    }
                }
                OpusState::Payload { len, filled } => {
                    let take = (len - filled).min(data.len() - pos);
                    self.payload.slice_mut(len)[filled..filled + take]
                        .copy_from_slice(&data[pos..pos + take]);
                    pos += take;
                    let filled = filled + take;
                    if filled < len {
                        self.state = OpusState::Payload { len, filled };
                    } else {
                        self.finish_frame(len, on_samples)?;
                    }
                }
            }
        }
    }

    fn prefers_background(&self) -> bool {
        self.options.background
    }

    fn reset(&mut self) {
        self.state = OpusState::Header { filled: 0 };
        self.frame_index = 0;
        if let Some(primitive) = self.primitive.as_mut() {
            primitive.reset();
        }
    }
}
