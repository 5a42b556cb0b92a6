//! PCM 音频解码器.
//!
//! 将无头部的原始小端 PCM 字节流按配置的位深转换为浮点采样.
//! 跨调用只保留不足一个采样块 (采样宽度 × 声道数) 的尾部字节.

use log::debug;
use yin_core::{SampleFormat, YinError, YinResult};

use crate::buffer::GrowBuffer;
use crate::codec_id::CodecId;
use crate::decoder::{SampleSink, StreamDecoder};

/// 默认声道数
const DEFAULT_CHANNELS: u32 = 1;
/// 默认采样率
const DEFAULT_SAMPLE_RATE: u32 = 16000;

/// PCM 音频解码器
pub struct PcmDecoder {
    /// 线上采样格式
    format: SampleFormat,
    /// 声道数
    channels: u32,
    /// 采样率 (仅用于描述, 不影响转换)
    sample_rate: u32,
    /// 采样块字节数 (每样本字节数 * 声道数)
    block_align: usize,
    /// 上次调用遗留的不完整采样块
    remainder: Vec<u8>,
    /// 复用的输出缓冲
    samples: GrowBuffer<f32>,
}

impl PcmDecoder {
    /// 创建指定采样格式的解码器, 默认单声道
    pub fn new(format: SampleFormat) -> Self {
        Self {
            format,
            channels: DEFAULT_CHANNELS,
            sample_rate: DEFAULT_SAMPLE_RATE,
            block_align: format.bytes_per_sample() * DEFAULT_CHANNELS as usize,
            remainder: Vec::with_capacity(format.bytes_per_sample()),
            samples: GrowBuffer::new(),
        }
    }

    fn create(format: SampleFormat) -> YinResult<Box<dyn StreamDecoder>> {
        Ok(Box::new(Self::new(format)))
    }

    pub fn new_u8() -> YinResult<Box<dyn StreamDecoder>> {
        Self::create(SampleFormat::U8)
    }

    pub fn new_s16le() -> YinResult<Box<dyn StreamDecoder>> {
        Self::create(SampleFormat::S16)
    }

    pub fn new_s24le() -> YinResult<Box<dyn StreamDecoder>> {
        Self::create(SampleFormat::S24)
    }

    pub fn new_s32le() -> YinResult<Box<dyn StreamDecoder>> {
        Self::create(SampleFormat::S32)
    }

    pub fn new_f32le() -> YinResult<Box<dyn StreamDecoder>> {
        Self::create(SampleFormat::F32)
    }

    /// 重新配置格式参数
    ///
    /// 遗留的不完整采样块按旧格式无法解释, 一并丢弃.
    pub fn configure(
        &mut self,
        format: SampleFormat,
        channels: u32,
        sample_rate: u32,
    ) -> YinResult<()> {
        if channels == 0 {
            return Err(YinError::InvalidArgument("声道数不能为 0".into()));
        }
        if sample_rate == 0 {
            return Err(YinError::InvalidArgument("采样率不能为 0".into()));
        }
        self.format = format;
        self.channels = channels;
        self.sample_rate = sample_rate;
        self.block_align = format.bytes_per_sample() * channels as usize;
        self.remainder.clear();
        debug!(
            "配置 PCM 解码器: {} Hz, {} 声道, 格式={}",
            sample_rate, channels, format,
        );
        Ok(())
    }

    /// 线上采样格式
    pub fn format(&self) -> SampleFormat {
        self.format
    }

    /// 声道数
    pub fn channels(&self) -> u32 {
        self.channels
    }

    /// 采样率
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// 输出缓冲当前容量 (采样数)
    pub fn sample_capacity(&self) -> usize {
        self.samples.capacity()
    }

    /// 尚未凑成完整采样块的字节数
    pub fn pending_bytes(&self) -> usize {
        self.remainder.len()
    }
}

impl StreamDecoder for PcmDecoder {
    fn codec_id(&self) -> CodecId {
        CodecId::from_pcm_format(self.format)
    }

    fn name(&self) -> &str {
        self.codec_id().name()
    }

    fn setup(&mut self, channels: u32, sample_rate: u32) -> YinResult<()> {
        self.configure(self.format, channels, sample_rate)
    }

    fn decode(&mut self, data: &[u8], on_samples: &mut SampleSink<'_>) -> YinResult<()> {
        let width = self.format.bytes_per_sample();
        let mut input = data;

        // 先补齐上次遗留的采样块
        let mut head = 0usize;
        if !self.remainder.is_empty() {
            let need = self.block_align - self.remainder.len();
            let take = need.min(input.len());
            self.remainder.extend_from_slice(&input[..take]);
            input = &input[take..];
            if self.remainder.len() < self.block_align {
                return Ok(());
            }
            head = self.block_align / width;
        }

        let whole = input.len() - input.len() % self.block_align;
        let total = head + whole / width;
        if total == 0 {
            self.remainder.extend_from_slice(input);
            return Ok(());
        }

        self.samples.ensure(total);
        let out = self.samples.slice_mut(total);
        if head > 0 {
            self.format.convert_into(&self.remainder, &mut out[..head]);
            self.remainder.clear();
        }
        self.format.convert_into(&input[..whole], &mut out[head..]);
        self.remainder.extend_from_slice(&input[whole..]);

        on_samples(self.samples.slice(total));
        Ok(())
    }

    fn reset(&mut self) {
        self.remainder.clear();
    }
}
