//! JSON 配置文件.
//!
//! 所有字段都有默认值, 空对象 `{}` 即为合法配置.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::Path;
use yin_codec::decoders::mixed::{DEFAULT_MAX_BINARY_LEN, DEFAULT_MAX_JSON_LEN};
use yin_codec::decoders::opus::DEFAULT_MAX_FRAME_LEN;
use yin_codec::{
    CodecId, CodecRegistry, MetadataSink, MixedChunkDecoder, MixedOptions, OpusDecoder,
    OpusOptions, StreamDecoder,
};

use crate::logging::LoggingConfig;

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct YinConfig {
    pub logging: LoggingConfig,
    pub stream: StreamConfig,
}

impl YinConfig {
    /// 从 JSON 文件加载
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败, path={}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("解析配置文件失败, path={}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// 流参数
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct StreamConfig {
    /// 解码器名称, 见 `CodecId::from_name`
    pub codec: String,
    pub channels: u32,
    pub sample_rate: u32,
    /// 每次送入解码器的窗口大小 (字节)
    pub chunk_size: usize,
    pub opus_max_frame_len: usize,
    pub mixed: MixedConfig,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            codec: "pcm_s16le".to_string(),
            channels: 1,
            sample_rate: 16000,
            chunk_size: 4096,
            opus_max_frame_len: DEFAULT_MAX_FRAME_LEN,
            mixed: MixedConfig::default(),
        }
    }
}

/// 混合传输参数
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct MixedConfig {
    /// 二进制部分交给的内部解码器
    pub inner_codec: String,
    pub max_binary_len: usize,
    pub max_json_len: usize,
    pub background: bool,
}

impl Default for MixedConfig {
    fn default() -> Self {
        Self {
            inner_codec: "opus".to_string(),
            max_binary_len: DEFAULT_MAX_BINARY_LEN,
            max_json_len: DEFAULT_MAX_JSON_LEN,
            background: true,
        }
    }
}

impl MixedConfig {
    pub fn options(&self) -> MixedOptions {
        MixedOptions {
            max_binary_len: self.max_binary_len,
            max_json_len: self.max_json_len,
            background: self.background,
        }
    }
}

impl StreamConfig {
    pub fn codec_id(&self) -> Result<CodecId> {
        parse_codec(&self.codec)
    }

    pub fn opus_options(&self) -> OpusOptions {
        OpusOptions {
            max_frame_len: self.opus_max_frame_len,
            ..OpusOptions::default()
        }
    }

    /// 按配置创建并初始化解码器
    ///
    /// `on_metadata` 只在混合传输下使用.
    pub fn create_decoder(
        &self,
        registry: &CodecRegistry,
        on_metadata: MetadataSink,
    ) -> Result<Box<dyn StreamDecoder>> {
        if self.chunk_size == 0 {
            bail!("chunk_size 不能为 0");
        }
        let mut decoder: Box<dyn StreamDecoder> = match self.codec_id()? {
            CodecId::Mixed => {
                let inner = self.create_inner(registry, parse_codec(&self.mixed.inner_codec)?)?;
                Box::new(MixedChunkDecoder::new(
                    inner,
                    self.mixed.options(),
                    on_metadata,
                ))
            }
            id => self.create_inner(registry, id)?,
        };
        decoder
            .setup(self.channels, self.sample_rate)
            .with_context(|| {
                format!(
                    "初始化 {} 解码器失败 ({} 声道, {} Hz)",
                    decoder.name(),
                    self.channels,
                    self.sample_rate
                )
            })?;
        Ok(decoder)
    }

    fn create_inner(
        &self,
        registry: &CodecRegistry,
        id: CodecId,
    ) -> Result<Box<dyn StreamDecoder>> {
        match id {
            CodecId::Opus => Ok(Box::new(OpusDecoder::new(self.opus_options()))),
            CodecId::Mixed => bail!("混合传输不能嵌套"),
            id => registry
                .create_decoder(id)
                .with_context(|| format!("创建 {} 解码器失败", id)),
        }
    }
}

fn parse_codec(name: &str) -> Result<CodecId> {
    match CodecId::from_name(name) {
        Some(id) => Ok(id),
        None => bail!("未知的解码器名称: {}", name),
    }
}
