//! 编解码器标识符.
//!
//! 为每种线上编码分配唯一标识, 供注册表按 ID 创建解码器.

use std::fmt;

use yin_core::SampleFormat;

/// 编解码器标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecId {
    /// PCM 无符号 8 位
    PcmU8,
    /// PCM 有符号 16 位小端
    PcmS16le,
    /// PCM 有符号 24 位小端
    PcmS24le,
    /// PCM 有符号 32 位小端
    PcmS32le,
    /// PCM 32 位浮点小端
    PcmF32le,
    /// RIFF/WAV 封装的 PCM
    Wav,
    /// MPEG Layer I/II/III
    Mpeg,
    /// 8 字节长度前缀封装的 Opus
    Opus,
    /// 二进制音频与 JSON 元数据混合传输
    Mixed,
}

impl CodecId {
    /// 全部标识, 按注册顺序排列
    pub const ALL: [CodecId; 9] = [
        CodecId::PcmU8,
        CodecId::PcmS16le,
        CodecId::PcmS24le,
        CodecId::PcmS32le,
        CodecId::PcmF32le,
        CodecId::Wav,
        CodecId::Mpeg,
        CodecId::Opus,
        CodecId::Mixed,
    ];

    /// 获取编解码器名称
    pub const fn name(&self) -> &'static str {
        match self {
            Self::PcmU8 => "pcm_u8",
            Self::PcmS16le => "pcm_s16le",
            Self::PcmS24le => "pcm_s24le",
            Self::PcmS32le => "pcm_s32le",
            Self::PcmF32le => "pcm_f32le",
            Self::Wav => "wav",
            Self::Mpeg => "mpeg",
            Self::Opus => "opus",
            Self::Mixed => "mixed",
        }
    }

    /// 按名称 (或常用别名) 查找标识, 不区分大小写
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.trim().to_ascii_lowercase();
        let id = match lower.as_str() {
            "pcm_u8" | "u8" => Self::PcmU8,
            "pcm" | "pcm_s16le" | "s16le" | "raw" => Self::PcmS16le,
            "pcm_s24le" | "s24le" => Self::PcmS24le,
            "pcm_s32le" | "s32le" => Self::PcmS32le,
            "pcm_f32le" | "f32le" => Self::PcmF32le,
            "wav" | "wave" | "riff" => Self::Wav,
            "mpeg" | "mp3" | "mp2" | "mp1" | "mpga" => Self::Mpeg,
            "opus" => Self::Opus,
            "mixed" | "json" => Self::Mixed,
            _ => return None,
        };
        Some(id)
    }

    /// 原始 PCM 标识对应的采样格式
    pub const fn pcm_format(&self) -> Option<SampleFormat> {
        match self {
            Self::PcmU8 => Some(SampleFormat::U8),
            Self::PcmS16le => Some(SampleFormat::S16),
            Self::PcmS24le => Some(SampleFormat::S24),
            Self::PcmS32le => Some(SampleFormat::S32),
            Self::PcmF32le => Some(SampleFormat::F32),
            _ => None,
        }
    }

    /// 采样格式对应的原始 PCM 标识
    pub const fn from_pcm_format(format: SampleFormat) -> Self {
        match format {
            SampleFormat::U8 => Self::PcmU8,
            SampleFormat::S16 => Self::PcmS16le,
            SampleFormat::S24 => Self::PcmS24le,
            SampleFormat::S32 => Self::PcmS32le,
            SampleFormat::F32 => Self::PcmF32le,
        }
    }
}

impl fmt::Display for CodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
