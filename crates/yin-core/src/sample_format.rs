//! 线上 PCM 采样格式定义.
//!
//! 描述原始 PCM 字节流中单个采样点的编码方式, 以及到 `f32` 的转换.
//! 所有多字节格式均为小端序.

use std::fmt;

/// PCM 采样格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    /// 无符号 8 位整数
    U8,
    /// 有符号 16 位整数, 小端
    S16,
    /// 有符号 24 位整数, 小端 (3 字节紧凑排列)
    S24,
    /// 有符号 32 位整数, 小端
    S32,
    /// 32 位浮点, 小端
    F32,
}

impl SampleFormat {
    /// 每个采样点占用的字节数
    pub const fn bytes_per_sample(&self) -> usize {
        match self {
            Self::U8 => 1,
            Self::S16 => 2,
            Self::S24 => 3,
            Self::S32 | Self::F32 => 4,
        }
    }

    /// 按位深查找整数格式 (WAV `fmt ` 块中的 bits_per_sample)
    pub const fn from_bits(bits: u16) -> Option<Self> {
        match bits {
            8 => Some(Self::U8),
            16 => Some(Self::S16),
            24 => Some(Self::S24),
            32 => Some(Self::S32),
            _ => None,
        }
    }

    /// 将一个采样点的字节转换为 [-1.0, 1.0) 区间的浮点值
    ///
    /// `bytes` 长度必须等于 `bytes_per_sample()`.
    #[inline]
    pub fn to_f32(&self, bytes: &[u8]) -> f32 {
        match self {
            Self::U8 => (f32::from(bytes[0]) - 128.0) / 128.0,
            Self::S16 => f32::from(i16::from_le_bytes([bytes[0], bytes[1]])) / 32768.0,
            Self::S24 => {
                // 放到 i32 高 24 位, 算术右移完成符号扩展
                let v = i32::from_le_bytes([0, bytes[0], bytes[1], bytes[2]]) >> 8;
                v as f32 / 8_388_608.0
            }
            Self::S32 => {
                let v = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                (f64::from(v) / 2_147_483_648.0) as f32
            }
            Self::F32 => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        }
    }

    /// 批量转换: `src` 必须是采样宽度的整数倍, 结果写入 `dst` 前部
    ///
    /// 返回写入的采样数.
    pub fn convert_into(&self, src: &[u8], dst: &mut [f32]) -> usize {
        let width = self.bytes_per_sample();
        let mut written = 0;
        for (out, chunk) in dst.iter_mut().zip(src.chunks_exact(width)) {
            *out = self.to_f32(chunk);
            written += 1;
        }
        written
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::U8 => "u8",
            Self::S16 => "s16le",
            Self::S24 => "s24le",
            Self::S32 => "s32le",
            Self::F32 => "f32le",
        };
        write!(f, "{name}")
    }
}
