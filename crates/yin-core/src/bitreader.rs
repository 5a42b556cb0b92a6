//! 比特流读取器.
//!
//! 按大端位序 (MSB first) 从帧缓冲区中读取任意宽度的整数字段.
//! 读取器内部维护一个 64 位累加器, 每次按整字节补充, 一帧之内多次
//! `read_bits` 共享同一份累加状态, 每帧重新创建.

use crate::{YinError, YinResult};

/// 比特流读取器
///
/// # 示例
/// ```
/// use yin_core::bitreader::BitReader;
///
/// let data = [0b10110001, 0b01010101];
/// let mut br = BitReader::new(&data);
/// assert_eq!(br.read_bits(4).unwrap(), 0b1011);
/// assert_eq!(br.read_bits(4).unwrap(), 0b0001);
/// assert_eq!(br.read_bits(8).unwrap(), 0b01010101);
/// ```
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    /// 源数据 (完整帧)
    data: &'a [u8],
    /// 下一个待拉取字节的位置
    cursor: usize,
    /// 位累加器, 低 `cached` 位有效
    acc: u64,
    /// 累加器中的有效位数
    cached: u32,
}

impl<'a> BitReader<'a> {
    /// 创建新的比特流读取器, 从首字节开始
    pub fn new(data: &'a [u8]) -> Self {
        Self::at(data, 0)
    }

    /// 创建从指定字节偏移开始读取的读取器
    pub fn at(data: &'a [u8], start: usize) -> Self {
        Self {
            data,
            cursor: start.min(data.len()),
            acc: 0,
            cached: 0,
        }
    }

    /// 读取 N 个位 (1..=32), 返回值的低 N 位有效
    pub fn read_bits(&mut self, n: u32) -> YinResult<u32> {
        if n == 0 {
            return Ok(0);
        }
        if n > 32 {
            return Err(YinError::InvalidArgument(format!(
                "read_bits: n={} 超过 32 位",
                n,
            )));
        }

        while self.cached < n {
            let byte = *self.data.get(self.cursor).ok_or(YinError::Eof)?;
            self.acc = (self.acc << 8) | u64::from(byte);
            self.cursor += 1;
            self.cached += 8;
        }

        self.cached -= n;
        let value = (self.acc >> self.cached) & ((1u64 << n) - 1);
        // 丢弃已消费的高位, 累加器最多保留 39 位
        self.acc &= (1u64 << self.cached) - 1;
        Ok(value as u32)
    }

    /// 读取 1 个位
    pub fn read_bit(&mut self) -> YinResult<bool> {
        self.read_bits(1).map(|v| v != 0)
    }

    /// 跳过 N 个位
    pub fn skip_bits(&mut self, mut n: usize) -> YinResult<()> {
        while n > 0 {
            let step = n.min(32);
            self.read_bits(step as u32)?;
            n -= step;
        }
        Ok(())
    }

    /// 剩余可读位数 (含累加器中未消费的位)
    pub fn bits_left(&self) -> usize {
        (self.data.len() - self.cursor) * 8 + self.cached as usize
    }

    /// 相对缓冲区起点已消费的位数
    pub fn bits_read(&self) -> usize {
        self.cursor * 8 - self.cached as usize
    }

    /// 读取游标 (下一个待拉取字节的偏移)
    pub fn byte_position(&self) -> usize {
        self.cursor
    }
}
