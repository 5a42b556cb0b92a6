//! 流式解码器 trait 定义.
//!
//! 所有解码器 (PCM, WAV, MPEG, Opus, 混合传输) 都实现 `StreamDecoder`.

use yin_core::{YinError, YinResult};

use crate::codec_id::CodecId;

/// 采样回调: 每完成一帧调用一次, 参数为交错排列的浮点采样
///
/// 切片借用自解码器内部的复用缓冲区, 仅在回调期间有效.
pub type SampleSink<'a> = dyn FnMut(&[f32]) + 'a;

/// 流式解码器 trait
///
/// 传输层按到达顺序送入任意大小的字节窗口. 解码器消费窗口内能组成
/// 完整帧的部分, 每完成一帧触发一次采样回调, 不完整的尾部留在内部
/// 等待下一次调用. 无论窗口边界落在何处, 同一字节序列的输出都相同.
///
/// 解码流程:
/// 1. (可选) 调用 `setup()` 提供声道数与采样率
/// 2. 按到达顺序对每个窗口调用 `decode()`
/// 3. 流结束后丢弃实例, 或调用 `reset()` 复用
pub trait StreamDecoder: Send {
    /// 获取解码器标识
    fn codec_id(&self) -> CodecId;

    /// 获取解码器名称
    fn name(&self) -> &str;

    /// 提供流参数, 每个流至多调用一次且须在首次 `decode()` 之前
    ///
    /// 默认实现为空操作, 允许自描述的格式跳过此步骤.
    fn setup(&mut self, _channels: u32, _sample_rate: u32) -> YinResult<()> {
        Ok(())
    }

    /// 消费一个字节窗口
    ///
    /// # 返回
    /// - `Ok(())`: 窗口已全部消费 (可能只是被缓冲)
    /// - `Err(YinError::Format)`: 不可恢复的封装错误, 流已失效
    fn decode(&mut self, data: &[u8], on_samples: &mut SampleSink<'_>) -> YinResult<()>;

    /// 以 `(buffer, offset, length)` 形式消费窗口
    fn decode_window(
        &mut self,
        buffer: &[u8],
        offset: usize,
        length: usize,
        on_samples: &mut SampleSink<'_>,
    ) -> YinResult<()> {
        let end = offset
            .checked_add(length)
            .filter(|&end| end <= buffer.len())
            .ok_or_else(|| {
                YinError::InvalidArgument(format!(
                    "窗口越界: offset={} length={} buffer={}",
                    offset,
                    length,
                    buffer.len(),
                ))
            })?;
        self.decode(&buffer[offset..end], on_samples)
    }

    /// 是否要求整条流按顺序送入同一个实例
    ///
    /// 为 `true` 时跨帧状态依赖已见字节的顺序, 不能把窗口分派到多个线程.
    fn requires_sequential(&self) -> bool {
        false
    }

    /// 是否建议调用方在后台线程执行解码 (仅为建议, 解码器不强制)
    fn prefers_background(&self) -> bool {
        false
    }

    /// 清空所有跨调用状态, 回到刚创建时的样子 (缓冲区容量保留)
    fn reset(&mut self);
}
