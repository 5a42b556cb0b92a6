//! MPEG 帧解码器: 跨调用的帧头/帧体累积状态机.
//!
//! 状态转换:
//!
//! ```text
//! Header ──(4 字节帧头有效)──> Body ──(整帧到齐, 合成)──> Header
//!   │  └──(帧头无效)──> 丢弃首字节, 以剩余 3 字节继续 (逐字节重同步)
//!   └──("ID3")──> Id3Header ──> SkipTag ──> Header
//! ```

use log::{debug, trace, warn};
use yin_core::{BitReader, YinResult};

use super::header::{HEADER_LEN, MpegHeader};
use super::synth::{FrameSynthesizer, MpegFrame};
use crate::buffer::GrowBuffer;
use crate::decoder::SampleSink;

/// ID3v2 标签头长度
const ID3_HEADER_LEN: usize = 10;

/// 帧缓冲初始容量, 覆盖常见码率下的单帧
const INITIAL_FRAME_CAPACITY: usize = 2048;

/// 解析器状态
#[derive(Debug, Clone, Copy)]
enum FrameState {
    /// 累积帧头, `filled` 为已缓存的字节数
    Header { filled: usize },
    /// 累积 ID3v2 标签头
    Id3Header { filled: usize },
    /// 跳过 ID3v2 标签体
    SkipTag { remaining: usize },
    /// 累积帧体, `filled` 含帧头
    Body { header: MpegHeader, filled: usize },
}

/// 单个 MPEG 流的帧解码器
pub struct MpegFrameDecoder {
    state: FrameState,
    /// 帧头 / ID3 标签头暂存
    header_buf: [u8; ID3_HEADER_LEN],
    /// 整帧缓冲 (容量只增不减)
    frame_buf: GrowBuffer<u8>,
    /// 交错采样缓冲 (容量只增不减)
    samples: GrowBuffer<f32>,
    synth: Box<dyn FrameSynthesizer>,
    /// 已完成的帧数
    frame_index: u64,
    /// 当前重同步过程中已丢弃的字节数, `None` 表示未在重同步
    resync_skipped: Option<usize>,
    /// 最近一帧的帧头
    last_header: Option<MpegHeader>,
}

impl MpegFrameDecoder {
    pub fn new(synth: Box<dyn FrameSynthesizer>) -> Self {
        Self {
            state: FrameState::Header { filled: 0 },
            header_buf: [0; ID3_HEADER_LEN],
            frame_buf: GrowBuffer::with_capacity(INITIAL_FRAME_CAPACITY),
            samples: GrowBuffer::new(),
            synth,
            frame_index: 0,
            resync_skipped: None,
            last_header: None,
        }
    }

    /// 已完成 (含合成失败) 的帧数
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// 最近一个有效帧头
    pub fn last_header(&self) -> Option<&MpegHeader> {
        self.last_header.as_ref()
    }

    /// 帧缓冲容量 (字节)
    pub fn frame_capacity(&self) -> usize {
        self.frame_buf.capacity()
    }

    /// 采样缓冲容量 (浮点数个数)
    pub fn sample_capacity(&self) -> usize {
        self.samples.capacity()
    }

    /// 是否有未完成的帧头或帧体
    pub fn has_pending(&self) -> bool {
        !matches!(self.state, FrameState::Header { filled: 0 })
    }

    /// 消费输入, 每完成一帧调用一次 `on_samples`
    ///
    /// 帧头错误在内部恢复, 不会向调用方返回.
    pub fn feed(&mut self, data: &[u8], on_samples: &mut SampleSink<'_>) -> YinResult<()> {
        let mut pos = 0;
        while pos < data.len() {
            match self.state {
                FrameState::Header { filled } => {
                    let take = (HEADER_LEN - filled).min(data.len() - pos);
                    self.header_buf[filled..filled + take].copy_from_slice(&data[pos..pos + take]);
                    pos += take;
                    let filled = filled + take;
                    if filled < HEADER_LEN {
                        self.state = FrameState::Header { filled };
                        continue;
                    }
                    self.on_header();
                }
                FrameState::Id3Header { filled } => {
                    let take = (ID3_HEADER_LEN - filled).min(data.len() - pos);
                    self.header_buf[filled..filled + take].copy_from_slice(&data[pos..pos + take]);
                    pos += take;
                    let filled = filled + take;
                    if filled < ID3_HEADER_LEN {
                        self.state = FrameState::Id3Header { filled };
                        continue;
                    }
                    if let Some(tail) = self.on_id3_header() {
                        // 标签头无效: 丢弃 "I", 其余字节重新扫描
                        self.feed(&tail, on_samples)?;
                    }
                }
                FrameState::SkipTag { remaining } => {
                    let take = remaining.min(data.len() - pos);
                    pos += take;
                    let remaining = remaining - take;
                    self.state = if remaining == 0 {
                        debug!("ID3v2 标签跳过完成");
                        FrameState::Header { filled: 0 }
                    } else {
                        FrameState::SkipTag { remaining }
                    };
                }
                FrameState::Body { header, filled } => {
                    let take = (header.frame_length - filled).min(data.len() - pos);
                    self.frame_buf.slice_mut(header.frame_length)[filled..filled + take]
                        .copy_from_slice(&data[pos..pos + take]);
                    pos += take;
                    let filled = filled + take;
                    if filled < header.frame_length {
                        self.state = FrameState::Body { header, filled };
                        continue;
                    }
                    self.finish_frame(&header, on_samples);
                }
            }
        }
        Ok(())
    }

    /// 4 字节帧头到齐: 解析成功进入 Body, 否则按字节重同步
    fn on_header(&mut self) {
        let bytes = [
            self.header_buf[0],
            self.header_buf[1],
            self.header_buf[2],
            self.header_buf[3],
        ];

        if bytes[..3] == *b"ID3" {
            self.end_resync();
            self.state = FrameState::Id3Header { filled: HEADER_LEN };
            return;
        }

        match MpegHeader::parse(bytes) {
            Ok(header) => {
                self.end_resync();
                self.begin_frame(header);
            }
            Err(err) => {
                let raw = u32::from_be_bytes(bytes);
                match self.resync_skipped.as_mut() {
                    None => {
                        warn!(
                            "MPEG 帧 {} 帧头无效 ({:#010X}): {}, 开始逐字节重同步",
                            self.frame_index, raw, err
                        );
                        self.resync_skipped = Some(1);
                    }
                    Some(skipped) => {
                        trace!("重同步: 帧头 {:#010X} 无效", raw);
                        *skipped += 1;
                    }
                }
                self.header_buf.copy_within(1..HEADER_LEN, 0);
                self.state = FrameState::Header {
                    filled: HEADER_LEN - 1,
                };
            }
        }
    }

    fn end_resync(&mut self) {
        if let Some(skipped) = self.resync_skipped.take() {
            debug!(
                "MPEG 重同步完成: 帧 {} 前丢弃 {} 字节",
                self.frame_index, skipped
            );
        }
    }

    /// 10 字节 ID3v2 标签头到齐, 标签头无效时返回需要重新扫描的字节
    fn on_id3_header(&mut self) -> Option<[u8; ID3_HEADER_LEN - 1]> {
        let tag = self.header_buf;
        let size_bytes = &tag[6..10];
        if tag[3] == 0xFF || tag[4] == 0xFF || size_bytes.iter().any(|&b| b & 0x80 != 0) {
            warn!("ID3v2 标签头无效, 跳过标签标识");
            self.state = FrameState::Header { filled: 0 };
            let mut tail = [0u8; ID3_HEADER_LEN - 1];
            tail.copy_from_slice(&tag[1..]);
            return Some(tail);
        }

        let size = size_bytes
            .iter()
            .fold(0usize, |acc, &b| (acc << 7) | usize::from(b));
        let footer = if tag[5] & 0x10 != 0 {
            ID3_HEADER_LEN
        } else {
            0
        };
        let remaining = size + footer;
        debug!("跳过 ID3v2.{} 标签: {} 字节", tag[3], remaining);
        self.state = if remaining == 0 {
            FrameState::Header { filled: 0 }
        } else {
            FrameState::SkipTag { remaining }
        };
        None
    }

    /// 有效帧头: 按需扩容并开始累积帧体
    fn begin_frame(&mut self, header: MpegHeader) {
        let frame_len = header.frame_length;
        if self.frame_buf.ensure(frame_len) {
            debug!("MPEG 帧缓冲扩容至 {} 字节", frame_len);
        }
        let sample_len = header.sample_count * header.channels() as usize;
        if self.samples.ensure(sample_len) {
            debug!("MPEG 采样缓冲扩容至 {} 个采样", sample_len);
        }

        self.frame_buf.slice_mut(HEADER_LEN).copy_from_slice(&self.header_buf[..HEADER_LEN]);
        if self.last_header.is_none() {
            debug!(
                "MPEG 流: {:?} {:?}, {} Hz, {} 声道, {} bps",
                header.version,
                header.layer,
                header.sample_rate,
                header.channels(),
                header.bitrate
            );
        }
        self.last_header = Some(header);
        self.state = FrameState::Body {
            header,
            filled: HEADER_LEN,
        };
    }

    /// 整帧到齐: 合成并投递采样, 然后回到帧头状态
    fn finish_frame(&mut self, header: &MpegHeader, on_samples: &mut SampleSink<'_>) {
        let channels = header.channels() as usize;
        let data = self.frame_buf.slice(header.frame_length);
        let out = self.samples.slice_mut(header.sample_count * channels);
        let mut reader = BitReader::at(data, header.data_offset());
        let frame = MpegFrame {
            header,
            data,
            index: self.frame_index,
        };

        match self.synth.synthesize(&frame, &mut reader, out) {
            Ok(count) => {
                let len = (count * channels).min(out.len());
                if len > 0 {
                    on_samples(&out[..len]);
                }
            }
            Err(err) => {
                warn!("MPEG 帧 {} 合成失败, 丢弃该帧: {}", self.frame_index, err);
            }
        }

        self.frame_index += 1;
        self.state = FrameState::Header { filled: 0 };
    }

    /// 丢弃所有未完成的状态, 保留已分配的缓冲
    pub fn reset(&mut self) {
        self.state = FrameState::Header { filled: 0 };
        self.resync_skipped = None;
        self.last_header = None;
        self.frame_index = 0;
        self.synth.reset();
    }
}
