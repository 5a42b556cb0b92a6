//! 混合传输的分块器.
//!
//! 线上格式, 重复直到流结束:
//!
//! ```text
//! [u32 BE binary_len][u32 BE json_len][binary_len 字节二进制][json_len 字节 UTF-8 JSON]
//! ```
//!
//! 长度为 0 表示该部分缺省. 二进制部分随到随出 (可能被切成多段),
//! JSON 部分缓存到完整后再解析.

use bytes::BytesMut;
use log::{trace, warn};
use serde_json::Value;
use yin_core::{YinError, YinResult};

/// 分块头长度
pub const CHUNK_HEADER_LEN: usize = 8;
/// 默认二进制部分上限 (16 MiB)
pub const DEFAULT_MAX_BINARY_LEN: usize = 16 << 20;
/// 默认 JSON 部分上限 (1 MiB)
pub const DEFAULT_MAX_JSON_LEN: usize = 1 << 20;

/// 分块器输出的一个单元
///
/// 二进制与结构化值可以同时存在, 也可以都缺省.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk<'a> {
    pub binary: Option<&'a [u8]>,
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SplitState {
    /// 累积 8 字节分块头
    Header { filled: usize },
    /// 转发二进制部分
    Binary { remaining: usize, json_len: usize },
    /// 缓存 JSON 部分
    Json { len: usize },
    /// 封装错误后不再接受输入
    Failed,
}

/// 流式分块器, 跨调用保留分块头与未完成的 JSON
#[derive(Debug)]
pub struct ChunkSplitter {
    max_binary_len: usize,
    max_json_len: usize,
    state: SplitState,
    header: [u8; CHUNK_HEADER_LEN],
    json: BytesMut,
}

impl Default for ChunkSplitter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BINARY_LEN, DEFAULT_MAX_JSON_LEN)
    }
}

impl ChunkSplitter {
    pub fn new(max_binary_len: usize, max_json_len: usize) -> Self {
        Self {
            max_binary_len,
            max_json_len,
            state: SplitState::Header { filled: 0 },
            header: [0; CHUNK_HEADER_LEN],
            json: BytesMut::new(),
        }
    }

    /// 是否因封装错误失效
    pub fn is_failed(&self) -> bool {
        self.state == SplitState::Failed
    }

    /// 是否停在分块边界上
    pub fn at_boundary(&self) -> bool {
        self.state == SplitState::Header { filled: 0 }
    }

    /// 按线上顺序切分输入, 每得到一个单元调用一次 `on_chunk`
    ///
    /// 一个单元的二进制尾段与其 JSON 在同一次调用内到齐时, 合并为
    /// 同一个 `Chunk` 输出.
    pub fn split<'d, F>(&mut self, data: &'d [u8], mut on_chunk: F) -> YinResult<()>
    where
        F: FnMut(Chunk<'d>) -> YinResult<()>,
    {
        let mut pos = 0;
        // 已完整但等待同一单元 JSON 的二进制尾段
        let mut held: Option<&'d [u8]> = None;

        loop {
            match self.state {
                SplitState::Failed => {
                    return Err(YinError::Format("混合流已因封装错误失效".into()));
                }
                _ if pos == data.len() => break,
                SplitState::Header { filled } => {
                    let take = (CHUNK_HEADER_LEN - filled).min(data.len() - pos);
                    self.header[filled..filled + take].copy_from_slice(&data[pos..pos + take]);
                    pos += take;
                    let filled = filled + take;
                    self.state = SplitState::Header { filled };
                    if filled == CHUNK_HEADER_LEN {
                        self.on_header()?;
                    }
                }
                SplitState::Binary {
                    remaining,
                    json_len,
                } => {
                    let take = remaining.min(data.len() - pos);
                    let span = &data[pos..pos + take];
                    pos += take;
                    let remaining = remaining - take;
                    if remaining > 0 {
                        self.state = SplitState::Binary {
                            remaining,
                            json_len,
                        };
                        on_chunk(Chunk {
                            binary: Some(span),
                            value: None,
                        })?;
                    } else if json_len > 0 {
                        held = Some(span);
                        self.state = SplitState::Json { len: json_len };
                    } else {
                        self.state = SplitState::Header { filled: 0 };
                        on_chunk(Chunk {
                            binary: Some(span),
                            value: None,
                        })?;
                    }
                }
                SplitState::Json { len } => {
                    let take = (len - self.json.len()).min(data.len() - pos);
                    self.json.extend_from_slice(&data[pos..pos + take]);
                    pos += take;
                    if self.json.len() < len {
                        continue;
                    }
                    let value = self.parse_json();
                    self.state = SplitState::Header { filled: 0 };
                    let binary = held.take();
                    if binary.is_some() || value.is_some() {
                        on_chunk(Chunk { binary, value })?;
                    }
                }
            }
        }

        if let Some(span) = held {
            on_chunk(Chunk {
                binary: Some(span),
                value: None,
            })?;
        }
        Ok(())
    }

    /// 分块头到齐: 校验两个长度
    fn on_header(&mut self) -> YinResult<()> {
        let [a, b, c, d, e, f, g, h] = self.header;
        let binary_len = u32::from_be_bytes([a, b, c, d]) as usize;
        let json_len = u32::from_be_bytes([e, f, g, h]) as usize;

        if binary_len > self.max_binary_len {
            return Err(self.fail(format!(
                "二进制部分 {} 字节超过上限 {}",
                binary_len, self.max_binary_len
            )));
        }
        if json_len > self.max_json_len {
            return Err(self.fail(format!(
                "JSON 部分 {} 字节超过上限 {}",
                json_len, self.max_json_len
            )));
        }

        trace!("分块头: binary={} json={}", binary_len, json_len);
        self.state = match (binary_len, json_len) {
            (0, 0) => SplitState::Header { filled: 0 },
            (0, len) => SplitState::Json { len },
            (remaining, json_len) => SplitState::Binary {
                remaining,
                json_len,
            },
        };
        if let SplitState::Json { len } = self.state {
            self.json.reserve(len);
        }
        Ok(())
    }

    fn fail(&mut self, message: String) -> YinError {
        warn!("混合流封装错误: {}", message);
        self.state = SplitState::Failed;
        YinError::Format(message)
    }

    /// 解析已缓存的 JSON, 格式错误时记录并丢弃
    fn parse_json(&mut self) -> Option<Value> {
        let parsed = serde_json::from_slice::<Value>(&self.json);
        self.json.clear();
        match parsed {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("丢弃无法解析的 JSON 部分: {}", err);
                None
            }
        }
    }

    /// 回到分块边界, 丢弃未完成的单元
    pub fn reset(&mut self) {
        self.state = SplitState::Header { filled: 0 };
        self.json.clear();
    }
}
