//! 混合传输解复用解码器.
//!
//! 同一字节流中交错着压缩音频 (二进制部分) 与 JSON 元数据. 二进制部分
//! 转发给内部音频解码器, 结构化值收集后每次 `decode()` 至多批量投递一次.

pub mod chunk;

use serde_json::Value;
use yin_core::YinResult;

use crate::codec_id::CodecId;
use crate::decoder::{SampleSink, StreamDecoder};

pub use self::chunk::{
    CHUNK_HEADER_LEN, Chunk, ChunkSplitter, DEFAULT_MAX_BINARY_LEN, DEFAULT_MAX_JSON_LEN,
};

/// 元数据回调, 参数为本次 `decode()` 收集到的全部值
pub type MetadataSink = Box<dyn FnMut(&[Value]) + Send>;

/// 混合传输选项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MixedOptions {
    /// 单个二进制部分的最大长度
    pub max_binary_len: usize,
    /// 单个 JSON 部分的最大长度
    pub max_json_len: usize,
    /// 是否建议在后台线程解码 (JSON 解析开销较大)
    pub background: bool,
}

impl Default for MixedOptions {
    fn default() -> Self {
        Self {
            max_binary_len: DEFAULT_MAX_BINARY_LEN,
            max_json_len: DEFAULT_MAX_JSON_LEN,
            background: true,
        }
    }
}

/// 混合传输解码器, 包装一个内部音频解码器
pub struct MixedChunkDecoder {
    inner: Box<dyn StreamDecoder>,
    splitter: ChunkSplitter,
    options: MixedOptions,
    /// 本次调用收集的元数据
    pending: Vec<Value>,
    on_metadata: MetadataSink,
}

impl MixedChunkDecoder {
    pub fn new(
        inner: Box<dyn StreamDecoder>,
        options: MixedOptions,
        on_metadata: MetadataSink,
    ) -> Self {
        Self {
            inner,
            splitter: ChunkSplitter::new(options.max_binary_len, options.max_json_len),
            options,
            pending: Vec::new(),
            on_metadata,
        }
    }

    /// 内部音频解码器
    pub fn inner(&self) -> &dyn StreamDecoder {
        self.inner.as_ref()
    }

    pub fn options(&self) -> &MixedOptions {
        &self.options
    }

    /// 是否因封装错误失效
    pub fn is_failed(&self) -> bool {
        self.splitter.is_failed()
    }
}

impl StreamDecoder for MixedChunkDecoder {
    fn codec_id(&self) -> CodecId {
        CodecId::Mixed
    }

    fn name(&self) -> &str {
        "mixed"
    }

    fn setup(&mut self, channels: u32, sample_rate: u32) -> YinResult<()> {
        self.inner.setup(channels, sample_rate)
    }

    fn decode(&mut self, data: &[u8], on_samples: &mut SampleSink<'_>) -> YinResult<()> {
        let inner = &mut self.inner;
        let pending = &mut self.pending;
        let result = self.splitter.split(data, |chunk| {
            if let Some(binary) = chunk.binary {
                inner.decode(binary, &mut *on_samples)?;
            }
            match chunk.value {
                Some(Value::Array(items)) => pending.extend(items),
                Some(value) => pending.push(value),
                None => {}
            }
            Ok(())
        });

        // 失败前已收集的元数据照常投递
        if !self.pending.is_empty() {
            (self.on_metadata)(&self.pending);
            self.pending.clear();
        }
        result
    }

    fn requires_sequential(&self) -> bool {
        self.inner.requires_sequential()
    }

    fn prefers_background(&self) -> bool {
        self.options.background
    }

    fn reset(&mut self) {
        self.inner.reset();
        self.splitter.reset();
        self.pending.clear();
    }
}
