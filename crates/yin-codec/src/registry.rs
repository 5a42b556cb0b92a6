//! 解码器注册表.
//!
//! 按 `CodecId` 查找并实例化解码器, 混合传输解码器在内部解码器之上组装.

use std::collections::HashMap;

use log::debug;
use yin_core::{YinError, YinResult};

use crate::codec_id::CodecId;
use crate::decoder::StreamDecoder;
use crate::decoders::mixed::{MetadataSink, MixedChunkDecoder, MixedOptions};

/// 解码器工厂函数类型
pub type DecoderFactory = fn() -> YinResult<Box<dyn StreamDecoder>>;

/// 解码器注册表
pub struct CodecRegistry {
    /// 解码器工厂映射, 同一 ID 可注册多个实现
    decoders: HashMap<CodecId, Vec<DecoderEntry>>,
}

/// 解码器注册条目
struct DecoderEntry {
    /// 解码器名称
    name: String,
    /// 工厂函数
    factory: DecoderFactory,
}

impl CodecRegistry {
    /// 创建空的注册表
    pub fn new() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// 注册一个解码器
    pub fn register_decoder(
        &mut self,
        codec_id: CodecId,
        name: impl Into<String>,
        factory: DecoderFactory,
    ) {
        self.decoders
            .entry(codec_id)
            .or_default()
            .push(DecoderEntry {
                name: name.into(),
                factory,
            });
    }

    /// 创建指定 ID 的解码器实例
    pub fn create_decoder(&self, codec_id: CodecId) -> YinResult<Box<dyn StreamDecoder>> {
        if codec_id == CodecId::Mixed {
            return Err(YinError::InvalidArgument(
                "混合传输需要内部解码器, 请使用 create_mixed_decoder".into(),
            ));
        }
        let entry = self
            .decoders
            .get(&codec_id)
            .and_then(|entries| entries.first())
            .ok_or_else(|| YinError::CodecNotFound(format!("未找到 {} 的解码器", codec_id)))?;
        // 使用第一个注册的解码器 (优先级最高)
        debug!("创建解码器: {}", entry.name);
        (entry.factory)()
    }

    /// 创建混合传输解码器, 二进制部分交给 `inner` 指定的解码器
    pub fn create_mixed_decoder(
        &self,
        inner: CodecId,
        options: MixedOptions,
        on_metadata: MetadataSink,
    ) -> YinResult<Box<dyn StreamDecoder>> {
        let inner = self.create_decoder(inner)?;
        Ok(Box::new(MixedChunkDecoder::new(inner, options, on_metadata)))
    }

    /// 获取所有已注册的解码器, 按 `CodecId` 顺序排列
    pub fn list_decoders(&self) -> Vec<(CodecId, &str)> {
        let mut result = Vec::new();
        for id in CodecId::ALL {
            if let Some(entries) = self.decoders.get(&id) {
                for entry in entries {
                    result.push((id, entry.name.as_str()));
                }
            }
        }
        result
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}
