//! yin-cli - 流式音频解码命令行工具
//!
//! 读取文件, 按固定窗口大小切分后逐块送入解码器, 模拟网络传输的
//! 分块到达. 可选地把解码结果写成小端 f32 原始采样.

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};
use serde_json::Value;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process;

use yin::config::YinConfig;

#[derive(Parser, Debug)]
#[command(name = "yin-cli", version, about = "纯 Rust 流式音频解码工具")]
struct Cli {
    /// 输入文件路径
    #[arg(short, long)]
    input: PathBuf,

    /// 解码器名称 (pcm_s16le, wav, mpeg, opus, mixed ...)
    #[arg(short, long)]
    codec: Option<String>,

    /// 混合传输的内部解码器
    #[arg(long)]
    inner_codec: Option<String>,

    /// 每次送入解码器的字节数
    #[arg(long)]
    chunk_size: Option<usize>,

    /// 声道数
    #[arg(long)]
    channels: Option<u32>,

    /// 采样率 (Hz)
    #[arg(long)]
    sample_rate: Option<u32>,

    /// 输出原始 f32 小端采样文件
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON 配置文件
    #[arg(long)]
    config: Option<PathBuf>,

    /// 日志级别 (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// 解码统计
#[derive(Debug, Default)]
struct DecodeStats {
    callbacks: usize,
    samples: usize,
    peak: f32,
}

impl DecodeStats {
    fn record(&mut self, samples: &[f32]) {
        self.callbacks += 1;
        self.samples += samples.len();
        self.peak = samples.iter().fold(self.peak, |peak, s| peak.max(s.abs()));
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("错误: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => YinConfig::load(path)?,
        None => YinConfig::default(),
    };
    apply_overrides(&mut config, &cli);
    yin::logging::init(config.logging.clone())?;

    let registry = yin::default_codec_registry();
    let mut decoder = config.stream.create_decoder(
        &registry,
        Box::new(|values: &[Value]| {
            for value in values {
                println!("元数据: {value}");
            }
        }),
    )?;
    info!(
        "解码器 {}: 顺序投递={}, 建议后台={}",
        decoder.name(),
        decoder.requires_sequential(),
        decoder.prefers_background()
    );

    let data = std::fs::read(&cli.input)
        .with_context(|| format!("读取输入文件失败, path={}", cli.input.display()))?;
    let mut writer = match &cli.output {
        Some(path) => Some(BufWriter::new(File::create(path).with_context(|| {
            format!("创建输出文件失败, path={}", path.display())
        })?)),
        None => None,
    };

    let mut stats = DecodeStats::default();
    let mut pending = Vec::new();
    for (index, window) in data.chunks(config.stream.chunk_size).enumerate() {
        decoder
            .decode(window, &mut |samples: &[f32]| {
                stats.record(samples);
                if writer.is_some() {
                    pending.extend(samples.iter().flat_map(|s| s.to_le_bytes()));
                }
            })
            .with_context(|| format!("第 {} 个窗口解码失败", index))?;
        if let Some(writer) = writer.as_mut() {
            writer.write_all(&pending)?;
            pending.clear();
        }
        debug!("窗口 {}: {} 字节", index, window.len());
    }
    if let Some(mut writer) = writer {
        writer.flush()?;
    }

    println!(
        "{}: {} 字节, {} 次回调, {} 个采样, 峰值 {:.4}",
        cli.input.display(),
        data.len(),
        stats.callbacks,
        stats.samples,
        stats.peak
    );
    Ok(())
}

/// 命令行参数覆盖配置文件
fn apply_overrides(config: &mut YinConfig, cli: &Cli) {
    let stream = &mut config.stream;
    if let Some(codec) = &cli.codec {
        stream.codec = codec.clone();
    }
    if let Some(inner) = &cli.inner_codec {
        stream.mixed.inner_codec = inner.clone();
    }
    if let Some(chunk_size) = cli.chunk_size {
        stream.chunk_size = chunk_size;
    }
    if let Some(channels) = cli.channels {
        stream.channels = channels;
    }
    if let Some(sample_rate) = cli.sample_rate {
        stream.sample_rate = sample_rate;
    }
    match cli.verbose {
        0 => {}
        1 => config.logging.level = "debug".to_string(),
        _ => config.logging.level = "trace".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_命令行覆盖配置() {
        let cli = Cli::parse_from([
            "yin-cli",
            "-i",
            "in.mp3",
            "-c",
            "mp3",
            "--chunk-size",
            "7",
            "-vv",
        ]);
        let mut config = YinConfig::default();
        apply_overrides(&mut config, &cli);
        assert_eq!(config.stream.codec, "mp3");
        assert_eq!(config.stream.chunk_size, 7);
        assert_eq!(config.stream.channels, 1);
        assert_eq!(config.logging.level, "trace");
    }

    #[test]
    fn test_统计峰值() {
        let mut stats = DecodeStats::default();
        stats.record(&[0.25, -0.75]);
        stats.record(&[0.5]);
        assert_eq!(stats.callbacks, 2);
        assert_eq!(stats.samples, 3);
        assert_eq!(stats.peak, 0.75);
    }
}
