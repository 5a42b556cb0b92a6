//! MPEG 音频帧头解析.
//!
//! 覆盖 MPEG-1/2/2.5 的 Layer I/II/III. 帧头为 4 字节, 按大端拼成 32 位后
//! 从 bit 31 向下解释:
//!
//! ```text
//! AAAAAAAA AAABBCCD EEEEFFGH IIJJKLMM
//! A: 同步字 (11 位, 全 1)      B: 版本         C: 层
//! D: 保护位 (0 = 有 CRC)       E: 比特率索引   F: 采样率索引
//! G: 填充位                    H: 私有位       I: 声道模式
//! J: 声道模式扩展              K: 版权         L: 原始
//! M: 加重
//! ```

use yin_core::{YinError, YinResult};

/// 帧头长度 (字节)
pub const HEADER_LEN: usize = 4;
/// CRC 长度 (字节)
pub const CRC_LEN: usize = 2;

/// 比特率表 (kbps) [版本组: V1=0 / V2·V2.5=1][layer-1][索引]
///
/// 索引 0 为自由比特率, 索引 15 非法.
const BITRATE_KBPS: [[[u32; 15]; 3]; 2] = [
    [
        [0, 32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448],
        [0, 32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384],
        [0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320],
    ],
    [
        [0, 32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256],
        [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160],
        [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160],
    ],
];

/// MPEG-1 采样率表, V2 减半, V2.5 再减半
const SAMPLE_RATES: [u32; 3] = [44100, 48000, 32000];

/// MPEG 版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MpegVersion {
    /// MPEG-1
    Version1,
    /// MPEG-2 (LSF)
    Version2,
    /// MPEG-2.5 (非官方扩展)
    Version25,
}

/// MPEG Layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpegLayer {
    Layer1 = 1,
    Layer2 = 2,
    Layer3 = 3,
}

/// 声道模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMode {
    Stereo,
    JointStereo,
    DualChannel,
    SingleChannel,
}

impl ChannelMode {
    /// 输出声道数
    pub const fn channels(&self) -> u32 {
        match self {
            ChannelMode::SingleChannel => 1,
            _ => 2,
        }
    }
}

/// MPEG 音频帧头
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MpegHeader {
    /// 原始 32 位帧头
    pub raw: u32,
    pub version: MpegVersion,
    pub layer: MpegLayer,
    pub has_crc: bool,
    /// 比特率索引 (0 = 自由比特率)
    pub bitrate_index: u8,
    /// 比特率 (bps); 自由比特率时为估算值
    pub bitrate: u32,
    pub sample_rate_index: u8,
    pub sample_rate: u32,
    pub padding: bool,
    pub mode: ChannelMode,
    pub mode_extension: u8,
    pub copyright: bool,
    /// 整帧长度 (字节, 含帧头)
    pub frame_length: usize,
    /// 每声道采样数
    pub sample_count: usize,
}

impl MpegHeader {
    /// 解析 4 字节帧头
    pub fn parse(bytes: [u8; HEADER_LEN]) -> YinResult<Self> {
        Self::parse_u32(u32::from_be_bytes(bytes))
    }

    /// 解析已拼成 32 位的帧头
    pub fn parse_u32(header: u32) -> YinResult<Self> {
        if header >> 21 != 0x7FF {
            return Err(YinError::Format(format!(
                "同步字错误: 0x{:03X}",
                header >> 21
            )));
        }

        let version = match (header >> 19) & 0x3 {
            3 => MpegVersion::Version1,
            2 => MpegVersion::Version2,
            0 => MpegVersion::Version25,
            v => {
                return Err(YinError::Format(format!("保留的 MPEG 版本位: {v}")));
            }
        };

        let layer = match 4 - ((header >> 17) & 0x3) {
            1 => MpegLayer::Layer1,
            2 => MpegLayer::Layer2,
            3 => MpegLayer::Layer3,
            _ => return Err(YinError::Format("保留的 MPEG 层位: 0".into())),
        };

        let has_crc = (header >> 16) & 0x1 == 0;

        let bitrate_index = ((header >> 12) & 0xF) as u8;
        if bitrate_index == 15 {
            return Err(YinError::Format("非法比特率索引: 15".into()));
        }

        let sample_rate_index = ((header >> 10) & 0x3) as u8;
        if sample_rate_index == 3 {
            return Err(YinError::Format("非法采样率索引: 3".into()));
        }
        let sample_rate = match version {
            MpegVersion::Version1 => SAMPLE_RATES[sample_rate_index as usize],
            MpegVersion::Version2 => SAMPLE_RATES[sample_rate_index as usize] / 2,
            MpegVersion::Version25 => SAMPLE_RATES[sample_rate_index as usize] / 4,
        };

        let padding = (header >> 9) & 0x1 == 1;
        let mode = match (header >> 6) & 0x3 {
            0 => ChannelMode::Stereo,
            1 => ChannelMode::JointStereo,
            2 => ChannelMode::DualChannel,
            _ => ChannelMode::SingleChannel,
        };
        let mode_extension = ((header >> 4) & 0x3) as u8;
        let copyright = (header >> 3) & 0x1 == 1;

        let sample_count = match (layer, version) {
            (MpegLayer::Layer1, _) => 384,
            (MpegLayer::Layer3, v) if v > MpegVersion::Version1 => 576,
            _ => 1152,
        };

        let mut parsed = Self {
            raw: header,
            version,
            layer,
            has_crc,
            bitrate_index,
            bitrate: 0,
            sample_rate_index,
            sample_rate,
            padding,
            mode,
            mode_extension,
            copyright,
            frame_length: 0,
            sample_count,
        };

        if bitrate_index == 0 {
            parsed.estimate_free_format()?;
        } else {
            let group = usize::from(version != MpegVersion::Version1);
            let kbps = BITRATE_KBPS[group][layer as usize - 1][bitrate_index as usize];
            parsed.bitrate = kbps * 1000;
            parsed.frame_length = parsed.compute_frame_length();
        }

        if parsed.frame_length <= parsed.data_offset() {
            return Err(YinError::Format(format!(
                "帧长 {} 不足以容纳帧头",
                parsed.frame_length
            )));
        }
        Ok(parsed)
    }

    /// 按比特率与采样率计算整帧长度
    fn compute_frame_length(&self) -> usize {
        let pad = usize::from(self.padding);
        let bitrate = self.bitrate as usize;
        let rate = self.sample_rate as usize;
        match self.layer {
            MpegLayer::Layer1 => ((12 * bitrate / rate) + pad) << 2,
            _ => {
                let mut len = 144 * bitrate / rate;
                if self.version != MpegVersion::Version1 {
                    len >>= 1;
                }
                len + pad
            }
        }
    }

    /// 自由比特率: 以帧头 + 侧信息 + 填充估算帧长, 再反推比特率
    fn estimate_free_format(&mut self) -> YinResult<()> {
        let side = self.side_data_size();
        if side == 0 {
            return Err(YinError::Format(format!(
                "自由比特率无法估算帧长: {:?} 无侧信息",
                self.layer
            )));
        }
        let pad = usize::from(self.padding);
        let length = self.data_offset() + side + pad;
        let rate = self.sample_rate as usize;
        let raw_bitrate = match self.layer {
            MpegLayer::Layer1 => ((length >> 2).saturating_sub(pad)) * rate / 12,
            _ => {
                let slots = length - pad;
                let per_frame = if self.version == MpegVersion::Version1 {
                    144
                } else {
                    72
                };
                slots * rate / per_frame
            }
        };
        self.frame_length = length;
        self.bitrate = (((raw_bitrate + 500) / 1000) * 1000) as u32;
        Ok(())
    }

    /// 侧信息 (side data) 字节数, 仅用于自由比特率估算
    pub fn side_data_size(&self) -> usize {
        let mono = self.mode == ChannelMode::SingleChannel;
        match self.layer {
            // 每子带 4 位比特分配; 联合立体声前 bound 个子带双声道
            MpegLayer::Layer1 => match self.mode {
                ChannelMode::SingleChannel => 16,
                ChannelMode::JointStereo => (32 + 4 + 4 * self.mode_extension as usize) / 2,
                _ => 32,
            },
            MpegLayer::Layer2 => 0,
            MpegLayer::Layer3 => match (self.version, mono) {
                (MpegVersion::Version1, true) => 17,
                (MpegVersion::Version1, false) => 32,
                (_, true) => 9,
                (_, false) => 17,
            },
        }
    }

    /// 帧体数据起点 (帧头 + 可选 CRC)
    pub fn data_offset(&self) -> usize {
        HEADER_LEN + if self.has_crc { CRC_LEN } else { 0 }
    }

    /// 输出声道数
    pub fn channels(&self) -> u32 {
        self.mode.channels()
    }
}
