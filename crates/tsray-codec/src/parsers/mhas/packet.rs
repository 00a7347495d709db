//! MHAS (MPEG-H 3D Audio Stream) 包头解析.
//!
//! # MHAS 包结构 (ISO/IEC 23008-3)
//! ```text
//! MHASPacketType    escapedValue(3, 8, 8)
//! MHASPacketLabel   escapedValue(2, 8, 32)
//! MHASPacketLength  escapedValue(11, 24, 24)
//! MHASPacketPayload MHASPacketLength 字节
//! ```

use std::borrow::Cow;
use std::fmt;

use log::debug;
use tsray_core::{BitReader, TsrayResult};

/// MHAS 包类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MhasPacketType {
    /// PACTYP_FILLDATA
    FillData,
    /// PACTYP_MPEGH3DACFG (配置, 随机访问点)
    Config,
    /// PACTYP_MPEGH3DAFRAME (音频帧)
    Frame,
    /// PACTYP_AUDIOSCENEINFO
    AudioSceneInfo,
    /// PACTYP_SYNC (同步, 随机访问点)
    Sync,
    /// PACTYP_SYNCGAP
    SyncGap,
    /// PACTYP_MARKER
    Marker,
    /// PACTYP_CRC16
    Crc16,
    /// PACTYP_CRC32
    Crc32,
    /// PACTYP_DESCRIPTOR
    Descriptor,
    /// PACTYP_USERINTERACTION
    UserInteraction,
    /// PACTYP_LOUDNESS_DRC
    LoudnessDrc,
    /// PACTYP_BUFFERINFO
    BufferInfo,
    /// PACTYP_GLOBAL_CRC16
    GlobalCrc16,
    /// PACTYP_GLOBAL_CRC32
    GlobalCrc32,
    /// PACTYP_AUDIOTRUNCATION
    AudioTruncation,
    /// PACTYP_GENDATA
    GenData,
    /// 未定义的类型编号
    Unknown(u64),
}

/// 按类型编号索引的静态表, 4 和 5 为保留值
const PACKET_TYPES: [Option<MhasPacketType>; 19] = [
    Some(MhasPacketType::FillData),
    Some(MhasPacketType::Config),
    Some(MhasPacketType::Frame),
    Some(MhasPacketType::AudioSceneInfo),
    None,
    None,
    Some(MhasPacketType::Sync),
    Some(MhasPacketType::SyncGap),
    Some(MhasPacketType::Marker),
    Some(MhasPacketType::Crc16),
    Some(MhasPacketType::Crc32),
    Some(MhasPacketType::Descriptor),
    Some(MhasPacketType::UserInteraction),
    Some(MhasPacketType::LoudnessDrc),
    Some(MhasPacketType::BufferInfo),
    Some(MhasPacketType::GlobalCrc16),
    Some(MhasPacketType::GlobalCrc32),
    Some(MhasPacketType::AudioTruncation),
    Some(MhasPacketType::GenData),
];

impl MhasPacketType {
    /// 从类型编号创建
    pub fn from_code(code: u64) -> Self {
        usize::try_from(code)
            .ok()
            .and_then(|i| PACKET_TYPES.get(i).copied().flatten())
            .unwrap_or(Self::Unknown(code))
    }

    /// 报告中的名称, 未定义类型为 `unknown_<code>`
    pub fn name(&self) -> Cow<'static, str> {
        let name = match self {
            Self::FillData => "PACTYP_FILLDATA",
            Self::Config => "PACTYP_MPEGH3DACFG",
            Self::Frame => "PACTYP_MPEGH3DAFRAME",
            Self::AudioSceneInfo => "PACTYP_AUDIOSCENEINFO",
            Self::Sync => "PACTYP_SYNC",
            Self::SyncGap => "PACTYP_SYNCGAP",
            Self::Marker => "PACTYP_MARKER",
            Self::Crc16 => "PACTYP_CRC16",
            Self::Crc32 => "PACTYP_CRC32",
            Self::Descriptor => "PACTYP_DESCRIPTOR",
            Self::UserInteraction => "PACTYP_USERINTERACTION",
            Self::LoudnessDrc => "PACTYP_LOUDNESS_DRC",
            Self::BufferInfo => "PACTYP_BUFFERINFO",
            Self::GlobalCrc16 => "PACTYP_GLOBAL_CRC16",
            Self::GlobalCrc32 => "PACTYP_GLOBAL_CRC32",
            Self::AudioTruncation => "PACTYP_AUDIOTRUNCATION",
            Self::GenData => "PACTYP_GENDATA",
            Self::Unknown(code) => return Cow::Owned(format!("unknown_{code}")),
        };
        Cow::Borrowed(name)
    }

    /// 是否为随机访问点 (配置包或同步包)
    pub fn is_random_access(&self) -> bool {
        matches!(self, Self::Config | Self::Sync)
    }
}

impl fmt::Display for MhasPacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// MHAS 包头
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MhasPacketHeader {
    /// MHASPacketType
    pub packet_type: u64,
    /// MHASPacketLabel (仅为保持读取位置而解析)
    pub label: u64,
    /// MHASPacketLength, 负载字节数
    pub length: u64,
}

impl MhasPacketHeader {
    /// 从当前读取位置解析包头
    pub fn read(br: &mut BitReader<'_>) -> TsrayResult<Self> {
        let packet_type = br.read_escaped_value(3, 8, 8)?;
        let label = br.read_escaped_value(2, 8, 32)?;
        let length = br.read_escaped_value(11, 24, 24)?;
        Ok(Self {
            packet_type,
            label,
            length,
        })
    }
}

/// 按顺序解析负载中的所有 MHAS 包类型
///
/// 包长度超出剩余数据 (或包头本身被截断) 时视为损坏,
/// 从该包起始位置的下一个字节重新同步, 而不是放弃整个负载.
/// 剩余不足 2 字节时停止.
pub fn scan_mhas_packets(data: &[u8]) -> Vec<MhasPacketType> {
    let mut types = Vec::new();
    let mut br = BitReader::new(data);

    while br.bytes_left() >= 2 {
        let start = br.byte_position();

        let header = match MhasPacketHeader::read(&mut br) {
            Ok(header) if header.length <= br.bytes_left() as u64 => header,
            Ok(header) => {
                debug!(
                    "MHAS: 包长度越界, offset={start}, length={}, 剩余={}",
                    header.length,
                    br.bytes_left()
                );
                if br.seek_to_byte(start + 1).is_err() {
                    break;
                }
                continue;
            }
            Err(_) => {
                debug!("MHAS: 包头截断, offset={start}");
                if br.seek_to_byte(start + 1).is_err() {
                    break;
                }
                continue;
            }
        };

        types.push(MhasPacketType::from_code(header.packet_type));

        // 长度已校验, 只有非字节对齐时才可能失败
        if br.skip_bytes(header.length as usize).is_err() {
            break;
        }
    }

    types
}
