//! 编码标识符.
//!
//! 为每种可分析的编码分配唯一标识, 并提供与 PMT stream_type 的映射.

use std::fmt;
use std::str::FromStr;

use tsray_core::TsrayError;

/// 编码标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CodecId {
    /// H.266 / VVC (ISO/IEC 23090-3)
    H266,
    /// MPEG-H 3D Audio, MHAS 封装 (ISO/IEC 23008-3)
    MpeghAudio,
}

impl CodecId {
    /// 所有支持的编码
    pub const ALL: [CodecId; 2] = [CodecId::H266, CodecId::MpeghAudio];

    /// 由 PMT 中的 stream_type 推断编码
    ///
    /// - 0x33: VVC 视频
    /// - 0x2D: MPEG-H 3D Audio 主流 (MHAS)
    /// - 0x2E: MPEG-H 3D Audio 辅助流
    pub const fn from_stream_type(stream_type: u8) -> Option<Self> {
        match stream_type {
            0x33 => Some(Self::H266),
            0x2D | 0x2E => Some(Self::MpeghAudio),
            _ => None,
        }
    }

    /// 获取编码的人类可读名称
    pub const fn name(&self) -> &'static str {
        match self {
            Self::H266 => "h266",
            Self::MpeghAudio => "mpegh",
        }
    }
}

impl fmt::Display for CodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for CodecId {
    type Err = TsrayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "h266" | "vvc" => Ok(Self::H266),
            "mpegh" | "mha" | "mhas" => Ok(Self::MpeghAudio),
            other => Err(TsrayError::CodecNotFound(format!("不支持的编码: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_type_映射() {
        assert_eq!(CodecId::from_stream_type(0x33), Some(CodecId::H266));
        assert_eq!(CodecId::from_stream_type(0x2D), Some(CodecId::MpeghAudio));
        assert_eq!(CodecId::from_stream_type(0x2E), Some(CodecId::MpeghAudio));
        assert_eq!(CodecId::from_stream_type(0x1B), None);
    }

    #[test]
    fn test_名称解析() {
        assert_eq!("VVC".parse::<CodecId>().unwrap(), CodecId::H266);
        assert_eq!("mhas".parse::<CodecId>().unwrap(), CodecId::MpeghAudio);
        assert!("aac".parse::<CodecId>().is_err());
        assert_eq!(CodecId::MpeghAudio.to_string(), "mpegh");
    }
}
