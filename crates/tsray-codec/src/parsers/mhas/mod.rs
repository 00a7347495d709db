//! MPEG-H 3D Audio (MHAS) 码流分析.
//!
//! 提供:
//! - MHAS 包头 (escapedValue 编码) 解析
//! - 包类型分类与损坏包后的字节级重新同步
//! - 基于配置包/同步包的随机访问点检测

pub mod packet;

pub use packet::{MhasPacketHeader, MhasPacketType, scan_mhas_packets};

use crate::analyzer::{UnitAnalysis, UnitAnalyzer, UnitTable};
use crate::codec_id::CodecId;

/// MHAS 包类型报告描述
pub const MHAS_PACKET_TABLE: UnitTable = UnitTable {
    suffix: "mhas",
    column: "MHAS Packet Types",
    keep_empty: false,
};

/// MHAS 分析器
#[derive(Debug, Default)]
pub struct MhasAnalyzer;

impl MhasAnalyzer {
    /// 创建分析器
    pub fn new() -> Self {
        Self
    }
}

impl UnitAnalyzer for MhasAnalyzer {
    fn codec_id(&self) -> CodecId {
        CodecId::MpeghAudio
    }

    fn unit_table(&self) -> UnitTable {
        MHAS_PACKET_TABLE
    }

    fn analyze(&mut self, payload: &[u8]) -> UnitAnalysis {
        let types = scan_mhas_packets(payload);
        UnitAnalysis {
            random_access: types.iter().any(MhasPacketType::is_random_access),
            units: types.iter().map(|t| t.name().into_owned()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_配置包为随机访问点() {
        // CFG(len=1) + FRAME(len=0)
        let payload = [0x20, 0x01, 0xEE, 0x40, 0x00];
        let analysis = MhasAnalyzer::new().analyze(&payload);
        assert_eq!(
            analysis.units,
            vec!["PACTYP_MPEGH3DACFG", "PACTYP_MPEGH3DAFRAME"]
        );
        assert!(analysis.random_access);
    }

    #[test]
    fn test_仅音频帧不是随机访问点() {
        let payload = [0x40, 0x02, 0x11, 0x22];
        let analysis = MhasAnalyzer::new().analyze(&payload);
        assert_eq!(analysis.units, vec!["PACTYP_MPEGH3DAFRAME"]);
        assert!(!analysis.random_access);
    }
}
