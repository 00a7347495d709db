//! H.266/VVC 码流分析.
//!
//! 提供:
//! - NAL 单元类型表与起始码扫描
//! - 基于 NAL 类型的随机访问点检测

pub mod nal;

pub use nal::{VvcNalUnitType, scan_nal_unit_types};

use crate::analyzer::{UnitAnalysis, UnitAnalyzer, UnitTable};
use crate::codec_id::CodecId;

/// VVC NAL 报告描述
pub const NAL_UNIT_TABLE: UnitTable = UnitTable {
    suffix: "nal",
    column: "NAL units",
    keep_empty: true,
};

/// VVC NAL 分析器
#[derive(Debug, Default)]
pub struct H266Analyzer;

impl H266Analyzer {
    /// 创建分析器
    pub fn new() -> Self {
        Self
    }
}

impl UnitAnalyzer for H266Analyzer {
    fn codec_id(&self) -> CodecId {
        CodecId::H266
    }

    fn unit_table(&self) -> UnitTable {
        NAL_UNIT_TABLE
    }

    fn analyze(&mut self, payload: &[u8]) -> UnitAnalysis {
        let types = scan_nal_unit_types(payload);
        UnitAnalysis {
            random_access: types.iter().any(VvcNalUnitType::is_random_access),
            units: types.iter().map(|t| t.name().to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_多个随机访问_nal_只标记一次() {
        let mut payload = Vec::new();
        for header in [0x41u8, 0x48, 0x41] {
            payload.extend_from_slice(&[0x00, 0x00, 0x01, 0x00, header, 0x80, 0x80]);
        }
        payload.extend_from_slice(&[0xAA; 4]);

        let mut analyzer = H266Analyzer::new();
        let analysis = analyzer.analyze(&payload);
        assert_eq!(analysis.units, vec!["idr_n_lp", "cra_nut", "idr_n_lp"]);
        assert!(analysis.random_access);
    }

    #[test]
    fn test_非随机访问负载() {
        let payload = [0x00, 0x00, 0x01, 0x00, 0x01, 0x11, 0x22, 0x33];
        let analysis = H266Analyzer::new().analyze(&payload);
        assert_eq!(analysis.units, vec!["trail_nvc"]);
        assert!(!analysis.random_access);
    }
}
