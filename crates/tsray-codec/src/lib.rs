//! # tsray-codec
//!
//! tsray 编码层码流分析库.
//!
//! 分析器只识别结构边界与随机访问点, 不做任何样本解码.
//!
//! ## 支持的编码
//!
//! - **H.266/VVC**: 起始码扫描, NAL 单元类型分类
//! - **MPEG-H 3D Audio**: MHAS 包头解析, 包类型分类
//!
//! ## 使用示例
//!
//! ```rust
//! use tsray_codec::{AnalyzerRegistry, CodecId};
//!
//! let registry = AnalyzerRegistry::default();
//! let mut analyzer = registry.create(CodecId::H266).unwrap();
//! let analysis = analyzer.analyze(&[0x00, 0x00, 0x01, 0x00, 0x48, 0x00, 0x00]);
//! assert_eq!(analysis.units, vec!["cra_nut"]);
//! assert!(analysis.random_access);
//! ```

pub mod analyzer;
pub mod codec_id;
pub mod parsers;
pub mod registry;

// 重导出常用类型
pub use analyzer::{UnitAnalysis, UnitAnalyzer, UnitTable};
pub use codec_id::CodecId;
pub use registry::{AnalyzerRegistry, register_all};
