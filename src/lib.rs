//! # tsray
//!
//! 纯 Rust 实现的 MPEG-TS 码流结构分析工具.
//!
//! 按 PID 把传输包重组为 PES 负载, 识别其中的结构单元与随机访问点,
//! 并记录 PCR/PTS/DTS 以便分析时间戳漂移. 只分析结构, 不解码任何样本.
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use tsray::codec::{AnalyzerRegistry, CodecId};
//! use tsray::format::{Session, StreamSelection};
//!
//! let registry = AnalyzerRegistry::default();
//! let selection: StreamSelection = "0x100:h266".parse().unwrap();
//! let mut session = Session::open("capture.ts", &[selection], &registry).unwrap();
//! session.run().unwrap();
//! session.write_reports(std::path::Path::new("reports")).unwrap();
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `tsray-core` | 错误类型, 比特流读取, 时钟换算 |
//! | `tsray-codec` | H.266/VVC 与 MPEG-H MHAS 码流分析器 |
//! | `tsray-format` | TS 解封装, PES 重组, 记录引擎, CSV 报告 |

/// 核心类型与工具
pub use tsray_core as core;

/// 码流分析器
pub use tsray_codec as codec;

/// 传输流层
pub use tsray_format as format;

/// 创建已注册所有内置分析器的注册表
pub fn default_analyzer_registry() -> tsray_codec::AnalyzerRegistry {
    let mut registry = tsray_codec::AnalyzerRegistry::new();
    tsray_codec::register_all(&mut registry);
    registry
}
