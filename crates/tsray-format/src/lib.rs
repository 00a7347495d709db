//! # tsray-format
//!
//! tsray 传输流层: 解封装、PES 重组、记录引擎与 CSV 报告.
//!
//! 数据流:
//! ```text
//! TS 文件 → TsDemuxer → TransportPacket → RecordEngine (PesReassembler → UnitAnalyzer)
//!         → 历史记录 → CSV 报告
//! ```

pub mod demuxers;
pub mod io;
pub mod packet;
pub mod pes;
pub mod record;
pub mod report;
pub mod session;

// 重导出常用类型
pub use demuxers::{ElementaryStream, TsDemuxer};
pub use io::IoContext;
pub use packet::TransportPacket;
pub use pes::{PesHeader, PesPacket, PesReassembler, ReassemblerState};
pub use record::{PesRecord, RandomAccessEvent, RecordEngine, RecordSummary, StructuralUnitRecord};
pub use report::{ReportFiles, write_reports};
pub use session::{Session, StreamSelection};
