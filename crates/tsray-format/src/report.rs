//! CSV 报告输出.
//!
//! 每个 PID 生成以下文件 (PID 以十进制命名, 字段以 `", "` 分隔, 首行为表头):
//!
//! | 文件 | 表头 | 生成条件 |
//! |------|------|----------|
//! | `<PID>.csv` | `Pos, Size, PCR, PTS, DTS, (DTS-PCR)` | 总是 |
//! | `<PID>-nal.csv` | `Pos, PTS, NAL units` | H.266, 总是 |
//! | `<PID>-mhas.csv` | `Pos, PTS, MHAS Packet Types` | MPEG-H, 至少一条记录 |
//! | `<PID>-rap.csv` | `Pos, PTS, Key` | 至少一个随机访问点 |
//!
//! H.266 流同样生成 `<PID>-rap.csv`, 与 MPEG-H 共用同一格式; 旧版报告只为 MPEG-H 生成该文件.
//!
//! 任何文件无法创建或写入都是致命错误.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::info;
use tsray_core::{TsrayError, TsrayResult};

use crate::record::RecordEngine;

/// PES 时间信息报告表头
pub const PES_REPORT_HEADER: &str = "Pos, Size, PCR, PTS, DTS, (DTS-PCR)";
/// 随机访问点报告表头
pub const RAP_REPORT_HEADER: &str = "Pos, PTS, Key";

/// 已生成的报告文件
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFiles {
    pub pes: PathBuf,
    pub units: Option<PathBuf>,
    pub rap: Option<PathBuf>,
}

impl ReportFiles {
    /// 按生成顺序列出所有文件
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.pes.as_path())
            .chain(self.units.as_deref())
            .chain(self.rap.as_deref())
    }
}

/// 将一个记录引擎的历史写入 `root` 目录
pub fn write_reports(engine: &RecordEngine, root: &Path) -> TsrayResult<ReportFiles> {
    let pid = engine.pid();

    let pes = root.join(format!("{pid}.csv"));
    write_csv(
        &pes,
        PES_REPORT_HEADER,
        engine.pes_records().iter().map(|r| {
            let cols = [
                r.pos,
                r.size as i64,
                r.pcr_90k(),
                r.pts,
                r.effective_dts(),
                r.drift(),
            ];
            join(cols.iter())
        }),
    )?;

    let table = engine.unit_table();
    let units = if table.keep_empty || !engine.unit_records().is_empty() {
        let path = root.join(format!("{pid}-{}.csv", table.suffix));
        write_csv(
            &path,
            &format!("Pos, PTS, {}", table.column),
            engine
                .unit_records()
                .iter()
                .map(|r| format!("{}, {}, {}", r.pos, r.pts, r.units.join(", "))),
        )?;
        Some(path)
    } else {
        None
    };

    let rap = if engine.rap_events().is_empty() {
        None
    } else {
        let path = root.join(format!("{pid}-rap.csv"));
        write_csv(
            &path,
            RAP_REPORT_HEADER,
            engine
                .rap_events()
                .iter()
                .map(|e| format!("{}, {}, {}", e.pos, e.pts, e.key)),
        )?;
        Some(path)
    };

    let files = ReportFiles { pes, units, rap };
    for path in files.paths() {
        info!("报告已写入: {}", path.display());
    }
    Ok(files)
}

fn join<T: ToString>(cols: impl Iterator<Item = T>) -> String {
    cols.map(|c| c.to_string()).collect::<Vec<_>>().join(", ")
}

fn write_csv(path: &Path, header: &str, rows: impl Iterator<Item = String>) -> TsrayResult<()> {
    let report_err = |source| TsrayError::Report {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(report_err)?;
    let mut writer = BufWriter::new(file);
    writeln!(writer, "{header}").map_err(report_err)?;
    for row in rows {
        writeln!(writer, "{row}").map_err(report_err)?;
    }
    writer.flush().map_err(report_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::TransportPacket;
    use tsray_codec::{AnalyzerRegistry, CodecId};

    fn engine(codec_id: CodecId) -> RecordEngine {
        let analyzer = AnalyzerRegistry::default().create(codec_id).unwrap();
        RecordEngine::new(256, analyzer)
    }

    /// PTS = 0, 无 DTS 的 PES 头
    const PES_HEADER: [u8; 14] = [
        0x00, 0x00, 0x01, 0xE0, 0x00, 0x00, 0x80, 0x80, 0x05, 0x21, 0x00, 0x01, 0x00, 0x01,
    ];

    fn pes(payload: &[u8]) -> Vec<u8> {
        let mut data = PES_HEADER.to_vec();
        data.extend_from_slice(payload);
        data
    }

    #[test]
    fn test_h266_报告() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(CodecId::H266);
        let nal = [0x00, 0x00, 0x01, 0x00, 0x48, 0x11, 0x00, 0x00, 0x01, 0x00, 0x78, 0x22];
        engine.process(&TransportPacket::new(0, 256, true, 27_000, pes(&nal)));
        engine.flush();

        let files = write_reports(&engine, dir.path()).unwrap();
        assert_eq!(files.pes, dir.path().join("256.csv"));
        assert_eq!(files.units, Some(dir.path().join("256-nal.csv")));
        assert_eq!(files.rap, Some(dir.path().join("256-rap.csv")));

        let pes_csv = std::fs::read_to_string(&files.pes).unwrap();
        assert_eq!(pes_csv, "Pos, Size, PCR, PTS, DTS, (DTS-PCR)\n0, 12, 90, 0, 0, -90\n");

        let nal_csv = std::fs::read_to_string(dir.path().join("256-nal.csv")).unwrap();
        assert_eq!(nal_csv, "Pos, PTS, NAL units\n0, 0, cra_nut, sps_nut\n");

        let rap_csv = std::fs::read_to_string(dir.path().join("256-rap.csv")).unwrap();
        assert_eq!(rap_csv, "Pos, PTS, Key\n0, 0, true\n");
    }

    #[test]
    fn test_mhas_无记录时不生成文件() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(CodecId::MpeghAudio);
        engine.process(&TransportPacket::new(0, 256, true, 0, pes(&[])));
        engine.flush();

        let files = write_reports(&engine, dir.path()).unwrap();
        assert_eq!(files.units, None);
        assert_eq!(files.rap, None);
        assert!(!dir.path().join("256-mhas.csv").exists());
        assert!(!dir.path().join("256-rap.csv").exists());
        assert_eq!(files.paths().count(), 1);
    }

    #[test]
    fn test_无法创建文件为致命错误() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let engine = engine(CodecId::H266);

        let err = write_reports(&engine, &missing).unwrap_err();
        match err {
            TsrayError::Report { path, .. } => assert_eq!(path, missing.join("256.csv")),
            other => panic!("意外的错误: {other}"),
        }
    }
}
