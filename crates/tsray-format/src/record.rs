//! 单个 PID 的记录引擎.
//!
//! 串联 [`PesReassembler`] 与码流分析器, 为报告保存三类历史:
//! - 每个完成的 PES 包的时间信息 ([`PesRecord`])
//! - 每个负载中的结构单元分类 ([`StructuralUnitRecord`])
//! - 随机访问点事件 ([`RandomAccessEvent`]), 每个负载至多一个

use log::{debug, info};
use tsray_codec::{CodecId, UnitAnalyzer, UnitTable};
use tsray_core::timestamp;

use crate::packet::TransportPacket;
use crate::pes::{PesPacket, PesReassembler};

/// 完成的 PES 包的时间信息 (不保留负载)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PesRecord {
    pub pos: i64,
    pub size: usize,
    /// 27MHz 原始 PCR
    pub pcr: i64,
    pub pts: i64,
    pub dts: i64,
}

impl PesRecord {
    fn from_packet(pes: &PesPacket) -> Self {
        Self {
            pos: pes.pos,
            size: pes.size,
            pcr: pes.pcr,
            pts: pes.pts,
            dts: pes.dts,
        }
    }

    /// 对齐到 90kHz 的 PCR
    pub fn pcr_90k(&self) -> i64 {
        timestamp::pcr_to_90k(self.pcr)
    }

    /// 报告使用的 DTS, 缺失时为 PTS
    pub fn effective_dts(&self) -> i64 {
        timestamp::effective_dts(self.pts, self.dts)
    }

    /// DTS - PCR (90kHz)
    pub fn drift(&self) -> i64 {
        timestamp::dts_pcr_drift(self.pts, self.dts, self.pcr)
    }
}

/// 单个负载的结构单元分类
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralUnitRecord {
    pub pos: i64,
    pub pts: i64,
    /// 分类名称, 按出现顺序, 不去重
    pub units: Vec<String>,
}

/// 随机访问点事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomAccessEvent {
    pub pos: i64,
    pub pts: i64,
    pub key: bool,
}

/// 记录引擎统计
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordSummary {
    pub pid: u16,
    pub codec_id: CodecId,
    /// 完成的 PES 包数
    pub pes_packets: usize,
    /// 累积的负载总字节数
    pub payload_bytes: usize,
    /// 识别出的结构单元总数
    pub units: usize,
    /// 随机访问点事件数
    pub random_access_points: usize,
}

/// 单个 PID 的记录引擎
pub struct RecordEngine {
    pid: u16,
    reassembler: PesReassembler,
    analyzer: Box<dyn UnitAnalyzer>,
    pes_records: Vec<PesRecord>,
    unit_records: Vec<StructuralUnitRecord>,
    rap_events: Vec<RandomAccessEvent>,
}

impl RecordEngine {
    /// 为指定 PID 创建记录引擎
    pub fn new(pid: u16, analyzer: Box<dyn UnitAnalyzer>) -> Self {
        Self {
            pid,
            reassembler: PesReassembler::new(pid),
            analyzer,
            pes_records: Vec::new(),
            unit_records: Vec::new(),
            rap_events: Vec::new(),
        }
    }

    pub fn pid(&self) -> u16 {
        self.pid
    }

    pub fn codec_id(&self) -> CodecId {
        self.analyzer.codec_id()
    }

    pub fn unit_table(&self) -> UnitTable {
        self.analyzer.unit_table()
    }

    /// 处理一个属于本 PID 的传输包
    pub fn process(&mut self, packet: &TransportPacket) {
        self.log_private_data(packet);
        if let Some(pes) = self.reassembler.process(packet) {
            self.complete(pes);
        }
    }

    /// 结束流, 分析尚未完成的 PES 包
    pub fn flush(&mut self) {
        if let Some(pes) = self.reassembler.flush() {
            self.complete(pes);
        }
    }

    pub fn pes_records(&self) -> &[PesRecord] {
        &self.pes_records
    }

    pub fn unit_records(&self) -> &[StructuralUnitRecord] {
        &self.unit_records
    }

    pub fn rap_events(&self) -> &[RandomAccessEvent] {
        &self.rap_events
    }

    /// 统计信息
    pub fn summary(&self) -> RecordSummary {
        RecordSummary {
            pid: self.pid,
            codec_id: self.codec_id(),
            pes_packets: self.pes_records.len(),
            payload_bytes: self.pes_records.iter().map(|r| r.size).sum(),
            units: self.unit_records.iter().map(|r| r.units.len()).sum(),
            random_access_points: self.rap_events.len(),
        }
    }

    fn complete(&mut self, pes: PesPacket) {
        let analysis = self.analyzer.analyze(&pes.data);

        if pes.random_access_indicator != analysis.random_access {
            debug!(
                "PID {:#06X}: 适配字段 random_access_indicator={} 与码流分析结果 {} 不一致, pos={}",
                self.pid, pes.random_access_indicator, analysis.random_access, pes.pos
            );
        }

        if analysis.random_access {
            info!(
                "PID {:#06X}: 随机访问点 pos={} pts={}",
                self.pid, pes.pos, pes.pts
            );
            self.rap_events.push(RandomAccessEvent {
                pos: pes.pos,
                pts: pes.pts,
                key: true,
            });
        }

        if !analysis.is_empty() || self.unit_table().keep_empty {
            self.unit_records.push(StructuralUnitRecord {
                pos: pes.pos,
                pts: pes.pts,
                units: analysis.units,
            });
        }

        self.pes_records.push(PesRecord::from_packet(&pes));
    }

    fn log_private_data(&self, packet: &TransportPacket) {
        let Some(data) = &packet.private_data else {
            return;
        };
        let hex: String = data.iter().map(|b| format!("{b:02X}")).collect();
        debug!(
            "PID {:#06X}: 适配字段私有数据 pos={} len={} data={hex}",
            self.pid,
            packet.pos,
            data.len()
        );
    }
}
