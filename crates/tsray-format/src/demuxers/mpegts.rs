//! MPEG-TS (Transport Stream) 解封装器.
//!
//! 按文件顺序读取 188 字节的 TS 包, 解析 PAT/PMT 以发现基本流,
//! 跟踪 PCR, 并为每个基本流 PID 产出 [`TransportPacket`].
//!
//! # TS 包结构 (188 字节)
//! ```text
//! ┌──────────────────────────────────────────┐
//! │ 同步字节 (0x47)                    1 byte│
//! │ TEI(1) + PUSI(1) + Priority(1) +         │
//! │   PID(13)                         2 bytes│
//! │ TSC(2) + AFC(2) + CC(4)          1 byte │
//! │ [Adaptation Field]               可变     │
//! │ [Payload]                        可变     │
//! └──────────────────────────────────────────┘
//! ```
//!
//! # 适配字段中关心的部分
//! - random_access_indicator
//! - PCR (33 位 base + 9 位 extension, 27MHz)
//! - transport_private_data

use std::collections::HashMap;

use bytes::Bytes;
use log::{debug, warn};
use tsray_codec::CodecId;
use tsray_core::timestamp::pcr_from_fields;
use tsray_core::{TsrayError, TsrayResult};

use crate::io::IoContext;
use crate::packet::TransportPacket;

/// TS 包大小
pub const TS_PACKET_SIZE: usize = 188;
/// TS 同步字节
pub const TS_SYNC_BYTE: u8 = 0x47;
/// PAT PID
const PID_PAT: u16 = 0x0000;
/// 空包 PID
const PID_NULL: u16 = 0x1FFF;
/// open() 时为解析 PAT/PMT 最多预读的包数
const MAX_PROBE_PACKETS: usize = 5000;

/// PMT 中声明的基本流
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementaryStream {
    /// ES PID
    pub pid: u16,
    /// stream_type
    pub stream_type: u8,
    /// 可分析的编码, 未知 stream_type 为 None
    pub codec_id: Option<CodecId>,
}

/// TS 包头 (4 字节)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TsHeader {
    pid: u16,
    pusi: bool,
    afc: u8,
    cc: u8,
}

impl TsHeader {
    fn parse(pkt: &[u8; TS_PACKET_SIZE]) -> Self {
        Self {
            pid: (u16::from(pkt[1] & 0x1F) << 8) | u16::from(pkt[2]),
            pusi: (pkt[1] & 0x40) != 0,
            afc: (pkt[3] >> 4) & 0x03,
            cc: pkt[3] & 0x0F,
        }
    }

    /// afc==1 或 afc==3 表示有 payload
    fn has_payload(&self) -> bool {
        self.afc == 1 || self.afc == 3
    }

    /// afc==2 或 afc==3 表示有适配字段
    fn has_adaptation_field(&self) -> bool {
        self.afc == 2 || self.afc == 3
    }
}

/// 适配字段中提取的信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct AdaptationField {
    discontinuity: bool,
    random_access: bool,
    pcr: Option<i64>,
    private_data: Option<Bytes>,
}

impl AdaptationField {
    /// 解析适配字段, `af` 为 adaptation_field_length 之后的字节
    fn parse(af: &[u8]) -> Self {
        let mut field = Self::default();
        let Some(&flags) = af.first() else {
            return field;
        };
        field.discontinuity = flags & 0x80 != 0;
        field.random_access = flags & 0x40 != 0;

        let mut pos = 1;
        if flags & 0x10 != 0 {
            if let Some(b) = af.get(pos..pos + 6) {
                let base = (u64::from(b[0]) << 25)
                    | (u64::from(b[1]) << 17)
                    | (u64::from(b[2]) << 9)
                    | (u64::from(b[3]) << 1)
                    | (u64::from(b[4]) >> 7);
                let ext = (u16::from(b[4] & 0x01) << 8) | u16::from(b[5]);
                field.pcr = Some(pcr_from_fields(base, ext));
            }
            pos += 6;
        }
        // OPCR
        if flags & 0x08 != 0 {
            pos += 6;
        }
        // splice_countdown
        if flags & 0x04 != 0 {
            pos += 1;
        }
        if flags & 0x02 != 0 {
            if let Some(&len) = af.get(pos) {
                let start = pos + 1;
                if let Some(data) = af.get(start..start + usize::from(len)) {
                    field.private_data = Some(Bytes::copy_from_slice(data));
                }
            }
        }
        field
    }
}

/// MPEG-TS 解封装器
pub struct TsDemuxer {
    /// PAT 中的 PMT PID
    pmt_pid: Option<u16>,
    /// PMT 中的 PCR PID
    pcr_pid: Option<u16>,
    /// PMT 声明的基本流
    streams: Vec<ElementaryStream>,
    /// 最新 PCR (27MHz)
    last_pcr: i64,
    /// PID → 上一个连续计数器
    continuity: HashMap<u16, u8>,
    /// PAT 是否已解析
    pat_parsed: bool,
    /// PMT 是否已解析
    pmt_parsed: bool,
}

impl Default for TsDemuxer {
    fn default() -> Self {
        Self::new()
    }
}

impl TsDemuxer {
    /// 创建解封装器
    pub fn new() -> Self {
        Self {
            pmt_pid: None,
            pcr_pid: None,
            streams: Vec::new(),
            last_pcr: 0,
            continuity: HashMap::new(),
            pat_parsed: false,
            pmt_parsed: false,
        }
    }

    /// 打开传输流: 同步到第一个 TS 包并预读 PAT/PMT, 随后回到起点
    ///
    /// 找不到 PAT/PMT 不视为错误, 调用方仍可按 PID 显式指定编码.
    pub fn open(&mut self, io: &mut IoContext) -> TsrayResult<()> {
        self.sync_to_packet(io)?;
        let start = io.position()?;

        for _ in 0..MAX_PROBE_PACKETS {
            let pkt = match self.read_raw_packet(io) {
                Ok((_, pkt)) => pkt,
                Err(TsrayError::Eof) => break,
                Err(e) => return Err(e),
            };
            let header = TsHeader::parse(&pkt);
            if let Some(payload) = Self::payload(&pkt, &header) {
                self.handle_psi(&header, payload);
            }
            if self.pat_parsed && self.pmt_parsed {
                break;
            }
        }

        if self.streams.is_empty() {
            warn!("TS: 未能从 PAT/PMT 发现基本流");
        } else {
            debug!("TS: 发现 {} 个基本流", self.streams.len());
        }

        io.seek(std::io::SeekFrom::Start(start))?;
        self.continuity.clear();
        self.last_pcr = 0;
        Ok(())
    }

    /// PMT 声明的基本流
    pub fn streams(&self) -> &[ElementaryStream] {
        &self.streams
    }

    /// 查找指定 PID 的基本流
    pub fn stream(&self, pid: u16) -> Option<&ElementaryStream> {
        self.streams.iter().find(|s| s.pid == pid)
    }

    /// 读取下一个基本流传输包
    ///
    /// PSI 与空包在内部处理, 不会返回.
    /// 到达文件末尾时返回 `TsrayError::Eof`.
    pub fn read_packet(&mut self, io: &mut IoContext) -> TsrayResult<TransportPacket> {
        loop {
            let (pos, pkt) = self.read_raw_packet(io)?;
            if let Some(packet) = self.process_packet(pos, &pkt) {
                return Ok(packet);
            }
        }
    }

    /// 处理一个 TS 包, 基本流包返回 `Some`
    fn process_packet(&mut self, pos: u64, pkt: &[u8; TS_PACKET_SIZE]) -> Option<TransportPacket> {
        let header = TsHeader::parse(pkt);
        if header.pid == PID_NULL {
            return None;
        }

        let af = if header.has_adaptation_field() {
            let af_len = usize::from(pkt[4]);
            let end = (5 + af_len).min(TS_PACKET_SIZE);
            AdaptationField::parse(&pkt[5..end])
        } else {
            AdaptationField::default()
        };

        if let Some(pcr) = af.pcr {
            if self.pcr_pid.is_none_or(|pid| pid == header.pid) {
                self.last_pcr = pcr;
            }
        }

        if header.has_payload() {
            self.check_continuity(&header, af.discontinuity);
        }

        let payload = Self::payload(pkt, &header);
        if header.pid == PID_PAT || Some(header.pid) == self.pmt_pid {
            if let Some(payload) = payload {
                self.handle_psi(&header, payload);
            }
            return None;
        }

        Some(TransportPacket {
            pos: pos as i64,
            pid: header.pid,
            pusi: header.pusi,
            pcr: self.last_pcr,
            random_access: af.random_access,
            private_data: af.private_data,
            data: payload.map(Bytes::copy_from_slice).unwrap_or_default(),
        })
    }

    /// 获取 payload 切片
    fn payload<'a>(pkt: &'a [u8; TS_PACKET_SIZE], header: &TsHeader) -> Option<&'a [u8]> {
        if !header.has_payload() {
            return None;
        }
        let offset = if header.has_adaptation_field() {
            5 + usize::from(pkt[4])
        } else {
            4
        };
        pkt.get(offset..)
    }

    /// 连续计数器检查, 只记录日志
    fn check_continuity(&mut self, header: &TsHeader, discontinuity: bool) {
        if let Some(prev) = self.continuity.insert(header.pid, header.cc) {
            let expected = (prev + 1) & 0x0F;
            if header.cc != expected && header.cc != prev && !discontinuity {
                debug!(
                    "TS: PID {:#06X} 连续计数器跳变, 期望 {}, 实际 {}",
                    header.pid, expected, header.cc
                );
            }
        }
    }

    /// PSI 处理 (PAT / PMT)
    fn handle_psi(&mut self, header: &TsHeader, payload: &[u8]) {
        if !header.pusi || payload.is_empty() {
            return;
        }
        // pointer_field
        let section_start = 1 + usize::from(payload[0]);
        let Some(section) = payload.get(section_start..) else {
            return;
        };
        if header.pid == PID_PAT {
            self.parse_pat(section);
        } else if Some(header.pid) == self.pmt_pid {
            self.parse_pmt(section);
        }
    }

    /// 解析 PAT (Program Association Table)
    fn parse_pat(&mut self, section: &[u8]) {
        if self.pat_parsed || section.len() < 8 {
            return;
        }
        let section_length = usize::from(section[1] & 0x0F) << 8 | usize::from(section[2]);

        // 跳过 transport_stream_id(2) + version/flags(1) + section_number(1) + last_section(1)
        let entries_start = 8;
        let entries_end = (3 + section_length).min(section.len()).saturating_sub(4); // 减去 CRC
        if entries_end <= entries_start {
            return;
        }

        // 每个条目 4 字节: program_number(2) + PID(2)
        for chunk in section[entries_start..entries_end].chunks_exact(4) {
            let program_number = u16::from(chunk[0]) << 8 | u16::from(chunk[1]);
            let pid = (u16::from(chunk[2] & 0x1F) << 8) | u16::from(chunk[3]);
            if program_number != 0 {
                self.pmt_pid = Some(pid);
                debug!("TS PAT: program={program_number} PMT_PID={pid:#06X}");
                break; // 只取第一个节目
            }
        }

        self.pat_parsed = true;
    }

    /// 解析 PMT (Program Map Table)
    fn parse_pmt(&mut self, section: &[u8]) {
        if self.pmt_parsed || section.len() < 12 {
            return;
        }
        let section_length = usize::from(section[1] & 0x0F) << 8 | usize::from(section[2]);
        let pcr_pid = (u16::from(section[8] & 0x1F) << 8) | u16::from(section[9]);
        if pcr_pid != PID_NULL {
            self.pcr_pid = Some(pcr_pid);
        }

        let prog_info_len = usize::from(section[10] & 0x0F) << 8 | usize::from(section[11]);
        let mut pos = 12 + prog_info_len;
        let section_end = (3 + section_length).min(section.len()).saturating_sub(4); // 减去 CRC

        while pos + 5 <= section_end {
            let stream_type = section[pos];
            let pid = (u16::from(section[pos + 1] & 0x1F) << 8) | u16::from(section[pos + 2]);
            let es_info_len =
                usize::from(section[pos + 3] & 0x0F) << 8 | usize::from(section[pos + 4]);
            let codec_id = CodecId::from_stream_type(stream_type);

            debug!("TS PMT: stream_type=0x{stream_type:02X} PID={pid:#06X} codec={codec_id:?}");

            self.streams.push(ElementaryStream {
                pid,
                stream_type,
                codec_id,
            });
            pos += 5 + es_info_len;
        }

        self.pmt_parsed = true;
    }

    /// 读取一个 188 字节的 TS 包, 同步字节丢失时重新同步
    fn read_raw_packet(&mut self, io: &mut IoContext) -> TsrayResult<(u64, [u8; TS_PACKET_SIZE])> {
        loop {
            let pos = io.position()?;
            let mut pkt = [0u8; TS_PACKET_SIZE];
            io.read_exact(&mut pkt)?;
            if pkt[0] == TS_SYNC_BYTE {
                return Ok((pos, pkt));
            }
            warn!("TS: 同步字节丢失, pos={pos}, 尝试重新同步");
            io.seek(std::io::SeekFrom::Start(pos + 1))?;
            self.sync_to_packet(io)?;
        }
    }

    /// 从当前位置同步到下一个有效的 TS 包
    fn sync_to_packet(&self, io: &mut IoContext) -> TsrayResult<()> {
        let max_search = 65536;
        for _ in 0..max_search {
            let b = io.read_u8()?;
            if b == TS_SYNC_BYTE {
                // 验证: 188 字节后是否还有同步字节
                let pos = io.position()?;
                let mut check = [0u8; TS_PACKET_SIZE];
                match io.read_exact(&mut check) {
                    Ok(()) if check[TS_PACKET_SIZE - 1] == TS_SYNC_BYTE => {
                        io.seek(std::io::SeekFrom::Start(pos - 1))?;
                        return Ok(());
                    }
                    // 文件末尾只剩一个包, 直接接受
                    Err(TsrayError::Eof) => {
                        io.seek(std::io::SeekFrom::Start(pos - 1))?;
                        return Ok(());
                    }
                    _ => {}
                }
                io.seek(std::io::SeekFrom::Start(pos))?;
            }
        }
        Err(TsrayError::InvalidData("TS: 找不到同步字节".into()))
    }
}
