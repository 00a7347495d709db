//! PES (Packetized Elementary Stream) 重组.
//!
//! 每个 PID 拥有一个 [`PesReassembler`], 把按文件顺序到达的传输包拼接成完整的 PES 负载.
//!
//! PUSI 包的负载不足 [`MIN_PES_HEADER_LEN`] 字节时无法解析 PES 头,
//! 此时进入缓冲状态, 把后续包的负载暂存起来, 凑够字节后再解析 PES 头.
//! PES 头声明的长度 (含填充字节) 超过已有字节时同样继续缓冲, 直到整个头到齐.
//!
//! # 状态转换
//! ```text
//!            PUSI (>= 19 字节)
//!   Idle ─────────────────────────▶ Accumulating ◀──┐
//!     │                                  ▲          │ 非 PUSI: 追加负载
//!     │ PUSI (< 19 字节或头不完整)         │          │
//!     ▼                                  │ 整个 PES 头到齐
//!   Buffering ───────────────────────────┘
//! ```
//! 任何状态下遇到 PUSI 都会先结束当前 PES 包.

use std::mem;

use log::{debug, warn};

use crate::packet::TransportPacket;

/// 可以可靠解析 PES 头 (含 PTS 与 DTS) 的最小字节数
pub const MIN_PES_HEADER_LEN: usize = 19;

/// PES 起始码前缀
const PES_START_CODE: [u8; 3] = [0x00, 0x00, 0x01];

/// PES 头中提取的信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PesHeader {
    /// PES 头总长度 (包括起始码)
    pub header_len: usize,
    /// PTS (90kHz), 不存在时为 0
    pub pts: i64,
    /// DTS (90kHz), 不存在时为 0
    pub dts: i64,
}

impl PesHeader {
    /// 解析 PES 头
    ///
    /// 数据不足 [`MIN_PES_HEADER_LEN`] 字节或起始码不匹配时返回 `None`.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < MIN_PES_HEADER_LEN || data[..3] != PES_START_CODE {
            return None;
        }

        // data[6]: 10xxxxxx 表示存在可选头
        if (data[6] & 0xC0) != 0x80 {
            return Some(Self {
                header_len: 6,
                pts: 0,
                dts: 0,
            });
        }

        let pts_dts_flags = (data[7] >> 6) & 0x03;
        let header_len = 9 + usize::from(data[8]);

        let pts = if pts_dts_flags >= 2 {
            parse_timestamp(&data[9..14])
        } else {
            0
        };
        let dts = if pts_dts_flags == 3 {
            parse_timestamp(&data[14..19])
        } else {
            0
        };

        Some(Self {
            header_len,
            pts,
            dts,
        })
    }
}

/// 从 5 字节中提取 33-bit 时间戳
fn parse_timestamp(data: &[u8]) -> i64 {
    let b0 = i64::from(data[0]);
    let b1 = i64::from(data[1]);
    let b2 = i64::from(data[2]);
    let b3 = i64::from(data[3]);
    let b4 = i64::from(data[4]);

    ((b0 >> 1) & 0x07) << 30 | b1 << 22 | (b2 >> 1) << 15 | b3 << 7 | b4 >> 1
}

/// 重组中的 PES 包
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PesPacket {
    /// 第一个传输包在文件中的字节偏移
    pub pos: i64,
    /// PTS (90kHz), 不存在时为 0
    pub pts: i64,
    /// DTS (90kHz), 不存在时为 0
    pub dts: i64,
    /// 创建时的最新 PCR (27MHz)
    pub pcr: i64,
    /// 首个传输包适配字段中的 random_access_indicator
    pub random_access_indicator: bool,
    /// 已累积的负载字节数
    pub size: usize,
    /// 负载 (不含 PES 头)
    pub data: Vec<u8>,
}

impl PesPacket {
    /// 在指定位置创建空的 PES 包
    pub fn new(pos: i64, pcr: i64) -> Self {
        Self {
            pos,
            pcr,
            ..Self::default()
        }
    }

    /// 追加负载
    pub fn append(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
        self.size += bytes.len();
    }
}

/// 重组状态
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ReassemblerState {
    /// 尚未遇到 PUSI 包
    #[default]
    Idle,
    /// PES 头已解析, 正在累积负载
    Accumulating(PesPacket),
    /// PES 头不完整, 暂存原始字节
    Buffering {
        /// 等待 PES 头的包
        packet: PesPacket,
        /// 暂存的原始字节 (尚不足以覆盖整个 PES 头)
        pending: Vec<u8>,
    },
}

/// 单个 PID 的 PES 重组器
#[derive(Debug)]
pub struct PesReassembler {
    pid: u16,
    state: ReassemblerState,
}

impl PesReassembler {
    /// 创建重组器
    pub fn new(pid: u16) -> Self {
        Self {
            pid,
            state: ReassemblerState::Idle,
        }
    }

    /// 当前状态
    pub fn state(&self) -> &ReassemblerState {
        &self.state
    }

    /// 处理一个传输包
    ///
    /// PUSI 包会结束当前 PES 包并将其返回.
    pub fn process(&mut self, packet: &TransportPacket) -> Option<PesPacket> {
        let state = mem::take(&mut self.state);

        if packet.pusi {
            let finished = self.finish(state);
            let mut pes = PesPacket::new(packet.pos, packet.pcr);
            pes.random_access_indicator = packet.random_access;
            self.state = self.resume(pes, packet.data.to_vec());
            return finished;
        }

        self.state = match state {
            ReassemblerState::Idle => {
                debug!("PID {:#06X}: 尚未遇到 PUSI, 丢弃 pos={}", self.pid, packet.pos);
                ReassemblerState::Idle
            }
            ReassemblerState::Accumulating(mut pes) => {
                pes.append(&packet.data);
                ReassemblerState::Accumulating(pes)
            }
            ReassemblerState::Buffering {
                packet: pes,
                mut pending,
            } => {
                pending.extend_from_slice(&packet.data);
                self.resume(pes, pending)
            }
        };
        None
    }

    /// 结束流, 返回尚未完成的 PES 包
    pub fn flush(&mut self) -> Option<PesPacket> {
        let state = mem::take(&mut self.state);
        self.finish(state)
    }

    fn finish(&self, state: ReassemblerState) -> Option<PesPacket> {
        match state {
            ReassemblerState::Idle => None,
            ReassemblerState::Accumulating(pes) => Some(pes),
            ReassemblerState::Buffering { packet, pending } => {
                warn!(
                    "PID {:#06X}: PES 头不完整, 丢弃 {} 字节缓冲数据, pos={}",
                    self.pid,
                    pending.len(),
                    packet.pos
                );
                Some(packet)
            }
        }
    }

    /// 字节足够时解析 PES 头并开始累积, 否则继续缓冲
    fn resume(&self, mut pes: PesPacket, pending: Vec<u8>) -> ReassemblerState {
        if pending.len() < MIN_PES_HEADER_LEN {
            debug!(
                "PID {:#06X}: PES 头不完整 ({} 字节), 缓冲等待后续数据",
                self.pid,
                pending.len()
            );
            return ReassemblerState::Buffering {
                packet: pes,
                pending,
            };
        }

        let Some(header) = PesHeader::parse(&pending) else {
            warn!("PID {:#06X}: PES 起始码错误, pos={}", self.pid, pes.pos);
            pes.append(&pending);
            return ReassemblerState::Accumulating(pes);
        };

        if pending.len() < header.header_len {
            debug!(
                "PID {:#06X}: PES 头长 {} 字节, 已缓冲 {} 字节, 等待后续数据",
                self.pid,
                header.header_len,
                pending.len()
            );
            return ReassemblerState::Buffering {
                packet: pes,
                pending,
            };
        }

        pes.pts = header.pts;
        pes.dts = header.dts;
        pes.append(&pending[header.header_len..]);
        ReassemblerState::Accumulating(pes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 编码 5 字节时间戳
    fn encode_ts(prefix: u8, ts: i64) -> [u8; 5] {
        [
            (prefix << 4) | (((ts >> 29) as u8) & 0x0E) | 0x01,
            (ts >> 22) as u8,
            (((ts >> 14) as u8) & 0xFE) | 0x01,
            (ts >> 7) as u8,
            (((ts << 1) as u8) & 0xFE) | 0x01,
        ]
    }

    /// 构造含 PTS 与 DTS 的 19 字节 PES 头
    fn pes_header(pts: i64, dts: i64) -> Vec<u8> {
        let mut header = vec![0x00, 0x00, 0x01, 0xE0, 0x00, 0x00, 0x80, 0xC0, 0x0A];
        header.extend_from_slice(&encode_ts(0x3, pts));
        header.extend_from_slice(&encode_ts(0x1, dts));
        header
    }

    fn ts_packet(pos: i64, pusi: bool, data: &[u8]) -> TransportPacket {
        TransportPacket::new(pos, 0x100, pusi, 2700, data.to_vec())
    }

    #[test]
    fn test_解析_pes_头() {
        let mut data = pes_header(1000, 900);
        data.extend_from_slice(&[0xAA; 4]);
        let header = PesHeader::parse(&data).unwrap();
        assert_eq!(
            header,
            PesHeader {
                header_len: 19,
                pts: 1000,
                dts: 900
            }
        );
    }

    #[test]
    fn test_仅含_pts() {
        let mut data = vec![0x00, 0x00, 0x01, 0xC0, 0x00, 0x00, 0x80, 0x80, 0x05];
        data.extend_from_slice(&encode_ts(0x2, (1 << 32) + 5));
        data.extend_from_slice(&[0x11; 8]);
        let header = PesHeader::parse(&data).unwrap();
        assert_eq!(header.header_len, 14);
        assert_eq!(header.pts, (1 << 32) + 5);
        assert_eq!(header.dts, 0);
    }

    #[test]
    fn test_无可选头() {
        let mut data = vec![0x00, 0x00, 0x01, 0xBE, 0x00, 0x10];
        data.extend_from_slice(&[0xFF; 16]);
        let header = PesHeader::parse(&data).unwrap();
        assert_eq!(header.header_len, 6);
        assert_eq!((header.pts, header.dts), (0, 0));
    }

    #[test]
    fn test_数据不足或起始码错误() {
        assert_eq!(PesHeader::parse(&pes_header(1, 1)[..18]), None);
        assert_eq!(PesHeader::parse(&[0xFF; 32]), None);
    }

    #[test]
    fn test_单包内完整_pes_头() {
        let mut first = pes_header(1000, 0);
        first.extend_from_slice(&[0x01; 10]);

        let mut reassembler = PesReassembler::new(0x100);
        assert_eq!(reassembler.process(&ts_packet(0, true, &first)), None);
        assert_eq!(reassembler.process(&ts_packet(188, false, &[0x02; 5])), None);

        let pes = reassembler.flush().unwrap();
        assert_eq!(pes.pos, 0);
        assert_eq!(pes.pcr, 2700);
        assert_eq!(pes.pts, 1000);
        assert_eq!(pes.size, 15);
        assert_eq!(&pes.data[..10], &[0x01; 10]);
        assert_eq!(&pes.data[10..], &[0x02; 5]);
        assert_eq!(reassembler.state(), &ReassemblerState::Idle);
    }

    #[test]
    fn test_pusi_结束上一个包() {
        let mut first = pes_header(1000, 0);
        first.push(0x01);
        let mut second = pes_header(4600, 0);
        second.push(0x02);

        let mut reassembler = PesReassembler::new(0x100);
        assert_eq!(reassembler.process(&ts_packet(0, true, &first)), None);
        let finished = reassembler.process(&ts_packet(188, true, &second)).unwrap();
        assert_eq!(finished.pos, 0);
        assert_eq!(finished.data, vec![0x01]);

        let last = reassembler.flush().unwrap();
        assert_eq!(last.pos, 188);
        assert_eq!(last.pts, 4600);
    }

    #[test]
    fn test_短_pes_头跨包缓冲() {
        let header = pes_header(1000, 900);
        let mut second = header[10..].to_vec();
        second.extend_from_slice(&[0xAB; 4]);

        let mut reassembler = PesReassembler::new(0x100);
        reassembler.process(&ts_packet(0, true, &header[..10]));
        assert!(matches!(
            reassembler.state(),
            ReassemblerState::Buffering { pending, .. } if pending.len() == 10
        ));

        reassembler.process(&ts_packet(188, false, &second));
        assert!(matches!(
            reassembler.state(),
            ReassemblerState::Accumulating(pes) if pes.size == 4
        ));

        reassembler.process(&ts_packet(376, false, &[0xCD; 6]));
        let pes = reassembler.flush().unwrap();
        assert_eq!(pes.pos, 0);
        assert_eq!((pes.pts, pes.dts), (1000, 900));
        assert_eq!(pes.size, 10);
        assert_eq!(&pes.data[..4], &[0xAB; 4]);
    }

    #[test]
    fn test_多个短包凑齐_pes_头() {
        let mut stream = pes_header(1000, 0);
        stream.extend_from_slice(&[0x77; 6]);

        let mut reassembler = PesReassembler::new(0x100);
        reassembler.process(&ts_packet(0, true, &stream[..5]));
        reassembler.process(&ts_packet(188, false, &stream[5..10]));
        reassembler.process(&ts_packet(376, false, &stream[10..15]));
        assert!(matches!(reassembler.state(), ReassemblerState::Buffering { .. }));
        reassembler.process(&ts_packet(564, false, &stream[15..]));

        let pes = reassembler.flush().unwrap();
        assert_eq!(pes.pts, 1000);
        assert_eq!(pes.data, vec![0x77; 6]);
    }

    #[test]
    fn test_结束时仍在缓冲() {
        let mut reassembler = PesReassembler::new(0x100);
        reassembler.process(&ts_packet(0, true, &[0x00, 0x00, 0x01, 0xE0]));

        let pes = reassembler.flush().unwrap();
        assert_eq!(pes.pos, 0);
        assert_eq!(pes.size, 0);
        assert_eq!((pes.pts, pes.dts), (0, 0));
        assert!(reassembler.flush().is_none());
    }

    #[test]
    fn test_缓冲中遇到_pusi() {
        let mut next = pes_header(3000, 0);
        next.push(0x09);

        let mut reassembler = PesReassembler::new(0x100);
        reassembler.process(&ts_packet(0, true, &[0x00, 0x00, 0x01]));
        let finished = reassembler.process(&ts_packet(188, true, &next)).unwrap();
        assert_eq!(finished.pos, 0);
        assert_eq!(finished.size, 0);

        let pes = reassembler.flush().unwrap();
        assert_eq!(pes.pos, 188);
        assert_eq!(pes.pts, 3000);
        assert_eq!(pes.data, vec![0x09]);
    }

    #[test]
    fn test_起始码错误保留原始数据() {
        let mut reassembler = PesReassembler::new(0x100);
        reassembler.process(&ts_packet(0, true, &[0xFF; 20]));
        reassembler.process(&ts_packet(188, false, &[0xEE; 2]));

        let pes = reassembler.flush().unwrap();
        assert_eq!(pes.pts, 0);
        assert_eq!(pes.size, 22);
    }

    #[test]
    fn test_缓冲后起始码错误结束缓冲() {
        let mut reassembler = PesReassembler::new(0x100);
        reassembler.process(&ts_packet(0, true, &[0xFF; 10]));
        assert!(matches!(reassembler.state(), ReassemblerState::Buffering { .. }));

        reassembler.process(&ts_packet(188, false, &[0xEE; 10]));
        assert!(matches!(
            reassembler.state(),
            ReassemblerState::Accumulating(pes) if pes.size == 20
        ));

        reassembler.process(&ts_packet(376, false, &[0xDD; 3]));
        let pes = reassembler.flush().unwrap();
        assert_eq!((pes.pts, pes.dts), (0, 0));
        assert_eq!(pes.size, 23);
        assert_eq!(&pes.data[..10], &[0xFF; 10]);
        assert_eq!(&pes.data[10..20], &[0xEE; 10]);
        assert_eq!(&pes.data[20..], &[0xDD; 3]);
    }

    #[test]
    fn test_带填充的长_pes_头跨三个包() {
        // header_data_length = 20: PTS (5 字节) + 15 字节填充, 头长 29
        let mut stream = vec![0x00, 0x00, 0x01, 0xC0, 0x00, 0x00, 0x80, 0x80, 20];
        stream.extend_from_slice(&encode_ts(0x2, 1000));
        stream.extend_from_slice(&[0xFF; 15]);
        stream.extend_from_slice(&[0xAA; 4]);
        assert_eq!(stream.len(), 33);

        let mut reassembler = PesReassembler::new(0x100);
        reassembler.process(&ts_packet(0, true, &stream[..10]));
        reassembler.process(&ts_packet(188, false, &stream[10..20]));
        assert!(matches!(
            reassembler.state(),
            ReassemblerState::Buffering { pending, .. } if pending.len() == 20
        ));
        reassembler.process(&ts_packet(376, false, &stream[20..]));

        let pes = reassembler.flush().unwrap();
        assert_eq!(pes.pts, 1000);
        assert_eq!(pes.size, 4);
        assert_eq!(pes.data, vec![0xAA; 4]);
    }

    #[test]
    fn test_单包内_pes_头不完整时缓冲() {
        // PUSI 包有 25 字节, 但 PES 头声明 29 字节
        let mut stream = vec![0x00, 0x00, 0x01, 0xE0, 0x00, 0x00, 0x80, 0x80, 20];
        stream.extend_from_slice(&encode_ts(0x2, 7200));
        stream.extend_from_slice(&[0xFF; 15]);
        stream.extend_from_slice(&[0x42; 3]);

        let mut reassembler = PesReassembler::new(0x100);
        reassembler.process(&ts_packet(0, true, &stream[..25]));
        assert!(matches!(reassembler.state(), ReassemblerState::Buffering { .. }));
        reassembler.process(&ts_packet(188, false, &stream[25..]));

        let pes = reassembler.flush().unwrap();
        assert_eq!(pes.pts, 7200);
        assert_eq!(pes.data, vec![0x42; 3]);
    }

    #[test]
    fn test_记录随机访问指示() {
        let mut packet = ts_packet(0, true, &pes_header(1000, 0));
        packet.random_access = true;

        let mut reassembler = PesReassembler::new(0x100);
        reassembler.process(&packet);
        reassembler.process(&ts_packet(188, false, &[0x01; 4]));
        let pes = reassembler.flush().unwrap();
        assert!(pes.random_access_indicator);
        assert_eq!(pes.size, 4);
    }

    #[test]
    fn test_首个_pusi_之前的数据被丢弃() {
        let mut reassembler = PesReassembler::new(0x100);
        assert_eq!(reassembler.process(&ts_packet(0, false, &[0x01; 50])), None);
        assert!(reassembler.flush().is_none());
    }
}
