//! 传输包 (TransportPacket) 定义.
//!
//! 解封装器按文件顺序为每个基本流 PID 产出传输包, 供 PES 重组使用.

use bytes::Bytes;

/// 单个 188 字节 TS 包中与 PES 重组相关的信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportPacket {
    /// TS 包在文件中的字节偏移
    pub pos: i64,
    /// PID
    pub pid: u16,
    /// Payload Unit Start Indicator
    pub pusi: bool,
    /// 截至此包的最新 PCR (27MHz 原始值), 尚未出现 PCR 时为 0
    pub pcr: i64,
    /// 适配字段中的 random_access_indicator
    pub random_access: bool,
    /// 适配字段中的 transport_private_data
    pub private_data: Option<Bytes>,
    /// 负载 (可能为空)
    pub data: Bytes,
}

impl TransportPacket {
    /// 创建只含负载的传输包
    pub fn new(pos: i64, pid: u16, pusi: bool, pcr: i64, data: impl Into<Bytes>) -> Self {
        Self {
            pos,
            pid,
            pusi,
            pcr,
            random_access: false,
            private_data: None,
            data: data.into(),
        }
    }
}
