//! 时钟换算.
//!
//! PCR 以 27MHz 为单位 (base * 300 + extension), PTS/DTS 以 90kHz 为单位.
//! 报告中的漂移值统一在 90kHz 时钟下计算.

/// PCR (27MHz) 与 PTS/DTS (90kHz) 之间的换算因子
pub const PCR_CLOCK_DIVISOR: i64 = 300;

/// 由 PCR 的 33 位 base 与 9 位 extension 组合出 27MHz 原始值
pub const fn pcr_from_fields(base: u64, extension: u16) -> i64 {
    (base as i64) * PCR_CLOCK_DIVISOR + extension as i64
}

/// 将 27MHz 原始 PCR 对齐到 90kHz 时钟
pub const fn pcr_to_90k(pcr: i64) -> i64 {
    pcr / PCR_CLOCK_DIVISOR
}

/// 报告使用的 DTS
///
/// DTS 为 0 表示 PES 头中不存在, 此时以 PTS 代替.
pub const fn effective_dts(pts: i64, dts: i64) -> i64 {
    if dts == 0 { pts } else { dts }
}

/// DTS 相对 PCR 的漂移 (90kHz)
pub const fn dts_pcr_drift(pts: i64, dts: i64, pcr: i64) -> i64 {
    effective_dts(pts, dts) - pcr_to_90k(pcr)
}
