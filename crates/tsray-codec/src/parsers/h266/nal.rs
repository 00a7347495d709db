//! H.266/VVC NAL (Network Abstraction Layer) 单元分类.
//!
//! VVC NAL 头部为 2 字节:
//! - forbidden_zero_bit (1 bit)
//! - nuh_reserved_zero_bit (1 bit)
//! - nuh_layer_id (6 bits)
//! - nal_unit_type (5 bits)
//! - nuh_temporal_id_plus1 (3 bits)
//!
//! 这里只按起始码扫描并提取类型, 不做 emulation prevention 去除.

/// VVC NAL 单元类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VvcNalUnitType {
    /// TRAIL_NUT (尾随图像)
    Trail,
    /// STSA_NUT
    Stsa,
    /// RADL_NUT
    Radl,
    /// RASL_NUT
    Rasl,
    /// RSV_VCL_4
    RsvVcl4,
    /// RSV_VCL_5
    RsvVcl5,
    /// RSV_VCL_6
    RsvVcl6,
    /// IDR_W_RADL (带 RADL 的 IDR)
    IdrWRadl,
    /// IDR_N_LP (无前导图像的 IDR)
    IdrNLp,
    /// CRA_NUT (Clean Random Access)
    Cra,
    /// GDR_NUT (Gradual Decoder Refresh)
    Gdr,
    /// RSV_IRAP_11
    RsvIrap11,
    /// OPI_NUT (Operating Point Information)
    Opi,
    /// DCI_NUT (Decoding Capability Information)
    Dci,
    /// VPS_NUT
    Vps,
    /// SPS_NUT
    Sps,
    /// PPS_NUT
    Pps,
    /// PREFIX_APS_NUT
    PrefixAps,
    /// SUFFIX_APS_NUT
    SuffixAps,
    /// PH_NUT (Picture Header)
    PictureHeader,
    /// AUD_NUT (Access Unit Delimiter)
    Aud,
    /// EOB_NUT
    Eob,
    /// EOS_NUT
    Eos,
    /// PREFIX_SEI_NUT
    PrefixSei,
    /// SUFFIX_SEI_NUT
    SuffixSei,
    /// FD_NUT (Filler Data)
    FillerData,
    /// RSV_NVCL_26
    RsvNvcl26,
    /// RSV_NVCL_27
    RsvNvcl27,
    /// UNSPEC_28
    Unspec28,
    /// UNSPEC_29
    Unspec29,
    /// UNSPEC_30
    Unspec30,
    /// UNSPEC_31
    Unspec31,
    /// 超出 5 位范围的类型编号
    Unknown(u8),
}

/// 按类型编号索引的静态表
const NAL_UNIT_TYPES: [VvcNalUnitType; 32] = [
    VvcNalUnitType::Trail,
    VvcNalUnitType::Stsa,
    VvcNalUnitType::Radl,
    VvcNalUnitType::Rasl,
    VvcNalUnitType::RsvVcl4,
    VvcNalUnitType::RsvVcl5,
    VvcNalUnitType::RsvVcl6,
    VvcNalUnitType::IdrWRadl,
    VvcNalUnitType::IdrNLp,
    VvcNalUnitType::Cra,
    VvcNalUnitType::Gdr,
    VvcNalUnitType::RsvIrap11,
    VvcNalUnitType::Opi,
    VvcNalUnitType::Dci,
    VvcNalUnitType::Vps,
    VvcNalUnitType::Sps,
    VvcNalUnitType::Pps,
    VvcNalUnitType::PrefixAps,
    VvcNalUnitType::SuffixAps,
    VvcNalUnitType::PictureHeader,
    VvcNalUnitType::Aud,
    VvcNalUnitType::Eob,
    VvcNalUnitType::Eos,
    VvcNalUnitType::PrefixSei,
    VvcNalUnitType::SuffixSei,
    VvcNalUnitType::FillerData,
    VvcNalUnitType::RsvNvcl26,
    VvcNalUnitType::RsvNvcl27,
    VvcNalUnitType::Unspec28,
    VvcNalUnitType::Unspec29,
    VvcNalUnitType::Unspec30,
    VvcNalUnitType::Unspec31,
];

/// 报告中使用的名称, 与 `NAL_UNIT_TYPES` 一一对应
const NAL_UNIT_NAMES: [&str; 32] = [
    "trail_nvc",
    "stsa_nvc",
    "radl_nvc",
    "rasl_nvc",
    "rsv_vcl_4",
    "rsv_vcl_5",
    "rsv_vcl_6",
    "idr_w_radl",
    "idr_n_lp",
    "cra_nut",
    "gdr_nut",
    "rsv_irap_11",
    "opi_nut",
    "dci_nut",
    "vps_nut",
    "sps_nut",
    "pps_nut",
    "prefix_aps_nut",
    "suffix_aps_nut",
    "ph_nut",
    "aud_nut",
    "eob_nut",
    "eos_nut",
    "prefix_sei_nut",
    "suffix_sei_nut",
    "fd_nut",
    "rsv_nvcl_26",
    "rsv_nvcl_27",
    "unspec_28",
    "unspec_29",
    "unspec_30",
    "unspec_31",
];

impl VvcNalUnitType {
    /// 从类型编号创建
    pub fn from_type_id(id: u8) -> Self {
        NAL_UNIT_TYPES
            .get(usize::from(id))
            .copied()
            .unwrap_or(Self::Unknown(id))
    }

    /// 从 NAL 头第二字节提取类型 (`(byte >> 3) & 0x1F`)
    pub fn from_header_byte(byte: u8) -> Self {
        Self::from_type_id((byte >> 3) & 0x1F)
    }

    /// 获取类型编号
    pub fn type_id(&self) -> u8 {
        match self {
            Self::Unknown(id) => *id,
            known => NAL_UNIT_TYPES
                .iter()
                .position(|t| t == known)
                .map_or(u8::MAX, |i| i as u8),
        }
    }

    /// 报告中的名称
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unknown(_) => "unknown",
            _ => NAL_UNIT_NAMES
                .get(usize::from(self.type_id()))
                .copied()
                .unwrap_or("unknown"),
        }
    }

    /// 是否为随机访问点 (IDR_W_RADL / IDR_N_LP / CRA)
    pub fn is_random_access(&self) -> bool {
        matches!(self, Self::IdrWRadl | Self::IdrNLp | Self::Cra)
    }
}

/// 3 字节起始码
const START_CODE: [u8; 3] = [0x00, 0x00, 0x01];

/// 扫描负载中所有起始码后的 NAL 类型, 按出现顺序返回
///
/// 起始码不要求对齐; 剩余数据不足 5 字节时停止扫描.
/// 起始码后的第二个字节即 NAL 头第二字节, 其高 5 位为类型.
pub fn scan_nal_unit_types(data: &[u8]) -> Vec<VvcNalUnitType> {
    let mut types = Vec::new();
    let mut pos = 0;
    while pos + 5 < data.len() {
        if data[pos..pos + 3] == START_CODE {
            pos += START_CODE.len();
            if pos + 1 < data.len() {
                types.push(VvcNalUnitType::from_header_byte(data[pos + 1]));
            }
        }
        pos += 1;
    }
    types
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_类型表完整() {
        for id in 0..32u8 {
            let t = VvcNalUnitType::from_type_id(id);
            assert_eq!(t.type_id(), id);
            assert_ne!(t.name(), "unknown");
        }
        assert_eq!(VvcNalUnitType::from_type_id(40), VvcNalUnitType::Unknown(40));
        assert_eq!(VvcNalUnitType::Unknown(40).name(), "unknown");
    }

    #[test]
    fn test_头字节提取类型() {
        // (0x48 >> 3) & 0x1F = 9
        assert_eq!(VvcNalUnitType::from_header_byte(0x48), VvcNalUnitType::Cra);
        assert_eq!(VvcNalUnitType::from_header_byte(0x41), VvcNalUnitType::IdrNLp);
        assert_eq!(VvcNalUnitType::from_header_byte(0x79), VvcNalUnitType::Sps);
    }

    #[test]
    fn test_随机访问类型() {
        assert!(VvcNalUnitType::IdrWRadl.is_random_access());
        assert!(VvcNalUnitType::IdrNLp.is_random_access());
        assert!(VvcNalUnitType::Cra.is_random_access());
        assert!(!VvcNalUnitType::Gdr.is_random_access());
        assert!(!VvcNalUnitType::Trail.is_random_access());
    }

    #[test]
    fn test_扫描按出现顺序() {
        let data = [
            0x00, 0x00, 0x01, 0x00, 0x79, 0xAA, // SPS
            0x00, 0x00, 0x01, 0x00, 0x81, 0xBB, // PPS
            0x00, 0x00, 0x01, 0x00, 0x41, 0xCC, 0xDD, 0xEE, 0xFF, // IDR_N_LP
        ];
        let types = scan_nal_unit_types(&data);
        assert_eq!(
            types,
            vec![VvcNalUnitType::Sps, VvcNalUnitType::Pps, VvcNalUnitType::IdrNLp]
        );
    }

    #[test]
    fn test_非对齐起始码() {
        let data = [0xFF, 0x00, 0x00, 0x01, 0x00, 0x48, 0x10, 0x20, 0x30];
        assert_eq!(scan_nal_unit_types(&data), vec![VvcNalUnitType::Cra]);
    }

    #[test]
    fn test_尾部不足时停止() {
        // 起始码位于末尾 5 字节内, 不再扫描
        let data = [0x00, 0x00, 0x01, 0x00, 0x48];
        assert!(scan_nal_unit_types(&data).is_empty());
        assert!(scan_nal_unit_types(&[]).is_empty());
    }
}
