//! 码流分析器 (UnitAnalyzer) trait 定义.
//!
//! 分析器接收一个完整的 PES 负载, 输出其中结构单元的分类名称 (按出现顺序, 不去重)
//! 以及该负载是否包含随机访问点.
//!
//! 随机访问点只通过返回值报告, 由调用方 (记录引擎) 统一记录与输出日志,
//! 每个负载至多产生一个事件.

use crate::codec_id::CodecId;

/// 单个 PES 负载的分析结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitAnalysis {
    /// 结构单元分类名称, 按出现顺序
    pub units: Vec<String>,
    /// 是否包含随机访问点
    pub random_access: bool,
}

impl UnitAnalysis {
    /// 是否没有识别出任何结构单元
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// 结构单元报告的描述
///
/// 决定报告文件名后缀、列标题, 以及空结果是否也要记录.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitTable {
    /// 文件名后缀, 报告文件为 `<PID>-<suffix>.csv`
    pub suffix: &'static str,
    /// 第三列标题
    pub column: &'static str,
    /// 未识别出任何单元的负载是否也产生一条记录 (同时决定报告文件是否总是生成)
    pub keep_empty: bool,
}

/// 码流分析器 trait
///
/// 每个 PID 拥有独立的实例, 按 PES 完成顺序依次调用 `analyze()`.
pub trait UnitAnalyzer: Send {
    /// 获取编码标识
    fn codec_id(&self) -> CodecId;

    /// 获取报告描述
    fn unit_table(&self) -> UnitTable;

    /// 分析一个完整的 PES 负载
    fn analyze(&mut self, payload: &[u8]) -> UnitAnalysis;
}
