//! 码流解析器.
//!
//! 每个子模块负责一种编码的结构单元分类, 并实现 [`UnitAnalyzer`](crate::UnitAnalyzer).

pub mod h266;
pub mod mhas;
