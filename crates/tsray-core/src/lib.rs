//! # tsray-core
//!
//! tsray 传输流分析核心库, 提供错误类型、比特流读取与时钟换算.

pub mod bitreader;
pub mod error;
pub mod timestamp;

// 重导出常用类型
pub use bitreader::BitReader;
pub use error::{TsrayError, TsrayResult};
