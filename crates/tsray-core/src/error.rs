//! 统一错误类型定义.
//!
//! 所有 tsray crate 共用的错误类型, 支持跨模块传播.
//!
//! 码流层面的异常 (起始码错误、包长度越界等) 在解析器内部就地处理并记录日志,
//! 只有资源获取失败 (报告文件无法创建等) 才会以错误形式向上传播.

use std::path::PathBuf;

use thiserror::Error;

/// tsray 统一错误类型
#[derive(Debug, Error)]
pub enum TsrayError {
    /// 无效参数
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 无效数据 (损坏的码流等)
    #[error("无效数据: {0}")]
    InvalidData(String),

    /// I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 已到达流末尾
    #[error("已到达流末尾")]
    Eof,

    /// 未找到指定编码的分析器
    #[error("未找到分析器: {0}")]
    CodecNotFound(String),

    /// 报告文件写入失败
    #[error("报告文件写入失败: {}: {source}", path.display())]
    Report {
        /// 报告文件路径
        path: PathBuf,
        /// 底层 I/O 错误
        #[source]
        source: std::io::Error,
    },
}

/// tsray 统一 Result 类型
pub type TsrayResult<T> = Result<T, TsrayError>;
