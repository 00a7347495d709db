//! 分析器注册表.
//!
//! 按 CodecId 查找并实例化码流分析器.

use std::collections::HashMap;

use tsray_core::{TsrayError, TsrayResult};

use crate::analyzer::UnitAnalyzer;
use crate::codec_id::CodecId;
use crate::parsers::h266::H266Analyzer;
use crate::parsers::mhas::MhasAnalyzer;

/// 分析器工厂函数类型
pub type AnalyzerFactory = fn() -> Box<dyn UnitAnalyzer>;

/// 分析器注册条目
struct AnalyzerEntry {
    /// 分析器名称
    name: String,
    /// 工厂函数
    factory: AnalyzerFactory,
}

/// 分析器注册表
pub struct AnalyzerRegistry {
    entries: HashMap<CodecId, AnalyzerEntry>,
}

impl AnalyzerRegistry {
    /// 创建空的注册表
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// 注册一个分析器, 同一 CodecId 后注册的覆盖先注册的
    pub fn register(&mut self, codec_id: CodecId, name: impl Into<String>, factory: AnalyzerFactory) {
        self.entries.insert(
            codec_id,
            AnalyzerEntry {
                name: name.into(),
                factory,
            },
        );
    }

    /// 创建指定编码的分析器实例
    pub fn create(&self, codec_id: CodecId) -> TsrayResult<Box<dyn UnitAnalyzer>> {
        let entry = self
            .entries
            .get(&codec_id)
            .ok_or_else(|| TsrayError::CodecNotFound(format!("未找到 {} 的分析器", codec_id)))?;
        Ok((entry.factory)())
    }

    /// 获取所有已注册的分析器名称
    pub fn list(&self) -> Vec<(CodecId, &str)> {
        let mut result: Vec<_> = self
            .entries
            .iter()
            .map(|(id, entry)| (*id, entry.name.as_str()))
            .collect();
        result.sort_by_key(|(id, _)| id.name());
        result
    }
}

impl Default for AnalyzerRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        register_all(&mut registry);
        registry
    }
}

/// 注册所有内置分析器
pub fn register_all(registry: &mut AnalyzerRegistry) {
    registry.register(CodecId::H266, "vvc_nal", || Box::new(H266Analyzer::new()));
    registry.register(CodecId::MpeghAudio, "mhas", || Box::new(MhasAnalyzer::new()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_创建已注册分析器() {
        let registry = AnalyzerRegistry::default();
        for codec_id in CodecId::ALL {
            let analyzer = registry.create(codec_id).unwrap();
            assert_eq!(analyzer.codec_id(), codec_id);
        }
        assert_eq!(registry.list().len(), 2);
    }

    #[test]
    fn test_空注册表返回错误() {
        let registry = AnalyzerRegistry::new();
        assert!(matches!(
            registry.create(CodecId::H266),
            Err(TsrayError::CodecNotFound(_))
        ));
    }
}
