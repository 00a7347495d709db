//! 分析会话.
//!
//! 一个会话对应一个输入文件: 持有解封装器与每个所选 PID 的记录引擎,
//! 按文件顺序把传输包分发给对应引擎, 读到文件末尾后统一 flush.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use log::{info, warn};
use tsray_codec::{AnalyzerRegistry, CodecId};
use tsray_core::{TsrayError, TsrayResult};

use crate::demuxers::TsDemuxer;
use crate::io::IoContext;
use crate::record::RecordEngine;
use crate::report::{ReportFiles, write_reports};

/// 待分析的基本流
///
/// 字符串形式为 `PID[:codec]`, PID 可以是十进制或 `0x` 前缀的十六进制.
/// 省略编码时从 PMT 中推断.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSelection {
    pub pid: u16,
    pub codec: Option<CodecId>,
}

impl FromStr for StreamSelection {
    type Err = TsrayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (pid, codec) = match s.split_once(':') {
            Some((pid, codec)) => (pid, Some(codec.parse::<CodecId>()?)),
            None => (s, None),
        };
        let pid = pid.trim();
        let parsed = match pid.strip_prefix("0x").or_else(|| pid.strip_prefix("0X")) {
            Some(hex) => u16::from_str_radix(hex, 16),
            None => pid.parse::<u16>(),
        };
        let pid = parsed.map_err(|_| TsrayError::InvalidArgument(format!("无效的 PID: {pid}")))?;
        if pid > 0x1FFF {
            return Err(TsrayError::InvalidArgument(format!(
                "PID 超出范围: {pid:#X}"
            )));
        }
        Ok(Self { pid, codec })
    }
}

/// 分析会话
pub struct Session {
    io: IoContext,
    demuxer: TsDemuxer,
    engines: Vec<RecordEngine>,
    /// PID → engines 下标
    index: HashMap<u16, usize>,
    packets: u64,
}

impl Session {
    /// 打开输入文件
    ///
    /// `selections` 为空时分析 PMT 中所有可识别编码的基本流.
    pub fn open(
        path: impl AsRef<Path>,
        selections: &[StreamSelection],
        registry: &AnalyzerRegistry,
    ) -> TsrayResult<Self> {
        let io = IoContext::open_read(path)?;
        Self::from_io(io, selections, registry)
    }

    /// 从已打开的 I/O 上下文创建会话
    pub fn from_io(
        mut io: IoContext,
        selections: &[StreamSelection],
        registry: &AnalyzerRegistry,
    ) -> TsrayResult<Self> {
        let mut demuxer = TsDemuxer::new();
        demuxer.open(&mut io).map_err(|e| match e {
            TsrayError::Eof => TsrayError::InvalidData("输入中没有完整的 TS 包".into()),
            other => other,
        })?;

        let selections: Vec<StreamSelection> = if selections.is_empty() {
            demuxer
                .streams()
                .iter()
                .filter(|s| s.codec_id.is_some())
                .map(|s| StreamSelection {
                    pid: s.pid,
                    codec: s.codec_id,
                })
                .collect()
        } else {
            selections.to_vec()
        };

        let mut engines = Vec::new();
        let mut index = HashMap::new();
        for selection in selections {
            if index.contains_key(&selection.pid) {
                warn!("PID {:#06X} 重复指定, 忽略", selection.pid);
                continue;
            }
            let codec_id = selection
                .codec
                .or_else(|| demuxer.stream(selection.pid).and_then(|s| s.codec_id))
                .ok_or_else(|| {
                    TsrayError::InvalidArgument(format!(
                        "无法确定 PID {:#06X} 的编码, 请显式指定",
                        selection.pid
                    ))
                })?;
            let analyzer = registry.create(codec_id)?;
            info!("分析 PID {:#06X} ({codec_id})", selection.pid);
            index.insert(selection.pid, engines.len());
            engines.push(RecordEngine::new(selection.pid, analyzer));
        }

        if engines.is_empty() {
            return Err(TsrayError::InvalidArgument("没有可分析的基本流".into()));
        }

        Ok(Self {
            io,
            demuxer,
            engines,
            index,
            packets: 0,
        })
    }

    /// 读取整个文件, 结束后 flush 所有记录引擎
    pub fn run(&mut self) -> TsrayResult<()> {
        loop {
            let packet = match self.demuxer.read_packet(&mut self.io) {
                Ok(packet) => packet,
                Err(TsrayError::Eof) => break,
                Err(e) => return Err(e),
            };
            self.packets += 1;
            if let Some(&i) = self.index.get(&packet.pid) {
                self.engines[i].process(&packet);
            }
        }

        for engine in &mut self.engines {
            engine.flush();
        }
        info!(
            "处理完成: {} 个 TS 包, {} 个基本流",
            self.packets,
            self.engines.len()
        );
        Ok(())
    }

    /// 已读取的基本流 TS 包数
    pub fn packets(&self) -> u64 {
        self.packets
    }

    pub fn engines(&self) -> &[RecordEngine] {
        &self.engines
    }

    /// 为所有基本流写出报告
    pub fn write_reports(&self, root: &Path) -> TsrayResult<Vec<ReportFiles>> {
        self.engines
            .iter()
            .map(|engine| write_reports(engine, root))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_解析流选择() {
        assert_eq!(
            "256".parse::<StreamSelection>().unwrap(),
            StreamSelection {
                pid: 256,
                codec: None
            }
        );
        assert_eq!(
            "0x101:mhas".parse::<StreamSelection>().unwrap(),
            StreamSelection {
                pid: 0x101,
                codec: Some(CodecId::MpeghAudio)
            }
        );
        assert_eq!(
            "0X1FF:vvc".parse::<StreamSelection>().unwrap().codec,
            Some(CodecId::H266)
        );
    }

    #[test]
    fn test_无效流选择() {
        assert!(matches!(
            "abc".parse::<StreamSelection>(),
            Err(TsrayError::InvalidArgument(_))
        ));
        assert!(matches!(
            "0x2000".parse::<StreamSelection>(),
            Err(TsrayError::InvalidArgument(_))
        ));
        assert!(matches!(
            "256:aac".parse::<StreamSelection>(),
            Err(TsrayError::CodecNotFound(_))
        ));
    }

    #[test]
    fn test_空输入() {
        let registry = AnalyzerRegistry::default();
        let selection = [StreamSelection {
            pid: 256,
            codec: Some(CodecId::H266),
        }];
        let result = Session::from_io(IoContext::from_memory(Vec::new()), &selection, &registry);
        assert!(matches!(result, Err(TsrayError::InvalidData(_))));
    }

    #[test]
    fn test_无法推断编码() {
        let mut pkt = vec![0xFFu8; 188];
        pkt[..4].copy_from_slice(&[0x47, 0x41, 0x00, 0x10]);
        let registry = AnalyzerRegistry::default();
        let selection = [StreamSelection {
            pid: 256,
            codec: None,
        }];
        let result = Session::from_io(IoContext::from_memory(pkt), &selection, &registry);
        assert!(matches!(result, Err(TsrayError::InvalidArgument(_))));
    }
}
