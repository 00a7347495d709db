//! tsray-probe - MPEG-TS 码流结构分析工具
//!
//! 按 PID 重组 PES 包, 分析 H.266/VVC NAL 单元与 MPEG-H MHAS 包,
//! 并输出时间戳与随机访问点的 CSV 报告.

mod logging;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;

use tsray_codec::AnalyzerRegistry;
use tsray_format::{RecordSummary, ReportFiles, Session, StreamSelection};

/// MPEG-TS 码流结构分析工具
#[derive(Parser, Debug)]
#[command(name = "tsray-probe", version, about = "MPEG-TS PES 重组与码流结构分析工具")]
struct Cli {
    /// 输入 TS 文件路径
    input: PathBuf,

    /// 报告输出目录 (不存在时自动创建)
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// 待分析的基本流 "PID[:codec]", 可重复指定 (如 "0x100:h266", "257:mhas").
    /// 省略时分析 PMT 中所有可识别编码的基本流
    #[arg(long = "pid", value_name = "PID[:CODEC]")]
    pids: Vec<StreamSelection>,

    /// 在 stdout 输出 JSON 格式的统计
    #[arg(long)]
    json: bool,

    /// 静默模式 (console 只输出警告与错误)
    #[arg(short, long)]
    quiet: bool,

    /// 日志级别 (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

// ============================================================
// JSON 输出结构体
// ============================================================

/// 完整分析结果
#[derive(Serialize)]
struct ProbeOutput {
    input: String,
    output_dir: String,
    ts_packets: u64,
    streams: Vec<StreamReport>,
}

/// 单个基本流的统计
#[derive(Serialize)]
struct StreamReport {
    pid: u16,
    codec: String,
    pes_packets: usize,
    payload_bytes: usize,
    units: usize,
    random_access_points: usize,
    reports: Vec<String>,
}

impl StreamReport {
    fn new(summary: RecordSummary, files: &ReportFiles) -> Self {
        Self {
            pid: summary.pid,
            codec: summary.codec_id.to_string(),
            pes_packets: summary.pes_packets,
            payload_bytes: summary.payload_bytes,
            units: summary.units,
            random_access_points: summary.random_access_points,
            reports: files.paths().map(|p| p.display().to_string()).collect(),
        }
    }
}

// ============================================================
// 主逻辑
// ============================================================

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init("tsray-probe", cli.verbose, cli.quiet)?;

    std::fs::create_dir_all(&cli.output)
        .with_context(|| format!("无法创建输出目录 '{}'", cli.output.display()))?;

    let registry = AnalyzerRegistry::default();
    let mut session = Session::open(&cli.input, &cli.pids, &registry)
        .with_context(|| format!("无法打开输入文件 '{}'", cli.input.display()))?;
    session.run().context("读取传输流失败")?;

    let files = session.write_reports(&cli.output)?;
    let output = ProbeOutput {
        input: cli.input.display().to_string(),
        output_dir: cli.output.display().to_string(),
        ts_packets: session.packets(),
        streams: session
            .engines()
            .iter()
            .zip(&files)
            .map(|(engine, files)| StreamReport::new(engine.summary(), files))
            .collect(),
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("序列化 JSON 失败")?;
        println!("{json}");
    } else if !cli.quiet {
        print_text(&output);
    }
    Ok(())
}

/// 文本格式输出
fn print_text(output: &ProbeOutput) {
    println!("输入文件: {}", output.input);
    println!("TS 包数: {}", output.ts_packets);
    for stream in &output.streams {
        println!();
        println!("PID {} (0x{:04X}) [{}]", stream.pid, stream.pid, stream.codec);
        println!("  PES 包:     {}", stream.pes_packets);
        println!("  负载字节:   {}", stream.payload_bytes);
        println!("  结构单元:   {}", stream.units);
        println!("  随机访问点: {}", stream.random_access_points);
        for report in &stream.reports {
            println!("  报告:       {report}");
        }
    }
}
