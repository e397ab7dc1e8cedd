//! 单瓶颈接口 AQM 仿真
//!
//! 从 JSON 场景文件读取队列类型、参数与流，运行后打印每个队列的统计。

use std::path::PathBuf;
use std::process::ExitCode;

use aqm_sim::config::ScenarioSpec;
use aqm_sim::demo::run_scenario;
use aqm_sim::sim::SimTime;
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "aqm_sim", about = "接口队列 AQM 仿真：FIFO / RED / RED-ECN / WRED / RIO / ATM-RED")]
struct Args {
    /// 场景文件（JSON）
    #[arg(long)]
    scenario: PathBuf,
    /// 覆盖场景中的队列类型
    #[arg(long)]
    queue_type: Option<String>,
    /// 覆盖场景中的结束时间（毫秒）
    #[arg(long)]
    until_ms: Option<u64>,
    /// 把报告写成 JSON
    #[arg(long)]
    report_json: Option<PathBuf>,
}

fn main() -> ExitCode {
    // 初始化 tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut spec = ScenarioSpec::from_path(&args.scenario)?;
    if let Some(kind) = &args.queue_type {
        spec.queue_type = kind.clone();
    }
    if let Some(ms) = args.until_ms {
        spec.until_ms = ms;
    }
    let base_dir = args.scenario.parent();
    let outcome = run_scenario(&spec, base_dir, SimTime::from_millis(spec.until_ms))?;

    for report in &outcome.reports {
        for line in &report.lines {
            println!("{line}");
        }
    }
    println!(
        "done @ {}, injected_pkts={}, delivered_pkts={}, delivered_bytes={}, rejected_pkts={}, marked_pkts={}, aged_pkts={}",
        SimTime(outcome.finished_at_ns),
        outcome.stats.injected_pkts,
        outcome.stats.delivered_pkts,
        outcome.stats.delivered_bytes,
        outcome.stats.rejected_pkts,
        outcome.stats.marked_pkts,
        outcome.stats.aged_pkts,
    );

    if let Some(path) = &args.report_json {
        let json = serde_json::to_string_pretty(&outcome)?;
        std::fs::write(path, json)?;
    }
    Ok(())
}
