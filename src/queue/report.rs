//! 仿真结束时的队列报告

use serde::Serialize;
use tracing::info;

use crate::config::CountingMode;
use crate::sim::SimTime;

use super::color::Color;
use super::ifq::IfQueue;
use super::stats::{ClassStats, QueueSummary};
use super::QueueKind;

/// 一个颜色或 PHB 的统计
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassReport {
    pub name: String,
    pub stats: ClassStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueReport {
    /// 例如 `RED`、`RIO[C]`、`X WRED`
    pub label: String,
    pub interface_index: u32,
    pub queue_number: u32,
    /// 关闭统计时为 `None`
    pub summary: Option<QueueSummary>,
    pub classes: Vec<ClassReport>,
    pub packets_marked_ecn: u64,
    /// 可读的文本形式
    pub lines: Vec<String>,
}

fn class_lines(lines: &mut Vec<String>, label: &str, name: &str, cs: &ClassStats) {
    lines.push(format!("{label} ({name}) Packets Queued = {}", cs.packets_queued));
    lines.push(format!("{label} ({name}) Packets Dequeued = {}", cs.packets_dequeued));
    lines.push(format!("{label} ({name}) Packets Marked ECN = {}", cs.packets_ecn_marked));
    lines.push(format!("{label} ({name}) Packets Dropped = {}", cs.packets_dropped));
}

impl IfQueue {
    fn report_label(&self, invoking_protocol: &str) -> String {
        let base = match self.queue_type() {
            QueueKind::RedEcn => "RED".to_string(),
            QueueKind::Rio => match self.counting_mode() {
                Some(CountingMode::Decoupled) => "RIO[DC]".to_string(),
                _ => "RIO[C]".to_string(),
            },
            kind => kind.as_str().to_string(),
        };
        if invoking_protocol.is_empty() || invoking_protocol == "IP" {
            base
        } else {
            format!("{invoking_protocol} {base}")
        }
    }

    /// 结束统计并生成报告。`invoking_protocol` 不是 `IP` 时作为标签前缀。
    #[tracing::instrument(skip(self))]
    pub fn finalize(&mut self, invoking_protocol: &str, now: SimTime) -> QueueReport {
        let bytes = self.bytes_in_queue();
        if let Some(s) = self.stats_sink_mut() {
            s.on_finalize(now, bytes);
        }
        let label = self.report_label(invoking_protocol);
        let summary = self.stats_summary();

        let mut lines = Vec::new();
        if let Some(s) = &summary {
            lines.push(format!("{label} Packets Enqueued = {}", s.packets_enqueued));
            lines.push(format!("{label} Bytes Enqueued = {}", s.bytes_enqueued));
            lines.push(format!("{label} Packets Dequeued = {}", s.packets_dequeued));
            lines.push(format!("{label} Bytes Dequeued = {}", s.bytes_dequeued));
            lines.push(format!("{label} Packets Dropped = {}", s.packets_dropped));
            lines.push(format!("{label} Bytes Dropped = {}", s.bytes_dropped));
            lines.push(format!(
                "{label} Packets Dropped Forcefully = {}",
                s.packets_dropped_forcefully
            ));
            lines.push(format!("{label} Packets Dropped Aged = {}", s.packets_dropped_aged));
            lines.push(format!("{label} Peak Queue Length (bytes) = {}", s.peak_bytes));
            lines.push(format!(
                "{label} Average Queue Length (bytes) = {:.3}",
                s.average_queue_bytes
            ));
            lines.push(format!(
                "{label} Average Time In Queue (s) = {:.6}",
                s.average_time_in_queue_secs
            ));
        }

        let mut classes = Vec::new();
        match self.queue_type() {
            QueueKind::Wred | QueueKind::Rio => {
                for c in Color::ALL {
                    if let Some(cs) = self.color_stats(c) {
                        class_lines(&mut lines, &label, c.label(), cs);
                        classes.push(ClassReport {
                            name: c.label().to_string(),
                            stats: *cs,
                        });
                    }
                }
            }
            QueueKind::RedEcn => {
                if let Some(phbs) = self.phb_table() {
                    for (i, (ds, cs)) in phbs.iter().enumerate() {
                        let name = if i == 0 {
                            "DEFAULT".to_string()
                        } else {
                            format!("DSCP {ds}")
                        };
                        if phbs.len() > 1 {
                            class_lines(&mut lines, &label, &name, cs);
                        }
                        classes.push(ClassReport { name, stats: *cs });
                    }
                }
            }
            _ => {}
        }

        let packets_marked_ecn = self.packets_marked();
        lines.push(format!("{label} Packets Marked ECN = {packets_marked_ecn}"));

        info!(
            label = %label,
            in_queue = bytes,
            marked = packets_marked_ecn,
            "📊 队列统计完成"
        );
        QueueReport {
            label,
            interface_index: self.interface_index(),
            queue_number: self.queue_number(),
            summary,
            classes,
            packets_marked_ecn,
            lines,
        }
    }
}
