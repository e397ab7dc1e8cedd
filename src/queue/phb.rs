//! RED-ECN 的 per-hop behavior 表
//!
//! 第 0 项是默认 PHB；其余按 DSCP 精确匹配，匹配不到的 DSCP 落到默认项。

use crate::config::{PhbEntry, Thresholds};

use super::stats::ClassStats;

#[derive(Debug, Clone)]
pub struct PhbTable {
    entries: Vec<PhbEntry>,
    stats: Vec<ClassStats>,
}

impl PhbTable {
    pub fn new(entries: Vec<PhbEntry>) -> Self {
        let stats = vec![ClassStats::default(); entries.len()];
        PhbTable { entries, stats }
    }

    /// DSCP 对应的表项下标
    pub fn select(&self, ds: u8) -> usize {
        self.entries
            .iter()
            .skip(1)
            .position(|p| p.ds == ds)
            .map_or(0, |i| i + 1)
    }

    pub fn thresholds(&self, idx: usize) -> &Thresholds {
        &self.entries[idx].thresholds
    }

    pub fn stats_mut(&mut self, idx: usize) -> &mut ClassStats {
        &mut self.stats[idx]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// (DSCP, 统计) 按表顺序
    pub fn iter(&self) -> impl Iterator<Item = (u8, &ClassStats)> + '_ {
        self.entries.iter().map(|e| e.ds).zip(self.stats.iter())
    }
}
