//! 平均队长估计（EWMA）
//!
//! 忙时 `avg = (1-w)·avg + w·q`；空闲时按空闲时长折算成“若干个小包发送时间”，
//! `avg = avg · (1-w)^m`。

use crate::config::AveragingParams;
use crate::sim::SimTime;

/// 一个被跟踪群体（整个队列或某个颜色）的平均队长状态
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AverageSizeState {
    pub avg: f64,
    /// 最近一次变空的时刻
    pub idle_since: SimTime,
    /// 上次标记/丢弃以来进入 ramp 区间的包数；-1 表示低于 min
    pub packet_count: i32,
}

impl AverageSizeState {
    pub fn new(now: SimTime) -> Self {
        AverageSizeState {
            avg: 0.0,
            idle_since: now,
            packet_count: -1,
        }
    }

    /// `is_empty` 为真时按空闲衰减，否则按当前占用 `occupancy`（包数）平滑。
    pub fn update(&mut self, is_empty: bool, occupancy: usize, params: &AveragingParams, now: SimTime) {
        let w = params.queue_weight;
        if is_empty {
            let m = now
                .saturating_sub(self.idle_since)
                .ratio(params.small_packet_tx_time);
            self.avg *= (1.0 - w).powf(m);
        } else {
            self.avg = (1.0 - w) * self.avg + w * occupancy as f64;
        }
    }

    pub fn mark_idle(&mut self, now: SimTime) {
        self.idle_since = now;
    }
}
