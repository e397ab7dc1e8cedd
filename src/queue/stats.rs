//! 队列统计
//!
//! `QueueStatsSink` 是队列向统计层汇报的接口；`QueueStats` 是默认实现。
//! 所有回调都带着“操作之前”的队列字节数：入队时先汇报再增加 `bytes_used`，
//! 平均队长按这个约定做时间加权。

use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::net::Packet;
use crate::sim::SimTime;

/// 队列统计回调
pub trait QueueStatsSink: Send {
    fn on_enqueue(&mut self, pkt: &Packet, bytes_before: u64, now: SimTime);
    fn on_dequeue(&mut self, pkt: &Packet, bytes_before: u64, now: SimTime);
    /// 入队被拒（容量不足、AQM 丢弃）或 DISCARD
    fn on_drop(&mut self, pkt: &Packet, bytes_before: u64, now: SimTime);
    /// 已在队列中的包被强制移除；`aged` 表示因超龄
    fn on_drop_forcefully(&mut self, pkt: &Packet, bytes_before: u64, now: SimTime, aged: bool);
    /// 一个包在队列中的停留时间
    fn on_delay_sample(&mut self, delay: SimTime);
    fn on_finalize(&mut self, now: SimTime, bytes_in_queue: u64);
    fn summary(&self) -> QueueSummary;
}

/// 统计快照
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueueSummary {
    pub packets_enqueued: u64,
    pub bytes_enqueued: u64,
    pub packets_dequeued: u64,
    pub bytes_dequeued: u64,
    pub packets_dropped: u64,
    pub bytes_dropped: u64,
    pub packets_dropped_forcefully: u64,
    pub bytes_dropped_forcefully: u64,
    pub packets_dropped_aged: u64,
    pub peak_bytes: u64,
    /// 时间加权平均队长（字节）
    pub average_queue_bytes: f64,
    /// 平均排队时延（秒），分母为 出队 + 强制丢弃 + 超龄丢弃
    pub average_time_in_queue_secs: f64,
    pub delay_samples: u64,
}

/// 默认统计实现
#[derive(Debug, Clone)]
pub struct QueueStats {
    summary: QueueSummary,
    created_at: SimTime,
    last_change: SimTime,
    current_bytes: u64,
    /// 字节 × 纳秒
    byte_time_area: u128,
    total_delay: u128,
    finalized_at: Option<SimTime>,
}

impl QueueStats {
    pub fn new(created_at: SimTime) -> Self {
        QueueStats {
            summary: QueueSummary::default(),
            created_at,
            last_change: created_at,
            current_bytes: 0,
            byte_time_area: 0,
            total_delay: 0,
            finalized_at: None,
        }
    }

    /// 共享句柄，供外部在队列销毁后继续读取
    pub fn shared(created_at: SimTime) -> Arc<Mutex<QueueStats>> {
        Arc::new(Mutex::new(QueueStats::new(created_at)))
    }

    fn advance(&mut self, bytes_before: u64, now: SimTime) {
        let dt = now.saturating_sub(self.last_change).as_nanos();
        self.byte_time_area += u128::from(bytes_before) * u128::from(dt);
        self.last_change = self.last_change.max(now);
    }

    fn average_queue_bytes(&self, until: SimTime) -> f64 {
        let dt = until.saturating_sub(self.last_change).as_nanos();
        let area = self.byte_time_area + u128::from(self.current_bytes) * u128::from(dt);
        let span = until.saturating_sub(self.created_at).as_nanos();
        if span == 0 {
            return self.current_bytes as f64;
        }
        area as f64 / span as f64
    }
}

impl QueueStatsSink for QueueStats {
    fn on_enqueue(&mut self, pkt: &Packet, bytes_before: u64, now: SimTime) {
        self.advance(bytes_before, now);
        let size = u64::from(pkt.size_bytes);
        self.current_bytes = bytes_before + size;
        self.summary.packets_enqueued += 1;
        self.summary.bytes_enqueued += size;
        self.summary.peak_bytes = self.summary.peak_bytes.max(self.current_bytes);
    }

    fn on_dequeue(&mut self, pkt: &Packet, bytes_before: u64, now: SimTime) {
        self.advance(bytes_before, now);
        let size = u64::from(pkt.size_bytes);
        self.current_bytes = bytes_before.saturating_sub(size);
        self.summary.packets_dequeued += 1;
        self.summary.bytes_dequeued += size;
    }

    fn on_drop(&mut self, pkt: &Packet, bytes_before: u64, now: SimTime) {
        self.advance(bytes_before, now);
        self.summary.packets_dropped += 1;
        self.summary.bytes_dropped += u64::from(pkt.size_bytes);
    }

    fn on_drop_forcefully(&mut self, pkt: &Packet, bytes_before: u64, now: SimTime, aged: bool) {
        self.advance(bytes_before, now);
        let size = u64::from(pkt.size_bytes);
        self.current_bytes = bytes_before.saturating_sub(size);
        if aged {
            self.summary.packets_dropped_aged += 1;
        } else {
            self.summary.packets_dropped_forcefully += 1;
        }
        self.summary.bytes_dropped_forcefully += size;
    }

    fn on_delay_sample(&mut self, delay: SimTime) {
        self.total_delay += u128::from(delay.as_nanos());
        self.summary.delay_samples += 1;
    }

    fn on_finalize(&mut self, now: SimTime, bytes_in_queue: u64) {
        self.advance(self.current_bytes, now);
        self.current_bytes = bytes_in_queue;
        self.finalized_at = Some(now);
    }

    fn summary(&self) -> QueueSummary {
        let mut s = self.summary.clone();
        s.average_queue_bytes = self.average_queue_bytes(self.finalized_at.unwrap_or(self.last_change));
        let removed =
            s.packets_dequeued + s.packets_dropped_forcefully + s.packets_dropped_aged;
        if removed > 0 {
            s.average_time_in_queue_secs = self.total_delay as f64 / removed as f64 / 1e9;
        }
        s
    }
}

impl<T: QueueStatsSink> QueueStatsSink for Arc<Mutex<T>> {
    fn on_enqueue(&mut self, pkt: &Packet, bytes_before: u64, now: SimTime) {
        if let Ok(mut s) = self.lock() {
            s.on_enqueue(pkt, bytes_before, now);
        }
    }

    fn on_dequeue(&mut self, pkt: &Packet, bytes_before: u64, now: SimTime) {
        if let Ok(mut s) = self.lock() {
            s.on_dequeue(pkt, bytes_before, now);
        }
    }

    fn on_drop(&mut self, pkt: &Packet, bytes_before: u64, now: SimTime) {
        if let Ok(mut s) = self.lock() {
            s.on_drop(pkt, bytes_before, now);
        }
    }

    fn on_drop_forcefully(&mut self, pkt: &Packet, bytes_before: u64, now: SimTime, aged: bool) {
        if let Ok(mut s) = self.lock() {
            s.on_drop_forcefully(pkt, bytes_before, now, aged);
        }
    }

    fn on_delay_sample(&mut self, delay: SimTime) {
        if let Ok(mut s) = self.lock() {
            s.on_delay_sample(delay);
        }
    }

    fn on_finalize(&mut self, now: SimTime, bytes_in_queue: u64) {
        if let Ok(mut s) = self.lock() {
            s.on_finalize(now, bytes_in_queue);
        }
    }

    fn summary(&self) -> QueueSummary {
        match self.lock() {
            Ok(s) => s.summary(),
            Err(poisoned) => poisoned.into_inner().summary(),
        }
    }
}

/// 每个颜色 / PHB 的计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClassStats {
    pub packets_queued: u64,
    pub bytes_queued: u64,
    pub packets_dequeued: u64,
    pub bytes_dequeued: u64,
    pub packets_dropped: u64,
    pub bytes_dropped: u64,
    /// 已在队列中被强制移除（DROP / 超龄）
    pub packets_dropped_forcefully: u64,
    pub packets_ecn_marked: u64,
}

impl ClassStats {
    pub(crate) fn queued(&mut self, size: u32) {
        self.packets_queued += 1;
        self.bytes_queued += u64::from(size);
    }

    pub(crate) fn dequeued(&mut self, size: u32) {
        self.packets_dequeued += 1;
        self.bytes_dequeued += u64::from(size);
    }

    pub(crate) fn dropped(&mut self, size: u32) {
        self.packets_dropped += 1;
        self.bytes_dropped += u64::from(size);
    }
}
