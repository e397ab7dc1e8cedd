//! 已调度事件
//!
//! 堆中的条目按 (时间, 序号) 排序：时间早的先执行，同一时刻先调度的先执行。

use super::event::Event;
use super::time::SimTime;
use std::cmp::{Ordering, Reverse};

/// 已调度事件的句柄，可用于取消。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct EventKey {
    pub(crate) at: SimTime,
    pub(crate) id: EventId,
}

pub struct ScheduledEvent {
    pub(crate) key: EventKey,
    pub(crate) ev: Box<dyn Event>,
}

impl ScheduledEvent {
    pub fn at(&self) -> SimTime {
        self.key.at
    }

    pub fn id(&self) -> EventId {
        self.key.id
    }
}

// BinaryHeap 是 max-heap，用 Reverse 取最小键
impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        Reverse(self.key).cmp(&Reverse(other.key))
    }
}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for ScheduledEvent {}
