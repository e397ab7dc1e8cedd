//! 仿真器
//!
//! 定义事件驱动仿真器，维护当前时间与事件队列。单线程、协作式：
//! 同一时刻只有一个事件在执行。

use super::event::Event;
use super::scheduled_event::{EventId, EventKey, ScheduledEvent};
use super::time::SimTime;
use super::world::World;
use std::collections::{BinaryHeap, HashSet};
use tracing::{debug, info, trace};

/// 事件驱动仿真器：维护当前时间与事件队列。
#[derive(Default)]
pub struct Simulator {
    now: SimTime,
    next_seq: u64,
    q: BinaryHeap<ScheduledEvent>,
    cancelled: HashSet<u64>,
}

impl Simulator {
    /// 获取当前仿真时间
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// 调度事件在指定时间执行
    #[tracing::instrument(skip(self, ev), fields(event_type = std::any::type_name::<E>(), schedule_at = ?at))]
    pub fn schedule<E: Event>(&mut self, at: SimTime, ev: E) -> EventId {
        let seq = self.next_seq;
        trace!(now = ?self.now, seq, "调度事件");

        self.next_seq = self.next_seq.wrapping_add(1);
        self.q.push(ScheduledEvent {
            key: EventKey {
                at,
                id: EventId(seq),
            },
            ev: Box::new(ev),
        });

        debug!(queue_size = self.q.len(), "事件已加入队列");
        EventId(seq)
    }

    /// 在当前时间之后 `delay` 执行事件。
    pub fn schedule_after<E: Event>(&mut self, delay: SimTime, ev: E) -> EventId {
        let at = self.now.saturating_add(delay);
        self.schedule(at, ev)
    }

    /// 取消一个尚未执行的事件；已执行或不存在的事件被忽略。
    pub fn cancel(&mut self, id: EventId) {
        if id.0 < self.next_seq {
            self.cancelled.insert(id.0);
        }
    }

    /// 队列中尚未执行（且未取消）的事件数。
    pub fn pending(&self) -> usize {
        self.q.len().saturating_sub(self.cancelled.len())
    }

    /// 运行直到事件队列为空或到达 `until`。
    pub fn run_until(&mut self, until: SimTime, world: &mut dyn World) {
        while let Some(top) = self.q.peek() {
            if top.at() > until {
                break;
            }
            let Some(item) = self.q.pop() else { break };
            if self.cancelled.remove(&item.id().0) {
                trace!(seq = item.id().0, "跳过已取消事件");
                continue;
            }
            self.now = item.at();
            item.ev.execute(self, world);
            world.on_tick(self);
        }
        self.now = self.now.max(until);
    }

    /// 运行所有事件直到队列为空。
    #[tracing::instrument(skip(self, world))]
    pub fn run(&mut self, world: &mut dyn World) {
        info!("▶️  开始运行仿真");
        debug!(now = ?self.now, queue_size = self.q.len(), "初始状态");

        let mut event_count = 0u64;
        while let Some(item) = self.q.pop() {
            if self.cancelled.remove(&item.id().0) {
                continue;
            }
            event_count += 1;
            self.now = item.at();

            trace!(
                event_num = event_count,
                now = ?self.now,
                seq = item.id().0,
                remaining_queue = self.q.len(),
                "执行事件"
            );

            item.ev.execute(self, world);
            world.on_tick(self);
        }

        info!(
            total_events = event_count,
            final_time = ?self.now,
            "✅ 仿真完成"
        );
    }
}
