//! 出接口
//!
//! 一个接口持有若干 `IfQueue`，按下标严格优先级调度（0 最高），
//! 并按链路带宽计算串行发送时间。

use tracing::{debug, trace};

use super::id::InterfaceId;
use super::packet::Packet;
use crate::queue::{Enqueued, IfQueue, QueueOperation, QueueReport, Rejected, Retrieved};
use crate::sim::SimTime;

#[derive(Debug)]
pub struct Interface {
    pub id: InterfaceId,
    pub bandwidth_bps: u64,
    /// 调用队列的协议名，非 `IP` 时作为报告前缀
    pub invoking_protocol: String,
    queues: Vec<IfQueue>,
    busy: bool,
}

impl Interface {
    pub fn new(id: InterfaceId, bandwidth_bps: u64, queues: Vec<IfQueue>) -> Self {
        Self {
            id,
            bandwidth_bps,
            invoking_protocol: "IP".to_string(),
            queues,
            busy: false,
        }
    }

    /// 发送 `bytes` 字节所需的时间（向上取整到纳秒）
    pub(crate) fn tx_time(&self, bytes: u32) -> SimTime {
        if self.bandwidth_bps == 0 {
            return SimTime(u64::MAX / 4);
        }
        let bits = u128::from(bytes) * 8;
        let bps = u128::from(self.bandwidth_bps);
        let nanos = (bits * 1_000_000_000 + bps - 1) / bps;
        SimTime(nanos.min(u128::from(u64::MAX)) as u64)
    }

    pub fn queue(&self, idx: usize) -> Option<&IfQueue> {
        self.queues.get(idx)
    }

    pub fn queue_mut(&mut self, idx: usize) -> Option<&mut IfQueue> {
        self.queues.get_mut(idx)
    }

    pub fn queues(&self) -> &[IfQueue] {
        &self.queues
    }

    pub fn num_queues(&self) -> usize {
        self.queues.len()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub(crate) fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }

    /// 放进第 `idx` 个队列；下标越界的包进最低优先级队列
    pub fn enqueue(&mut self, idx: usize, pkt: Packet, now: SimTime) -> Result<Enqueued, Rejected> {
        let last = self.queues.len().saturating_sub(1);
        let idx = idx.min(last);
        let Some(q) = self.queues.get_mut(idx) else {
            panic!("interface {:?} has no queues", self.id);
        };
        q.insert(pkt, None, now, 0.0)
    }

    /// 严格优先级：从最高优先级的非空队列取出队头
    pub fn dequeue(&mut self, now: SimTime) -> Option<(usize, Retrieved)> {
        for (idx, q) in self.queues.iter_mut().enumerate() {
            if q.is_empty() {
                continue;
            }
            if let Some(r) = q.retrieve(0, QueueOperation::Dequeue, now) {
                trace!(iface = self.id.0, queue = idx, pkt_id = r.pkt.id, "选中队列");
                return Some((idx, r));
            }
        }
        None
    }

    /// 所有队列的报告，按优先级顺序
    pub fn finalize(&mut self, now: SimTime) -> Vec<QueueReport> {
        debug!(iface = self.id.0, queues = self.queues.len(), "汇总接口队列");
        let protocol = self.invoking_protocol.clone();
        self.queues
            .iter_mut()
            .map(|q| q.finalize(&protocol, now))
            .collect()
    }
}
