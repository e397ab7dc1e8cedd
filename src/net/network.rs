//! 网络
//!
//! 持有所有出接口，负责入队、串行发送、老化与最终统计。

use std::collections::HashMap;

use tracing::{debug, info, trace};

use super::aging_timer::QueueAgingTimer;
use super::id::{InterfaceId, NodeId};
use super::interface::Interface;
use super::packet::Packet;
use super::stats::Stats;
use super::transmit_done::TransmitDone;
use crate::queue::{AgeTicket, IfQueue, QueueReport};
use crate::sim::{SimTime, Simulator};

#[derive(Debug, Default)]
pub struct Network {
    interfaces: Vec<Interface>,
    next_pkt_id: u64,
    /// 每个源节点的下一个序号
    next_seq: HashMap<NodeId, u32>,
    pub stats: Stats,
}

impl Network {
    /// 添加接口；接口 id 按添加顺序分配
    pub fn add_interface(&mut self, bandwidth_bps: u64, queues: Vec<IfQueue>) -> InterfaceId {
        self.add_interface_for("IP", bandwidth_bps, queues)
    }

    /// 同 `add_interface`，队列由 `protocol` 调用（报告标签带该前缀）
    pub fn add_interface_for(
        &mut self,
        protocol: &str,
        bandwidth_bps: u64,
        queues: Vec<IfQueue>,
    ) -> InterfaceId {
        let id = InterfaceId(self.interfaces.len() as u32);
        let mut iface = Interface::new(id, bandwidth_bps, queues);
        iface.invoking_protocol = protocol.to_string();
        self.interfaces.push(iface);
        id
    }

    pub fn interface(&self, id: InterfaceId) -> Option<&Interface> {
        self.interfaces.get(id.0 as usize)
    }

    pub fn interface_mut(&mut self, id: InterfaceId) -> Option<&mut Interface> {
        self.interfaces.get_mut(id.0 as usize)
    }

    fn iface_mut(&mut self, id: InterfaceId) -> &mut Interface {
        let n = self.interfaces.len();
        self.interfaces
            .get_mut(id.0 as usize)
            .unwrap_or_else(|| panic!("no interface {:?} (have {n})", id))
    }

    /// 分配一个全局唯一的包 id
    pub fn next_packet_id(&mut self) -> u64 {
        let id = self.next_pkt_id;
        self.next_pkt_id = self.next_pkt_id.wrapping_add(1);
        id
    }

    /// 分配 `origin` 内的下一个序号
    pub fn next_seq(&mut self, origin: NodeId) -> u32 {
        let seq = self.next_seq.entry(origin).or_insert(0);
        let cur = *seq;
        *seq = seq.wrapping_add(1);
        cur
    }

    /// 把包放进接口的队列；接口空闲时立即开始发送
    #[tracing::instrument(skip(self, pkt, sim), fields(pkt_id = pkt.id, iface = iface.0))]
    pub fn inject(&mut self, iface: InterfaceId, queue: usize, pkt: Packet, sim: &mut Simulator) {
        let now = sim.now();
        self.stats.injected_pkts += 1;
        let res = self.iface_mut(iface).enqueue(queue, pkt, now);
        match res {
            Ok(enq) => {
                if enq.marked {
                    self.stats.marked_pkts += 1;
                }
                if let Some(ticket) = enq.aging {
                    sim.schedule_after(ticket.age, QueueAgingTimer { iface, ticket });
                }
                if !self.iface_mut(iface).is_busy() {
                    self.start_transmit(iface, sim);
                }
            }
            Err(rej) => {
                self.stats.rejected_pkts += 1;
                trace!(pkt_id = rej.pkt.id, reason = ?rej.reason, "入队失败");
            }
        }
    }

    /// 取出下一个包并调度其发送完成事件；没有包时接口进入空闲
    fn start_transmit(&mut self, iface: InterfaceId, sim: &mut Simulator) {
        let now = sim.now();
        let ifc = self.iface_mut(iface);
        match ifc.dequeue(now) {
            Some((queue, r)) => {
                let tx = ifc.tx_time(r.pkt.size_bytes);
                ifc.set_busy(true);
                debug!(
                    pkt_id = r.pkt.id,
                    queue,
                    waited = ?now.saturating_sub(r.insert_time),
                    tx_time = ?tx,
                    "🚀 开始发送"
                );
                sim.schedule_after(tx, TransmitDone { iface, pkt: r.pkt });
            }
            None => {
                ifc.set_busy(false);
                trace!(iface = iface.0, "接口空闲");
            }
        }
    }

    pub(crate) fn on_transmit_done(&mut self, iface: InterfaceId, pkt: Packet, sim: &mut Simulator) {
        self.stats.delivered_pkts += 1;
        self.stats.delivered_bytes += u64::from(pkt.size_bytes);
        trace!(pkt_id = pkt.id, delivered = self.stats.delivered_pkts, "✅ 发送完成");
        self.start_transmit(iface, sim);
    }

    pub(crate) fn on_aging_timer(&mut self, iface: InterfaceId, ticket: &AgeTicket, sim: &mut Simulator) {
        let now = sim.now();
        let Some(q) = self.iface_mut(iface).queue_mut(ticket.queue_number as usize) else {
            return;
        };
        if q.expire_aged(ticket, now).is_some() {
            self.stats.aged_pkts += 1;
        }
    }

    /// 汇总所有接口所有队列的报告
    pub fn finalize(&mut self, now: SimTime) -> Vec<QueueReport> {
        let reports: Vec<QueueReport> = self
            .interfaces
            .iter_mut()
            .flat_map(|i| i.finalize(now))
            .collect();
        info!(
            queues = reports.len(),
            delivered_pkts = self.stats.delivered_pkts,
            rejected_pkts = self.stats.rejected_pkts,
            "📊 网络统计完成"
        );
        reports
    }
}
