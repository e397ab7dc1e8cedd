//! 注包事件

use super::id::InterfaceId;
use super::net_world::NetWorld;
use super::packet::Packet;
use crate::sim::{Event, Simulator, World};
use tracing::trace;

/// 事件：把 `pkt` 交给接口的第 `queue` 个队列
#[derive(Debug)]
pub struct InjectPacket {
    pub iface: InterfaceId,
    pub queue: usize,
    pub pkt: Packet,
}

impl Event for InjectPacket {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let InjectPacket { iface, queue, pkt } = *self;
        trace!(pkt_id = pkt.id, queue, now = ?sim.now(), "注入数据包");
        let w = world
            .as_any_mut()
            .downcast_mut::<NetWorld>()
            .expect("world must be NetWorld");
        w.net.inject(iface, queue, pkt, sim);
    }
}
