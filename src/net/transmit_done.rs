//! 发送完成事件（驱动接口出队）

use super::id::InterfaceId;
use super::net_world::NetWorld;
use super::packet::Packet;
use crate::sim::{Event, Simulator, World};

/// 事件：接口把 `pkt` 的最后一个比特送上链路后触发，接着发送下一个包。
#[derive(Debug)]
pub struct TransmitDone {
    pub iface: InterfaceId,
    pub pkt: Packet,
}

impl Event for TransmitDone {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let TransmitDone { iface, pkt } = *self;
        let w = world
            .as_any_mut()
            .downcast_mut::<NetWorld>()
            .expect("world must be NetWorld");
        w.net.on_transmit_done(iface, pkt, sim);
    }
}
