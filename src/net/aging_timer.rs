//! 包老化定时器

use super::id::InterfaceId;
use super::net_world::NetWorld;
use crate::queue::AgeTicket;
use crate::sim::{Event, Simulator, World};

/// 事件：包入队 `ticket.age` 之后触发；包若仍在队列中则被移除。
#[derive(Debug)]
pub struct QueueAgingTimer {
    pub iface: InterfaceId,
    pub ticket: AgeTicket,
}

impl Event for QueueAgingTimer {
    #[tracing::instrument(skip(self, sim, world), fields(pkt_id = self.ticket.packet_id, queue = self.ticket.queue_number))]
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let QueueAgingTimer { iface, ticket } = *self;
        let w = world
            .as_any_mut()
            .downcast_mut::<NetWorld>()
            .expect("world must be NetWorld");
        w.net.on_aging_timer(iface, &ticket, sim);
    }
}
