//! 演示场景
//!
//! 单瓶颈接口：按 `ScenarioSpec` 建队列，注入若干 CBR 流，跑到结束时刻后汇总报告。

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::{read_aqm_config, FlowSpec, QueueSetup, ReadContext, ScenarioSpec};
use crate::error::ConfigError;
use crate::net::{InterfaceId, NetWorld, NodeId, Packet, Stats, IPTOS_ECT};
use crate::queue::{build_queue, IfQueue, QueueKind, QueueReport};
use crate::sim::{Event, SimTime, Simulator, World};

/// 瓶颈接口所在的节点
pub const BOTTLENECK_NODE: u32 = 0;

/// 按场景建出瓶颈接口的各个队列
pub fn build_queues(spec: &ScenarioSpec, base_dir: Option<&Path>) -> Result<Vec<IfQueue>, ConfigError> {
    let kind: QueueKind = spec.queue_type.parse()?;
    let max_packet_age = spec
        .max_packet_age_ms
        .map_or(SimTime::INFINITE, SimTime::from_millis);

    (0..spec.num_queues())
        .map(|queue_number| {
            let mut ctx = ReadContext::new(BOTTLENECK_NODE, 0, queue_number);
            ctx.base_dir = base_dir.map(Path::to_path_buf);
            let config = read_aqm_config(kind, &spec.params, &ctx)?.map(Arc::new);
            let setup = QueueSetup {
                capacity_bytes: spec.capacity_bytes,
                node_id: BOTTLENECK_NODE,
                interface_index: 0,
                queue_number,
                global_seed: spec.seed,
                max_packet_age,
                ..QueueSetup::default()
            };
            build_queue(kind, setup, config)
        })
        .collect()
}

/// 建好世界并调度所有流，返回瓶颈接口 id
pub fn build_scenario(
    spec: &ScenarioSpec,
    base_dir: Option<&Path>,
    world: &mut NetWorld,
    sim: &mut Simulator,
) -> Result<InterfaceId, ConfigError> {
    let queues = build_queues(spec, base_dir)?;
    let iface = world
        .net
        .add_interface_for(&spec.protocol, spec.bandwidth_bps, queues);

    for (i, flow) in spec.flows.iter().enumerate() {
        let interval = flow_interval(flow)?;
        let stop = flow.stop_ms.map_or(SimTime::INFINITE, SimTime::from_millis);
        debug!(flow = i, ?interval, ?stop, dscp = flow.dscp, "调度 CBR 流");
        sim.schedule(
            SimTime::from_millis(flow.start_ms),
            CbrSource {
                flow_id: i as u64,
                flow: flow.clone(),
                iface,
                interval,
                stop,
            },
        );
    }
    Ok(iface)
}

fn flow_interval(flow: &FlowSpec) -> Result<SimTime, ConfigError> {
    if flow.rate_bps == 0 || flow.packet_bytes == 0 {
        return Err(ConfigError::InvalidSetup(format!(
            "flow from node {} needs rate_bps > 0 and packet_bytes > 0",
            flow.origin
        )));
    }
    let bits = u128::from(flow.packet_bytes) * 8;
    let nanos = bits * 1_000_000_000 / u128::from(flow.rate_bps);
    Ok(SimTime(nanos.clamp(1, u128::from(u64::MAX)) as u64))
}

/// 事件：CBR 源发出一个包，并在 `interval` 后再次触发
#[derive(Debug)]
pub struct CbrSource {
    pub flow_id: u64,
    pub flow: FlowSpec,
    pub iface: InterfaceId,
    pub interval: SimTime,
    pub stop: SimTime,
}

impl CbrSource {
    fn make_packet(&self, w: &mut NetWorld) -> Packet {
        let origin = NodeId(self.flow.origin);
        let id = w.net.next_packet_id();
        let seq = w.net.next_seq(origin);
        let tos = (self.flow.dscp << 2) | if self.flow.ect { IPTOS_ECT } else { 0 };
        let pkt = if self.flow.ipv6 {
            Packet::ipv6(id, origin, seq, self.flow.packet_bytes, tos)
        } else {
            Packet::ipv4(id, origin, seq, self.flow.packet_bytes, tos)
        };
        let pkt = if self.flow.ethernet || self.flow.mpls {
            pkt.with_ethernet(self.flow.mpls)
        } else {
            pkt
        };
        pkt.with_flow(self.flow_id)
    }
}

impl Event for CbrSource {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let me = *self;
        let w = world
            .as_any_mut()
            .downcast_mut::<NetWorld>()
            .expect("world must be NetWorld");

        if sim.now() >= me.stop {
            return;
        }
        let pkt = me.make_packet(w);
        w.net.inject(me.iface, me.flow.queue as usize, pkt, sim);

        let next_at = sim.now().saturating_add(me.interval);
        if next_at < me.stop {
            sim.schedule(next_at, me);
        }
    }
}

/// 一次场景运行的结果
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioOutcome {
    pub queue_type: String,
    pub finished_at_ns: u64,
    pub stats: Stats,
    pub reports: Vec<QueueReport>,
}

/// 建场景、运行到 `until`、汇总
#[tracing::instrument(skip(spec, base_dir), fields(queue_type = %spec.queue_type))]
pub fn run_scenario(
    spec: &ScenarioSpec,
    base_dir: Option<&Path>,
    until: SimTime,
) -> Result<ScenarioOutcome, ConfigError> {
    let mut sim = Simulator::default();
    let mut world = NetWorld::default();
    build_scenario(spec, base_dir, &mut world, &mut sim)?;

    info!(flows = spec.flows.len(), ?until, "▶️  运行场景");
    sim.run_until(until, &mut world);

    let now = sim.now();
    let reports = world.net.finalize(now);
    Ok(ScenarioOutcome {
        queue_type: spec.queue_type.clone(),
        finished_at_ns: now.as_nanos(),
        stats: world.net.stats.clone(),
        reports,
    })
}
