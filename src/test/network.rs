use crate::config::{FlowSpec, ParamTable, QueueSetup, ScenarioSpec};
use crate::demo::{build_queues, build_scenario, run_scenario};
use crate::error::ConfigError;
use crate::net::{InjectPacket, InterfaceId, NetWorld, NodeId, Packet};
use crate::queue::{build_queue, QueueKind};
use crate::sim::{SimTime, Simulator};

fn flow(origin: u32, rate_bps: u64) -> FlowSpec {
    FlowSpec {
        origin,
        dscp: 0,
        ect: false,
        packet_bytes: 1_000,
        rate_bps,
        start_ms: 0,
        stop_ms: None,
        queue: 0,
        ipv6: false,
        ethernet: false,
        mpls: false,
    }
}

fn spec(queue_type: &str, flows: Vec<FlowSpec>) -> ScenarioSpec {
    ScenarioSpec {
        queue_type: queue_type.to_string(),
        capacity_bytes: 20_000,
        bandwidth_bps: 1_000_000,
        seed: 7,
        protocol: "IP".to_string(),
        max_packet_age_ms: None,
        until_ms: 200,
        params: ParamTable::new(),
        flows,
    }
}

#[test]
fn interface_serves_queues_in_strict_priority_order() {
    let mut world = NetWorld::default();
    let mut sim = Simulator::default();
    let queues = (0..2)
        .map(|n| {
            let setup = QueueSetup {
                queue_number: n,
                ..QueueSetup::default()
            };
            build_queue(QueueKind::Fifo, setup, None).expect("fifo")
        })
        .collect();
    // 1000 字节 = 8 ms
    let iface = world.net.add_interface(1_000_000, queues);

    let lo = Packet::ipv4(0, NodeId(1), 0, 1_000, 0);
    let lo2 = Packet::ipv4(1, NodeId(1), 1, 1_000, 0);
    let hi = Packet::ipv4(2, NodeId(2), 0, 1_000, 0);
    sim.schedule(SimTime::ZERO, InjectPacket { iface, queue: 1, pkt: lo });
    sim.schedule(SimTime(1), InjectPacket { iface, queue: 1, pkt: lo2 });
    sim.schedule(SimTime(2), InjectPacket { iface, queue: 0, pkt: hi });

    // 第一个包已在发送；第二个时刻高优先级包应先于 lo2
    sim.run_until(SimTime::from_millis(9), &mut world);
    assert_eq!(world.net.stats.delivered_pkts, 1);
    let ifc = world.net.interface(iface).expect("iface");
    assert!(ifc.is_busy());
    assert_eq!(ifc.queue(1).expect("q1").packets_in_queue(), 1);
    assert!(ifc.queue(0).expect("q0").is_empty());

    sim.run(&mut world);
    assert_eq!(world.net.stats.delivered_pkts, 3);
    assert_eq!(world.net.stats.delivered_bytes, 3_000);
    assert!(!world.net.interface(iface).expect("iface").is_busy());
    assert_eq!(sim.now(), SimTime::from_millis(24));
}

#[test]
fn interface_tx_time_rounds_up() {
    let mut world = NetWorld::default();
    let id = world.net.add_interface(3, Vec::new());
    assert_eq!(id, InterfaceId(0));
    let ifc = world.net.interface(id).expect("iface");
    assert_eq!(ifc.tx_time(1), SimTime(2_666_666_667));
}

#[test]
fn overloaded_fifo_accounts_for_every_injected_packet() {
    let out = run_scenario(
        &spec("FIFO", vec![flow(1, 2_000_000)]),
        None,
        SimTime::from_millis(200),
    )
    .expect("valid scenario");
    assert_eq!(out.reports.len(), 1);
    let s = out.reports[0].summary.as_ref().expect("stats on");

    assert!(out.stats.rejected_pkts > 0);
    assert_eq!(out.stats.injected_pkts, s.packets_enqueued + s.packets_dropped);
    assert_eq!(out.stats.rejected_pkts, s.packets_dropped);
    // 最后一个出队的包可能仍在链路上
    assert!(s.packets_dequeued - out.stats.delivered_pkts <= 1);
    assert!(s.peak_bytes <= 20_000);
}

#[test]
fn red_keeps_average_queue_below_fifo() {
    let run = |kind: &str| {
        let mut sp = spec(kind, vec![flow(1, 2_000_000)]);
        sp.capacity_bytes = 100_000;
        sp.params
            .set("RED-MIN-THRESHOLD", 2)
            .set("RED-MAX-THRESHOLD", 6)
            .set("RED-QUEUE-WEIGHT", 0.5);
        let out = run_scenario(&sp, None, SimTime::from_millis(500)).expect("valid");
        out.reports[0]
            .summary
            .as_ref()
            .expect("stats")
            .average_queue_bytes
    };
    assert!(run("RED") < run("FIFO"));
}

#[test]
fn aged_packets_leave_the_queue() {
    let mut sp = spec("FIFO", vec![flow(1, 4_000_000)]);
    sp.max_packet_age_ms = Some(20);
    let out = run_scenario(&sp, None, SimTime::from_millis(200)).expect("valid");
    assert!(out.stats.aged_pkts > 0);
    let s = out.reports[0].summary.as_ref().expect("stats");
    assert_eq!(s.packets_dropped_aged, out.stats.aged_pkts);
}

#[test]
fn ecn_capable_flow_is_marked_by_red_ecn() {
    let mut f = flow(1, 2_000_000);
    f.ect = true;
    f.dscp = 10;
    let mut sp = spec("RED-ECN", vec![f]);
    sp.capacity_bytes = 100_000;
    sp.params
        .set("ECN", "YES")
        .set("RED-MIN-THRESHOLD", 2)
        .set("RED-MAX-THRESHOLD", 40)
        .set("RED-MAX-PROBABILITY", 0.5)
        .set("RED-QUEUE-WEIGHT", 0.5);
    let out = run_scenario(&sp, None, SimTime::from_millis(500)).expect("valid");
    assert!(out.stats.marked_pkts > 0);
    assert_eq!(out.reports[0].packets_marked_ecn, out.stats.marked_pkts);
}

#[test]
fn rio_scenario_without_modes_fails_setup() {
    let err = build_queues(&spec("RIO", vec![flow(1, 1_000_000)]), None).expect_err("modes");
    assert!(matches!(err, ConfigError::MissingParameter { node: 0, queue: 0, .. }));
}

#[test]
fn flow_with_zero_rate_is_rejected() {
    let mut world = NetWorld::default();
    let mut sim = Simulator::default();
    let err = build_scenario(&spec("FIFO", vec![flow(1, 0)]), None, &mut world, &mut sim)
        .expect_err("zero rate");
    assert!(matches!(err, ConfigError::InvalidSetup(_)));
}

#[test]
fn same_scenario_runs_identically() {
    let mut sp = spec("WRED", vec![flow(1, 1_500_000), flow(2, 1_500_000)]);
    sp.flows[1].dscp = 0b000110;
    let a = run_scenario(&sp, None, SimTime::from_millis(300)).expect("valid");
    let b = run_scenario(&sp, None, SimTime::from_millis(300)).expect("valid");
    assert_eq!(a.stats, b.stats);
    assert_eq!(a.reports, b.reports);
}

#[test]
fn scenario_protocol_prefixes_report_labels() {
    let mut sp = spec("FIFO", vec![flow(1, 500_000)]);
    sp.protocol = "MPLS".to_string();
    let out = run_scenario(&sp, None, SimTime::from_millis(50)).expect("valid");
    assert_eq!(out.reports[0].label, "MPLS FIFO");
    assert!(out.reports[0]
        .lines
        .iter()
        .all(|l| l.starts_with("MPLS FIFO ")));
}
