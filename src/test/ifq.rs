use std::sync::Arc;

use crate::config::{AqmConfig, AveragingParams, QueueSetup, RedParams, Thresholds};
use crate::error::ConfigError;
use crate::net::{NodeId, Packet};
use crate::queue::{
    build_queue, build_queue_by_name, DropReason, IfQueue, QueueKind, QueueOperation, QueueStats,
    QueueStatsSink,
};
use crate::sim::SimTime;

fn setup(capacity_bytes: u64) -> QueueSetup {
    QueueSetup {
        capacity_bytes,
        ..QueueSetup::default()
    }
}

fn fifo(capacity_bytes: u64) -> IfQueue {
    build_queue(QueueKind::Fifo, setup(capacity_bytes), None).expect("fifo")
}

fn pkt(id: u64, size_bytes: u32) -> Packet {
    Packet::ipv4(id, NodeId(1), id as u32, size_bytes, 0)
}

/// 权重为 1 时平均队长就是到达时的队列包数
fn red_config(min: u32, max: u32, p: f64) -> Arc<AqmConfig> {
    Arc::new(AqmConfig::Red(RedParams {
        thresholds: Thresholds::new(min, max, p),
        averaging: AveragingParams {
            queue_weight: 1.0,
            ..AveragingParams::default()
        },
    }))
}

#[test]
fn fifo_10000_bytes_refuses_seventeenth_600_byte_packet() {
    let mut q = fifo(10_000);
    for i in 0..16 {
        q.insert(pkt(i, 600), None, SimTime(i), 0.0).expect("fits");
    }
    assert_eq!(q.bytes_in_queue(), 9_600);
    assert_eq!(q.free_space(), 400);

    let rej = q
        .insert(pkt(16, 600), None, SimTime(16), 0.0)
        .expect_err("no room");
    assert_eq!(rej.reason, DropReason::Overflow);
    assert_eq!(rej.pkt.id, 16);
    assert_eq!(q.packets_in_queue(), 16);

    let s = q.stats_summary().expect("stats on");
    assert_eq!(s.packets_enqueued, 16);
    assert_eq!(s.packets_dropped, 1);
}

#[test]
fn retrieve_operations_are_accounted_separately() {
    let mut q = fifo(100_000);
    for i in 0..4 {
        q.insert(pkt(i, 100), None, SimTime::ZERO, i as f64).expect("fits");
    }

    let r = q
        .retrieve(1, QueueOperation::Discard, SimTime(10))
        .expect("pkt");
    assert_eq!(r.pkt.id, 1);
    assert_eq!(r.next_service_tag, Some(0.0));

    let r = q.retrieve(0, QueueOperation::Drop, SimTime(20)).expect("pkt");
    assert_eq!(r.pkt.id, 0);
    assert_eq!(r.next_service_tag, Some(2.0));

    let r = q
        .retrieve(0, QueueOperation::Dequeue, SimTime(30))
        .expect("pkt");
    assert_eq!(r.pkt.id, 2);
    assert_eq!(r.insert_time, SimTime::ZERO);
    assert_eq!(r.next_service_tag, Some(3.0));

    let r = q
        .retrieve(0, QueueOperation::DropAged, SimTime(40))
        .expect("pkt");
    assert_eq!(r.pkt.id, 3);
    assert_eq!(r.next_service_tag, None);

    assert!(q.retrieve(0, QueueOperation::Dequeue, SimTime(50)).is_none());

    let s = q.stats_summary().expect("stats on");
    assert_eq!(s.packets_dropped, 1);
    assert_eq!(s.packets_dropped_forcefully, 1);
    assert_eq!(s.packets_dequeued, 1);
    assert_eq!(s.packets_dropped_aged, 1);
    // DISCARD 不产生时延样本
    assert_eq!(s.delay_samples, 3);
    assert_eq!(
        s.packets_enqueued,
        s.packets_dequeued + s.packets_dropped + s.packets_dropped_forcefully + s.packets_dropped_aged
    );
}

#[test]
fn retrieve_out_of_range_leaves_queue_untouched() {
    let mut q = fifo(10_000);
    q.insert(pkt(0, 100), None, SimTime::ZERO, 0.0).expect("fits");
    assert!(q.retrieve(1, QueueOperation::Dequeue, SimTime(1)).is_none());
    assert_eq!(q.packets_in_queue(), 1);
    assert_eq!(q.peek(0).expect("head").pkt.id, 0);
    assert!(q.peek(1).is_none());
}

#[test]
fn suspended_queue_looks_empty() {
    let mut q = fifo(10_000);
    q.insert(pkt(0, 100), None, SimTime::ZERO, 0.0).expect("fits");
    q.set_suspended(true);
    assert!(q.is_suspended());
    assert!(q.is_empty());
    assert!(q.peek(0).is_none());
    assert!(q.retrieve(0, QueueOperation::Dequeue, SimTime(1)).is_none());
    assert_eq!(q.packets_in_queue(), 1);

    q.set_suspended(false);
    assert!(!q.is_empty());
    assert_eq!(
        q.retrieve(0, QueueOperation::Dequeue, SimTime(1))
            .expect("pkt")
            .pkt
            .id,
        0
    );
}

#[test]
fn service_tag_and_insert_time_accessors() {
    let mut q = fifo(10_000);
    assert!(!q.set_service_tag(1.0));
    q.insert(pkt(0, 100), Some(vec![7, 7]), SimTime(5), 0.0)
        .expect("fits");
    q.insert(pkt(1, 100), None, SimTime(9), 0.0).expect("fits");
    assert!(q.set_service_tag(4.5));
    assert_eq!(q.peek(1).expect("tail").service_tag, 4.5);
    assert_eq!(q.packet_insert_time(0), Some(SimTime(5)));
    assert_eq!(q.packet_insert_time(2), None);

    let r = q
        .retrieve(0, QueueOperation::Dequeue, SimTime(10))
        .expect("pkt");
    assert_eq!(r.info, Some(vec![7, 7]));
    assert_eq!(r.next_service_tag, Some(4.5));
}

#[test]
fn qos_information_tracks_delay_and_transmission() {
    let mut q = fifo(10_000);
    q.insert(pkt(0, 500), None, SimTime::ZERO, 0.0).expect("fits");
    q.retrieve(0, QueueOperation::Dequeue, SimTime::from_micros(100))
        .expect("pkt");

    let info = q.qos_information_update(SimTime::from_micros(200), false);
    assert_eq!(info.queue_delay_us, 50.0);
    assert_eq!(info.total_transmission, 500);

    // 超过观察间隔没有变化：先返回旧值，再清零
    let late = SimTime::from_micros(100).saturating_add(SimTime::from_secs(2));
    let info = q.qos_information_update(late, true);
    assert_eq!(info.queue_delay_us, 50.0);
    assert_eq!(info.total_transmission, 500);

    let info = q.qos_information_update(late, false);
    assert_eq!(info.queue_delay_us, 0.0);
    assert_eq!(info.total_transmission, 0);
}

#[test]
fn aged_packet_is_removed_by_identity() {
    let s = QueueSetup {
        max_packet_age: SimTime::from_millis(10),
        ..setup(10_000)
    };
    let mut q = build_queue(QueueKind::Fifo, s, None).expect("fifo");
    let t0 = q
        .insert(pkt(0, 100), None, SimTime::ZERO, 0.0)
        .expect("fits")
        .aging
        .expect("aging on");
    let t1 = q
        .insert(pkt(1, 100), None, SimTime(1), 0.0)
        .expect("fits")
        .aging
        .expect("aging on");
    assert_eq!(t1.age, SimTime::from_millis(10));

    // 第一个包先被正常发走，到期时已不在队列中
    q.retrieve(0, QueueOperation::Dequeue, SimTime(2)).expect("pkt");
    assert!(q.expire_aged(&t0, SimTime::from_millis(10)).is_none());

    let aged = q
        .expire_aged(&t1, SimTime::from_millis(10))
        .expect("still queued");
    assert_eq!(aged.id, 1);
    assert!(q.is_empty());
    assert_eq!(q.stats_summary().expect("stats").packets_dropped_aged, 1);
}

#[test]
fn no_aging_ticket_when_aging_is_off() {
    let mut q = fifo(10_000);
    let enq = q.insert(pkt(0, 100), None, SimTime::ZERO, 0.0).expect("fits");
    assert!(enq.aging.is_none());
    assert!(!enq.marked);
}

#[test]
fn dropping_queue_reports_residue_as_forced_drops() {
    let shared = QueueStats::shared(SimTime::ZERO);
    let mut q = fifo(10_000).with_stats_sink(Box::new(Arc::clone(&shared)));
    q.insert(pkt(0, 100), None, SimTime(1), 0.0).expect("fits");
    q.insert(pkt(1, 200), None, SimTime(2), 0.0).expect("fits");
    drop(q);

    let s = shared.summary();
    assert_eq!(s.packets_enqueued, 2);
    assert_eq!(s.packets_dropped_forcefully, 2);
    assert_eq!(s.bytes_dropped_forcefully, 300);
}

#[test]
fn replicate_moves_packets_through_new_queue_admission() {
    let mut old = fifo(10_000);
    for i in 0..5 {
        old.insert(pkt(i, 1_000), None, SimTime(i), 0.0).expect("fits");
    }
    let mut new = fifo(3_000);
    let extra = new.replicate(&mut old);

    assert_eq!(extra, 2);
    assert!(old.is_empty());
    assert_eq!(old.bytes_in_queue(), 0);
    assert_eq!(new.packets_in_queue(), 3);
    assert_eq!(new.packet_insert_time(2), Some(SimTime(2)));
    let ids: Vec<u64> = (0..3).map(|i| new.peek(i).expect("pkt").pkt.id).collect();
    assert_eq!(ids, vec![0, 1, 2]);
}

#[test]
fn red_never_holds_more_than_max_threshold_packets() {
    let mut q = build_queue(QueueKind::Red, setup(1_000_000), Some(red_config(5, 15, 0.1)))
        .expect("red");
    let mut forced = 0;
    for i in 0..200 {
        match q.insert(pkt(i, 100), None, SimTime(i), 0.0) {
            Ok(_) => {}
            Err(r) if r.reason == DropReason::AboveMaxThreshold => forced += 1,
            Err(r) => assert_eq!(r.reason, DropReason::EarlyDrop),
        }
        assert!(q.packets_in_queue() <= 15);
    }
    assert!(forced > 0);
}

#[test]
fn red_accepts_packet_arriving_at_min_threshold() {
    for seed in 0..20 {
        let s = QueueSetup {
            global_seed: seed,
            ..setup(1_000_000)
        };
        let mut q = build_queue(QueueKind::Red, s, Some(red_config(5, 15, 1.0))).expect("red");
        for i in 0..6 {
            assert!(q.insert(pkt(i, 100), None, SimTime(i), 0.0).is_ok());
        }
    }
}

#[test]
fn identical_setups_make_identical_decisions() {
    let run = |seed: u64| {
        let s = QueueSetup {
            global_seed: seed,
            ..setup(1_000_000)
        };
        let mut q = build_queue(QueueKind::Red, s, Some(red_config(3, 30, 0.5))).expect("red");
        let mut outcome = Vec::new();
        for i in 0..300u64 {
            outcome.push(q.insert(pkt(i, 100), None, SimTime(i), 0.0).is_ok());
            if i % 2 == 0 {
                let _ = q.retrieve(0, QueueOperation::Dequeue, SimTime(i));
            }
        }
        outcome
    };
    assert_eq!(run(9), run(9));
}

#[test]
fn build_queue_rejects_mismatched_or_invalid_config() {
    let err = build_queue(
        QueueKind::Wred,
        setup(10_000),
        Some(red_config(5, 15, 0.1)),
    )
    .expect_err("mismatch");
    assert!(matches!(
        err,
        ConfigError::ConfigMismatch {
            kind: "WRED",
            given: "RED"
        }
    ));

    let err = build_queue(QueueKind::Red, setup(10_000), Some(red_config(15, 5, 0.1)))
        .expect_err("bad order");
    assert!(matches!(err, ConfigError::ThresholdOrder { .. }));

    let err = build_queue(QueueKind::Fifo, setup(0), None).expect_err("zero capacity");
    assert!(matches!(err, ConfigError::InvalidSetup(_)));

    let err = build_queue_by_name("CODEL", setup(10_000), None).expect_err("unknown");
    assert_eq!(
        err.to_string(),
        "Queue Error: Unknown Queue Type Specified: CODEL"
    );
}

#[test]
fn queue_identity_accessors() {
    let s = QueueSetup {
        queue_number: 3,
        interface_index: 2,
        ..setup(4_500)
    };
    let q = build_queue_by_name("RED", s, None).expect("red");
    assert_eq!(q.queue_type(), QueueKind::Red);
    assert_eq!(q.queue_number(), 3);
    assert_eq!(q.interface_index(), 2);
    assert_eq!(q.size_of_queue(), 4_500);
    assert_eq!(q.slot_capacity(), 3);
    assert_eq!(q.average_queue_size(), 0.0);
}

#[test]
#[should_panic(expected = "0 length")]
fn zero_length_packet_is_an_invariant_violation() {
    let mut q = fifo(10_000);
    let _ = q.insert(Packet::bare(0, NodeId(0), 0, 0), None, SimTime::ZERO, 0.0);
}
