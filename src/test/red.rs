use crate::config::{AveragingParams, ColorMode, Thresholds};
use crate::queue::{
    decide, drop_probability, AverageSizeState, Color, DropRng, RedDecision, StreamKey,
};
use crate::sim::SimTime;

fn rng(seed: u64) -> DropRng {
    DropRng::from_stream(StreamKey {
        global_seed: seed,
        node_id: 0,
        interface_index: 0,
        queue_number: 0,
    })
}

#[test]
fn drop_probability_is_monotone_in_avg_and_count() {
    let t = Thresholds::new(5, 15, 0.1);
    let mut prev = 0.0;
    for step in 0..=200 {
        let avg = 4.0 + f64::from(step) * 0.06;
        let p = drop_probability(avg, &t, 1);
        assert!(p >= prev, "avg {avg}: {p} < {prev}");
        assert!((0.0..=1.0).contains(&p));
        prev = p;
    }
    let mut prev = 0.0;
    for count in 0..50 {
        let p = drop_probability(10.0, &t, count);
        assert!(p >= prev);
        prev = p;
    }
    assert_eq!(drop_probability(4.99, &t, 3), 0.0);
    assert_eq!(drop_probability(15.0, &t, 0), 1.0);
}

#[test]
fn drop_probability_never_exceeds_one_near_saturation() {
    // pb = 0.05：count = 19 时 c·pb 因舍入略小于 1
    let t = Thresholds::new(5, 15, 0.1);
    for count in 15..=25 {
        let p = drop_probability(10.0, &t, count);
        assert!(p <= 1.0, "count {count}: {p}");
    }
    assert_eq!(drop_probability(10.0, &t, 19), 1.0);
    assert_eq!(drop_probability(10.0, &t, 20), 1.0);
}

#[test]
fn decide_at_min_threshold_always_accepts() {
    let t = Thresholds::new(5, 15, 1.0);
    for seed in 0..100 {
        let mut r = rng(seed);
        let mut count = -1;
        assert_eq!(decide(5.0, &t, &mut count, &mut r), RedDecision::Accept);
        assert_eq!(count, 0);
    }
}

#[test]
fn decide_regions_update_packet_count() {
    let t = Thresholds::new(5, 15, 0.02);
    let mut r = rng(1);

    let mut count = 7;
    assert_eq!(decide(2.0, &t, &mut count, &mut r), RedDecision::Accept);
    assert_eq!(count, -1);

    let mut count = 7;
    assert_eq!(decide(15.0, &t, &mut count, &mut r), RedDecision::ForcedDrop);
    assert_eq!(count, 0);

    // pb = 0.5，count 递增到 1 后 pa = 1
    let t = Thresholds::new(1, 3, 1.0);
    let mut count = 0;
    assert_eq!(decide(2.0, &t, &mut count, &mut r), RedDecision::EarlyAct);
    assert_eq!(count, 0);
}

#[test]
fn ewma_smooths_busy_samples() {
    let p = AveragingParams {
        queue_weight: 0.5,
        small_packet_tx_time: SimTime::from_millis(10),
    };
    let mut st = AverageSizeState::new(SimTime::ZERO);
    st.update(false, 4, &p, SimTime(1));
    assert_eq!(st.avg, 2.0);
    st.update(false, 4, &p, SimTime(2));
    assert_eq!(st.avg, 3.0);
}

#[test]
fn ewma_decays_over_idle_period() {
    let p = AveragingParams {
        queue_weight: 0.5,
        small_packet_tx_time: SimTime::from_millis(10),
    };
    let mut st = AverageSizeState::new(SimTime::ZERO);
    st.avg = 10.0;
    st.mark_idle(SimTime::from_millis(5));

    // 空闲刚开始：m = 0，不衰减
    st.update(true, 0, &p, SimTime::from_millis(5));
    assert_eq!(st.avg, 10.0);

    // 两个小包发送时间
    st.update(true, 0, &p, SimTime::from_millis(25));
    assert_eq!(st.avg, 2.5);
}

#[test]
fn ewma_idle_for_one_small_packet_time_decays_by_one_weight_step() {
    let p = AveragingParams {
        queue_weight: 0.002,
        small_packet_tx_time: SimTime::from_millis(10),
    };
    let mut st = AverageSizeState::new(SimTime::ZERO);
    st.avg = 10.0;
    st.mark_idle(SimTime::from_millis(100));
    st.update(true, 0, &p, SimTime::from_millis(110));
    assert_eq!(st.avg, 10.0 * (1.0 - 0.002));
}

#[test]
fn drop_rng_streams_are_reproducible_and_distinct() {
    let mut a = rng(42);
    let mut b = rng(42);
    let xs: Vec<f64> = (0..16).map(|_| a.uniform01()).collect();
    let ys: Vec<f64> = (0..16).map(|_| b.uniform01()).collect();
    assert_eq!(xs, ys);
    assert!(xs.iter().all(|x| (0.0..1.0).contains(x)));

    let mut c = DropRng::from_stream(StreamKey {
        global_seed: 42,
        node_id: 0,
        interface_index: 0,
        queue_number: 1,
    });
    let zs: Vec<f64> = (0..16).map(|_| c.uniform01()).collect();
    assert_ne!(xs, zs);
}

#[test]
fn color_classification_follows_dscp_bits() {
    assert_eq!(Color::of_dscp(0b000000), Color::Green);
    assert_eq!(Color::of_dscp(0b001010), Color::Green);
    assert_eq!(Color::of_dscp(0b001100), Color::Yellow);
    assert_eq!(Color::of_dscp(0b001110), Color::Red);
    assert_eq!(Color::classify(0b001110, ColorMode::TwoColor), Color::Yellow);
    assert_eq!(Color::classify(0b001110, ColorMode::ThreeColor), Color::Red);
}
