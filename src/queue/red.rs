//! RED 判决
//!
//! 平均队长低于 min 一律接受；不低于 max 一律丢弃；介于两者之间时按
//! `pb = p·(avg-min)/(max-min)`、`pa = pb / (1 - count·pb)` 随机作用。

use crate::config::Thresholds;

use super::rng::DropRng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedDecision {
    Accept,
    /// ramp 区间内随机命中：可以打 ECN/EFCI 标记代替丢弃
    EarlyAct,
    /// 平均队长不低于 max
    ForcedDrop,
}

/// ramp 区间内的作用概率 `pa`；`count` 为已递增后的计数。
pub fn drop_probability(avg: f64, t: &Thresholds, count: i32) -> f64 {
    let min = f64::from(t.min_threshold);
    let max = f64::from(t.max_threshold);
    if avg < min {
        return 0.0;
    }
    if avg >= max {
        return 1.0;
    }
    let pb = t.max_probability * (avg - min) / (max - min);
    let c = f64::from(count);
    if c * pb >= 1.0 {
        1.0
    } else {
        // 舍入误差可能让结果略大于 1
        (pb / (1.0 - c * pb)).min(1.0)
    }
}

pub fn decide(avg: f64, t: &Thresholds, packet_count: &mut i32, rng: &mut DropRng) -> RedDecision {
    if avg >= f64::from(t.max_threshold) {
        *packet_count = 0;
        return RedDecision::ForcedDrop;
    }
    if avg < f64::from(t.min_threshold) {
        *packet_count = -1;
        return RedDecision::Accept;
    }

    *packet_count += 1;
    let pa = drop_probability(avg, t, *packet_count);
    let u = rng.uniform01();
    // avg == min 时 pa 为 0，不能因为抽到 0.0 而作用
    if pa > 0.0 && u <= pa {
        *packet_count = 0;
        RedDecision::EarlyAct
    } else {
        RedDecision::Accept
    }
}
