//! 丢包随机数
//!
//! 每个队列一条独立的随机流，由 (全局种子, 节点, 接口, 队列序号) 决定，
//! 同样的配置重复运行得到同样的丢包序列。
//!
//! rand 不保证 `StdRng` 的算法在版本之间不变，逐位相同的序列只在
//! 同一个锁定的 rand 版本（`Cargo.lock`）下成立。

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// 随机流的标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamKey {
    pub global_seed: u64,
    pub node_id: u32,
    pub interface_index: u32,
    pub queue_number: u32,
}

#[derive(Debug, Clone)]
pub struct DropRng {
    rng: StdRng,
}

impl DropRng {
    pub fn from_stream(key: StreamKey) -> Self {
        let mut seed = [0u8; 32];
        seed[0..8].copy_from_slice(&key.global_seed.to_le_bytes());
        seed[8..12].copy_from_slice(&key.node_id.to_le_bytes());
        seed[12..16].copy_from_slice(&key.interface_index.to_le_bytes());
        seed[16..20].copy_from_slice(&key.queue_number.to_le_bytes());
        DropRng {
            rng: StdRng::from_seed(seed),
        }
    }

    /// [0, 1) 上的均匀分布
    pub fn uniform01(&mut self) -> f64 {
        self.rng.random_range(0.0..1.0)
    }
}
