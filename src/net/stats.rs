//! 统计信息
//!
//! 网络层面的计数（队列内部的统计见 `queue::QueueStats`）。

use serde::Serialize;

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub injected_pkts: u64,
    pub delivered_pkts: u64,
    pub delivered_bytes: u64,
    /// 入队被拒（容量或 AQM）
    pub rejected_pkts: u64,
    /// 入队时被打上拥塞标记
    pub marked_pkts: u64,
    /// 超龄移除
    pub aged_pkts: u64,
}
