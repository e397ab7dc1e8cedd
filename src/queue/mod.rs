//! 接口队列与主动队列管理（AQM）
//!
//! 所有变体（FIFO / RED / RED-ECN / WRED / RIO / ATM-RED）共用一个 `IfQueue` 引擎，
//! 变体之间只在“入队前的判决”和“分类计数”上不同。
//! 入队被拒返回 `Err(Rejected)`，包原样交还调用方；出队按 `QueueOperation` 区分统计口径。

mod color;
mod counting;
mod ewma;
mod ifq;
mod phb;
mod red;
mod report;
mod rng;
mod stats;
mod store;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::config::{AqmConfig, QueueSetup};
use crate::error::ConfigError;
use crate::net::{NodeId, Packet};
use crate::sim::SimTime;

pub use color::{Color, DSCP_FIFTH_BIT, DSCP_FOURTH_BIT};
pub use counting::{
    counting_strategy, ClassAverages, ClassCounting, CoupledThreeColor, CoupledTwoColor,
    DecoupledThreeColor, DecoupledTwoColor, RefreshContext,
};
pub use ewma::AverageSizeState;
pub use ifq::{IfQueue, QosInfo, QOS_OBSERVATION_INTERVAL, QUEUE_DELAY_WEIGHT};
pub use phb::PhbTable;
pub use red::{decide, drop_probability, RedDecision};
pub use report::{ClassReport, QueueReport};
pub use rng::{DropRng, StreamKey};
pub use stats::{ClassStats, QueueStats, QueueStatsSink, QueueSummary};
pub use store::{PacketSlot, PacketStore};

pub const DEFAULT_PKT_BYTES: u64 = 1500;

/// 队列变体
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum QueueKind {
    Fifo,
    Red,
    RedEcn,
    Wred,
    Rio,
    AtmRed,
}

impl QueueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            QueueKind::Fifo => "FIFO",
            QueueKind::Red => "RED",
            QueueKind::RedEcn => "RED-ECN",
            QueueKind::Wred => "WRED",
            QueueKind::Rio => "RIO",
            QueueKind::AtmRed => "ATM-RED",
        }
    }
}

impl fmt::Display for QueueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueueKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FIFO" => Ok(QueueKind::Fifo),
            "RED" => Ok(QueueKind::Red),
            "RED-ECN" => Ok(QueueKind::RedEcn),
            "WRED" => Ok(QueueKind::Wred),
            "RIO" => Ok(QueueKind::Rio),
            "ATM-RED" => Ok(QueueKind::AtmRed),
            other => Err(ConfigError::UnknownQueueType(other.to_string())),
        }
    }
}

/// 取包方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueOperation {
    /// 正常发送
    Dequeue,
    /// 调度器丢弃，计为普通丢包
    Discard,
    /// 强制移除（例如被抢占）
    Drop,
    /// 超龄移除
    DropAged,
}

/// 队列侧表的键：`源节点 << 32 | 序号`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PacketKey(pub u64);

impl PacketKey {
    pub fn of(pkt: &Packet) -> Self {
        PacketKey((u64::from(pkt.origin.0) << 32) | u64::from(pkt.seq))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DropReason {
    /// 字节容量不足
    Overflow,
    /// 平均队长不低于 max 阈值
    AboveMaxThreshold,
    /// ramp 区间内随机丢弃
    EarlyDrop,
}

/// 入队被拒：包交还调用方
#[derive(Debug, Clone, PartialEq)]
pub struct Rejected {
    pub pkt: Packet,
    pub reason: DropReason,
}

/// 老化定时器需要的包身份
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeTicket {
    pub queue_number: u32,
    pub packet_id: u64,
    pub origin: NodeId,
    pub seq: u32,
    /// 多久之后到期
    pub age: SimTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Enqueued {
    /// 开启包老化时返回，调用方据此调度 `QueueAgingTimer`
    pub aging: Option<AgeTicket>,
    /// 入队时被打了 CE / EFCI 标记
    pub marked: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Retrieved {
    pub pkt: Packet,
    pub info: Option<Vec<u8>>,
    pub insert_time: SimTime,
    /// 取出后新队头的 service tag
    pub next_service_tag: Option<f64>,
}

/// 按类型创建队列。`config` 为 `None` 时使用该类型的默认参数。
#[tracing::instrument(skip(setup, config), fields(node = setup.node_id, iface = setup.interface_index, queue = setup.queue_number))]
pub fn build_queue(
    kind: QueueKind,
    setup: QueueSetup,
    config: Option<Arc<AqmConfig>>,
) -> Result<IfQueue, ConfigError> {
    setup.validate()?;
    if let Some(cfg) = &config {
        let fits = matches!(
            (kind, cfg.as_ref()),
            (QueueKind::Red, AqmConfig::Red(_))
                | (QueueKind::AtmRed, AqmConfig::AtmRed(_))
                | (QueueKind::RedEcn, AqmConfig::RedEcn(_))
                | (QueueKind::Wred, AqmConfig::Wred(_))
                | (QueueKind::Rio, AqmConfig::Rio(_))
        );
        if !fits {
            return Err(ConfigError::ConfigMismatch {
                kind: kind.as_str(),
                given: cfg.variant_name(),
            });
        }
        cfg.validate()?;
    }

    let q = IfQueue::new(kind, setup, config);
    info!(
        queue_type = %kind,
        capacity_bytes = q.size_of_queue(),
        slots = q.slot_capacity(),
        "🧱 创建接口队列"
    );
    Ok(q)
}

/// `build_queue` 的字符串入口
pub fn build_queue_by_name(
    kind: &str,
    setup: QueueSetup,
    config: Option<Arc<AqmConfig>>,
) -> Result<IfQueue, ConfigError> {
    build_queue(kind.parse()?, setup, config)
}
