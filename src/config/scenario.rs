use std::path::Path;

use serde::{Deserialize, Serialize};

use super::params::ParamTable;
use crate::error::ConfigError;

/// 单瓶颈接口场景：一个出接口、若干队列、若干 CBR 流。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub queue_type: String,
    #[serde(default = "default_capacity_bytes")]
    pub capacity_bytes: u64,
    #[serde(default = "default_bandwidth_bps")]
    pub bandwidth_bps: u64,
    #[serde(default)]
    pub seed: u64,
    /// 调用队列的协议，非 `IP` 时作为报告标签前缀
    #[serde(default = "default_protocol")]
    pub protocol: String,
    /// 包老化时间（ms）；缺省不老化
    #[serde(default)]
    pub max_packet_age_ms: Option<u64>,
    #[serde(default = "default_until_ms")]
    pub until_ms: u64,
    #[serde(default)]
    pub params: ParamTable,
    #[serde(default)]
    pub flows: Vec<FlowSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowSpec {
    pub origin: u32,
    #[serde(default)]
    pub dscp: u8,
    #[serde(default)]
    pub ect: bool,
    #[serde(default = "default_packet_bytes")]
    pub packet_bytes: u32,
    pub rate_bps: u64,
    #[serde(default)]
    pub start_ms: u64,
    #[serde(default)]
    pub stop_ms: Option<u64>,
    /// 接口上的队列序号（0 优先级最高）
    #[serde(default)]
    pub queue: u32,
    #[serde(default)]
    pub ipv6: bool,
    #[serde(default)]
    pub ethernet: bool,
    #[serde(default)]
    pub mpls: bool,
}

fn default_capacity_bytes() -> u64 {
    150_000
}

fn default_bandwidth_bps() -> u64 {
    10_000_000
}

fn default_protocol() -> String {
    "IP".to_string()
}

fn default_until_ms() -> u64 {
    1_000
}

fn default_packet_bytes() -> u32 {
    1_000
}

impl ScenarioSpec {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    /// 接口需要的队列个数
    pub fn num_queues(&self) -> u32 {
        self.flows.iter().map(|f| f.queue + 1).max().unwrap_or(1)
    }
}
