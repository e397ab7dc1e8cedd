//! 队列配置
//!
//! 各个 AQM 变体的参数在 setup 之后不可变，通过 `Arc<AqmConfig>` 在多个队列之间共享。
//! 参数来源是 `ParamTable`（按接口 / 队列序号回退查找的键值表），
//! RED-ECN 另外从 PHB 映射文件读取每个 DSCP 的阈值。

mod params;
mod phb_file;
mod readers;
mod scenario;

pub use params::{ParamEntry, ParamTable};
pub use phb_file::parse_phb_file;
pub use readers::{
    read_aqm_config, read_atm_red_params, read_red_ecn_params, read_red_params, read_rio_params,
    read_wred_params, ReadContext,
};
pub use scenario::{FlowSpec, ScenarioSpec};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::sim::SimTime;

pub const DEFAULT_RED_MIN_THRESHOLD: u32 = 5;
pub const DEFAULT_RED_MAX_THRESHOLD: u32 = 15;
pub const DEFAULT_RED_MAX_PROBABILITY: f64 = 0.02;
pub const DEFAULT_RED_QUEUE_WEIGHT: f64 = 0.002;
pub const DEFAULT_RED_SMALL_PACKET_TRANSMISSION_TIME: SimTime = SimTime(10_000_000);

pub const DEFAULT_GREEN_PROFILE_MIN_THRESHOLD: u32 = 10;
pub const DEFAULT_GREEN_PROFILE_MAX_THRESHOLD: u32 = 20;
pub const DEFAULT_YELLOW_PROFILE_MIN_THRESHOLD: u32 = 5;
pub const DEFAULT_YELLOW_PROFILE_MAX_THRESHOLD: u32 = 10;
pub const DEFAULT_RED_PROFILE_MIN_THRESHOLD: u32 = 2;
pub const DEFAULT_RED_PROFILE_MAX_THRESHOLD: u32 = 5;

/// 一组 RED 阈值（单位：包）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub min_threshold: u32,
    pub max_threshold: u32,
    pub max_probability: f64,
}

impl Thresholds {
    pub const fn new(min_threshold: u32, max_threshold: u32, max_probability: f64) -> Self {
        Thresholds {
            min_threshold,
            max_threshold,
            max_probability,
        }
    }

    /// 检查 `0 < min < max` 与 `0 < p <= 1`。`profile` 只用于错误信息。
    pub fn validate(&self, profile: &str) -> Result<(), ConfigError> {
        if self.min_threshold == 0 {
            return Err(ConfigError::InvalidThreshold {
                name: format!("{profile} minThreshold"),
                value: 0.0,
            });
        }
        if self.max_threshold == 0 {
            return Err(ConfigError::InvalidThreshold {
                name: format!("{profile} maxThreshold"),
                value: 0.0,
            });
        }
        if self.min_threshold >= self.max_threshold {
            return Err(ConfigError::ThresholdOrder {
                profile: profile.to_string(),
                min: self.min_threshold,
                max: self.max_threshold,
            });
        }
        let p = self.max_probability;
        if !(p > 0.0 && p <= 1.0) {
            return Err(ConfigError::InvalidProbability {
                profile: profile.to_string(),
                value: p,
            });
        }
        Ok(())
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds::new(
            DEFAULT_RED_MIN_THRESHOLD,
            DEFAULT_RED_MAX_THRESHOLD,
            DEFAULT_RED_MAX_PROBABILITY,
        )
    }
}

/// 平均队长估计器的参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AveragingParams {
    pub queue_weight: f64,
    /// 空闲衰减的时间单位：空闲期间每过一个“小包发送时间”，平均值乘一次 `1 - w`
    pub small_packet_tx_time: SimTime,
}

impl AveragingParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let w = self.queue_weight;
        if !(w > 0.0 && w <= 1.0) {
            return Err(ConfigError::InvalidWeight(w));
        }
        if self.small_packet_tx_time == SimTime::ZERO {
            return Err(ConfigError::InvalidThreshold {
                name: "RED-SMALL-PACKET-TRANSMISSION-TIME".to_string(),
                value: 0.0,
            });
        }
        Ok(())
    }
}

impl Default for AveragingParams {
    fn default() -> Self {
        AveragingParams {
            queue_weight: DEFAULT_RED_QUEUE_WEIGHT,
            small_packet_tx_time: DEFAULT_RED_SMALL_PACKET_TRANSMISSION_TIME,
        }
    }
}

/// RED / ATM-RED
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RedParams {
    pub thresholds: Thresholds,
    pub averaging: AveragingParams,
}

/// RED-ECN 的一个 per-hop behavior 条目
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhbEntry {
    pub ds: u8,
    pub thresholds: Thresholds,
}

/// RED-ECN：`phbs[0]` 是默认 PHB，其余按 DSCP 精确匹配。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedEcnParams {
    pub phbs: Vec<PhbEntry>,
    pub averaging: AveragingParams,
    pub ecn: bool,
}

impl Default for RedEcnParams {
    fn default() -> Self {
        RedEcnParams {
            phbs: vec![PhbEntry {
                ds: 0,
                thresholds: Thresholds::default(),
            }],
            averaging: AveragingParams::default(),
            ecn: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorMode {
    TwoColor,
    ThreeColor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CountingMode {
    Coupled,
    Decoupled,
}

/// WRED / RIO：green / yellow / red 三套阈值。
/// WRED 不使用 `color_mode` / `counting_mode`。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MultiClassParams {
    /// 按 `Color as usize` 索引
    pub profiles: [Thresholds; 3],
    pub averaging: AveragingParams,
    pub ecn: bool,
    pub color_mode: ColorMode,
    pub counting_mode: CountingMode,
}

impl Default for MultiClassParams {
    fn default() -> Self {
        MultiClassParams {
            profiles: [
                Thresholds::new(
                    DEFAULT_GREEN_PROFILE_MIN_THRESHOLD,
                    DEFAULT_GREEN_PROFILE_MAX_THRESHOLD,
                    DEFAULT_RED_MAX_PROBABILITY,
                ),
                Thresholds::new(
                    DEFAULT_YELLOW_PROFILE_MIN_THRESHOLD,
                    DEFAULT_YELLOW_PROFILE_MAX_THRESHOLD,
                    DEFAULT_RED_MAX_PROBABILITY,
                ),
                Thresholds::new(
                    DEFAULT_RED_PROFILE_MIN_THRESHOLD,
                    DEFAULT_RED_PROFILE_MAX_THRESHOLD,
                    DEFAULT_RED_MAX_PROBABILITY,
                ),
            ],
            averaging: AveragingParams::default(),
            ecn: false,
            color_mode: ColorMode::ThreeColor,
            counting_mode: CountingMode::Coupled,
        }
    }
}

/// 某个队列变体的完整参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AqmConfig {
    Red(RedParams),
    AtmRed(RedParams),
    RedEcn(RedEcnParams),
    Wred(MultiClassParams),
    Rio(MultiClassParams),
}

impl AqmConfig {
    pub fn variant_name(&self) -> &'static str {
        match self {
            AqmConfig::Red(_) => "RED",
            AqmConfig::AtmRed(_) => "ATM-RED",
            AqmConfig::RedEcn(_) => "RED-ECN",
            AqmConfig::Wred(_) => "WRED",
            AqmConfig::Rio(_) => "RIO",
        }
    }

    /// 全部阈值与权重的合法性检查
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            AqmConfig::Red(p) => {
                p.thresholds.validate("RED")?;
                p.averaging.validate()
            }
            AqmConfig::AtmRed(p) => {
                p.thresholds.validate("ATM-RED")?;
                p.averaging.validate()
            }
            AqmConfig::RedEcn(p) => {
                if p.phbs.is_empty() {
                    return Err(ConfigError::InvalidSetup(
                        "RED-ECN needs at least the default PHB".to_string(),
                    ));
                }
                for phb in &p.phbs {
                    phb.thresholds.validate(&format!("DSCP {}", phb.ds))?;
                }
                p.averaging.validate()
            }
            AqmConfig::Wred(p) | AqmConfig::Rio(p) => {
                for (name, t) in ["GREEN-PROFILE", "YELLOW-PROFILE", "RED-PROFILE"]
                    .iter()
                    .zip(p.profiles.iter())
                {
                    t.validate(name)?;
                }
                p.averaging.validate()
            }
        }
    }
}

/// 队列的通用 setup 参数（与变体无关）
#[derive(Debug, Clone, PartialEq)]
pub struct QueueSetup {
    pub capacity_bytes: u64,
    pub node_id: u32,
    pub interface_index: u32,
    pub queue_number: u32,
    /// 随机丢包流的全局种子
    pub global_seed: u64,
    pub collect_stats: bool,
    /// 包在队列中允许停留的最长时间；`SimTime::INFINITE` 表示关闭老化
    pub max_packet_age: SimTime,
    pub created_at: SimTime,
}

impl Default for QueueSetup {
    fn default() -> Self {
        QueueSetup {
            capacity_bytes: 150_000,
            node_id: 0,
            interface_index: 0,
            queue_number: 0,
            global_seed: 1,
            collect_stats: true,
            max_packet_age: SimTime::INFINITE,
            created_at: SimTime::ZERO,
        }
    }
}

impl QueueSetup {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity_bytes == 0 {
            return Err(ConfigError::InvalidSetup(
                "queue capacity must be > 0 bytes".to_string(),
            ));
        }
        if self.max_packet_age == SimTime::ZERO {
            return Err(ConfigError::InvalidSetup(
                "max packet age must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
