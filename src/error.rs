//! 配置错误
//!
//! 配置阶段发现的问题都是不可恢复的（阈值顺序错误、未知队列类型、PHB 文件格式错误等），
//! 由 setup / 配置读取函数以 `Err` 返回，交给调用方（通常是二进制入口）终止运行。
//! 运行期的丢包不是错误，见 `queue::Rejected`。

use std::path::PathBuf;

use thiserror::Error;

use crate::sim::ParseTimeError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Queue Error: Unknown Queue Type Specified: {0}")]
    UnknownQueueType(String),

    #[error("queue type {kind} cannot be configured with {given} parameters")]
    ConfigMismatch { kind: &'static str, given: &'static str },

    #[error("{name} should be > 0 (got {value})")]
    InvalidThreshold { name: String, value: f64 },

    #[error("{profile} maxThreshold ({max}) should be greater than minThreshold ({min})")]
    ThresholdOrder { profile: String, min: u32, max: u32 },

    #[error("{profile} maxProbability should be > 0.0 and <= 1.0 (got {value})")]
    InvalidProbability { profile: String, value: f64 },

    #[error("RED-QUEUE-WEIGHT should be in (0, 1] (got {0})")]
    InvalidWeight(f64),

    #[error("Node: {node} Queue: {queue}\tSpecify {key} {expected}")]
    MissingParameter {
        node: u32,
        queue: u32,
        key: &'static str,
        expected: &'static str,
    },

    #[error("parameter {key}: cannot parse `{value}`")]
    InvalidValue { key: String, value: String },

    #[error("PHB Mapping File line {line}: {reason}")]
    PhbFile { line: usize, reason: String },

    #[error("invalid queue setup: {0}")]
    InvalidSetup(String),

    #[error(transparent)]
    Time(#[from] ParseTimeError),

    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
