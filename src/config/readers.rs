//! 各队列变体的参数读取
//!
//! 缺省的键取默认值；读到的值逐项校验，任何不合法的值都以 `ConfigError` 返回。

use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use super::params::ParamTable;
use super::phb_file::parse_phb_file;
use super::{
    AqmConfig, AveragingParams, ColorMode, CountingMode, MultiClassParams, PhbEntry, RedEcnParams,
    RedParams, Thresholds, DEFAULT_RED_QUEUE_WEIGHT, DEFAULT_RED_SMALL_PACKET_TRANSMISSION_TIME,
};
use crate::error::ConfigError;
use crate::queue::QueueKind;

/// 读取参数时所在的位置：节点、接口、队列序号
#[derive(Debug, Clone, Default)]
pub struct ReadContext {
    pub node: u32,
    pub interface: u32,
    pub queue: u32,
    /// PHB 文件相对路径的基准目录
    pub base_dir: Option<PathBuf>,
}

impl ReadContext {
    pub fn new(node: u32, interface: u32, queue: u32) -> Self {
        ReadContext {
            node,
            interface,
            queue,
            base_dir: None,
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        match &self.base_dir {
            Some(dir) if p.is_relative() => dir.join(p),
            _ => p.to_path_buf(),
        }
    }
}

fn read_averaging(
    t: &ParamTable,
    ctx: &ReadContext,
    prefix: &str,
) -> Result<AveragingParams, ConfigError> {
    let (i, q) = (ctx.interface, ctx.queue);
    let weight_key = format!("{prefix}RED-QUEUE-WEIGHT");
    let time_key = format!("{prefix}RED-SMALL-PACKET-TRANSMISSION-TIME");
    let queue_weight = t.get_f64(&weight_key, i, q)?.unwrap_or(DEFAULT_RED_QUEUE_WEIGHT);
    let small_packet_tx_time = t
        .get_time(&time_key, i, q)?
        .unwrap_or(DEFAULT_RED_SMALL_PACKET_TRANSMISSION_TIME);
    let averaging = AveragingParams {
        queue_weight,
        small_packet_tx_time,
    };
    averaging.validate()?;
    Ok(averaging)
}

/// `<prefix>MIN-THRESHOLD` / `MAX-THRESHOLD` / `MAX-PROBABILITY`
fn read_thresholds(
    t: &ParamTable,
    ctx: &ReadContext,
    prefix: &str,
    default: Thresholds,
) -> Result<Thresholds, ConfigError> {
    let (i, q) = (ctx.interface, ctx.queue);
    let min_key = format!("{prefix}MIN-THRESHOLD");
    let max_key = format!("{prefix}MAX-THRESHOLD");
    let p_key = format!("{prefix}MAX-PROBABILITY");

    let thresholds = Thresholds {
        min_threshold: t.get_u32(&min_key, i, q)?.unwrap_or(default.min_threshold),
        max_threshold: t.get_u32(&max_key, i, q)?.unwrap_or(default.max_threshold),
        max_probability: t.get_f64(&p_key, i, q)?.unwrap_or(default.max_probability),
    };
    thresholds.validate(prefix.trim_end_matches('-'))?;
    Ok(thresholds)
}

fn read_ecn(t: &ParamTable, ctx: &ReadContext) -> bool {
    t.get_string("ECN", ctx.interface, ctx.queue)
        .is_some_and(|v| v.trim() == "YES")
}

fn read_profiles(
    t: &ParamTable,
    ctx: &ReadContext,
    three_color: bool,
) -> Result<[Thresholds; 3], ConfigError> {
    let defaults = MultiClassParams::default().profiles;
    let green = read_thresholds(t, ctx, "GREEN-PROFILE-", defaults[0])?;
    let yellow = read_thresholds(t, ctx, "YELLOW-PROFILE-", defaults[1])?;
    let red = if three_color {
        read_thresholds(t, ctx, "RED-PROFILE-", defaults[2])?
    } else {
        defaults[2]
    };
    Ok([green, yellow, red])
}

#[instrument(skip(t), fields(node = ctx.node, iface = ctx.interface, queue = ctx.queue))]
pub fn read_red_params(t: &ParamTable, ctx: &ReadContext) -> Result<RedParams, ConfigError> {
    let params = RedParams {
        thresholds: read_thresholds(t, ctx, "RED-", Thresholds::default())?,
        averaging: read_averaging(t, ctx, "")?,
    };
    debug!(?params, "读取 RED 参数");
    Ok(params)
}

#[instrument(skip(t), fields(node = ctx.node, iface = ctx.interface, queue = ctx.queue))]
pub fn read_atm_red_params(t: &ParamTable, ctx: &ReadContext) -> Result<RedParams, ConfigError> {
    let params = RedParams {
        thresholds: read_thresholds(t, ctx, "ATM-RED-", Thresholds::default())?,
        averaging: read_averaging(t, ctx, "ATM-")?,
    };
    debug!(?params, "读取 ATM-RED 参数");
    Ok(params)
}

/// RED-ECN：默认 PHB 来自 `RED-*` 键，`PER-HOP-BEHAVIOR-FILE` 给出其余 DSCP。
#[instrument(skip(t), fields(node = ctx.node, iface = ctx.interface, queue = ctx.queue))]
pub fn read_red_ecn_params(
    t: &ParamTable,
    ctx: &ReadContext,
) -> Result<RedEcnParams, ConfigError> {
    let default = PhbEntry {
        ds: 0,
        thresholds: read_thresholds(t, ctx, "RED-", Thresholds::default())?,
    };
    let mut phbs = vec![default];

    if let Some(file) = t.get_string("PER-HOP-BEHAVIOR-FILE", ctx.interface, ctx.queue) {
        let path = ctx.resolve(file.trim());
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        parse_phb_file(&text, &mut phbs)?;
        for phb in &phbs {
            phb.thresholds.validate(&format!("PHB DSCP {}", phb.ds))?;
        }
        debug!(path = %path.display(), phbs = phbs.len(), "读取 PHB 映射文件");
    }

    Ok(RedEcnParams {
        phbs,
        averaging: read_averaging(t, ctx, "")?,
        ecn: read_ecn(t, ctx),
    })
}

#[instrument(skip(t), fields(node = ctx.node, iface = ctx.interface, queue = ctx.queue))]
pub fn read_wred_params(
    t: &ParamTable,
    ctx: &ReadContext,
) -> Result<MultiClassParams, ConfigError> {
    Ok(MultiClassParams {
        profiles: read_profiles(t, ctx, true)?,
        averaging: read_averaging(t, ctx, "")?,
        ecn: read_ecn(t, ctx),
        ..MultiClassParams::default()
    })
}

/// RIO：`RIO-COLOR-MODE` 与 `RIO-COUNTING-MODE` 必须给出。
#[instrument(skip(t), fields(node = ctx.node, iface = ctx.interface, queue = ctx.queue))]
pub fn read_rio_params(
    t: &ParamTable,
    ctx: &ReadContext,
) -> Result<MultiClassParams, ConfigError> {
    let (i, q) = (ctx.interface, ctx.queue);

    let color_mode = match t.get_string("RIO-COLOR-MODE", i, q).as_deref().map(str::trim) {
        Some("TWO-COLOR") => ColorMode::TwoColor,
        Some("THREE-COLOR") => ColorMode::ThreeColor,
        _ => {
            return Err(ConfigError::MissingParameter {
                node: ctx.node,
                queue: ctx.queue,
                key: "RIO-COLOR-MODE",
                expected: "TWO-COLOR | THREE-COLOR",
            });
        }
    };
    let counting_mode = match t
        .get_string("RIO-COUNTING-MODE", i, q)
        .as_deref()
        .map(str::trim)
    {
        Some("COUPLED") => CountingMode::Coupled,
        Some("DECOUPLED") => CountingMode::Decoupled,
        _ => {
            return Err(ConfigError::MissingParameter {
                node: ctx.node,
                queue: ctx.queue,
                key: "RIO-COUNTING-MODE",
                expected: "COUPLED | DECOUPLED",
            });
        }
    };

    Ok(MultiClassParams {
        profiles: read_profiles(t, ctx, color_mode == ColorMode::ThreeColor)?,
        averaging: read_averaging(t, ctx, "")?,
        ecn: read_ecn(t, ctx),
        color_mode,
        counting_mode,
    })
}

/// 按队列类型分派读取；FIFO 没有参数，返回 `None`。
pub fn read_aqm_config(
    kind: QueueKind,
    t: &ParamTable,
    ctx: &ReadContext,
) -> Result<Option<AqmConfig>, ConfigError> {
    Ok(match kind {
        QueueKind::Fifo => None,
        QueueKind::Red => Some(AqmConfig::Red(read_red_params(t, ctx)?)),
        QueueKind::AtmRed => Some(AqmConfig::AtmRed(read_atm_red_params(t, ctx)?)),
        QueueKind::RedEcn => Some(AqmConfig::RedEcn(read_red_ecn_params(t, ctx)?)),
        QueueKind::Wred => Some(AqmConfig::Wred(read_wred_params(t, ctx)?)),
        QueueKind::Rio => Some(AqmConfig::Rio(read_rio_params(t, ctx)?)),
    })
}
