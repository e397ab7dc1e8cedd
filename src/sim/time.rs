//! 仿真时间类型
//!
//! 定义仿真时间及其单位转换，以及配置文件中 `10MS` 这类时间字符串的解析。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 仿真时间（纳秒）。序列化为纳秒整数。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SimTime(pub u64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0);
    /// 表示“无穷大”，例如未开启的包老化时间。
    pub const INFINITE: SimTime = SimTime(u64::MAX);

    pub fn from_nanos(ns: u64) -> SimTime {
        SimTime(ns)
    }
    pub fn from_micros(us: u64) -> SimTime {
        SimTime(us.saturating_mul(1_000))
    }
    pub fn from_millis(ms: u64) -> SimTime {
        SimTime(ms.saturating_mul(1_000_000))
    }
    pub fn from_secs(s: u64) -> SimTime {
        SimTime(s.saturating_mul(1_000_000_000))
    }

    pub fn as_nanos(self) -> u64 {
        self.0
    }

    pub fn as_micros_f64(self) -> f64 {
        self.0 as f64 / 1_000.0
    }

    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1_000_000_000.0
    }

    pub fn is_infinite(self) -> bool {
        self == SimTime::INFINITE
    }

    pub fn saturating_add(self, rhs: SimTime) -> SimTime {
        SimTime(self.0.saturating_add(rhs.0))
    }

    pub fn saturating_sub(self, rhs: SimTime) -> SimTime {
        SimTime(self.0.saturating_sub(rhs.0))
    }

    /// `self / unit`，以浮点数返回；`unit` 为零时返回 0。
    pub fn ratio(self, unit: SimTime) -> f64 {
        if unit.0 == 0 {
            return 0.0;
        }
        self.0 as f64 / unit.0 as f64
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_infinite() {
            return f.write_str("inf");
        }
        write!(f, "{:.9}s", self.as_secs_f64())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid time string `{0}` (expected e.g. 10MS, 500US, 2S or plain nanoseconds)")]
pub struct ParseTimeError(pub String);

impl FromStr for SimTime {
    type Err = ParseTimeError;

    /// 解析 `<数字><单位>`，单位不区分大小写：NS/US/MS/S/M/H，无单位视为纳秒。
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        let split = t
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(t.len());
        let (num, unit) = t.split_at(split);
        let value: f64 = num.parse().map_err(|_| ParseTimeError(s.to_string()))?;
        let scale = match unit.to_ascii_uppercase().as_str() {
            "" | "NS" => 1.0,
            "US" => 1e3,
            "MS" => 1e6,
            "S" => 1e9,
            "M" => 60.0 * 1e9,
            "H" => 3600.0 * 1e9,
            _ => return Err(ParseTimeError(s.to_string())),
        };
        let nanos = value * scale;
        if !nanos.is_finite() || nanos < 0.0 {
            return Err(ParseTimeError(s.to_string()));
        }
        Ok(SimTime(nanos.round().min(u64::MAX as f64) as u64))
    }
}
