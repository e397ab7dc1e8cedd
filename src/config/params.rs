//! 键值参数表
//!
//! 每个条目可以限定接口和/或队列序号。查找时按
//! (接口+队列) → 接口 → 队列 → 全局 的顺序回退；同一层级内后写的条目覆盖先写的。

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::sim::SimTime;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamEntry {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue: Option<u32>,
    pub value: serde_json::Value,
}

impl ParamEntry {
    /// 匹配层级：越大越具体；不匹配返回 None。
    fn specificity(&self, interface: u32, queue: u32) -> Option<u8> {
        let iface_ok = self.interface.is_none_or(|i| i == interface);
        let queue_ok = self.queue.is_none_or(|q| q == queue);
        if !(iface_ok && queue_ok) {
            return None;
        }
        Some(match (self.interface.is_some(), self.queue.is_some()) {
            (true, true) => 3,
            (true, false) => 2,
            (false, true) => 1,
            (false, false) => 0,
        })
    }

    fn value_string(&self) -> String {
        match &self.value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Bool(true) => "YES".to_string(),
            serde_json::Value::Bool(false) => "NO".to_string(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamTable {
    entries: Vec<ParamEntry>,
}

impl ParamTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 追加一个全局条目
    pub fn set(&mut self, key: &str, value: impl Into<serde_json::Value>) -> &mut Self {
        self.set_scoped(key, None, None, value)
    }

    pub fn set_scoped(
        &mut self,
        key: &str,
        interface: Option<u32>,
        queue: Option<u32>,
        value: impl Into<serde_json::Value>,
    ) -> &mut Self {
        self.entries.push(ParamEntry {
            key: key.to_string(),
            interface,
            queue,
            value: value.into(),
        });
        self
    }

    /// 带回退的原始字符串查找
    pub fn lookup(&self, key: &str, interface: u32, queue: u32) -> Option<String> {
        let mut best: Option<(u8, &ParamEntry)> = None;
        for e in self.entries.iter().filter(|e| e.key == key) {
            let Some(rank) = e.specificity(interface, queue) else {
                continue;
            };
            if best.is_none_or(|(r, _)| rank >= r) {
                best = Some((rank, e));
            }
        }
        best.map(|(_, e)| e.value_string())
    }

    fn parse<T: FromStr>(
        &self,
        key: &str,
        interface: u32,
        queue: u32,
    ) -> Result<Option<T>, ConfigError> {
        match self.lookup(key, interface, queue) {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .map(Some)
                .map_err(|_| ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: raw,
                }),
        }
    }

    pub fn get_u32(&self, key: &str, interface: u32, queue: u32) -> Result<Option<u32>, ConfigError> {
        self.parse(key, interface, queue)
    }

    pub fn get_f64(&self, key: &str, interface: u32, queue: u32) -> Result<Option<f64>, ConfigError> {
        self.parse(key, interface, queue)
    }

    pub fn get_time(
        &self,
        key: &str,
        interface: u32,
        queue: u32,
    ) -> Result<Option<SimTime>, ConfigError> {
        match self.lookup(key, interface, queue) {
            None => Ok(None),
            Some(raw) => Ok(Some(raw.parse::<SimTime>()?)),
        }
    }

    pub fn get_string(&self, key: &str, interface: u32, queue: u32) -> Option<String> {
        self.lookup(key, interface, queue)
    }
}
