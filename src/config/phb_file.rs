//! PHB 映射文件
//!
//! 每行 `RED <ds> <参数名> <值>`，参数名为 RED-MIN-THRESHOLD / RED-MAX-THRESHOLD /
//! RED-MAX-PROBABILITY。其它标识符开头的行和 `#` 注释被忽略。
//! 第一次出现的 DSCP 以默认 PHB（`phbs[0]`）的值为起点。

use super::PhbEntry;
use crate::error::ConfigError;

const MAX_DSCP: u32 = 63;

/// 把文件内容合并进 `phbs`（`phbs[0]` 必须是默认 PHB）。
pub fn parse_phb_file(text: &str, phbs: &mut Vec<PhbEntry>) -> Result<(), ConfigError> {
    let Some(default) = phbs.first().copied() else {
        return Err(ConfigError::InvalidSetup(
            "PHB table has no default entry".to_string(),
        ));
    };

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.split('#').next().unwrap_or("").trim();
        let mut tokens = line.split_whitespace();
        if tokens.next() != Some("RED") {
            continue;
        }
        let rest: Vec<&str> = tokens.collect();
        let [ds, name, value] = rest.as_slice() else {
            return Err(ConfigError::PhbFile {
                line: line_no,
                reason: "RED entries expect <ds> <parameter> <value>".to_string(),
            });
        };
        let ds: u32 = ds.parse().map_err(|_| ConfigError::PhbFile {
            line: line_no,
            reason: format!("bad DSCP `{ds}`"),
        })?;
        if ds > MAX_DSCP {
            return Err(ConfigError::PhbFile {
                line: line_no,
                reason: format!("DSCP {ds} out of range 0..=63"),
            });
        }
        let value: f64 = value.parse().map_err(|_| ConfigError::PhbFile {
            line: line_no,
            reason: format!("bad value `{value}`"),
        })?;
        if !value.is_finite() || value < 0.0 {
            return Err(ConfigError::PhbFile {
                line: line_no,
                reason: format!("value {value} must be non-negative"),
            });
        }

        let ds = ds as u8;
        // phbs[0] 是默认条目，精确匹配从 1 开始
        let pos = match phbs.iter().skip(1).position(|p| p.ds == ds) {
            Some(i) => i + 1,
            None => {
                phbs.push(PhbEntry {
                    ds,
                    thresholds: default.thresholds,
                });
                phbs.len() - 1
            }
        };
        let t = &mut phbs[pos].thresholds;
        match *name {
            "RED-MIN-THRESHOLD" => t.min_threshold = value as u32,
            "RED-MAX-THRESHOLD" => t.max_threshold = value as u32,
            "RED-MAX-PROBABILITY" => t.max_probability = value,
            other => {
                return Err(ConfigError::PhbFile {
                    line: line_no,
                    reason: format!(
                        "unknown parameter `{other}` (expected RED-MIN-THRESHOLD, \
                         RED-MAX-THRESHOLD or RED-MAX-PROBABILITY)"
                    ),
                });
            }
        }
    }
    Ok(())
}
