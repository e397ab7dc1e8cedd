//! 三色分类（drop precedence）
//!
//! DSCP 第 4 位为 0 → GREEN；第 4 位为 1、第 5 位为 0 → YELLOW；两位都为 1 → RED。

use serde::Serialize;

use crate::config::ColorMode;

pub const DSCP_FOURTH_BIT: u8 = 0x04;
pub const DSCP_FIFTH_BIT: u8 = 0x02;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Color {
    Green = 0,
    Yellow = 1,
    Red = 2,
}

impl Color {
    pub const ALL: [Color; 3] = [Color::Green, Color::Yellow, Color::Red];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Color::Green => "GREEN",
            Color::Yellow => "YELLOW",
            Color::Red => "RED",
        }
    }

    /// 三色分类
    pub fn of_dscp(dscp: u8) -> Color {
        if dscp & DSCP_FOURTH_BIT == 0 {
            Color::Green
        } else if dscp & DSCP_FIFTH_BIT == 0 {
            Color::Yellow
        } else {
            Color::Red
        }
    }

    /// 两色模式下只有 green / yellow，red 模式的 DSCP 归入 yellow。
    pub fn classify(dscp: u8, mode: ColorMode) -> Color {
        match (Color::of_dscp(dscp), mode) {
            (Color::Red, ColorMode::TwoColor) => Color::Yellow,
            (c, _) => c,
        }
    }
}
