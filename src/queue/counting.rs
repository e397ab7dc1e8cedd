//! RIO 的分类计数策略
//!
//! 四种组合（耦合/解耦 × 两色/三色）决定每个颜色的平均队长统计哪些包。
//! 每次入队前所有被跟踪的平均值都会刷新，然后返回该颜色对应的那一个。

use std::fmt::Debug;

use crate::config::{AveragingParams, ColorMode, CountingMode};
use crate::sim::SimTime;

use super::color::Color;
use super::ewma::AverageSizeState;

/// 整个队列与各颜色的平均队长、以及各颜色计数器
#[derive(Debug, Clone)]
pub struct ClassAverages {
    pub total: AverageSizeState,
    pub per_class: [AverageSizeState; 3],
    /// 各颜色计数器当前计入的包数（耦合模式下 yellow 计数包含 green）
    pub in_flight: [usize; 3],
}

impl ClassAverages {
    pub fn new(now: SimTime) -> Self {
        ClassAverages {
            total: AverageSizeState::new(now),
            per_class: [AverageSizeState::new(now); 3],
            in_flight: [0; 3],
        }
    }

    fn refresh_class(&mut self, c: Color, ctx: &RefreshContext<'_>) {
        let n = self.in_flight[c.index()];
        self.per_class[c.index()].update(n == 0, n, ctx.params, ctx.now);
    }

    fn refresh_total(&mut self, ctx: &RefreshContext<'_>) {
        self.total
            .update(ctx.queue_empty, ctx.occupancy, ctx.params, ctx.now);
    }

    fn enter(&mut self, c: Color) {
        self.in_flight[c.index()] += 1;
    }

    /// 计数减一；归零时记下该颜色开始空闲的时刻
    fn leave(&mut self, c: Color, now: SimTime) {
        let i = c.index();
        assert!(
            self.in_flight[i] > 0,
            "Queue Error: {} packet counter underflow",
            c.label()
        );
        self.in_flight[i] -= 1;
        if self.in_flight[i] == 0 {
            self.per_class[i].mark_idle(now);
        }
    }
}

/// 刷新平均值时需要的队列状态
#[derive(Debug, Clone, Copy)]
pub struct RefreshContext<'p> {
    pub queue_empty: bool,
    pub occupancy: usize,
    pub params: &'p AveragingParams,
    pub now: SimTime,
}

pub trait ClassCounting: Debug + Send {
    /// 刷新被跟踪的平均值，返回 `color` 应使用的那一个
    fn refresh<'a>(
        &self,
        avgs: &'a mut ClassAverages,
        color: Color,
        ctx: &RefreshContext<'_>,
    ) -> &'a mut AverageSizeState;

    fn on_enqueue(&self, avgs: &mut ClassAverages, color: Color);

    fn on_dequeue(&self, avgs: &mut ClassAverages, color: Color, now: SimTime);

    fn counting_mode(&self) -> CountingMode;
}

/// green 只统计 green；yellow 用整个队列
#[derive(Debug, Clone, Copy, Default)]
pub struct CoupledTwoColor;

impl ClassCounting for CoupledTwoColor {
    fn refresh<'a>(
        &self,
        avgs: &'a mut ClassAverages,
        color: Color,
        ctx: &RefreshContext<'_>,
    ) -> &'a mut AverageSizeState {
        avgs.refresh_total(ctx);
        avgs.refresh_class(Color::Green, ctx);
        match color {
            Color::Green => &mut avgs.per_class[Color::Green.index()],
            _ => &mut avgs.total,
        }
    }

    fn on_enqueue(&self, avgs: &mut ClassAverages, color: Color) {
        if color == Color::Green {
            avgs.enter(Color::Green);
        }
    }

    fn on_dequeue(&self, avgs: &mut ClassAverages, color: Color, now: SimTime) {
        if color == Color::Green {
            avgs.leave(Color::Green, now);
        }
    }

    fn counting_mode(&self) -> CountingMode {
        CountingMode::Coupled
    }
}

/// green 统计 green；yellow 统计 green + yellow；red 用整个队列
#[derive(Debug, Clone, Copy, Default)]
pub struct CoupledThreeColor;

impl ClassCounting for CoupledThreeColor {
    fn refresh<'a>(
        &self,
        avgs: &'a mut ClassAverages,
        color: Color,
        ctx: &RefreshContext<'_>,
    ) -> &'a mut AverageSizeState {
        avgs.refresh_total(ctx);
        avgs.refresh_class(Color::Green, ctx);
        avgs.refresh_class(Color::Yellow, ctx);
        match color {
            Color::Green => &mut avgs.per_class[Color::Green.index()],
            Color::Yellow => &mut avgs.per_class[Color::Yellow.index()],
            Color::Red => &mut avgs.total,
        }
    }

    fn on_enqueue(&self, avgs: &mut ClassAverages, color: Color) {
        match color {
            Color::Green => {
                avgs.enter(Color::Green);
                avgs.enter(Color::Yellow);
            }
            Color::Yellow => avgs.enter(Color::Yellow),
            Color::Red => {}
        }
    }

    fn on_dequeue(&self, avgs: &mut ClassAverages, color: Color, now: SimTime) {
        match color {
            Color::Green => {
                avgs.leave(Color::Green, now);
                avgs.leave(Color::Yellow, now);
            }
            Color::Yellow => avgs.leave(Color::Yellow, now),
            Color::Red => {}
        }
    }

    fn counting_mode(&self) -> CountingMode {
        CountingMode::Coupled
    }
}

/// green、yellow 各自独立
#[derive(Debug, Clone, Copy, Default)]
pub struct DecoupledTwoColor;

impl ClassCounting for DecoupledTwoColor {
    fn refresh<'a>(
        &self,
        avgs: &'a mut ClassAverages,
        color: Color,
        ctx: &RefreshContext<'_>,
    ) -> &'a mut AverageSizeState {
        avgs.refresh_class(Color::Green, ctx);
        avgs.refresh_class(Color::Yellow, ctx);
        match color {
            Color::Green => &mut avgs.per_class[Color::Green.index()],
            _ => &mut avgs.per_class[Color::Yellow.index()],
        }
    }

    fn on_enqueue(&self, avgs: &mut ClassAverages, color: Color) {
        match color {
            Color::Green => avgs.enter(Color::Green),
            _ => avgs.enter(Color::Yellow),
        }
    }

    fn on_dequeue(&self, avgs: &mut ClassAverages, color: Color, now: SimTime) {
        match color {
            Color::Green => avgs.leave(Color::Green, now),
            _ => avgs.leave(Color::Yellow, now),
        }
    }

    fn counting_mode(&self) -> CountingMode {
        CountingMode::Decoupled
    }
}

/// 三个颜色各自独立
#[derive(Debug, Clone, Copy, Default)]
pub struct DecoupledThreeColor;

impl ClassCounting for DecoupledThreeColor {
    fn refresh<'a>(
        &self,
        avgs: &'a mut ClassAverages,
        color: Color,
        ctx: &RefreshContext<'_>,
    ) -> &'a mut AverageSizeState {
        for c in Color::ALL {
            avgs.refresh_class(c, ctx);
        }
        &mut avgs.per_class[color.index()]
    }

    fn on_enqueue(&self, avgs: &mut ClassAverages, color: Color) {
        avgs.enter(color);
    }

    fn on_dequeue(&self, avgs: &mut ClassAverages, color: Color, now: SimTime) {
        avgs.leave(color, now);
    }

    fn counting_mode(&self) -> CountingMode {
        CountingMode::Decoupled
    }
}

/// 按配置选择策略
pub fn counting_strategy(color: ColorMode, counting: CountingMode) -> Box<dyn ClassCounting> {
    match (counting, color) {
        (CountingMode::Coupled, ColorMode::TwoColor) => Box::new(CoupledTwoColor),
        (CountingMode::Coupled, ColorMode::ThreeColor) => Box::new(CoupledThreeColor),
        (CountingMode::Decoupled, ColorMode::TwoColor) => Box::new(DecoupledTwoColor),
        (CountingMode::Decoupled, ColorMode::ThreeColor) => Box::new(DecoupledThreeColor),
    }
}
