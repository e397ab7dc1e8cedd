//! 接口队列引擎
//!
//! 一个 `IfQueue` = 环形包存储 + 平均队长估计 + 变体相关的判决与分类计数。

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::config::{
    AqmConfig, AveragingParams, CountingMode, MultiClassParams, QueueSetup, RedEcnParams, RedParams,
};
use crate::net::{Packet, IPTOS_CE, IPTOS_ECT};
use crate::sim::SimTime;

use super::color::Color;
use super::counting::{counting_strategy, ClassAverages, ClassCounting, RefreshContext};
use super::phb::PhbTable;
use super::red::{self, RedDecision};
use super::rng::{DropRng, StreamKey};
use super::stats::{ClassStats, QueueStats, QueueStatsSink, QueueSummary};
use super::store::{PacketSlot, PacketStore};
use super::{
    AgeTicket, DropReason, Enqueued, PacketKey, QueueKind, QueueOperation, Rejected, Retrieved,
};

/// 排队时延 EWMA 的权重
pub const QUEUE_DELAY_WEIGHT: f64 = 0.5;
/// 超过这段时间没有变化的队列，QoS 时延视为 0
pub const QOS_OBSERVATION_INTERVAL: SimTime = SimTime(1_000_000_000);

#[derive(Debug)]
enum Discipline {
    Fifo,
    Red(RedParams),
    AtmRed(RedParams),
    RedEcn {
        averaging: AveragingParams,
        ecn: bool,
        phbs: PhbTable,
    },
    Wred {
        params: MultiClassParams,
        classes: [ClassStats; 3],
    },
    Rio {
        params: MultiClassParams,
        strategy: Box<dyn ClassCounting>,
        classes: [ClassStats; 3],
    },
}

impl Discipline {
    fn new(kind: QueueKind, config: Option<&AqmConfig>) -> Self {
        match (kind, config) {
            (QueueKind::Fifo, _) => Discipline::Fifo,
            (QueueKind::Red, Some(AqmConfig::Red(p))) => Discipline::Red(*p),
            (QueueKind::Red, _) => Discipline::Red(RedParams::default()),
            (QueueKind::AtmRed, Some(AqmConfig::AtmRed(p))) => Discipline::AtmRed(*p),
            (QueueKind::AtmRed, _) => Discipline::AtmRed(RedParams::default()),
            (QueueKind::RedEcn, cfg) => {
                let p = match cfg {
                    Some(AqmConfig::RedEcn(p)) => p.clone(),
                    _ => RedEcnParams::default(),
                };
                Discipline::RedEcn {
                    averaging: p.averaging,
                    ecn: p.ecn,
                    phbs: PhbTable::new(p.phbs),
                }
            }
            (QueueKind::Wred, cfg) => {
                let params = match cfg {
                    Some(AqmConfig::Wred(p)) => *p,
                    _ => MultiClassParams::default(),
                };
                Discipline::Wred {
                    params,
                    classes: [ClassStats::default(); 3],
                }
            }
            (QueueKind::Rio, cfg) => {
                let params = match cfg {
                    Some(AqmConfig::Rio(p)) => *p,
                    _ => MultiClassParams::default(),
                };
                Discipline::Rio {
                    params,
                    strategy: counting_strategy(params.color_mode, params.counting_mode),
                    classes: [ClassStats::default(); 3],
                }
            }
        }
    }

    /// 是否需要按 DSCP 记录每个包的类别
    fn tracks_classes(&self) -> bool {
        matches!(
            self,
            Discipline::RedEcn { .. } | Discipline::Wred { .. } | Discipline::Rio { .. }
        )
    }

    fn ecn_enabled(&self) -> bool {
        match self {
            Discipline::RedEcn { ecn, .. } => *ecn,
            Discipline::Wred { params, .. } | Discipline::Rio { params, .. } => params.ecn,
            _ => false,
        }
    }

    /// 包类别对应的统计项
    fn class_stats_mut(&mut self, dscp: u8) -> Option<&mut ClassStats> {
        match self {
            Discipline::RedEcn { phbs, .. } => {
                let idx = phbs.select(dscp);
                Some(phbs.stats_mut(idx))
            }
            Discipline::Wred { classes, .. } => Some(&mut classes[Color::of_dscp(dscp).index()]),
            Discipline::Rio {
                params, classes, ..
            } => Some(&mut classes[Color::classify(dscp, params.color_mode).index()]),
            _ => None,
        }
    }
}

/// QoS 监视信息
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QosInfo {
    /// 排队时延的 EWMA（微秒）
    pub queue_delay_us: f64,
    /// 上次清零以来发送的字节数
    pub total_transmission: u64,
}

pub struct IfQueue {
    kind: QueueKind,
    setup: QueueSetup,
    config: Option<Arc<AqmConfig>>,
    store: PacketStore,
    discipline: Discipline,
    averages: ClassAverages,
    rng: DropRng,
    /// 队列中每个包的 DSCP（仅分类变体使用）
    profile: HashMap<PacketKey, u8>,
    stats: Option<Box<dyn QueueStatsSink>>,
    /// 入队时新打上 CE / EFCI 标记的包数
    packets_marked: u64,
    suspended: bool,
    q_delay_us: f64,
    total_transmission: u64,
    last_change: SimTime,
}

impl std::fmt::Debug for IfQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IfQueue")
            .field("kind", &self.kind)
            .field("queue_number", &self.setup.queue_number)
            .field("packets", &self.store.len())
            .field("bytes", &self.store.bytes_used())
            .field("suspended", &self.suspended)
            .finish()
    }
}

impl IfQueue {
    pub(crate) fn new(kind: QueueKind, setup: QueueSetup, config: Option<Arc<AqmConfig>>) -> Self {
        let rng = DropRng::from_stream(StreamKey {
            global_seed: setup.global_seed,
            node_id: setup.node_id,
            interface_index: setup.interface_index,
            queue_number: setup.queue_number,
        });
        let stats: Option<Box<dyn QueueStatsSink>> = if setup.collect_stats {
            Some(Box::new(QueueStats::new(setup.created_at)))
        } else {
            None
        };
        IfQueue {
            kind,
            store: PacketStore::new(setup.capacity_bytes),
            discipline: Discipline::new(kind, config.as_deref()),
            averages: ClassAverages::new(setup.created_at),
            rng,
            profile: HashMap::new(),
            stats,
            packets_marked: 0,
            suspended: false,
            q_delay_us: 0.0,
            total_transmission: 0,
            last_change: setup.created_at,
            config,
            setup,
        }
    }

    /// 换一个统计接收端（例如 `Arc<Mutex<QueueStats>>`，便于队列销毁后读取）
    pub fn with_stats_sink(mut self, sink: Box<dyn QueueStatsSink>) -> Self {
        self.stats = Some(sink);
        self
    }

    pub fn insert(
        &mut self,
        pkt: Packet,
        info: Option<Vec<u8>>,
        now: SimTime,
        service_tag: f64,
    ) -> Result<Enqueued, Rejected> {
        self.insert_with_tos(pkt, info, now, None, service_tag)
    }

    /// 入队。`tos` 给出时用它代替包头里的 TOS，CE 标记也打在它上面。
    pub fn insert_with_tos(
        &mut self,
        mut pkt: Packet,
        info: Option<Vec<u8>>,
        now: SimTime,
        tos: Option<&mut u8>,
        service_tag: f64,
    ) -> Result<Enqueued, Rejected> {
        assert!(
            pkt.size_bytes > 0,
            "Queue Error: Attempted to queue a packet of 0 length"
        );
        let ip_tos = match tos.as_deref() {
            Some(t) => *t,
            None => pkt.tos(),
        };
        let dscp = ip_tos >> 2;

        if !self.store.fits(pkt.size_bytes) {
            debug!(
                pkt_id = pkt.id,
                size = pkt.size_bytes,
                bytes_used = self.store.bytes_used(),
                "🚫 队列容量不足，丢弃"
            );
            return Err(self.reject(pkt, dscp, DropReason::Overflow, now));
        }

        let decision = self.aqm_decide(dscp, now);
        let is_atm = matches!(self.discipline, Discipline::AtmRed(_));
        let was_marked = if is_atm {
            pkt.efci
        } else {
            ip_tos & IPTOS_CE != 0
        };
        let mut marked = false;
        match decision {
            RedDecision::Accept => {}
            RedDecision::EarlyAct if is_atm => {
                pkt.set_efci();
                marked = true;
            }
            RedDecision::EarlyAct if self.discipline.ecn_enabled() && ip_tos & IPTOS_ECT != 0 => {
                marked = match tos {
                    Some(t) => {
                        *t |= IPTOS_CE;
                        true
                    }
                    None => pkt.set_ce(),
                };
                if !marked {
                    return Err(self.reject(pkt, dscp, DropReason::EarlyDrop, now));
                }
            }
            RedDecision::EarlyAct => {
                return Err(self.reject(pkt, dscp, DropReason::EarlyDrop, now));
            }
            RedDecision::ForcedDrop => {
                return Err(self.reject(pkt, dscp, DropReason::AboveMaxThreshold, now));
            }
        }
        if marked {
            debug!(pkt_id = pkt.id, dscp, avg = self.averages.total.avg, "🏷️ 拥塞标记");
        }

        let key = PacketKey::of(&pkt);
        let tracks_classes = self.discipline.tracks_classes();
        // 同一 (源节点, 序号) 的两个包同时在队列中会让侧表串号
        assert!(
            !tracks_classes || !self.profile.contains_key(&key),
            "Queue Error: packet {key:?} (id {}) is already queued",
            pkt.id
        );
        let (pkt_id, origin, seq, size) = (pkt.id, pkt.origin, pkt.seq, pkt.size_bytes);
        if let Err(pkt) = self
            .store
            .push(pkt, info, now, service_tag, self.stats.as_deref_mut())
        {
            return Err(Rejected {
                pkt,
                reason: DropReason::Overflow,
            });
        }
        self.last_change = now;

        let newly_marked = marked && !was_marked;
        if newly_marked {
            self.packets_marked += 1;
        }
        if tracks_classes {
            self.profile.insert(key, dscp);
            self.class_enqueue(dscp, size, newly_marked);
        }

        trace!(
            pkt_id,
            dscp,
            bytes_used = self.store.bytes_used(),
            packets = self.store.len(),
            "📥 入队"
        );

        let aging = (!self.setup.max_packet_age.is_infinite()).then_some(AgeTicket {
            queue_number: self.setup.queue_number,
            packet_id: pkt_id,
            origin,
            seq,
            age: self.setup.max_packet_age,
        });
        Ok(Enqueued { aging, marked })
    }

    /// 更新平均队长并给出判决
    fn aqm_decide(&mut self, dscp: u8, now: SimTime) -> RedDecision {
        let queue_empty = self.is_empty();
        let occupancy = self.store.len();
        let IfQueue {
            discipline,
            averages,
            rng,
            ..
        } = self;

        match discipline {
            Discipline::Fifo => RedDecision::Accept,
            Discipline::Red(p) | Discipline::AtmRed(p) => {
                let st = &mut averages.total;
                st.update(queue_empty, occupancy, &p.averaging, now);
                red::decide(st.avg, &p.thresholds, &mut st.packet_count, rng)
            }
            Discipline::RedEcn {
                averaging, phbs, ..
            } => {
                let st = &mut averages.total;
                st.update(queue_empty, occupancy, averaging, now);
                let t = phbs.thresholds(phbs.select(dscp));
                red::decide(st.avg, t, &mut st.packet_count, rng)
            }
            Discipline::Wred { params, .. } => {
                // 所有颜色共用一个平均值，阈值按颜色选
                let st = &mut averages.total;
                st.update(queue_empty, occupancy, &params.averaging, now);
                let t = &params.profiles[Color::of_dscp(dscp).index()];
                red::decide(st.avg, t, &mut st.packet_count, rng)
            }
            Discipline::Rio {
                params, strategy, ..
            } => {
                let color = Color::classify(dscp, params.color_mode);
                let ctx = RefreshContext {
                    queue_empty,
                    occupancy,
                    params: &params.averaging,
                    now,
                };
                let st = strategy.refresh(averages, color, &ctx);
                trace!(color = color.label(), avg = st.avg, "RIO 平均队长");
                red::decide(
                    st.avg,
                    &params.profiles[color.index()],
                    &mut st.packet_count,
                    rng,
                )
            }
        }
    }

    fn reject(&mut self, pkt: Packet, dscp: u8, reason: DropReason, now: SimTime) -> Rejected {
        if let Some(cs) = self.discipline.class_stats_mut(dscp) {
            cs.dropped(pkt.size_bytes);
        }
        if let Some(s) = self.stats.as_deref_mut() {
            s.on_drop(&pkt, self.store.bytes_used(), now);
        }
        debug!(
            pkt_id = pkt.id,
            dscp,
            ?reason,
            avg = self.averages.total.avg,
            "🗑️ 入队被拒"
        );
        Rejected { pkt, reason }
    }

    fn class_enqueue(&mut self, dscp: u8, size: u32, newly_marked: bool) {
        if let Discipline::Rio {
            params, strategy, ..
        } = &self.discipline
        {
            strategy.on_enqueue(&mut self.averages, Color::classify(dscp, params.color_mode));
        }
        if let Some(cs) = self.discipline.class_stats_mut(dscp) {
            cs.queued(size);
            if newly_marked {
                cs.packets_ecn_marked += 1;
            }
        }
    }

    fn class_dequeue(&mut self, dscp: u8, size: u32, op: QueueOperation, now: SimTime) {
        if let Discipline::Rio {
            params, strategy, ..
        } = &self.discipline
        {
            strategy.on_dequeue(
                &mut self.averages,
                Color::classify(dscp, params.color_mode),
                now,
            );
        }
        if let Some(cs) = self.discipline.class_stats_mut(dscp) {
            match op {
                QueueOperation::Dequeue => cs.dequeued(size),
                QueueOperation::Discard => cs.dropped(size),
                QueueOperation::Drop | QueueOperation::DropAged => {
                    cs.packets_dropped_forcefully += 1;
                }
            }
        }
    }

    /// 取出逻辑位置 `index` 的包。队列为空、越界或被挂起时返回 `None`。
    pub fn retrieve(&mut self, index: usize, op: QueueOperation, now: SimTime) -> Option<Retrieved> {
        if self.suspended || index >= self.store.len() {
            return None;
        }
        let bytes_before = self.store.bytes_used();
        let slot = self.store.remove(index)?;
        self.last_change = now;
        let size = slot.pkt.size_bytes;

        if let Some(s) = self.stats.as_deref_mut() {
            match op {
                QueueOperation::Dequeue => s.on_dequeue(&slot.pkt, bytes_before, now),
                QueueOperation::Discard => s.on_drop(&slot.pkt, bytes_before, now),
                QueueOperation::Drop => s.on_drop_forcefully(&slot.pkt, bytes_before, now, false),
                QueueOperation::DropAged => {
                    s.on_drop_forcefully(&slot.pkt, bytes_before, now, true)
                }
            }
        }
        if op != QueueOperation::Discard {
            self.record_delay(now.saturating_sub(slot.insert_time));
        }
        if op == QueueOperation::Dequeue {
            self.total_transmission += u64::from(size);
        }

        if self.store.is_empty() {
            self.averages.total.mark_idle(now);
        }
        if self.discipline.tracks_classes() {
            let key = PacketKey::of(&slot.pkt);
            let Some(dscp) = self.profile.remove(&key) else {
                panic!("Queue Error: packet {key:?} has no class entry");
            };
            self.class_dequeue(dscp, size, op, now);
        }

        trace!(
            pkt_id = slot.pkt.id,
            ?op,
            bytes_used = self.store.bytes_used(),
            "📤 出队"
        );

        let PacketSlot {
            pkt,
            info,
            insert_time,
            ..
        } = slot;
        Some(Retrieved {
            pkt,
            info,
            insert_time,
            next_service_tag: self.store.peek(0).map(|s| s.service_tag),
        })
    }

    /// 查看逻辑位置 `index` 的包，不改变队列
    pub fn peek(&self, index: usize) -> Option<&PacketSlot> {
        if self.suspended {
            return None;
        }
        self.store.peek(index)
    }

    fn record_delay(&mut self, delay: SimTime) {
        if let Some(s) = self.stats.as_deref_mut() {
            s.on_delay_sample(delay);
        }
        self.q_delay_us =
            QUEUE_DELAY_WEIGHT * delay.as_micros_f64() + (1.0 - QUEUE_DELAY_WEIGHT) * self.q_delay_us;
    }

    /// 把 `old` 中的包按 FIFO 顺序搬进本队列（经过本队列的判决），返回额外丢弃的包数。
    /// 之后 `old` 为空。
    #[tracing::instrument(skip_all)]
    pub fn replicate(&mut self, old: &mut IfQueue) -> usize {
        let mut extra_drops = 0;
        while let Some(slot) = old.store.pop_front() {
            let PacketSlot {
                pkt,
                info,
                insert_time,
                service_tag,
            } = slot;
            if self.insert(pkt, info, insert_time, service_tag).is_err() {
                extra_drops += 1;
            }
        }
        old.profile.clear();
        old.averages = ClassAverages::new(old.last_change);

        // 旧队列的统计整体记到默认类别上
        if let Some(summary) = self.stats.as_ref().map(|s| s.summary()) {
            let copy = ClassStats {
                packets_queued: summary.packets_enqueued,
                bytes_queued: summary.bytes_enqueued,
                packets_dequeued: summary.packets_dequeued,
                bytes_dequeued: summary.bytes_dequeued,
                packets_dropped: summary.packets_dropped,
                bytes_dropped: summary.bytes_dropped,
                ..ClassStats::default()
            };
            match &mut self.discipline {
                Discipline::RedEcn { phbs, .. } => *phbs.stats_mut(0) = copy,
                Discipline::Rio { classes, .. } => classes[Color::Green.index()] = copy,
                _ => {}
            }
        }

        debug!(
            from = %old.kind,
            to = %self.kind,
            extra_drops,
            packets = self.store.len(),
            "🔁 队列迁移完成"
        );
        extra_drops
    }

    /// 老化定时器到期：从队头找身份完全匹配的包，找到则以 DropAged 移除
    #[tracing::instrument(skip(self, ticket), fields(pkt_id = ticket.packet_id))]
    pub fn expire_aged(&mut self, ticket: &AgeTicket, now: SimTime) -> Option<Packet> {
        let idx = self.store.position(|s| {
            s.pkt.seq == ticket.seq && s.pkt.origin == ticket.origin && s.pkt.id == ticket.packet_id
        })?;
        let r = self.retrieve(idx, QueueOperation::DropAged, now)?;
        debug!(pkt_id = r.pkt.id, idx, "⏰ 包超龄，移除");
        Some(r.pkt)
    }

    /// 读取 QoS 信息；队列在观察间隔内没有变化时把时延清零
    pub fn qos_information_update(&mut self, now: SimTime, reset_total_transmission: bool) -> QosInfo {
        let info = QosInfo {
            queue_delay_us: self.q_delay_us,
            total_transmission: self.total_transmission,
        };
        if now.saturating_sub(self.last_change) > QOS_OBSERVATION_INTERVAL {
            self.q_delay_us = 0.0;
        }
        if reset_total_transmission {
            self.total_transmission = 0;
        }
        info
    }

    /// 挂起的队列对外表现为空，也不允许取包
    pub fn set_suspended(&mut self, suspended: bool) {
        self.suspended = suspended;
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// 修改队尾包的 service tag
    pub fn set_service_tag(&mut self, tag: f64) -> bool {
        match self.store.tail_mut() {
            Some(slot) => {
                slot.service_tag = tag;
                true
            }
            None => false,
        }
    }

    pub fn packet_insert_time(&self, index: usize) -> Option<SimTime> {
        self.store.peek(index).map(|s| s.insert_time)
    }

    pub fn is_empty(&self) -> bool {
        self.suspended || self.store.is_empty()
    }

    pub fn bytes_in_queue(&self) -> u64 {
        self.store.bytes_used()
    }

    pub fn packets_in_queue(&self) -> usize {
        self.store.len()
    }

    pub fn free_space(&self) -> u64 {
        self.store.free_bytes()
    }

    /// 容量（字节）
    pub fn size_of_queue(&self) -> u64 {
        self.store.capacity_bytes()
    }

    pub fn slot_capacity(&self) -> usize {
        self.store.slot_capacity()
    }

    pub fn queue_number(&self) -> u32 {
        self.setup.queue_number
    }

    pub fn interface_index(&self) -> u32 {
        self.setup.interface_index
    }

    pub fn queue_type(&self) -> QueueKind {
        self.kind
    }

    pub fn config(&self) -> Option<&Arc<AqmConfig>> {
        self.config.as_ref()
    }

    /// 整个队列的平均队长
    pub fn average_queue_size(&self) -> f64 {
        self.averages.total.avg
    }

    pub fn class_averages(&self) -> &ClassAverages {
        &self.averages
    }

    pub fn packets_marked(&self) -> u64 {
        self.packets_marked
    }

    /// 侧表中的条目数（等于分类变体的驻留包数）
    pub fn class_entries(&self) -> usize {
        self.profile.len()
    }

    /// WRED / RIO 的颜色统计
    pub fn color_stats(&self, color: Color) -> Option<&ClassStats> {
        match &self.discipline {
            Discipline::Wred { classes, .. } | Discipline::Rio { classes, .. } => {
                Some(&classes[color.index()])
            }
            _ => None,
        }
    }

    /// RED-ECN 的 PHB 表
    pub fn phb_table(&self) -> Option<&PhbTable> {
        match &self.discipline {
            Discipline::RedEcn { phbs, .. } => Some(phbs),
            _ => None,
        }
    }

    pub fn stats_summary(&self) -> Option<QueueSummary> {
        self.stats.as_ref().map(|s| s.summary())
    }

    pub(crate) fn stats_sink_mut(&mut self) -> Option<&mut (dyn QueueStatsSink + 'static)> {
        self.stats.as_deref_mut()
    }

    /// RIO 的计数方式
    pub fn counting_mode(&self) -> Option<CountingMode> {
        match &self.discipline {
            Discipline::Rio { strategy, .. } => Some(strategy.counting_mode()),
            _ => None,
        }
    }
}

impl Drop for IfQueue {
    /// 销毁时队列里剩下的包按强制丢弃计入统计
    fn drop(&mut self) {
        let now = self.last_change;
        loop {
            let bytes_before = self.store.bytes_used();
            let Some(slot) = self.store.pop_front() else {
                break;
            };
            if let Some(s) = self.stats.as_deref_mut() {
                s.on_drop_forcefully(&slot.pkt, bytes_before, now, false);
            }
        }
    }
}
