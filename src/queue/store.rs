//! 环形包存储
//!
//! 按字节限定容量的 FIFO 环形数组。槽位数从 `max(ceil(容量 / 1500), 2)` 开始，
//! 放满时翻倍（翻倍后把内容整理到从 0 开始），从不收缩。
//! 从中间删除时移动较短的一侧，保持其余包的先后顺序。

use crate::net::Packet;
use crate::sim::SimTime;

use super::stats::QueueStatsSink;
use super::DEFAULT_PKT_BYTES;

/// 存储中的一个包及其附带信息
#[derive(Debug, Clone, PartialEq)]
pub struct PacketSlot {
    pub pkt: Packet,
    /// 调用方随包保存的不透明数据
    pub info: Option<Vec<u8>>,
    pub insert_time: SimTime,
    pub service_tag: f64,
}

#[derive(Debug)]
pub struct PacketStore {
    slots: Vec<Option<PacketSlot>>,
    head: usize,
    len: usize,
    bytes_used: u64,
    capacity_bytes: u64,
}

impl PacketStore {
    pub fn new(capacity_bytes: u64) -> Self {
        let initial = capacity_bytes.div_ceil(DEFAULT_PKT_BYTES).max(2) as usize;
        let mut slots = Vec::with_capacity(initial);
        slots.resize_with(initial, || None);
        PacketStore {
            slots,
            head: 0,
            len: 0,
            bytes_used: 0,
            capacity_bytes,
        }
    }

    fn physical(&self, logical: usize) -> usize {
        (self.head + logical) % self.slots.len()
    }

    /// 是否还放得下 `size` 字节
    pub fn fits(&self, size: u32) -> bool {
        u64::from(size) <= self.free_bytes()
    }

    /// 追加到队尾。放不下时把包原样退回，并以 `on_drop` 汇报。
    ///
    /// 统计回调发生在 `bytes_used` 增加之前。
    pub fn push<S: QueueStatsSink + ?Sized>(
        &mut self,
        pkt: Packet,
        info: Option<Vec<u8>>,
        now: SimTime,
        service_tag: f64,
        stats: Option<&mut S>,
    ) -> Result<(), Packet> {
        assert!(
            pkt.size_bytes > 0,
            "Queue Error: Attempted to queue a packet of 0 length"
        );

        if !self.fits(pkt.size_bytes) {
            if let Some(s) = stats {
                s.on_drop(&pkt, self.bytes_used, now);
            }
            return Err(pkt);
        }

        if self.len == self.slots.len() {
            self.grow();
        }

        if let Some(s) = stats {
            s.on_enqueue(&pkt, self.bytes_used, now);
        }
        self.bytes_used += u64::from(pkt.size_bytes);

        let tail = self.physical(self.len);
        debug_assert!(self.slots[tail].is_none());
        self.slots[tail] = Some(PacketSlot {
            pkt,
            info,
            insert_time: now,
            service_tag,
        });
        self.len += 1;
        Ok(())
    }

    fn grow(&mut self) {
        let old = self.slots.len();
        let mut slots: Vec<Option<PacketSlot>> = Vec::with_capacity(old * 2);
        for i in 0..self.len {
            let p = self.physical(i);
            slots.push(self.slots[p].take());
        }
        slots.resize_with(old * 2, || None);
        self.slots = slots;
        self.head = 0;
    }

    /// 删除逻辑位置 `index`（0 为队头）的包。
    pub fn remove(&mut self, index: usize) -> Option<PacketSlot> {
        if index >= self.len {
            return None;
        }
        let target = self.physical(index);
        let Some(slot) = self.slots[target].take() else {
            panic!("Queue Error: slot {index} of {} is empty", self.len);
        };

        if index < self.len - 1 - index {
            // 前半段整体后移一格
            for i in (0..index).rev() {
                let from = self.physical(i);
                let to = self.physical(i + 1);
                self.slots[to] = self.slots[from].take();
            }
            self.head = (self.head + 1) % self.slots.len();
        } else {
            for i in index + 1..self.len {
                let from = self.physical(i);
                let to = self.physical(i - 1);
                self.slots[to] = self.slots[from].take();
            }
        }
        self.len -= 1;
        self.bytes_used -= u64::from(slot.pkt.size_bytes);
        Some(slot)
    }

    pub fn pop_front(&mut self) -> Option<PacketSlot> {
        self.remove(0)
    }

    pub fn peek(&self, index: usize) -> Option<&PacketSlot> {
        if index >= self.len {
            return None;
        }
        self.slots[self.physical(index)].as_ref()
    }

    pub fn tail_mut(&mut self) -> Option<&mut PacketSlot> {
        let last = self.len.checked_sub(1)?;
        let p = self.physical(last);
        self.slots[p].as_mut()
    }

    /// 从队头开始找第一个满足条件的包的逻辑位置
    pub fn position(&self, mut pred: impl FnMut(&PacketSlot) -> bool) -> Option<usize> {
        (0..self.len).find(|&i| self.peek(i).is_some_and(&mut pred))
    }

    /// 按 FIFO 顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = &PacketSlot> + '_ {
        (0..self.len).filter_map(move |i| self.peek(i))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bytes_used(&self) -> u64 {
        self.bytes_used
    }

    pub fn capacity_bytes(&self) -> u64 {
        self.capacity_bytes
    }

    pub fn free_bytes(&self) -> u64 {
        self.capacity_bytes - self.bytes_used
    }

    /// 当前槽位数
    pub fn slot_capacity(&self) -> usize {
        self.slots.len()
    }
}
