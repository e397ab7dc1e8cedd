//! 数据包类型
//!
//! 队列只需要包的身份（id / 源节点 / 序号）、长度，以及头部里的 TOS 字节。
//! 头部以原始字节保存，前面可以带一个以太网头（可能是 ARP 或 MPLS）。

use etherparse::EtherType;

use super::header::{self, LinkLayer, IPTOS_CE, IPTOS_ECT};
use super::id::NodeId;

/// 网络数据包
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    /// 全局唯一句柄
    pub id: u64,
    pub flow_id: u64,
    /// 产生该包的节点
    pub origin: NodeId,
    /// 源节点内的序号
    pub seq: u32,
    pub size_bytes: u32,
    pub link: LinkLayer,
    pub header: Vec<u8>,
    /// ATM cell 的 EFCI（explicit forward congestion indication）位
    pub efci: bool,
}

impl Packet {
    /// 不带任何头部的包（例如 ATM cell）
    pub fn bare(id: u64, origin: NodeId, seq: u32, size_bytes: u32) -> Self {
        Packet {
            id,
            flow_id: 0,
            origin,
            seq,
            size_bytes,
            link: LinkLayer::None,
            header: Vec::new(),
            efci: false,
        }
    }

    /// 带最小 IPv4 头的包
    pub fn ipv4(id: u64, origin: NodeId, seq: u32, size_bytes: u32, tos: u8) -> Self {
        let total_len = u16::try_from(size_bytes).unwrap_or(u16::MAX);
        Packet {
            header: header::build_ipv4(tos, total_len),
            ..Packet::bare(id, origin, seq, size_bytes)
        }
    }

    /// 带最小 IPv6 头的包
    pub fn ipv6(id: u64, origin: NodeId, seq: u32, size_bytes: u32, traffic_class: u8) -> Self {
        let payload_len = u16::try_from(size_bytes.saturating_sub(40)).unwrap_or(u16::MAX);
        Packet {
            header: header::build_ipv6(traffic_class, payload_len),
            ..Packet::bare(id, origin, seq, size_bytes)
        }
    }

    /// 以太网承载的 ARP 帧（只有链路层头）
    pub fn arp(id: u64, origin: NodeId, seq: u32, size_bytes: u32) -> Self {
        Packet {
            link: LinkLayer::Ethernet,
            header: header::build_ethernet(EtherType::ARP, false),
            ..Packet::bare(id, origin, seq, size_bytes)
        }
    }

    /// 在现有 IP 头前加以太网头；`mpls` 为真时中间再插一个 MPLS shim。
    pub fn with_ethernet(mut self, mpls: bool) -> Self {
        if self.link == LinkLayer::Ethernet {
            return self;
        }
        let ether_type = match self.header.first().map(|b| b >> 4) {
            Some(6) => EtherType::IPV6,
            _ => EtherType::IPV4,
        };
        let mut bytes = header::build_ethernet(ether_type, mpls);
        bytes.extend_from_slice(&self.header);
        self.header = bytes;
        self.link = LinkLayer::Ethernet;
        self
    }

    pub fn with_flow(mut self, flow_id: u64) -> Self {
        self.flow_id = flow_id;
        self
    }

    /// IPv4 TOS 或 IPv6 traffic class；ARP 视为 internet-control (0xC0)，
    /// 没有可识别的 IP 头时为 0。
    pub fn tos(&self) -> u8 {
        header::read_tos(&self.header, self.link)
    }

    /// DSCP（TOS 高 6 位）
    pub fn dscp(&self) -> u8 {
        self.tos() >> 2
    }

    pub fn is_ect(&self) -> bool {
        self.tos() & IPTOS_ECT != 0
    }

    pub fn is_ce(&self) -> bool {
        self.tos() & IPTOS_CE != 0
    }

    /// 在 IP 头上打 CE 标记；找不到 IP 头时返回 false。
    pub fn set_ce(&mut self) -> bool {
        header::set_ce(&mut self.header, self.link)
    }

    pub fn set_efci(&mut self) {
        self.efci = true;
    }
}
