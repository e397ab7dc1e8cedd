//! IP 头中与 AQM 相关的字段
//!
//! 只关心 TOS / traffic class 一个字节：高 6 位是 DSCP，低 2 位是 ECN。
//! 头部前面可能有以太网头（其后可能是 ARP 或一个 MPLS shim）。

use etherparse::{
    EtherType, Ethernet2Header, Ethernet2HeaderSlice, IpDscp, IpEcn, IpNumber, Ipv4Header,
    Ipv4HeaderSlice, Ipv6FlowLabel, Ipv6Header, Ipv6HeaderSlice,
};

/// ECN-capable transport 位
pub const IPTOS_ECT: u8 = 0x02;
/// congestion experienced 位
pub const IPTOS_CE: u8 = 0x01;
/// ARP 等控制报文的默认 TOS
pub const IPTOS_PREC_INTERNETCONTROL: u8 = 0xc0;

/// etherparse 没有 MPLS 的常量
pub(crate) const ETHERTYPE_MPLS_UNICAST: EtherType = EtherType(0x8847);
const MPLS_SHIM_LEN: usize = 4;

const SRC_MAC: [u8; 6] = [0x02, 0, 0, 0, 0, 0x01];
const DST_MAC: [u8; 6] = [0x02, 0, 0, 0, 0, 0x02];

/// 包头前缀的链路层类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkLayer {
    /// `header` 直接以 IP 头开始
    #[default]
    None,
    /// `header` 以以太网 II 头开始
    Ethernet,
}

/// IP 头在字节缓冲中的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IpLocation {
    V4(usize),
    V6(usize),
    Arp,
    Unknown,
}

pub(crate) fn locate_ip(bytes: &[u8], link: LinkLayer) -> IpLocation {
    let mut offset = 0;
    if link == LinkLayer::Ethernet {
        let Ok(eth) = Ethernet2HeaderSlice::from_slice(bytes) else {
            return IpLocation::Unknown;
        };
        let ether_type = eth.ether_type();
        if ether_type == EtherType::ARP {
            return IpLocation::Arp;
        }
        offset = eth.slice().len();
        if ether_type == ETHERTYPE_MPLS_UNICAST {
            offset += MPLS_SHIM_LEN;
        }
    }

    let Some(ip) = bytes.get(offset..) else {
        return IpLocation::Unknown;
    };
    if Ipv4HeaderSlice::from_slice(ip).is_ok() {
        IpLocation::V4(offset)
    } else if Ipv6HeaderSlice::from_slice(ip).is_ok() {
        IpLocation::V6(offset)
    } else {
        IpLocation::Unknown
    }
}

/// 读取 TOS（IPv4）或 traffic class（IPv6）。ARP 返回 internet-control，
/// 无法识别的头返回 0。
pub(crate) fn read_tos(bytes: &[u8], link: LinkLayer) -> u8 {
    match locate_ip(bytes, link) {
        IpLocation::V4(off) => match Ipv4HeaderSlice::from_slice(&bytes[off..]) {
            Ok(h) => (h.dcp().value() << 2) | h.ecn().value(),
            Err(_) => 0,
        },
        IpLocation::V6(off) => match Ipv6HeaderSlice::from_slice(&bytes[off..]) {
            Ok(h) => h.traffic_class(),
            Err(_) => 0,
        },
        IpLocation::Arp => IPTOS_PREC_INTERNETCONTROL,
        IpLocation::Unknown => 0,
    }
}

/// 原地置 CE 位。IPv4 同时重算头校验和。返回是否找到了可写的 IP 头。
pub(crate) fn set_ce(bytes: &mut [u8], link: LinkLayer) -> bool {
    match locate_ip(bytes, link) {
        IpLocation::V4(off) => {
            let Ok((mut h, _)) = Ipv4Header::from_slice(&bytes[off..]) else {
                return false;
            };
            h.ecn = IpEcn::CongestionExperienced;
            h.header_checksum = h.calc_header_checksum();
            let out = h.to_bytes();
            bytes[off..off + out.len()].copy_from_slice(&out);
            true
        }
        IpLocation::V6(off) => {
            let Ok((mut h, _)) = Ipv6Header::from_slice(&bytes[off..]) else {
                return false;
            };
            h.traffic_class |= IPTOS_CE;
            bytes[off..off + Ipv6Header::LEN].copy_from_slice(&h.to_bytes());
            true
        }
        IpLocation::Arp | IpLocation::Unknown => false,
    }
}

/// 构造一个最小 IPv4 头（20 字节，UDP，校验和有效）。
pub(crate) fn build_ipv4(tos: u8, total_len: u16) -> Vec<u8> {
    let payload_len = total_len.saturating_sub(Ipv4Header::MIN_LEN_U16);
    let mut h = Ipv4Header::new(payload_len, 64, IpNumber::UDP, [10, 0, 0, 1], [10, 0, 0, 2])
        .unwrap_or_default();
    h.dscp = IpDscp::try_new(tos >> 2).unwrap_or_default();
    h.ecn = IpEcn::try_new(tos & IpEcn::MAX_U8).unwrap_or_default();
    h.header_checksum = h.calc_header_checksum();
    h.to_bytes().to_vec()
}

/// 构造一个最小 IPv6 头（40 字节，UDP，链路本地地址）。
pub(crate) fn build_ipv6(traffic_class: u8, payload_len: u16) -> Vec<u8> {
    let mut source = [0u8; 16];
    source[..2].copy_from_slice(&[0xfe, 0x80]);
    let mut destination = source;
    source[15] = 1;
    destination[15] = 2;
    Ipv6Header {
        traffic_class,
        flow_label: Ipv6FlowLabel::ZERO,
        payload_length: payload_len,
        next_header: IpNumber::UDP,
        hop_limit: 64,
        source,
        destination,
    }
    .to_bytes()
    .to_vec()
}

/// 以太网 II 头；`mpls` 为真时追加一个 MPLS shim（bottom-of-stack）。
pub(crate) fn build_ethernet(ether_type: EtherType, mpls: bool) -> Vec<u8> {
    let eth = Ethernet2Header {
        source: SRC_MAC,
        destination: DST_MAC,
        ether_type: if mpls { ETHERTYPE_MPLS_UNICAST } else { ether_type },
    };
    let mut h = eth.to_bytes().to_vec();
    if mpls {
        // label 16, bottom of stack, ttl 64
        h.extend_from_slice(&[0x00, 0x01, 0x01, 0x40]);
    }
    h
}
