//! 网络模拟模块
//!
//! 包、出接口与驱动队列的事件。

// 子模块声明
mod aging_timer;
mod header;
mod id;
mod inject;
mod interface;
mod net_world;
mod network;
mod packet;
mod stats;
mod transmit_done;

// 重新导出公共接口
pub use aging_timer::QueueAgingTimer;
pub use header::{LinkLayer, IPTOS_CE, IPTOS_ECT, IPTOS_PREC_INTERNETCONTROL};
pub use id::{InterfaceId, NodeId};
pub use inject::InjectPacket;
pub use interface::Interface;
pub use net_world::NetWorld;
pub use network::Network;
pub use packet::Packet;
pub use stats::Stats;
pub use transmit_done::TransmitDone;
