//! 标识符类型

/// 节点标识符。与包的序号一起组成包在队列侧表中的键，因此限定为 32 位。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NodeId(pub u32);

/// 节点内的接口序号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct InterfaceId(pub u32);
