//! 世界 trait

use super::simulator::Simulator;
use std::any::Any;

/// 仿真世界：由上层实现（例如持有接口队列的 `NetWorld`）。
/// 事件通过 `as_any_mut` 向下转型取得具体世界。
pub trait World: Any {
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn on_tick(&mut self, _sim: &mut Simulator) {}
}
