//! 事件 trait

use super::simulator::Simulator;
use super::world::World;

/// 可被调度执行的事件。`self: Box<Self>` 让事件在执行时交出自身携带的数据
/// （例如老化定时器里的包标识）。
pub trait Event: Send + 'static {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World);
}
