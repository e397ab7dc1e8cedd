//! 仿真核心模块
//!
//! 离散事件内核：仿真时间、事件、世界与仿真器。队列子系统只通过
//! `Simulator::schedule_after` / `cancel` 使用它（包老化定时器）。

mod event;
mod scheduled_event;
mod simulator;
mod time;
mod world;

pub use event::Event;
pub use scheduled_event::{EventId, ScheduledEvent};
pub use simulator::Simulator;
pub use time::{ParseTimeError, SimTime};
pub use world::World;
