//! 中继流程。
//!
//! - [`PushRelay`]：broker 消息 → 解码 → 写库 + 仪表盘更新（各自独立、尽力而为）
//! - [`PollRelay`]：定时读取最新一行 → 仪表盘更新
//!
//! 两者都只有 idle → triggered → attempt → idle 一种状态流转：没有重试、熔断或背压，
//! 所有失败只记录日志与计数器。

pub mod poll;
pub mod push;

pub use poll::{OverlapPolicy, PollRelay, PollSettings, TickOutcome};
pub use push::{PinBinding, PushRelay, PushReport, PushSettings};
