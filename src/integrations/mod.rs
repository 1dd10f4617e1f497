//! 外部协作方：过程叙述与平台会话
//!
//! 本层全部是尽力而为的出站调用；任何失败都被监管器吞掉并写日志，
//! 被监管运行的正确性不依赖可观测性成功。

pub mod activity;
pub mod platform;

pub use activity::{
    tracing_logger, ActivityLogger, InMemoryActivityLogger, NoopActivityLogger,
    TracingActivityLogger,
};
pub use platform::{NoopPlatformSession, PlatformSession};
