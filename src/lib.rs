//! Hive - Rust 智能体执行监管内核
//!
//! 为自治智能体的工具调用提供横切监管：循环熔断、跨进程取消与插话、
//! 会话生命周期与审计落账。推理循环、具体工具实现、HTTP 面皆为外部协作方。
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **coordination**: 共享协调存储抽象、键布局、跨进程信箱（取消标志 + 插话队列）
//! - **core**: 监管错误分类（Cancelled / LoopDetected / ToolFailed / Store）
//! - **integrations**: 过程叙述（ActivityLogger）与平台会话收尾（PlatformSession）
//! - **memory**: 每次工具调用的耐久审计记录（MemoryRecorder）
//! - **observability**: tracing 初始化
//! - **session**: 会话记录、活跃/完结持久化、幂等完结器
//! - **tools**: 监管包装器（wrap）、分类目录、执行追踪、阶段机、叙述启发式

pub mod config;
pub mod coordination;
pub mod core;
pub mod integrations;
pub mod memory;
pub mod observability;
pub mod session;
pub mod tools;

pub use crate::core::{CancelReason, SupervisorError};
pub use crate::tools::{wrap, RunContext, SupervisedTool, ToolExecute};
