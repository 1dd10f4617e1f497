//! 工具监管层：执行器包装、分类目录、追踪、阶段机、叙述

pub mod catalog;
pub mod executor;
pub mod narrate;
pub mod strategy;
pub mod tracker;

pub use catalog::{ToolCatalog, ToolCategory};
pub use executor::{wrap, RunContext, StatusSender, SupervisedTool, ToolExecute};
pub use strategy::{ExecutionStrategy, Phase};
pub use tracker::ExecutionTracker;
