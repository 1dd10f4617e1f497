//! 核心类型：监管错误分类与取消来源

pub mod error;

pub use error::{CancelReason, SupervisorError};
