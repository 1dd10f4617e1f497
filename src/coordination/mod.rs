//! 协调层：共享存储抽象、键布局、跨进程信箱
//!
//! 运行中的监管器与外部进程（webhook、停止命令 UI）之间没有共享内存，
//! 全部通信经由 CoordinationStore 的原子操作完成。

pub mod keys;
pub mod mailbox;
pub mod memory;
pub mod store;

pub use mailbox::QueuedMessage;
pub use memory::InMemoryStore;
pub use store::{CoordinationStore, StoreError};
