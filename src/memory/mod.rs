//! 记忆层：工具调用的耐久审计记录

pub mod recorder;

pub use recorder::{ActionRecord, InMemoryRecorder, MemoryRecorder, NoopRecorder};
