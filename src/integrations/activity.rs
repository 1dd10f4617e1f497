//! 过程叙述：面向用户的进度播报
//!
//! thought 为过程性说明（如工单上的 agent 思考评论），response 为面向用户的正式回复。
//! 两者都是尽力而为：失败只写运维日志，绝不影响被监管调用的结果。

use std::sync::{Arc, RwLock};

use async_trait::async_trait;

/// 叙述接口：按 context 投递文本
#[async_trait]
pub trait ActivityLogger: Send + Sync {
    /// 过程性叙述（思考/进度）
    async fn thought(&self, context_id: &str, text: &str) -> anyhow::Result<()>;

    /// 面向用户的回复（终态消息、停止确认）
    async fn response(&self, context_id: &str, text: &str) -> anyhow::Result<()>;
}

/// 空实现：不播报
#[derive(Clone, Default)]
pub struct NoopActivityLogger;

#[async_trait]
impl ActivityLogger for NoopActivityLogger {
    async fn thought(&self, _context_id: &str, _text: &str) -> anyhow::Result<()> {
        Ok(())
    }

    async fn response(&self, _context_id: &str, _text: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

/// 写入 tracing 的实现：无外部平台时的默认选择
#[derive(Clone, Default)]
pub struct TracingActivityLogger;

#[async_trait]
impl ActivityLogger for TracingActivityLogger {
    async fn thought(&self, context_id: &str, text: &str) -> anyhow::Result<()> {
        tracing::info!(context_id, kind = "thought", "{text}");
        Ok(())
    }

    async fn response(&self, context_id: &str, text: &str) -> anyhow::Result<()> {
        tracing::info!(context_id, kind = "response", "{text}");
        Ok(())
    }
}

/// 内存实现：记录全部播报，测试断言用
#[derive(Default)]
pub struct InMemoryActivityLogger {
    thoughts: RwLock<Vec<(String, String)>>,
    responses: RwLock<Vec<(String, String)>>,
}

impl InMemoryActivityLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn thoughts(&self) -> Vec<(String, String)> {
        self.thoughts.read().unwrap().clone()
    }

    pub fn responses(&self) -> Vec<(String, String)> {
        self.responses.read().unwrap().clone()
    }
}

#[async_trait]
impl ActivityLogger for InMemoryActivityLogger {
    async fn thought(&self, context_id: &str, text: &str) -> anyhow::Result<()> {
        self.thoughts
            .write()
            .unwrap()
            .push((context_id.to_string(), text.to_string()));
        Ok(())
    }

    async fn response(&self, context_id: &str, text: &str) -> anyhow::Result<()> {
        self.responses
            .write()
            .unwrap()
            .push((context_id.to_string(), text.to_string()));
        Ok(())
    }
}

/// 便捷构造：Arc 化的默认叙述器
pub fn tracing_logger() -> Arc<dyn ActivityLogger> {
    Arc::new(TracingActivityLogger)
}
