//! 行动记忆：每次工具调用的耐久审计日志
//!
//! 监管器对每次调用（成功或失败）写入一条 ActionRecord，按 context 归档，
//! 供事后审计与后续运行检索。当前实现为 InMemoryRecorder；
//! 生产部署可接数据库或嵌入式检索管线。

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 单次工具调用的完整记录
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionRecord {
    pub tool: String,
    /// 传给工具的原始参数
    pub input: Value,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ActionRecord {
    pub fn success(tool: impl Into<String>, input: Value, output: Value) -> Self {
        Self {
            tool: tool.into(),
            input,
            success: true,
            output: Some(output),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn failure(tool: impl Into<String>, input: Value, error: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            input,
            success: false,
            output: None,
            error: Some(error.into()),
            timestamp: Utc::now(),
        }
    }
}

/// 记忆记录 trait：按 context 追加条目
#[async_trait]
pub trait MemoryRecorder: Send + Sync {
    /// 追加一条记录；kind 当前恒为 "action"
    async fn record(&self, context_id: &str, kind: &str, entry: ActionRecord)
        -> anyhow::Result<()>;
}

/// 空实现：未接入记忆后端时使用
#[derive(Clone, Default)]
pub struct NoopRecorder;

#[async_trait]
impl MemoryRecorder for NoopRecorder {
    async fn record(
        &self,
        _context_id: &str,
        _kind: &str,
        _entry: ActionRecord,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

/// 内存实现：按 context 分组保存，测试与单机运行用
#[derive(Default)]
pub struct InMemoryRecorder {
    entries: RwLock<HashMap<String, Vec<(String, ActionRecord)>>>,
}

impl InMemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 某 context 下的全部条目（kind, record），入库顺序
    pub fn entries_for(&self, context_id: &str) -> Vec<(String, ActionRecord)> {
        self.entries
            .read()
            .unwrap()
            .get(context_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl MemoryRecorder for InMemoryRecorder {
    async fn record(
        &self,
        context_id: &str,
        kind: &str,
        entry: ActionRecord,
    ) -> anyhow::Result<()> {
        self.entries
            .write()
            .unwrap()
            .entry(context_id.to_string())
            .or_default()
            .push((kind.to_string(), entry));
        Ok(())
    }
}
