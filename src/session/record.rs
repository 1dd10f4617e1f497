//! 会话记录：一次运行对外可见的状态
//!
//! 由调用方在推理循环启动前创建，监管器在每次工具调用中持续更新，
//! 终态迁移（completed / cancelled / error）由 Finalizer 执行且仅执行一次。

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 会话状态；进入终态后不可复活
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Completed,
    Cancelled,
    Error,
}

/// 终态（Finalizer 的入参，排除 Active）
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TerminalStatus {
    Completed,
    Cancelled,
    Error,
}

impl TerminalStatus {
    pub fn as_status(self) -> SessionStatus {
        match self {
            TerminalStatus::Completed => SessionStatus::Completed,
            TerminalStatus::Cancelled => SessionStatus::Cancelled,
            TerminalStatus::Error => SessionStatus::Error,
        }
    }
}

/// 消息角色
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// 对话中的一轮；插话消息以其原始时间戳拼入，保证可归因的顺序
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TranscriptTurn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl TranscriptTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self::user_at(content, Utc::now())
    }

    pub fn user_at(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// 会话记录（经协调存储对外可见，serde 可往返）
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    /// 所属对话/工单；同一 context 同时至多一个活跃会话（调用方约定）
    pub context_id: String,
    pub status: SessionStatus,
    /// 正在执行的工具名，空闲时为 None
    pub current_tool: Option<String>,
    /// 已调用过的去重工具名
    pub tools_used: BTreeSet<String>,
    pub messages: Vec<TranscriptTurn>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// 终态为 error 时的原因
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl SessionRecord {
    pub fn new(context_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: format!("run_{}", uuid::Uuid::new_v4()),
            context_id: context_id.into(),
            status: SessionStatus::Active,
            current_tool: None,
            tools_used: BTreeSet::new(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
            error: None,
        }
    }

    /// 追加一轮对话并刷新更新时间
    pub fn push_turn(&mut self, turn: TranscriptTurn) {
        self.messages.push(turn);
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn is_terminal(&self) -> bool {
        self.status != SessionStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_active_and_unique() {
        let a = SessionRecord::new("issue-42");
        let b = SessionRecord::new("issue-42");
        assert_eq!(a.status, SessionStatus::Active);
        assert!(a.session_id.starts_with("run_"));
        assert_ne!(a.session_id, b.session_id);
    }

    #[test]
    fn test_serde_roundtrip_keeps_transcript_order() {
        let mut record = SessionRecord::new("issue-42");
        record.push_turn(TranscriptTurn::user("do the thing"));
        record.push_turn(TranscriptTurn::assistant("on it"));
        record.tools_used.insert("search".to_string());

        let raw = serde_json::to_string(&record).unwrap();
        let parsed: SessionRecord = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.messages.len(), 2);
        assert_eq!(parsed.messages[0].role, Role::User);
        assert!(parsed.tools_used.contains("search"));
    }
}
