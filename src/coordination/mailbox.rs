//! 会话信箱：跨进程取消标志与插话队列
//!
//! 运行中的会话无法被外界直接触达，唯一通道是协调存储：
//! webhook / UI 进程调用 request_cancel 或 push_message（生产端），
//! 监管器在每次工具调用前调用 is_cancel_requested 与 drain_messages（消费端）。
//! 队列为 FIFO，顺序即存储返回顺序；损坏的队列条目记日志后跳过，不中断排空。

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::keys;
use super::store::{CoordinationStore, StoreError};

/// 排队消息：stop 立即终止会话，content 作为新的用户轮次拼入对话
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueuedMessage {
    Stop {
        #[serde(default)]
        content: String,
        timestamp: DateTime<Utc>,
    },
    Content {
        content: String,
        timestamp: DateTime<Utc>,
    },
}

impl QueuedMessage {
    pub fn stop() -> Self {
        QueuedMessage::Stop {
            content: String::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn content(text: impl Into<String>) -> Self {
        QueuedMessage::Content {
            content: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn is_stop(&self) -> bool {
        matches!(self, QueuedMessage::Stop { .. })
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            QueuedMessage::Stop { timestamp, .. } | QueuedMessage::Content { timestamp, .. } => {
                *timestamp
            }
        }
    }
}

/// 向会话队列追加一条消息（生产端，供 webhook 等外部进程使用）
pub async fn push_message(
    store: &dyn CoordinationStore,
    session_id: &str,
    message: &QueuedMessage,
) -> Result<(), StoreError> {
    let raw = serde_json::to_string(message)
        .map_err(|e| StoreError::Operation(format!("serialize queued message: {e}")))?;
    store.list_push(&keys::message_queue(session_id), &raw).await
}

/// 排空会话队列，按入队顺序返回；无法解析的条目跳过并告警
pub async fn drain_messages(
    store: &dyn CoordinationStore,
    session_id: &str,
) -> Result<Vec<QueuedMessage>, StoreError> {
    let key = keys::message_queue(session_id);
    let mut drained = Vec::new();
    while let Some(raw) = store.list_pop(&key).await? {
        match serde_json::from_str::<QueuedMessage>(&raw) {
            Ok(msg) => drained.push(msg),
            Err(e) => {
                tracing::warn!(session_id, error = %e, "Skipping corrupt queued message");
            }
        }
    }
    Ok(drained)
}

/// 设置会话取消标志；ttl 防止孤儿标志永久残留
pub async fn request_cancel(
    store: &dyn CoordinationStore,
    session_id: &str,
    ttl: Option<Duration>,
) -> Result<(), StoreError> {
    store.set(&keys::cancel_flag(session_id), "1", ttl).await
}

/// 检查取消标志是否存在（单次往返）
pub async fn is_cancel_requested(
    store: &dyn CoordinationStore,
    session_id: &str,
) -> Result<bool, StoreError> {
    Ok(store.get(&keys::cancel_flag(session_id)).await?.is_some())
}

/// 清除取消标志（会话完结后由监管侧清理）
pub async fn clear_cancel(
    store: &dyn CoordinationStore,
    session_id: &str,
) -> Result<(), StoreError> {
    store.delete(&keys::cancel_flag(session_id)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordination::InMemoryStore;

    #[tokio::test]
    async fn test_messages_drain_in_order() {
        let store = InMemoryStore::new();
        push_message(&store, "run_1", &QueuedMessage::content("first"))
            .await
            .unwrap();
        push_message(&store, "run_1", &QueuedMessage::content("second"))
            .await
            .unwrap();

        let drained = drain_messages(&store, "run_1").await.unwrap();
        assert_eq!(drained.len(), 2);
        match &drained[0] {
            QueuedMessage::Content { content, .. } => assert_eq!(content, "first"),
            other => panic!("unexpected message: {other:?}"),
        }
        // 队列已空
        assert!(drain_messages(&store, "run_1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_skipped() {
        let store = InMemoryStore::new();
        store
            .list_push(&keys::message_queue("run_1"), "not json")
            .await
            .unwrap();
        push_message(&store, "run_1", &QueuedMessage::stop())
            .await
            .unwrap();

        let drained = drain_messages(&store, "run_1").await.unwrap();
        assert_eq!(drained.len(), 1);
        assert!(drained[0].is_stop());
    }

    #[tokio::test]
    async fn test_cancel_flag_roundtrip() {
        let store = InMemoryStore::new();
        assert!(!is_cancel_requested(&store, "run_1").await.unwrap());
        request_cancel(&store, "run_1", None).await.unwrap();
        assert!(is_cancel_requested(&store, "run_1").await.unwrap());
        // 其他会话不受影响
        assert!(!is_cancel_requested(&store, "run_2").await.unwrap());
        clear_cancel(&store, "run_1").await.unwrap();
        assert!(!is_cancel_requested(&store, "run_1").await.unwrap());
    }

    #[test]
    fn test_wire_format_is_type_tagged() {
        let raw = serde_json::to_string(&QueuedMessage::stop()).unwrap();
        assert!(raw.contains("\"type\":\"stop\""));
        let parsed: QueuedMessage =
            serde_json::from_str("{\"type\":\"content\",\"content\":\"hi\",\"timestamp\":\"2026-08-06T00:00:00Z\"}")
                .unwrap();
        assert!(!parsed.is_stop());
    }
}
