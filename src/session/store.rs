//! 会话记录持久化
//!
//! 将 SessionRecord 序列化后写入协调存储：活跃记录带索引集合，
//! 完结记录另键存放并可带 TTL。迁移顺序固定为「先写完结、再删活跃」，
//! 观察者可能短暂同时看到两者，但活跃记录绝不幸存于迁移之后。

use std::sync::Arc;
use std::time::Duration;

use super::record::{SessionRecord, SessionStatus};
use crate::coordination::{keys, CoordinationStore, StoreError};

/// 会话存储：协调存储之上的记录读写与活跃/完结迁移
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn CoordinationStore>,
    /// 完结记录保留时长，None 为永久
    completed_ttl: Option<Duration>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn CoordinationStore>) -> Self {
        Self {
            store,
            completed_ttl: None,
        }
    }

    pub fn with_completed_ttl(mut self, ttl: Duration) -> Self {
        self.completed_ttl = Some(ttl);
        self
    }

    /// 写入新的活跃记录并登记到活跃索引（推理循环启动前由调用方执行）
    pub async fn create_active(&self, record: &SessionRecord) -> Result<(), StoreError> {
        self.save_active(record).await?;
        self.store
            .set_add(&keys::active_index(), &record.session_id)
            .await
    }

    pub async fn load_active(&self, session_id: &str) -> Result<Option<SessionRecord>, StoreError> {
        self.load(&keys::active_session(session_id)).await
    }

    pub async fn save_active(&self, record: &SessionRecord) -> Result<(), StoreError> {
        let raw = serde_json::to_string(record)
            .map_err(|e| StoreError::Operation(format!("serialize session record: {e}")))?;
        self.store
            .set(&keys::active_session(&record.session_id), &raw, None)
            .await
    }

    pub async fn load_completed(
        &self,
        session_id: &str,
    ) -> Result<Option<SessionRecord>, StoreError> {
        self.load(&keys::completed_session(session_id)).await
    }

    /// 当前活跃会话 ID 列表
    pub async fn active_ids(&self) -> Result<Vec<String>, StoreError> {
        self.store.set_members(&keys::active_index()).await
    }

    /// 将记录迁入完结存储并清除活跃侧（记录须已处于终态）
    pub async fn complete(&self, record: &SessionRecord) -> Result<(), StoreError> {
        debug_assert!(record.status != SessionStatus::Active);
        let raw = serde_json::to_string(record)
            .map_err(|e| StoreError::Operation(format!("serialize session record: {e}")))?;
        self.store
            .set(
                &keys::completed_session(&record.session_id),
                &raw,
                self.completed_ttl,
            )
            .await?;
        self.store
            .delete(&keys::active_session(&record.session_id))
            .await?;
        self.store
            .set_remove(&keys::active_index(), &record.session_id)
            .await
    }

    async fn load(&self, key: &str) -> Result<Option<SessionRecord>, StoreError> {
        match self.store.get(key).await? {
            Some(raw) => {
                let record =
                    serde_json::from_str(&raw).map_err(|e| StoreError::Corrupt {
                        key: key.to_string(),
                        reason: e.to_string(),
                    })?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordination::InMemoryStore;

    fn store() -> SessionStore {
        SessionStore::new(Arc::new(InMemoryStore::new()))
    }

    #[tokio::test]
    async fn test_create_load_and_index() {
        let sessions = store();
        let record = SessionRecord::new("issue-1");
        sessions.create_active(&record).await.unwrap();

        let loaded = sessions.load_active(&record.session_id).await.unwrap();
        assert_eq!(loaded.unwrap().context_id, "issue-1");
        assert_eq!(sessions.active_ids().await.unwrap(), vec![record.session_id]);
    }

    #[tokio::test]
    async fn test_complete_moves_record() {
        let sessions = store();
        let mut record = SessionRecord::new("issue-1");
        sessions.create_active(&record).await.unwrap();

        record.status = SessionStatus::Cancelled;
        sessions.complete(&record).await.unwrap();

        assert!(sessions.load_active(&record.session_id).await.unwrap().is_none());
        assert!(sessions.active_ids().await.unwrap().is_empty());
        let completed = sessions.load_completed(&record.session_id).await.unwrap();
        assert_eq!(completed.unwrap().status, SessionStatus::Cancelled);
    }
}
