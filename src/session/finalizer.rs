//! 会话完结器
//!
//! 将会话记录一次性迁入终态并通知协作方。取消路径与自然完成路径可能竞争调用，
//! 因此必须幂等：进程内用原子标志短路，跨进程靠「活跃记录已消失且完结记录存在」判定。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::record::{SessionRecord, TerminalStatus};
use super::store::SessionStore;
use crate::coordination::{mailbox, CoordinationStore, StoreError};
use crate::integrations::{ActivityLogger, PlatformSession};

/// 完结器：终态迁移 + 平台会话收尾 + 唯一一条终态叙述
pub struct SessionFinalizer {
    sessions: SessionStore,
    store: Arc<dyn CoordinationStore>,
    activity: Arc<dyn ActivityLogger>,
    platform: Option<Arc<dyn PlatformSession>>,
    finalized: AtomicBool,
}

impl SessionFinalizer {
    pub fn new(
        sessions: SessionStore,
        store: Arc<dyn CoordinationStore>,
        activity: Arc<dyn ActivityLogger>,
    ) -> Self {
        Self {
            sessions,
            store,
            activity,
            platform: None,
            finalized: AtomicBool::new(false),
        }
    }

    /// 设置平台侧会话（如工单系统自己的 agent session），完结时一并标记完成
    pub fn with_platform(mut self, platform: Arc<dyn PlatformSession>) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized.load(Ordering::SeqCst)
    }

    /// 执行终态迁移；重复调用为空操作
    pub async fn finalize(
        &self,
        session_id: &str,
        context_id: &str,
        status: TerminalStatus,
        error: Option<&str>,
    ) -> Result<(), StoreError> {
        if self.finalized.swap(true, Ordering::SeqCst) {
            tracing::debug!(session_id, "Finalize called again, ignoring");
            return Ok(());
        }

        let mut record = match self.sessions.load_active(session_id).await? {
            Some(record) => record,
            None => {
                if self.sessions.load_completed(session_id).await?.is_some() {
                    tracing::debug!(session_id, "Session already finalized elsewhere");
                    return Ok(());
                }
                // 活跃与完结均缺失：合成最小记录，保证终态总是可观察
                tracing::warn!(session_id, "No active record at finalize, synthesizing one");
                let mut record = SessionRecord::new(context_id);
                record.session_id = session_id.to_string();
                record
            }
        };

        record.status = status.as_status();
        record.current_tool = None;
        record.error = error.map(str::to_string);
        record.touch();
        self.sessions.complete(&record).await?;

        if let Err(e) = mailbox::clear_cancel(self.store.as_ref(), session_id).await {
            tracing::warn!(session_id, error = %e, "Failed to clear cancellation flag");
        }

        if let Some(platform) = &self.platform {
            if let Err(e) = platform.complete(context_id).await {
                tracing::warn!(context_id, error = %e, "Platform session completion failed");
            }
        }

        let message = match status {
            TerminalStatus::Completed => "Task completed.".to_string(),
            TerminalStatus::Cancelled => "Session cancelled at user request.".to_string(),
            TerminalStatus::Error => format!(
                "Session ended with an error: {}",
                error.unwrap_or("unknown error")
            ),
        };
        if let Err(e) = self.activity.response(context_id, &message).await {
            tracing::warn!(context_id, error = %e, "Terminal narration failed");
        }

        tracing::info!(session_id, context_id, status = ?status, "Session finalized");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordination::InMemoryStore;
    use crate::integrations::InMemoryActivityLogger;
    use crate::session::record::SessionStatus;

    fn setup() -> (Arc<InMemoryStore>, SessionStore, Arc<InMemoryActivityLogger>) {
        let store = Arc::new(InMemoryStore::new());
        let sessions = SessionStore::new(store.clone() as Arc<dyn CoordinationStore>);
        (store, sessions, Arc::new(InMemoryActivityLogger::new()))
    }

    #[tokio::test]
    async fn test_finalize_moves_record_and_narrates_once() {
        let (store, sessions, activity) = setup();
        let record = SessionRecord::new("issue-1");
        sessions.create_active(&record).await.unwrap();

        let finalizer = SessionFinalizer::new(
            sessions.clone(),
            store as Arc<dyn CoordinationStore>,
            activity.clone(),
        );
        finalizer
            .finalize(&record.session_id, "issue-1", TerminalStatus::Completed, None)
            .await
            .unwrap();

        assert!(sessions.load_active(&record.session_id).await.unwrap().is_none());
        let completed = sessions.load_completed(&record.session_id).await.unwrap().unwrap();
        assert_eq!(completed.status, SessionStatus::Completed);
        assert_eq!(activity.responses().len(), 1);
    }

    #[tokio::test]
    async fn test_finalize_is_idempotent() {
        let (store, sessions, activity) = setup();
        let record = SessionRecord::new("issue-1");
        sessions.create_active(&record).await.unwrap();

        let finalizer = SessionFinalizer::new(
            sessions.clone(),
            store as Arc<dyn CoordinationStore>,
            activity.clone(),
        );
        finalizer
            .finalize(&record.session_id, "issue-1", TerminalStatus::Cancelled, None)
            .await
            .unwrap();
        let first = sessions.load_completed(&record.session_id).await.unwrap().unwrap();

        finalizer
            .finalize(&record.session_id, "issue-1", TerminalStatus::Cancelled, None)
            .await
            .unwrap();
        let second = sessions.load_completed(&record.session_id).await.unwrap().unwrap();

        assert_eq!(first.status, second.status);
        assert_eq!(first.updated_at, second.updated_at);
        assert_eq!(activity.responses().len(), 1);
    }

    #[tokio::test]
    async fn test_finalize_without_active_record_synthesizes() {
        let (store, sessions, activity) = setup();
        let finalizer = SessionFinalizer::new(
            sessions.clone(),
            store as Arc<dyn CoordinationStore>,
            activity,
        );
        finalizer
            .finalize("run_ghost", "issue-9", TerminalStatus::Error, Some("boom"))
            .await
            .unwrap();

        let completed = sessions.load_completed("run_ghost").await.unwrap().unwrap();
        assert_eq!(completed.status, SessionStatus::Error);
        assert_eq!(completed.error.as_deref(), Some("boom"));
    }
}
