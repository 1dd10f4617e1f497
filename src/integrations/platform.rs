//! 平台会话：宿主平台自己的会话概念（可选）
//!
//! 如工单系统为 agent 维护的 session 对象；完结时尽力标记完成，
//! 失败只记日志，不阻碍本地完结。

use async_trait::async_trait;

/// 平台侧会话收尾接口
#[async_trait]
pub trait PlatformSession: Send + Sync {
    /// 将 context 对应的平台会话标记为完成
    async fn complete(&self, context_id: &str) -> anyhow::Result<()>;
}

/// 空实现：平台没有会话概念时使用
#[derive(Clone, Default)]
pub struct NoopPlatformSession;

#[async_trait]
impl PlatformSession for NoopPlatformSession {
    async fn complete(&self, _context_id: &str) -> anyhow::Result<()> {
        Ok(())
    }
}
