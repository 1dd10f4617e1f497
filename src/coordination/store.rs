//! 协调存储抽象层
//!
//! 定义与其他进程通信的唯一信道：键值、集合、队列三类原子操作，
//! 可选 per-key 过期；实现可为内存（测试）或 Redis 等真实存储。
//! 所有访问都是单次原子操作，不假设存储侧解决读-改-写竞争。

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// 协调存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    /// 后端操作失败（连接、超时等）
    #[error("Store operation failed: {0}")]
    Operation(String),

    /// 键下的记录无法反序列化
    #[error("Corrupt record at key '{key}': {reason}")]
    Corrupt { key: String, reason: String },
}

/// 协调存储接口：get / set / delete、集合成员、队列 push/pop
#[async_trait]
pub trait CoordinationStore: Send + Sync {
    /// 读取键值，不存在或已过期返回 None
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// 写入键值，ttl 为 None 时永不过期
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError>;

    /// 删除键（值、集合、队列均可）
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// 向集合添加成员
    async fn set_add(&self, key: &str, member: &str) -> Result<(), StoreError>;

    /// 从集合移除成员
    async fn set_remove(&self, key: &str, member: &str) -> Result<(), StoreError>;

    /// 列出集合全部成员
    async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError>;

    /// 队尾追加
    async fn list_push(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// 队首弹出，空队列返回 None
    async fn list_pop(&self, key: &str) -> Result<Option<String>, StoreError>;
}
