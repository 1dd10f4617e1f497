//! 内存协调存储
//!
//! 单进程内的 CoordinationStore 实现：值 / 集合 / 队列三种槽位，懒惰过期。
//! 用于测试与单机部署；多进程场景应替换为 Redis 等真实后端。

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::store::{CoordinationStore, StoreError};

/// 槽位：一个键只能是三种类型之一（与 Redis 语义一致）
enum Slot {
    Value(String),
    Set(HashSet<String>),
    List(VecDeque<String>),
}

struct Entry {
    slot: Slot,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// 内存存储：RwLock<HashMap> 持有全部槽位
#[derive(Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 过期的键视同不存在
    fn purge_expired(entries: &mut HashMap<String, Entry>, key: &str) {
        if entries.get(key).is_some_and(Entry::is_expired) {
            entries.remove(key);
        }
    }

    fn live_slot<'a>(
        entries: &'a mut HashMap<String, Entry>,
        key: &str,
    ) -> Option<&'a mut Entry> {
        Self::purge_expired(entries, key);
        entries.get_mut(key)
    }
}

#[async_trait]
impl CoordinationStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut entries = self.entries.write().await;
        match Self::live_slot(&mut entries, key) {
            Some(Entry {
                slot: Slot::Value(v),
                ..
            }) => Ok(Some(v.clone())),
            _ => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            Entry {
                slot: Slot::Value(value.to_string()),
                expires_at: ttl.map(|d| Instant::now() + d),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        Self::purge_expired(&mut entries, key);
        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            slot: Slot::Set(HashSet::new()),
            expires_at: None,
        });
        match &mut entry.slot {
            Slot::Set(members) => {
                members.insert(member.to_string());
                Ok(())
            }
            _ => Err(StoreError::Operation(format!(
                "key '{key}' holds a non-set value"
            ))),
        }
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        if let Some(Entry {
            slot: Slot::Set(members),
            ..
        }) = Self::live_slot(&mut entries, key)
        {
            members.remove(member);
        }
        Ok(())
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let mut entries = self.entries.write().await;
        match Self::live_slot(&mut entries, key) {
            Some(Entry {
                slot: Slot::Set(members),
                ..
            }) => Ok(members.iter().cloned().collect()),
            _ => Ok(Vec::new()),
        }
    }

    async fn list_push(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        Self::purge_expired(&mut entries, key);
        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            slot: Slot::List(VecDeque::new()),
            expires_at: None,
        });
        match &mut entry.slot {
            Slot::List(items) => {
                items.push_back(value.to_string());
                Ok(())
            }
            _ => Err(StoreError::Operation(format!(
                "key '{key}' holds a non-list value"
            ))),
        }
    }

    async fn list_pop(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut entries = self.entries.write().await;
        match Self::live_slot(&mut entries, key) {
            Some(Entry {
                slot: Slot::List(items),
                ..
            }) => Ok(items.pop_front()),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_value_roundtrip_and_delete() {
        let store = InMemoryStore::new();
        store.set("k", "v", None).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));
        store.delete("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_ttl_expiry() {
        let store = InMemoryStore::new();
        store
            .set("flag", "1", Some(Duration::from_millis(20)))
            .await
            .unwrap();
        assert!(store.get("flag").await.unwrap().is_some());
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(store.get("flag").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_list_is_fifo() {
        let store = InMemoryStore::new();
        store.list_push("q", "a").await.unwrap();
        store.list_push("q", "b").await.unwrap();
        assert_eq!(store.list_pop("q").await.unwrap(), Some("a".to_string()));
        assert_eq!(store.list_pop("q").await.unwrap(), Some("b".to_string()));
        assert_eq!(store.list_pop("q").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_membership() {
        let store = InMemoryStore::new();
        store.set_add("s", "x").await.unwrap();
        store.set_add("s", "x").await.unwrap();
        store.set_add("s", "y").await.unwrap();
        let mut members = store.set_members("s").await.unwrap();
        members.sort();
        assert_eq!(members, vec!["x".to_string(), "y".to_string()]);
        store.set_remove("s", "x").await.unwrap();
        assert_eq!(store.set_members("s").await.unwrap(), vec!["y".to_string()]);
    }

    #[tokio::test]
    async fn test_type_mismatch_is_an_error() {
        let store = InMemoryStore::new();
        store.set("k", "v", None).await.unwrap();
        assert!(store.list_push("k", "x").await.is_err());
        assert!(store.set_add("k", "x").await.is_err());
    }

    #[tokio::test]
    async fn test_set_overwrites_other_slot_types() {
        let store = InMemoryStore::new();
        store.list_push("k", "a").await.unwrap();
        store.set("k", "v", None).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));
        assert_eq!(store.list_pop("k").await.unwrap(), None);
    }
}
