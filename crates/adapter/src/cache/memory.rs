use async_trait::async_trait;
use domain::counter::{CacheUnavailable, DedupStore};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// 超过这个键数时顺手清理过期项
const PURGE_THRESHOLD: usize = 4096;

/// 进程内的去重存储，单进程内原子
#[derive(Default)]
pub struct MemoryDedupStore {
    entries: Mutex<HashMap<String, Instant>>,
}

impl MemoryDedupStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DedupStore for MemoryDedupStore {
    async fn set_if_absent(&self, key: &str, ttl: Duration) -> Result<bool, CacheUnavailable> {
        let now = Instant::now();
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CacheUnavailable("memory dedup store poisoned".into()))?;

        if entries.len() >= PURGE_THRESHOLD {
            entries.retain(|_, expires| *expires > now);
        }
        match entries.get(key) {
            Some(expires) if *expires > now => Ok(false),
            _ => {
                entries.insert(key.to_string(), now + ttl);
                Ok(true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_key_expires_after_ttl() {
        let store = MemoryDedupStore::new();
        let ttl = Duration::from_secs(3600);

        assert!(store.set_if_absent("k", ttl).await.unwrap());
        assert!(!store.set_if_absent("k", ttl).await.unwrap());
        assert!(store.set_if_absent("other", ttl).await.unwrap());

        tokio::time::advance(Duration::from_secs(3599)).await;
        assert!(!store.set_if_absent("k", ttl).await.unwrap());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(store.set_if_absent("k", ttl).await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_callers_single_winner() {
        let store = Arc::new(MemoryDedupStore::new());
        let mut handles = Vec::new();
        for _ in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.set_if_absent("race", Duration::from_secs(60)).await.unwrap()
            }));
        }
        let mut winners = 0;
        for h in handles {
            if h.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
