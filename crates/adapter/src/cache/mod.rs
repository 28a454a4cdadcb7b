mod memory;
mod redis_store;

pub use memory::MemoryDedupStore;
pub use redis_store::{RedisDedupStore, DEFAULT_TIMEOUT};

use domain::counter::DedupStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// 配置了 Redis 地址时使用 Redis，否则退化为进程内存储
pub fn build_dedup_store(
    redis_url: Option<&str>,
    timeout: Duration,
) -> anyhow::Result<Arc<dyn DedupStore>> {
    match redis_url.filter(|u| !u.trim().is_empty()) {
        Some(url) => {
            info!("Dedup store: redis");
            Ok(Arc::new(RedisDedupStore::new(url, timeout)?))
        }
        None => {
            info!("Dedup store: in-process memory");
            Ok(Arc::new(MemoryDedupStore::new()))
        }
    }
}
