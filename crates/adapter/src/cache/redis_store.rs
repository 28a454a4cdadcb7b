use async_trait::async_trait;
use domain::counter::{CacheUnavailable, DedupStore};
use redis::aio::MultiplexedConnection;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, warn};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Redis 去重存储。连接懒建立并缓存，出错后丢弃，下次调用重新连接
pub struct RedisDedupStore {
    client: redis::Client,
    conn: Mutex<Option<MultiplexedConnection>>,
    timeout: Duration,
}

impl RedisDedupStore {
    pub fn new(url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = redis::Client::open(url)?;
        Ok(Self {
            client,
            conn: Mutex::new(None),
            timeout,
        })
    }

    /// 锁只用来读写缓存的连接，建连在锁外进行；并发调用者各自建连，后完成的覆盖先完成的
    async fn connection(&self) -> redis::RedisResult<MultiplexedConnection> {
        if let Some(conn) = self.conn.lock().await.as_ref() {
            return Ok(conn.clone());
        }

        debug!("Connecting to redis...");
        let conn = self.client.get_multiplexed_async_connection().await?;
        *self.conn.lock().await = Some(conn.clone());
        Ok(conn)
    }

    async fn reset(&self) {
        *self.conn.lock().await = None;
    }

    async fn set_nx(&self, key: &str, secs: u64) -> redis::RedisResult<bool> {
        let mut conn = self.connection().await?;
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(1).arg("NX").arg("EX").arg(secs);
        let reply: Option<String> = cmd.query_async(&mut conn).await?;
        Ok(reply.is_some())
    }
}

#[async_trait]
impl DedupStore for RedisDedupStore {
    async fn set_if_absent(&self, key: &str, ttl: Duration) -> Result<bool, CacheUnavailable> {
        // EX 必须为正整数
        let secs = ttl.as_secs().max(1);

        // 建连和命令共用一个超时
        match timeout(self.timeout, self.set_nx(key, secs)).await {
            Ok(Ok(created)) => Ok(created),
            Ok(Err(e)) => {
                warn!("Redis SET NX failed: {}", e);
                self.reset().await;
                Err(CacheUnavailable(e.to_string()))
            }
            Err(_) => {
                warn!("Redis SET NX timed out after {:?}", self.timeout);
                self.reset().await;
                Err(CacheUnavailable("redis timed out".into()))
            }
        }
    }
}
