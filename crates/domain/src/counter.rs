use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use crate::identity::Identity;

pub const DEFAULT_WINDOW: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Error)]
#[error("dedup cache unavailable: {0}")]
pub struct CacheUnavailable(pub String);

/// 共享的带过期键值存储
#[async_trait]
pub trait DedupStore: Send + Sync {
    /// `SET key IF-NOT-EXISTS WITH-EXPIRY ttl`，键原本不存在并写入成功时返回 true
    async fn set_if_absent(&self, key: &str, ttl: Duration) -> Result<bool, CacheUnavailable>;
}

/// 会话级的小型记录区，仅在共享存储不可用时使用
pub trait SessionScratch {
    fn last_hit(&self, scope: &str, subject: &str) -> Option<i64>;
    fn record_hit(&mut self, scope: &str, subject: &str, at: i64);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupSubject {
    ArticleRead(i64),
    SiteVisit,
}

impl DedupSubject {
    fn scope(&self) -> &'static str {
        match self {
            DedupSubject::ArticleRead(_) => "article_read_history",
            DedupSubject::SiteVisit => "site_visit_history",
        }
    }

    fn session_key(&self) -> String {
        match self {
            DedupSubject::ArticleRead(id) => id.to_string(),
            DedupSubject::SiteVisit => "site".to_string(),
        }
    }

    pub fn cache_key(&self, identity: &Identity) -> String {
        match self {
            DedupSubject::ArticleRead(id) => format!("blog:article:read:{}:{}", id, identity),
            DedupSubject::SiteVisit => format!("blog:site:visit:{}", identity),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DedupWindows {
    pub article_read: Duration,
    pub site_visit: Duration,
}

impl Default for DedupWindows {
    fn default() -> Self {
        Self {
            article_read: DEFAULT_WINDOW,
            site_visit: DEFAULT_WINDOW,
        }
    }
}

impl DedupWindows {
    fn for_subject(&self, subject: DedupSubject) -> Duration {
        match subject {
            DedupSubject::ArticleRead(_) => self.article_read,
            DedupSubject::SiteVisit => self.site_visit,
        }
    }
}

#[derive(Clone)]
pub struct DedupCounter {
    store: Arc<dyn DedupStore>,
    windows: DedupWindows,
}

impl DedupCounter {
    pub fn new(store: Arc<dyn DedupStore>, windows: DedupWindows) -> Self {
        Self { store, windows }
    }

    /// 同一 (subject, identity) 在一个窗口内至多返回一次 true；返回 true 后由调用方执行实际的自增
    pub async fn should_increment<S>(
        &self,
        subject: DedupSubject,
        identity: &Identity,
        session: &mut S,
    ) -> bool
    where
        S: SessionScratch + Send + ?Sized,
    {
        self.should_increment_at(subject, identity, session, Utc::now().timestamp())
            .await
    }

    pub async fn should_increment_at<S>(
        &self,
        subject: DedupSubject,
        identity: &Identity,
        session: &mut S,
        now_ts: i64,
    ) -> bool
    where
        S: SessionScratch + Send + ?Sized,
    {
        let window = self.windows.for_subject(subject);
        let key = subject.cache_key(identity);

        match self.store.set_if_absent(&key, window).await {
            Ok(created) => created,
            Err(e) => {
                // 缓存不可用时降级到 session 防刷，避免功能中断
                warn!("{}; falling back to session dedup for {}", e, key);
                session_fallback(session, subject, window, now_ts)
            }
        }
    }
}

fn session_fallback<S>(session: &mut S, subject: DedupSubject, window: Duration, now_ts: i64) -> bool
where
    S: SessionScratch + ?Sized,
{
    let scope = subject.scope();
    let subject_key = subject.session_key();
    let window_secs = i64::try_from(window.as_secs()).unwrap_or(i64::MAX);

    if let Some(last) = session.last_hit(scope, &subject_key) {
        if now_ts.saturating_sub(last) < window_secs {
            return false;
        }
    }
    session.record_hit(scope, &subject_key, now_ts);
    true
}
