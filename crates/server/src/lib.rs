pub mod config;
mod error;
pub mod http;
mod session;
pub mod state;

pub use error::{AppError, AppResult};
pub use http::router::build_router;
pub use session::COOKIE_NAME;

use config::{CounterSettings, SecuritySettings};
use domain::counter::{DedupCounter, DedupStore, DedupWindows};
use std::{sync::Arc, time::Duration};
use storage::Db;
use tracing::{info, warn};

pub fn build_counter(store: Arc<dyn DedupStore>, settings: &CounterSettings) -> DedupCounter {
    DedupCounter::new(
        store,
        DedupWindows {
            article_read: Duration::from_secs(settings.article_read_window_secs),
            site_visit: Duration::from_secs(settings.site_visit_window_secs),
        },
    )
}

/// 把配置中的站长账号提升为超级管理员
pub async fn promote_site_owner(db: &Db, security: &SecuritySettings) -> anyhow::Result<()> {
    let Some(owner) = security.site_owner.as_deref().map(str::trim).filter(|s| !s.is_empty())
    else {
        return Ok(());
    };
    if db.promote_superuser(owner).await? {
        info!("Site owner: {}", owner);
    } else {
        warn!("Configured site owner '{}' has not registered yet", owner);
    }
    Ok(())
}
