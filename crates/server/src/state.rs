use crate::config::Settings;
use adapter::CommandEnvelope;
use axum::extract::FromRef;
use domain::counter::DedupCounter;
use std::sync::Arc;
use storage::Db;
use tokio::sync::mpsc;

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub counter: DedupCounter,
    // 邮件 worker 的信封通道
    pub mailer: mpsc::Sender<CommandEnvelope>,
    pub settings: Arc<Settings>,
}

impl FromRef<AppState> for Db {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}
