use crate::traits::{MailDriver, OutgoingMail};
use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

/// 开发模式：只把邮件写进日志
pub struct LogMailDriver;

#[async_trait]
impl MailDriver for LogMailDriver {
    async fn deliver(&self, mail: &OutgoingMail) -> Result<()> {
        info!(to = %mail.to, subject = %mail.subject, "Mail (log driver): {}", mail.body);
        Ok(())
    }
}
