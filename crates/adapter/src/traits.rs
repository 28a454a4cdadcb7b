use anyhow::Result;
use async_trait::async_trait;

/// 一封待发送的邮件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait MailDriver: Send + Sync {
    async fn deliver(&self, mail: &OutgoingMail) -> Result<()>;
}
