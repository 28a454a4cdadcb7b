use crate::traits::{MailDriver, OutgoingMail};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct HttpMailConfig {
    pub endpoint: String,
    pub from: String,
    pub api_token: Option<String>,
}

#[derive(Serialize)]
struct MailPayload<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    body: &'a str,
}

/// 通过 HTTP 邮件网关投递
pub struct HttpMailDriver {
    config: HttpMailConfig,
    client: reqwest::Client,
}

impl HttpMailDriver {
    pub fn new(config: HttpMailConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build mail HTTP client")?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl MailDriver for HttpMailDriver {
    async fn deliver(&self, mail: &OutgoingMail) -> Result<()> {
        let payload = MailPayload {
            from: &self.config.from,
            to: &mail.to,
            subject: &mail.subject,
            body: &mail.body,
        };
        let mut req = self.client.post(&self.config.endpoint).json(&payload);
        if let Some(token) = &self.config.api_token {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await.context("Mail gateway unreachable")?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow!("Mail gateway returned {}: {}", status, text));
        }
        Ok(())
    }
}
