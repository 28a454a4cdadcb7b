pub mod cache;
mod mail;
mod traits;

pub use mail::{HttpMailConfig, HttpMailDriver, LogMailDriver};
pub use traits::{MailDriver, OutgoingMail};

use domain::AppCommand;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

// --- 信封模式核心定义 ---
pub struct CommandEnvelope {
    pub cmd: AppCommand,
    // 结果回传通道：API 层等待这个 Result
    pub resp: oneshot::Sender<anyhow::Result<()>>,
}

#[derive(Clone, Debug)]
pub enum MailConfig {
    Log,
    Http(HttpMailConfig),
}

impl MailConfig {
    pub fn into_driver(self) -> anyhow::Result<Box<dyn MailDriver>> {
        Ok(match self {
            MailConfig::Log => {
                info!("Initializing mail worker in LOG mode...");
                Box::new(LogMailDriver)
            }
            MailConfig::Http(conf) => {
                info!("Initializing mail worker in HTTP mode ({})...", conf.endpoint);
                Box::new(HttpMailDriver::new(conf)?)
            }
        })
    }
}

pub async fn start_with_cancel_token(
    config: MailConfig,
    rx: mpsc::Receiver<CommandEnvelope>,
    cancel_token: CancellationToken,
) -> anyhow::Result<()> {
    let driver = config.into_driver()?;
    run_worker(driver.as_ref(), rx, cancel_token).await;
    Ok(())
}

/// 逐条处理信封，直到通道关闭或收到取消信号
pub async fn run_worker(
    driver: &dyn MailDriver,
    mut rx: mpsc::Receiver<CommandEnvelope>,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            envelope = rx.recv() => {
                let Some(CommandEnvelope { cmd, resp }) = envelope else { break };

                let mail = mail::compose(&cmd);
                let result = driver.deliver(&mail).await;
                if let Err(e) = &result {
                    error!("Mail to {} failed: {:?}", cmd.recipient(), e);
                }
                // 调用方可能已超时放弃
                let _ = resp.send(result);
            },
            _ = cancel_token.cancelled() => break,
        }
    }
    info!("Mail worker stopped");
}
