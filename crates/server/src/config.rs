use config::ConfigError;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

const ENV_PREFIX: &str = "BLOG_";

#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub redis: RedisSettings,
    pub counter: CounterSettings,
    pub security: SecuritySettings,
    pub mail: MailSettings,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub cors_origins: String,
    // 上传文件的存放目录，对外以 /media/ 提供
    pub media_root: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseSettings {
    pub url: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct RedisSettings {
    /// 为空时使用进程内去重存储
    pub url: Option<String>,
    pub timeout_ms: u64,
}

impl RedisSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct CounterSettings {
    pub article_read_window_secs: u64,
    pub site_visit_window_secs: u64,
}

#[derive(Deserialize, Clone, Debug)]
pub struct SecuritySettings {
    pub session_secret: String,
    pub bcrypt_cost: u32,
    // 启动时提升为站长的用户名
    pub site_owner: Option<String>,
    pub remember_me_days: i64,
    pub session_ttl_secs: i64,
    pub captcha_ttl_secs: i64,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum MailSettings {
    Log,
    Http {
        endpoint: String,
        from: String,
        api_token: Option<String>,
    },
}

impl MailSettings {
    pub fn to_adapter(&self) -> adapter::MailConfig {
        match self {
            MailSettings::Log => adapter::MailConfig::Log,
            MailSettings::Http {
                endpoint,
                from,
                api_token,
            } => adapter::MailConfig::Http(adapter::HttpMailConfig {
                endpoint: endpoint.clone(),
                from: from.clone(),
                api_token: api_token.clone(),
            }),
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());
        let env_map = collect_env_vars(std::env::vars());
        let env_json = serde_json::to_string(&env_map)
            .map_err(|e| ConfigError::Message(format!("Failed to serialize env overrides: {}", e)))?;

        let s = defaults()?
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::File::with_name(&format!("config.{}", run_mode)).required(false))
            .add_source(config::File::from_str(&env_json, config::FileFormat::Json))
            .build()?;

        s.try_deserialize()
    }

    /// 只用默认值，测试与本地调试使用
    pub fn defaults_only() -> Result<Self, ConfigError> {
        defaults()?.build()?.try_deserialize()
    }
}

fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
    config::Config::builder()
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 3000)?
        .set_default("server.cors_origins", "*")?
        .set_default("server.media_root", "data/media")?
        .set_default("database.url", "sqlite://data/blog.db")?
        .set_default("redis.timeout_ms", 1000)?
        .set_default("counter.article_read_window_secs", 3600)?
        .set_default("counter.site_visit_window_secs", 3600)?
        .set_default("security.session_secret", "change_me_please")?
        .set_default("security.bcrypt_cost", 12)?
        .set_default("security.remember_me_days", 7)?
        .set_default("security.session_ttl_secs", 86400)?
        .set_default("security.captcha_ttl_secs", 900)?
        .set_default("mail.mode", "log")
}

/// `BLOG_SERVER__PORT=8080` -> `server.port = "8080"`
fn collect_env_vars(vars: impl Iterator<Item = (String, String)>) -> HashMap<String, String> {
    vars.filter(|(k, _)| k.starts_with(ENV_PREFIX))
        .map(|(k, v)| {
            let new_key = k
                .trim_start_matches(ENV_PREFIX)
                .replace("__", ".")
                .to_lowercase();
            (new_key, v)
        })
        .collect()
}
