#![allow(dead_code)]

use adapter::{cache::MemoryDedupStore, MailDriver, OutgoingMail};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use domain::counter::{CacheUnavailable, DedupStore};
use serde_json::{json, Value};
use server::{build_counter, build_router, config::Settings, state::AppState};
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};
use storage::Db;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

pub const OWNER: &str = "owner";
pub const DESKTOP_UA: &str = "Mozilla/5.0 (X11; Linux x86_64)";

/// 记录所有发出的邮件
#[derive(Clone, Default)]
pub struct Outbox(pub Arc<Mutex<Vec<OutgoingMail>>>);

#[async_trait]
impl MailDriver for Outbox {
    async fn deliver(&self, mail: &OutgoingMail) -> anyhow::Result<()> {
        self.0.lock().unwrap().push(mail.clone());
        Ok(())
    }
}

impl Outbox {
    pub fn last_captcha_for(&self, email: &str) -> String {
        let mails = self.0.lock().unwrap();
        let mail = mails.iter().rev().find(|m| m.to == email).unwrap();
        mail.body.chars().filter(|c| c.is_ascii_digit()).collect()
    }
}

/// 模拟 Redis 宕机
pub struct DownStore;

#[async_trait]
impl DedupStore for DownStore {
    async fn set_if_absent(&self, _key: &str, _ttl: Duration) -> Result<bool, CacheUnavailable> {
        Err(CacheUnavailable("connection refused".into()))
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub outbox: Outbox,
    cancel: CancellationToken,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with_store(Arc::new(MemoryDedupStore::new())).await
}

pub async fn spawn_app_with_store(store: Arc<dyn DedupStore>) -> TestApp {
    let mut settings = Settings::defaults_only().unwrap();
    settings.security.bcrypt_cost = 4;
    settings.security.site_owner = Some(OWNER.to_string());
    settings.server.media_root = std::env::temp_dir()
        .join(format!("blog-media-{:032x}", rand_suffix()))
        .to_string_lossy()
        .into_owned();

    let db = Db::new("sqlite::memory:").await.unwrap();
    let counter = build_counter(store, &settings.counter);

    let outbox = Outbox::default();
    let (tx, rx) = mpsc::channel(16);
    let cancel = CancellationToken::new();
    {
        let driver = outbox.clone();
        let token = cancel.clone();
        tokio::spawn(async move { adapter::run_worker(&driver, rx, token).await });
    }

    let state = AppState {
        db,
        counter,
        mailer: tx,
        settings: Arc::new(settings),
    };
    TestApp {
        router: build_router(state.clone()),
        state,
        outbox,
        cancel,
    }
}

fn rand_suffix() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos()
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl Reply {
    /// `blog_session=...` (不含属性)
    pub fn session_cookie(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with("blog_session="))
            .and_then(|v| v.split(';').next())
            .map(str::to_string)
    }
}

pub struct Call {
    method: Method,
    uri: String,
    cookie: Option<String>,
    ip: String,
    user_agent: String,
    content_type: Option<String>,
    body: Body,
}

impl Call {
    pub fn get(uri: &str) -> Self {
        Self::new(Method::GET, uri)
    }

    pub fn post(uri: &str, body: Value) -> Self {
        let mut call = Self::new(Method::POST, uri);
        call.content_type = Some("application/json".into());
        call.body = Body::from(body.to_string());
        call
    }

    pub fn multipart(uri: &str, boundary: &str, body: Vec<u8>) -> Self {
        let mut call = Self::new(Method::POST, uri);
        call.content_type = Some(format!("multipart/form-data; boundary={}", boundary));
        call.body = Body::from(body);
        call
    }

    fn new(method: Method, uri: &str) -> Self {
        Self {
            method,
            uri: uri.to_string(),
            cookie: None,
            ip: "10.0.0.1".into(),
            user_agent: DESKTOP_UA.into(),
            content_type: None,
            body: Body::empty(),
        }
    }

    pub fn cookie(mut self, cookie: Option<&str>) -> Self {
        self.cookie = cookie.map(str::to_string);
        self
    }

    pub fn from_ip(mut self, ip: &str) -> Self {
        self.ip = ip.to_string();
        self
    }

    pub fn user_agent(mut self, ua: &str) -> Self {
        self.user_agent = ua.to_string();
        self
    }

    pub async fn send(self, app: &TestApp) -> Reply {
        let mut req = Request::builder()
            .method(self.method)
            .uri(self.uri)
            .header("x-forwarded-for", self.ip)
            .header(header::USER_AGENT, self.user_agent);
        if let Some(ct) = self.content_type {
            req = req.header(header::CONTENT_TYPE, ct);
        }
        if let Some(cookie) = self.cookie {
            req = req.header(header::COOKIE, cookie);
        }

        let resp = app
            .router
            .clone()
            .oneshot(req.body(self.body).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        Reply {
            status,
            headers,
            body,
        }
    }
}

/// 走完整的验证码 + 注册流程
pub async fn register(app: &TestApp, username: &str) {
    let email = format!("{}@example.org", username);
    let sent = Call::post("/api/captcha", json!({ "email": email })).send(app).await;
    assert_eq!(sent.status, StatusCode::OK, "{}", sent.body);

    let captcha = app.outbox.last_captcha_for(&email);
    let reply = Call::post(
        "/api/register",
        json!({
            "username": username,
            "email": email,
            "captcha": captcha,
            "password": "secret123",
            "re_password": "secret123",
        }),
    )
    .send(app)
    .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
}

/// 注册并登录，返回会话 Cookie
pub async fn login(app: &TestApp, username: &str) -> String {
    register(app, username).await;
    let reply = Call::post(
        "/api/login",
        json!({ "username_or_email": username, "password": "secret123" }),
    )
    .send(app)
    .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    reply.session_cookie().unwrap()
}

/// 站长登录并发布一篇文章，返回 (站长 Cookie, 文章 id)
pub async fn publish_article(app: &TestApp) -> (String, i64) {
    let owner = login(app, OWNER).await;
    let tag = Call::post("/api/tags", json!({ "name": "rust" }))
        .cookie(Some(&owner))
        .send(app)
        .await;
    let tag_id = match tag.body["data"]["id"].as_i64() {
        Some(id) => id,
        // 标签已存在时复用
        None => Call::get("/api/tags").send(app).await.body["data"][0]["id"]
            .as_i64()
            .unwrap(),
    };

    let article = Call::post(
        "/api/articles",
        json!({ "title": "Hello", "content": "World", "tags": [tag_id] }),
    )
    .cookie(Some(&owner))
    .send(app)
    .await;
    assert_eq!(article.status, StatusCode::OK, "{}", article.body);
    (owner, article.body["data"]["id"].as_i64().unwrap())
}
