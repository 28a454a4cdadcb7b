//! 基于 Cookie 的服务端会话
//!
//! Cookie 只保存 `{id}.{签名}`，数据存在 `sessions` 表里。
//! 匿名访客只有在真正写入数据时 (例如去重计数降级) 才会落库。

use crate::{error::AppError, state::AppState};
use anyhow::anyhow;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderValue},
    response::{IntoResponseParts, ResponseParts},
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{Duration, NaiveDateTime, Utc};
use domain::{access::AuthUser, access::Viewer, counter::SessionScratch};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::HashMap;
use tracing::{debug, warn};

pub const COOKIE_NAME: &str = "blog_session";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default)]
    pub article_read_history: HashMap<String, i64>,
    #[serde(default)]
    pub site_visit_history: HashMap<String, i64>,
}

impl SessionData {
    fn history(&self, scope: &str) -> Option<&HashMap<String, i64>> {
        match scope {
            "article_read_history" => Some(&self.article_read_history),
            "site_visit_history" => Some(&self.site_visit_history),
            _ => None,
        }
    }

    fn history_mut(&mut self, scope: &str) -> Option<&mut HashMap<String, i64>> {
        match scope {
            "article_read_history" => Some(&mut self.article_read_history),
            "site_visit_history" => Some(&mut self.site_visit_history),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifetime {
    /// 浏览器会话 Cookie，服务端按 session_ttl 过期
    Browser,
    /// 记住我：持久 Cookie
    Persistent,
}

#[derive(Debug)]
pub struct Session {
    id: Option<String>,
    user: Option<AuthUser>,
    data: SessionData,
    expires_at: Option<NaiveDateTime>,
    lifetime: Lifetime,
    dirty: bool,
    // 需要下发新 Cookie (新建或轮换了 id)
    reissue: bool,
    // 旧 id 需要在保存时删除
    retired: Option<String>,
    ended: bool,
}

impl Session {
    fn fresh() -> Self {
        Self {
            id: None,
            user: None,
            data: SessionData::default(),
            expires_at: None,
            lifetime: Lifetime::Browser,
            dirty: false,
            reissue: false,
            retired: None,
            ended: false,
        }
    }

    pub fn viewer(&self) -> Viewer {
        Viewer {
            user: self.user.clone(),
        }
    }

    pub fn data(&self) -> &SessionData {
        &self.data
    }

    /// 登录后轮换会话 id，避免会话固定
    pub fn login(&mut self, user: AuthUser, remember: bool) {
        self.retired = self.id.take();
        self.user = Some(user);
        self.lifetime = if remember {
            Lifetime::Persistent
        } else {
            Lifetime::Browser
        };
        self.expires_at = None;
        self.dirty = true;
        self.reissue = true;
    }

    pub fn logout(&mut self) {
        self.ended = true;
    }

    /// 持久化会话并生成需要下发的 Cookie
    pub async fn save(mut self, state: &AppState) -> Result<SessionCookie, AppError> {
        let security = &state.settings.security;

        if self.ended {
            if let Some(id) = self.id.take() {
                state.db.delete_session(&id).await?;
            }
            return Ok(SessionCookie(Some(clear_cookie())));
        }

        if let Some(old) = self.retired.take() {
            state.db.delete_session(&old).await?;
        }
        if !self.dirty {
            return Ok(SessionCookie(None));
        }

        let id = match self.id.take() {
            Some(id) => id,
            None => {
                self.reissue = true;
                new_session_id()
            }
        };
        let max_age = match self.lifetime {
            Lifetime::Persistent => Some(Duration::days(security.remember_me_days)),
            Lifetime::Browser => None,
        };
        let expires_at = self.expires_at.unwrap_or_else(|| {
            Utc::now().naive_utc()
                + max_age.unwrap_or_else(|| Duration::seconds(security.session_ttl_secs))
        });

        let data = serde_json::to_string(&self.data).map_err(anyhow::Error::from)?;
        state
            .db
            .save_session(&id, self.user.as_ref().map(|u| u.id), &data, expires_at)
            .await?;

        if !self.reissue {
            return Ok(SessionCookie(None));
        }
        let value = format!("{}.{}", id, sign(&security.session_secret, &id)?);
        Ok(SessionCookie(Some(session_cookie(&value, max_age)?)))
    }
}

impl SessionScratch for Session {
    fn last_hit(&self, scope: &str, subject: &str) -> Option<i64> {
        self.data.history(scope)?.get(subject).copied()
    }

    fn record_hit(&mut self, scope: &str, subject: &str, at: i64) {
        match self.data.history_mut(scope) {
            Some(history) => {
                history.insert(subject.to_string(), at);
                self.dirty = true;
            }
            None => warn!("Unknown session history scope: {}", scope),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let Some(raw) = read_cookie(parts, COOKIE_NAME) else {
            return Ok(Session::fresh());
        };
        let Some(id) = verify(&state.settings.security.session_secret, &raw) else {
            debug!("Ignoring session cookie with bad signature");
            return Ok(Session::fresh());
        };
        let Some(record) = state.db.load_session(&id).await? else {
            return Ok(Session::fresh());
        };

        let data = serde_json::from_str(&record.data).unwrap_or_else(|e| {
            warn!("Discarding unreadable session data for {}: {}", record.id, e);
            SessionData::default()
        });
        Ok(Session {
            id: Some(record.id),
            user: record.user,
            data,
            expires_at: Some(record.expires_at),
            lifetime: Lifetime::Browser,
            dirty: false,
            reissue: false,
            retired: None,
            ended: false,
        })
    }
}

/// 作为响应的一部分写出 Set-Cookie
#[derive(Debug)]
pub struct SessionCookie(Option<HeaderValue>);

impl IntoResponseParts for SessionCookie {
    type Error = std::convert::Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        if let Some(value) = self.0 {
            res.headers_mut().append(header::SET_COOKIE, value);
        }
        Ok(res)
    }
}

fn new_session_id() -> String {
    format!("{:032x}", rand::random::<u128>())
}

fn mac(secret: &str) -> anyhow::Result<HmacSha256> {
    HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| anyhow!("invalid session secret"))
}

fn sign(secret: &str, id: &str) -> anyhow::Result<String> {
    let mut mac = mac(secret)?;
    mac.update(id.as_bytes());
    Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
}

/// 校验 `{id}.{sig}`，成功时返回 id
fn verify(secret: &str, raw: &str) -> Option<String> {
    let (id, sig) = raw.split_once('.')?;
    let sig = URL_SAFE_NO_PAD.decode(sig).ok()?;
    let mut mac = mac(secret).ok()?;
    mac.update(id.as_bytes());
    mac.verify_slice(&sig).ok()?;
    Some(id.to_string())
}

fn read_cookie(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.to_string())
}

fn session_cookie(value: &str, max_age: Option<Duration>) -> anyhow::Result<HeaderValue> {
    let mut cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", COOKIE_NAME, value);
    if let Some(age) = max_age {
        cookie.push_str(&format!("; Max-Age={}", age.num_seconds()));
    }
    Ok(HeaderValue::from_str(&cookie)?)
}

fn clear_cookie() -> HeaderValue {
    HeaderValue::from_static("blog_session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_roundtrip_and_tamper() {
        let id = new_session_id();
        let raw = format!("{}.{}", id, sign("secret", &id).unwrap());
        assert_eq!(verify("secret", &raw), Some(id.clone()));
        assert_eq!(verify("other-secret", &raw), None);

        let forged = format!("{}0.{}", id, raw.split_once('.').unwrap().1);
        assert_eq!(verify("secret", &forged), None);
        assert_eq!(verify("secret", "no-dot"), None);
    }

    #[test]
    fn test_scratch_marks_dirty() {
        let mut session = Session::fresh();
        assert_eq!(session.last_hit("article_read_history", "7"), None);
        session.record_hit("article_read_history", "7", 100);
        assert!(session.dirty);
        assert_eq!(session.last_hit("article_read_history", "7"), Some(100));
        assert_eq!(session.last_hit("site_visit_history", "7"), None);

        let json = serde_json::to_string(session.data()).unwrap();
        let back: SessionData = serde_json::from_str(&json).unwrap();
        assert_eq!(&back, session.data());
        // 旧数据缺字段时按默认值补齐
        let partial: SessionData = serde_json::from_str("{}").unwrap();
        assert!(partial.site_visit_history.is_empty());
    }

    #[test]
    fn test_session_cookie_sets_header_only_when_present() {
        use axum::response::IntoResponse;

        let cleared = (SessionCookie(Some(clear_cookie())), "ok").into_response();
        let value = cleared.headers().get(header::SET_COOKIE).unwrap();
        assert!(value.to_str().unwrap().starts_with("blog_session=;"));

        let untouched = (SessionCookie(None), "ok").into_response();
        assert!(untouched.headers().get(header::SET_COOKIE).is_none());
    }

    #[test]
    fn test_cookie_header_parsing() {
        let req = axum::http::Request::builder()
            .header(header::COOKIE, "theme=dark; blog_session=abc.def")
            .body(())
            .unwrap();
        let (parts, _) = req.into_parts();
        assert_eq!(read_cookie(&parts, COOKIE_NAME).as_deref(), Some("abc.def"));
        assert_eq!(read_cookie(&parts, "missing"), None);
    }
}
