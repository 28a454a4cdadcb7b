use adapter::CommandEnvelope;
use axum::{extract::State, Json};
use chrono::Duration;
use domain::{
    access::{require_login, AuthUser},
    forms::{is_valid_email, LoginForm, RegisterForm},
    AppCommand, DomainError,
};
use rand::Rng;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::{
    error::{ok_data, ok_msg, AppError, AppResult},
    session::{Session, SessionCookie},
    state::AppState,
};

const MAIL_REPLY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct CaptchaRequest {
    pub email: String,
}

/// 生成 4 位验证码，落库后交给邮件 worker 并等待结果
pub async fn send_email_captcha(
    State(state): State<AppState>,
    Json(req): Json<CaptchaRequest>,
) -> AppResult<Json<Value>> {
    let email = req.email.trim();
    if !is_valid_email(email) {
        return Err(DomainError::validation("email", "enter a valid email address").into());
    }

    let captcha = rand::thread_rng().gen_range(1000..=9999).to_string();
    state.db.upsert_captcha(email, &captcha).await?;

    let (tx, rx) = oneshot::channel();
    let envelope = CommandEnvelope {
        cmd: AppCommand::SendCaptchaMail {
            email: email.to_string(),
            captcha,
        },
        resp: tx,
    };
    state
        .mailer
        .send(envelope)
        .await
        .map_err(|_| AppError::MailUnavailable)?;

    match tokio::time::timeout(MAIL_REPLY_TIMEOUT, rx).await {
        Ok(Ok(Ok(()))) => Ok(ok_msg("captcha sent")),
        Ok(Ok(Err(e))) => {
            warn!("Captcha mail to {} failed: {:#}", email, e);
            Err(AppError::MailUnavailable)
        }
        _ => Err(AppError::MailUnavailable),
    }
}

pub async fn register(
    State(state): State<AppState>,
    Json(form): Json<RegisterForm>,
) -> AppResult<Json<Value>> {
    let reg = form.validate()?;
    let db = &state.db;

    if db.username_exists(&reg.username).await? {
        return Err(DomainError::validation("username", "username already taken").into());
    }
    if db.email_exists(&reg.email).await? {
        return Err(DomainError::validation("email", "email already registered").into());
    }
    let ttl = Duration::seconds(state.settings.security.captcha_ttl_secs);
    if !db.consume_captcha(&reg.email, &reg.captcha, ttl).await? {
        return Err(DomainError::validation("captcha", "captcha is incorrect or expired").into());
    }

    // bcrypt 是 CPU 密集操作，放到阻塞线程池
    let cost = state.settings.security.bcrypt_cost;
    let password = reg.password.clone();
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(anyhow::Error::from)?
        .map_err(anyhow::Error::from)?;

    let user = db.create_user(&reg.username, &reg.email, &hash).await?;
    info!("Registered user {} ({})", user.username, user.id);
    // 站长在服务启动后才注册时，在这里补上权限
    if state.settings.security.site_owner.as_deref() == Some(user.username.as_str()) {
        crate::promote_site_owner(db, &state.settings.security).await?;
    }
    Ok(ok_data("registered", json!({ "id": user.id })))
}

pub async fn login(
    State(state): State<AppState>,
    mut session: Session,
    Json(form): Json<LoginForm>,
) -> AppResult<(SessionCookie, Json<Value>)> {
    let creds = form.validate()?;

    let Some((user, hash)) = state.db.find_login_user(&creds.username_or_email).await? else {
        return Err(
            DomainError::validation("username_or_email", "unknown username or email").into(),
        );
    };
    // 游客账号没有可用密码
    let Some(hash) = hash.filter(|_| !user.is_guest) else {
        return Err(DomainError::validation("password", "incorrect password").into());
    };

    let password = creds.password.clone();
    let matched = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(anyhow::Error::from)?
        .unwrap_or(false);
    if !matched {
        return Err(DomainError::validation("password", "incorrect password").into());
    }

    session.login(
        AuthUser {
            id: user.id,
            username: user.username,
            is_superuser: user.is_superuser,
        },
        creds.remember,
    );
    let cookie = session.save(&state).await?;
    Ok((cookie, ok_msg("logged in")))
}

pub async fn logout(
    State(state): State<AppState>,
    mut session: Session,
) -> AppResult<(SessionCookie, Json<Value>)> {
    let viewer = session.viewer();
    require_login(&viewer)?;

    session.logout();
    let cookie = session.save(&state).await?;
    Ok((cookie, ok_msg("logged out")))
}
