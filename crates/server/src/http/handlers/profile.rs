use axum::{
    extract::{Multipart, State},
    Json,
};
use domain::{
    access::require_login,
    forms::{validate_image_upload, AVATAR_MAX_BYTES},
    DomainError,
};
use serde_json::{json, Value};

use super::media::{read_file_field, store_file};
use crate::{
    error::{ok_data, AppResult},
    session::Session,
    state::AppState,
};

const NOTIFICATION_LIMIT: i64 = 20;

/// 个人中心：我的文章、统计、标签与互动通知
pub async fn profile(State(state): State<AppState>, session: Session) -> AppResult<Json<Value>> {
    let viewer = session.viewer();
    let me = require_login(&viewer)?;
    let db = &state.db;

    let user = db
        .get_user(me.id)
        .await?
        .ok_or(DomainError::Unauthenticated)?;
    let articles = db.list_author_articles(me.id).await?;
    let (article_total, read_total, comment_total) = db.author_totals(me.id).await?;
    let tags = db.list_tags().await?;
    let notifications = db.list_notifications(me.id, NOTIFICATION_LIMIT).await?;

    Ok(Json(json!({
        "code": 200,
        "data": {
            "user": user,
            "is_site_owner": me.is_superuser,
            "articles": articles,
            "totals": {
                "articles": article_total,
                "reads": read_total,
                "comments": comment_total,
            },
            "tags": tags,
            "notifications": notifications,
        },
    })))
}

pub async fn upload_avatar(
    State(state): State<AppState>,
    session: Session,
    mut multipart: Multipart,
) -> AppResult<Json<Value>> {
    let viewer = session.viewer();
    let me = require_login(&viewer)?;

    let file = read_file_field(&mut multipart, "avatar")
        .await?
        .ok_or_else(|| DomainError::validation("avatar", "choose an avatar file"))?;
    let ext = validate_image_upload("avatar", &file.file_name, file.bytes.len(), AVATAR_MAX_BYTES)?;

    let path = store_file(&state.settings.server.media_root, "avatar", &ext, &file.bytes).await?;
    state.db.update_avatar(me.id, &path).await?;
    Ok(ok_data("avatar updated", json!({ "avatar": path })))
}
