use axum::{
    extract::{Path, State},
    Json,
};
use domain::{access::require_site_owner, DomainError, TagName};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    error::{ok_data, ok_msg, AppResult},
    session::Session,
    state::AppState,
};

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct CreateTagRequest {
    pub name: String,
}

pub async fn list_tags(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let tags = state.db.list_tags().await?;
    Ok(Json(json!({ "code": 200, "data": tags })))
}

pub async fn create_tag(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<CreateTagRequest>,
) -> AppResult<Json<Value>> {
    let viewer = session.viewer();
    require_site_owner(&viewer)?;

    let name = TagName::new(req.name.trim())?;
    let tag = state
        .db
        .create_tag(name.as_str())
        .await?
        .ok_or_else(|| DomainError::validation("name", "tag already exists"))?;
    Ok(ok_data("tag created", tag))
}

pub async fn delete_tag(
    State(state): State<AppState>,
    Path(tag_id): Path<i64>,
    session: Session,
) -> AppResult<Json<Value>> {
    let viewer = session.viewer();
    require_site_owner(&viewer)?;

    if !state.db.delete_tag(tag_id).await? {
        return Err(DomainError::NotFound("tag").into());
    }
    Ok(ok_msg("tag deleted"))
}
