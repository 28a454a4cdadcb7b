use axum::{
    extract::{Path, State},
    Json,
};
use domain::{forms::CommentForm, identity::guest_username, DomainError};
use serde_json::Value;

use crate::{
    error::{ok_data, AppResult},
    http::extract::ClientMeta,
    session::Session,
    state::AppState,
};

pub async fn post_comment(
    State(state): State<AppState>,
    Path(article_id): Path<i64>,
    client: ClientMeta,
    session: Session,
    Json(form): Json<CommentForm>,
) -> AppResult<Json<Value>> {
    state
        .db
        .get_published_article(article_id)
        .await?
        .ok_or(DomainError::NotFound("article"))?;

    let viewer = session.viewer();
    let draft = form.validate(viewer.user.is_some())?;

    let author_id = match (viewer.user_id(), draft.guest_name.as_deref()) {
        (Some(id), _) => id,
        (None, Some(name)) => {
            let username = guest_username(&client.ip, name);
            state.db.upsert_guest(&username, name).await?
        }
        (None, None) => return Err(DomainError::Unauthenticated.into()),
    };

    let comment = state
        .db
        .create_comment(article_id, author_id, &draft.content, draft.parent_id)
        .await?;
    Ok(ok_data("comment posted", comment))
}
