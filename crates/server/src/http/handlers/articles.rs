use axum::{
    extract::{Path, State},
    Json,
};
use domain::{
    access::require_site_owner,
    build_comment_tree,
    counter::DedupSubject,
    forms::{ArticleDraft, ArticleForm},
    DomainError,
};
use serde_json::{json, Value};
use storage::Db;

use crate::{
    error::{ok_data, ok_msg, AppResult},
    http::extract::ClientMeta,
    session::{Session, SessionCookie},
    state::AppState,
};

/// 文章详情：阅读数去重自增，附带评论树
pub async fn article_detail(
    State(state): State<AppState>,
    Path(article_id): Path<i64>,
    client: ClientMeta,
    mut session: Session,
) -> AppResult<(SessionCookie, Json<Value>)> {
    let mut article = state
        .db
        .get_published_article(article_id)
        .await?
        .ok_or(DomainError::NotFound("article"))?;

    let identity = client.identity(session.viewer().user_id());
    if state
        .counter
        .should_increment(DedupSubject::ArticleRead(article_id), &identity, &mut session)
        .await
    {
        state.db.increment_read_count(article_id).await?;
        article.read_count = state.db.read_count(article_id).await?;
    }

    let comments = build_comment_tree(state.db.list_comments(article_id).await?);

    let cookie = session.save(&state).await?;
    Ok((
        cookie,
        Json(json!({
            "code": 200,
            "data": { "article": article, "comments": comments },
        })),
    ))
}

pub async fn publish_article(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<ArticleForm>,
) -> AppResult<Json<Value>> {
    let viewer = session.viewer();
    let owner = require_site_owner(&viewer)?;
    let draft = form.validate()?;
    ensure_tags_exist(&state.db, &draft).await?;

    let article = state.db.create_article(owner.id, &draft).await?;
    tracing::info!("Article {} published by {}", article.id, owner.username);
    Ok(ok_data("article published", json!({ "id": article.id })))
}

pub async fn edit_article(
    State(state): State<AppState>,
    Path(article_id): Path<i64>,
    session: Session,
    Json(form): Json<ArticleForm>,
) -> AppResult<Json<Value>> {
    let viewer = session.viewer();
    let owner = require_site_owner(&viewer)?;
    // 先确认归属，再校验表单
    state
        .db
        .get_owned_article(article_id, owner.id)
        .await?
        .ok_or(DomainError::NotFound("article"))?;

    let draft = form.validate()?;
    ensure_tags_exist(&state.db, &draft).await?;
    let article = state.db.update_article(article_id, owner.id, &draft).await?;
    Ok(ok_data("article updated", json!({ "id": article.id })))
}

pub async fn delete_article(
    State(state): State<AppState>,
    Path(article_id): Path<i64>,
    session: Session,
) -> AppResult<Json<Value>> {
    let viewer = session.viewer();
    let owner = require_site_owner(&viewer)?;
    if !state.db.soft_delete_article(article_id, owner.id).await? {
        return Err(DomainError::NotFound("article").into());
    }
    Ok(ok_msg("article deleted"))
}

async fn ensure_tags_exist(db: &Db, draft: &ArticleDraft) -> AppResult<()> {
    let found = db.existing_tag_ids(&draft.tag_ids).await?;
    if found.len() != draft.tag_ids.len() {
        return Err(DomainError::validation("tags", "select existing tags only").into());
    }
    Ok(())
}
