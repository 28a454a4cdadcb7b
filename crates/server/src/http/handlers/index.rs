use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use domain::{
    counter::DedupSubject,
    page::{PageInfo, Paged, ARTICLES_PER_PAGE},
};
use serde::Deserialize;
use serde_json::{json, Value};
use storage::ArticleQuery;

use crate::{
    error::AppResult,
    http::extract::ClientMeta,
    session::{Session, SessionCookie},
    state::AppState,
};

const HOT_TAG_LIMIT: i64 = 12;
const HOT_ARTICLE_LIMIT: i64 = 5;

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct IndexParams {
    /// 标题/正文关键词
    pub q: Option<String>,
    pub tag: Option<String>,
    pub page: Option<String>,
}

pub async fn index(
    State(state): State<AppState>,
    client: ClientMeta,
    mut session: Session,
    Query(params): Query<IndexParams>,
) -> AppResult<(SessionCookie, Json<Value>)> {
    let db = &state.db;

    let keyword = params
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_string);
    // 非数字或不存在的标签直接忽略
    let selected_tag = match params.tag.as_deref().map(str::trim).map(str::parse::<i64>) {
        Some(Ok(id)) => db.get_tag(id).await?,
        _ => None,
    };
    let filter = ArticleQuery {
        keyword,
        tag_id: selected_tag.as_ref().map(|t| t.id),
    };

    let total = db.count_published(&filter).await?;
    let page = PageInfo::resolve(params.page.as_deref(), total, ARTICLES_PER_PAGE);
    let articles = db.list_published(&filter, page.per_page, page.offset()).await?;

    let hot_tags = db.hot_tags(HOT_TAG_LIMIT).await?;
    let hot_articles = db.hot_articles(HOT_ARTICLE_LIMIT).await?;
    let article_total = db.count_published(&ArticleQuery::default()).await?;
    let user_total = db.count_users().await?;

    // 站点访问量：同一访问者一个窗口内只计一次
    let today = Utc::now().date_naive();
    let identity = client.identity(session.viewer().user_id());
    let today_visit_count = if state
        .counter
        .should_increment(DedupSubject::SiteVisit, &identity, &mut session)
        .await
    {
        db.record_visit(today).await?
    } else {
        db.ensure_day(today).await?;
        db.visit_count(today).await?
    };
    let total_visit_count = db.total_visits().await?;

    let cookie = session.save(&state).await?;
    Ok((
        cookie,
        Json(json!({
            "code": 200,
            "data": {
                "articles": Paged { items: articles, page },
                "keyword": filter.keyword,
                "selected_tag": selected_tag,
                "hot_tags": hot_tags,
                "hot_articles": hot_articles,
                "stats": {
                    "article_total": article_total,
                    "user_total": user_total,
                    "today_visit_count": today_visit_count,
                    "total_visit_count": total_visit_count,
                },
            },
        })),
    ))
}
