use crate::{models::SqlArticle, Db};
use chrono::Utc;
use domain::{forms::ArticleDraft, Article, ArticleStatus, DomainError};
use sqlx::{QueryBuilder, Sqlite};

const ARTICLE_SELECT: &str = r#"
    SELECT
        a.id,
        a.title,
        a.content,
        a.status,
        a.is_delete,
        a.is_top,
        a.read_count,
        a.comment_count,
        a.user_id,
        COALESCE(NULLIF(u.first_name, ''), u.username) AS author_name,
        a.create_time,
        a.update_time
    FROM articles a
    JOIN users u ON u.id = a.user_id
"#;

/// 首页列表的筛选条件
#[derive(Debug, Clone, Default)]
pub struct ArticleQuery {
    pub keyword: Option<String>,
    pub tag_id: Option<i64>,
}

impl ArticleQuery {
    fn push_filters<'a>(&'a self, qb: &mut QueryBuilder<'a, Sqlite>) {
        qb.push(" WHERE a.is_delete = FALSE AND a.status = ");
        qb.push_bind(ArticleStatus::Published.code());
        if let Some(keyword) = self.keyword.as_deref().filter(|k| !k.is_empty()) {
            let pattern = format!("%{}%", escape_like(keyword));
            qb.push(" AND (a.title LIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" ESCAPE '\\' OR a.content LIKE ");
            qb.push_bind(pattern);
            qb.push(" ESCAPE '\\')");
        }
        if let Some(tag_id) = self.tag_id {
            qb.push(" AND EXISTS (SELECT 1 FROM article_tags t WHERE t.article_id = a.id AND t.tag_id = ");
            qb.push_bind(tag_id);
            qb.push(")");
        }
    }
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

impl Db {
    pub async fn count_published(&self, query: &ArticleQuery) -> anyhow::Result<i64> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM articles a");
        query.push_filters(&mut qb);
        let total = qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(total)
    }

    /// 已发布且未删除的文章，按发布时间倒序
    pub async fn list_published(
        &self,
        query: &ArticleQuery,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Article>> {
        let mut qb = QueryBuilder::<Sqlite>::new(ARTICLE_SELECT);
        query.push_filters(&mut qb);
        qb.push(" ORDER BY a.create_time DESC, a.id DESC LIMIT ");
        qb.push_bind(limit);
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let rows = qb.build_query_as::<SqlArticle>().fetch_all(&self.pool).await?;
        self.attach_tags(rows).await
    }

    /// 热门文章：read_count + comment_count * 2
    pub async fn hot_articles(&self, limit: i64) -> anyhow::Result<Vec<Article>> {
        let rows = sqlx::query_as::<_, SqlArticle>(&format!(
            r#"{}
            WHERE a.is_delete = FALSE AND a.status = ?
            ORDER BY (a.read_count + a.comment_count * 2) DESC, a.create_time DESC
            LIMIT ?"#,
            ARTICLE_SELECT
        ))
        .bind(ArticleStatus::Published.code())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        self.attach_tags(rows).await
    }

    pub async fn get_published_article(&self, id: i64) -> anyhow::Result<Option<Article>> {
        let row = sqlx::query_as::<_, SqlArticle>(&format!(
            "{} WHERE a.id = ? AND a.is_delete = FALSE AND a.status = ?",
            ARTICLE_SELECT
        ))
        .bind(id)
        .bind(ArticleStatus::Published.code())
        .fetch_optional(&self.pool)
        .await?;

        Ok(self.attach_tags(row.into_iter().collect()).await?.pop())
    }

    /// 作者自己的未删除文章 (不限发布状态)
    pub async fn get_owned_article(&self, id: i64, user_id: i64) -> anyhow::Result<Option<Article>> {
        let row = sqlx::query_as::<_, SqlArticle>(&format!(
            "{} WHERE a.id = ? AND a.user_id = ? AND a.is_delete = FALSE",
            ARTICLE_SELECT
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(self.attach_tags(row.into_iter().collect()).await?.pop())
    }

    pub async fn list_author_articles(&self, user_id: i64) -> anyhow::Result<Vec<Article>> {
        let rows = sqlx::query_as::<_, SqlArticle>(&format!(
            r#"{}
            WHERE a.user_id = ? AND a.is_delete = FALSE AND a.status = ?
            ORDER BY a.create_time DESC, a.id DESC"#,
            ARTICLE_SELECT
        ))
        .bind(user_id)
        .bind(ArticleStatus::Published.code())
        .fetch_all(&self.pool)
        .await?;

        self.attach_tags(rows).await
    }

    pub async fn create_article(&self, user_id: i64, draft: &ArticleDraft) -> anyhow::Result<Article> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now().naive_utc();

        let id = sqlx::query(
            r#"
            INSERT INTO articles (title, content, status, user_id, create_time, update_time)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&draft.title)
        .bind(&draft.content)
        .bind(ArticleStatus::Published.code())
        .bind(user_id)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        replace_tags(&mut tx, id, &draft.tag_ids).await?;
        tx.commit().await?;

        self.get_owned_article(id, user_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("article {} vanished after insert", id))
    }

    pub async fn update_article(
        &self,
        id: i64,
        user_id: i64,
        draft: &ArticleDraft,
    ) -> anyhow::Result<Article> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE articles
            SET title = ?, content = ?, update_time = ?
            WHERE id = ? AND user_id = ? AND is_delete = FALSE
            "#,
        )
        .bind(&draft.title)
        .bind(&draft.content)
        .bind(Utc::now().naive_utc())
        .bind(id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if updated == 0 {
            return Err(DomainError::NotFound("article").into());
        }

        replace_tags(&mut tx, id, &draft.tag_ids).await?;
        tx.commit().await?;

        self.get_owned_article(id, user_id)
            .await?
            .ok_or_else(|| DomainError::NotFound("article").into())
    }

    /// 逻辑删除
    pub async fn soft_delete_article(&self, id: i64, user_id: i64) -> anyhow::Result<bool> {
        let updated = sqlx::query(
            r#"
            UPDATE articles SET is_delete = TRUE, update_time = ?
            WHERE id = ? AND user_id = ? AND is_delete = FALSE
            "#,
        )
        .bind(Utc::now().naive_utc())
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(updated > 0)
    }

    /// 原子自增，不在应用内存里读改写
    pub async fn increment_read_count(&self, id: i64) -> anyhow::Result<()> {
        sqlx::query("UPDATE articles SET read_count = read_count + 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn read_count(&self, id: i64) -> anyhow::Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT read_count FROM articles WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// (文章数, 阅读总数, 评论总数)
    pub async fn author_totals(&self, user_id: i64) -> anyhow::Result<(i64, i64, i64)> {
        let totals: (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COALESCE(SUM(read_count), 0), COALESCE(SUM(comment_count), 0)
            FROM articles
            WHERE user_id = ? AND is_delete = FALSE AND status = ?
            "#,
        )
        .bind(user_id)
        .bind(ArticleStatus::Published.code())
        .fetch_one(&self.pool)
        .await?;
        Ok(totals)
    }

    async fn attach_tags(&self, rows: Vec<SqlArticle>) -> anyhow::Result<Vec<Article>> {
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let mut tags = self.tags_for_articles(&ids).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let article_tags = tags.remove(&row.id).unwrap_or_default();
                row.into_article(article_tags)
            })
            .collect())
    }
}

async fn replace_tags(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    article_id: i64,
    tag_ids: &[i64],
) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM article_tags WHERE article_id = ?")
        .bind(article_id)
        .execute(&mut **tx)
        .await?;
    for tag_id in tag_ids {
        sqlx::query("INSERT OR IGNORE INTO article_tags (article_id, tag_id) VALUES (?, ?)")
            .bind(article_id)
            .bind(tag_id)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seed(db: &Db) -> (i64, Vec<i64>) {
        let owner = db.create_user("owner", "owner@example.org", "x").await.unwrap();
        let rust = db.create_tag("rust").await.unwrap().unwrap();
        let go = db.create_tag("go").await.unwrap().unwrap();
        (owner.id, vec![rust.id, go.id])
    }

    fn draft(title: &str, content: &str, tag_ids: Vec<i64>) -> ArticleDraft {
        ArticleDraft {
            title: title.into(),
            content: content.into(),
            tag_ids,
        }
    }

    #[tokio::test]
    async fn test_listing_filters_and_order() {
        let db = Db::memory().await;
        let (owner, tags) = seed(&db).await;

        let first = db.create_article(owner, &draft("Ownership", "borrowck 100%", vec![tags[0]])).await.unwrap();
        let second = db.create_article(owner, &draft("Goroutines", "channels", vec![tags[1]])).await.unwrap();
        let third = db.create_article(owner, &draft("Async", "tokio and channels", tags.clone())).await.unwrap();
        assert!(db.soft_delete_article(second.id, owner).await.unwrap());

        let all = ArticleQuery::default();
        assert_eq!(db.count_published(&all).await.unwrap(), 2);
        let listed: Vec<i64> = db.list_published(&all, 6, 0).await.unwrap().iter().map(|a| a.id).collect();
        assert_eq!(listed, vec![third.id, first.id]);

        let by_keyword = ArticleQuery {
            keyword: Some("channels".into()),
            tag_id: None,
        };
        let found = db.list_published(&by_keyword, 6, 0).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, third.id);
        assert_eq!(found[0].tags.len(), 2);

        // % 按字面量匹配
        let literal = ArticleQuery {
            keyword: Some("100%".into()),
            tag_id: None,
        };
        assert_eq!(db.count_published(&literal).await.unwrap(), 1);

        let by_tag = ArticleQuery {
            keyword: None,
            tag_id: Some(tags[1]),
        };
        let found = db.list_published(&by_tag, 6, 0).await.unwrap();
        assert_eq!(found.iter().map(|a| a.id).collect::<Vec<_>>(), vec![third.id]);

        assert_eq!(db.list_published(&all, 1, 1).await.unwrap()[0].id, first.id);
    }

    #[tokio::test]
    async fn test_update_requires_owner() {
        let db = Db::memory().await;
        let (owner, tags) = seed(&db).await;
        let other = db.create_user("other", "other@example.org", "x").await.unwrap();
        let article = db.create_article(owner, &draft("T", "C", vec![tags[0]])).await.unwrap();

        let err = db
            .update_article(article.id, other.id, &draft("X", "Y", vec![tags[1]]))
            .await
            .unwrap_err();
        assert_eq!(err.downcast_ref::<DomainError>(), Some(&DomainError::NotFound("article")));

        let updated = db
            .update_article(article.id, owner, &draft("T2", "C2", vec![tags[1]]))
            .await
            .unwrap();
        assert_eq!(updated.title, "T2");
        assert_eq!(updated.tags.iter().map(|t| t.id).collect::<Vec<_>>(), vec![tags[1]]);

        assert!(!db.soft_delete_article(article.id, other.id).await.unwrap());
        assert!(db.soft_delete_article(article.id, owner).await.unwrap());
        assert!(db.get_published_article(article.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_counters_and_hot_articles() {
        let db = Db::memory().await;
        let (owner, tags) = seed(&db).await;
        let quiet = db.create_article(owner, &draft("Quiet", "c", vec![tags[0]])).await.unwrap();
        let busy = db.create_article(owner, &draft("Busy", "c", vec![tags[0]])).await.unwrap();

        for _ in 0..3 {
            db.increment_read_count(quiet.id).await.unwrap();
        }
        db.create_comment(busy.id, owner, "a", None).await.unwrap();
        db.create_comment(busy.id, owner, "b", None).await.unwrap();

        assert_eq!(db.read_count(quiet.id).await.unwrap(), 3);
        let hot: Vec<i64> = db.hot_articles(5).await.unwrap().iter().map(|a| a.id).collect();
        assert_eq!(hot, vec![busy.id, quiet.id]);
        assert_eq!(db.author_totals(owner).await.unwrap(), (2, 3, 2));
    }
}
