use crate::{
    models::{SqlArticleTag, SqlTag, SqlTagWithCount},
    Db,
};
use chrono::Utc;
use domain::{ArticleStatus, Tag, TagName, TagWithCount};
use sqlx::{QueryBuilder, Sqlite};
use std::collections::HashMap;

impl Db {
    /// 标签已存在时返回 None
    pub async fn create_tag(&self, name: &str) -> anyhow::Result<Option<Tag>> {
        let now = Utc::now().naive_utc();
        let result = sqlx::query(
            r#"
            INSERT INTO tags (name, create_time, update_time)
            VALUES (?, ?, ?)
            ON CONFLICT(name) DO NOTHING
            "#,
        )
        .bind(name)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some(Tag {
            id: result.last_insert_rowid(),
            name: TagName::new_unchecked(name.to_string()),
        }))
    }

    pub async fn delete_tag(&self, id: i64) -> anyhow::Result<bool> {
        let deleted = sqlx::query("DELETE FROM tags WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(deleted > 0)
    }

    pub async fn get_tag(&self, id: i64) -> anyhow::Result<Option<Tag>> {
        let row = sqlx::query_as::<_, SqlTag>("SELECT id, name FROM tags WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    /// 所有标签及关联文章数 (不区分文章状态)，按名称排序
    pub async fn list_tags(&self) -> anyhow::Result<Vec<TagWithCount>> {
        let rows = sqlx::query_as::<_, SqlTagWithCount>(
            r#"
            SELECT t.id, t.name, COUNT(DISTINCT atg.article_id) AS article_total
            FROM tags t
            LEFT JOIN article_tags atg ON atg.tag_id = t.id
            GROUP BY t.id, t.name
            ORDER BY t.name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// 热门标签：按已发布文章数排序，只取有文章的
    pub async fn hot_tags(&self, limit: i64) -> anyhow::Result<Vec<TagWithCount>> {
        let rows = sqlx::query_as::<_, SqlTagWithCount>(
            r#"
            SELECT t.id, t.name, COUNT(DISTINCT a.id) AS article_total
            FROM tags t
            JOIN article_tags atg ON atg.tag_id = t.id
            JOIN articles a ON a.id = atg.article_id AND a.is_delete = FALSE AND a.status = ?
            GROUP BY t.id, t.name
            HAVING COUNT(DISTINCT a.id) > 0
            ORDER BY article_total DESC, t.name ASC
            LIMIT ?
            "#,
        )
        .bind(ArticleStatus::Published.code())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// 过滤出真实存在的标签 id
    pub async fn existing_tag_ids(&self, ids: &[i64]) -> anyhow::Result<Vec<i64>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT id FROM tags WHERE id IN (");
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY id");
        let found = qb.build_query_scalar::<i64>().fetch_all(&self.pool).await?;
        Ok(found)
    }

    pub(crate) async fn tags_for_articles(
        &self,
        article_ids: &[i64],
    ) -> anyhow::Result<HashMap<i64, Vec<Tag>>> {
        let mut by_article: HashMap<i64, Vec<Tag>> = HashMap::new();
        if article_ids.is_empty() {
            return Ok(by_article);
        }

        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT atg.article_id, t.id, t.name FROM article_tags atg JOIN tags t ON t.id = atg.tag_id WHERE atg.article_id IN (",
        );
        let mut separated = qb.separated(", ");
        for id in article_ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY t.name");

        let rows = qb.build_query_as::<SqlArticleTag>().fetch_all(&self.pool).await?;
        for row in rows {
            by_article.entry(row.article_id).or_default().push(Tag {
                id: row.id,
                name: TagName::new_unchecked(row.name),
            });
        }
        Ok(by_article)
    }
}
