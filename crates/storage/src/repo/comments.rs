use crate::{
    models::{SqlComment, SqlNotification},
    Db,
};
use chrono::Utc;
use domain::{
    threading::{ParentRef, Threading},
    Comment, DomainError, Notification, NotificationKind,
};

pub(crate) const COMMENT_SELECT: &str = r#"
    SELECT
        c.id,
        c.article_id,
        c.user_id,
        COALESCE(NULLIF(u.first_name, ''), u.username) AS author_name,
        u.avatar AS author_avatar,
        u.is_guest AS author_is_guest,
        c.content,
        c.parent_id,
        c.root_id,
        c.depth,
        COALESCE(NULLIF(pu.first_name, ''), pu.username) AS reply_to_name,
        c.create_time
    FROM comments c
    JOIN users u ON u.id = c.user_id
    LEFT JOIN comments p ON p.id = c.parent_id
    LEFT JOIN users pu ON pu.id = p.user_id
"#;

impl Db {
    /// 写入评论并对文章评论数做原子自增。
    /// 父评论只在同一篇文章内查找，找不到时返回 `DomainError::NotFound` 且不写入任何数据。
    pub async fn create_comment(
        &self,
        article_id: i64,
        user_id: i64,
        content: &str,
        parent_id: Option<i64>,
    ) -> anyhow::Result<Comment> {
        let mut tx = self.pool.begin().await?;

        let parent = match parent_id {
            None => None,
            Some(pid) => {
                let row: Option<(i64, Option<i64>, i64)> = sqlx::query_as(
                    "SELECT id, root_id, depth FROM comments WHERE id = ? AND article_id = ?",
                )
                .bind(pid)
                .bind(article_id)
                .fetch_optional(&mut *tx)
                .await?;
                match row {
                    Some((id, root_id, depth)) => Some(ParentRef {
                        id,
                        root_id,
                        depth: u32::try_from(depth).unwrap_or(0),
                    }),
                    None => return Err(DomainError::NotFound("parent comment").into()),
                }
            }
        };
        let threading = Threading::for_reply(parent.as_ref());

        let now = Utc::now().naive_utc();
        let id = sqlx::query(
            r#"
            INSERT INTO comments (
                article_id, user_id, content,
                root_id, parent_id, depth,
                create_time, update_time
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(article_id)
        .bind(user_id)
        .bind(content)
        .bind(threading.root_id)
        .bind(threading.parent_id)
        .bind(i64::from(threading.depth))
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        sqlx::query("UPDATE articles SET comment_count = comment_count + 1 WHERE id = ?")
            .bind(article_id)
            .execute(&mut *tx)
            .await?;

        let comment = sqlx::query_as::<_, SqlComment>(&format!("{} WHERE c.id = ?", COMMENT_SELECT))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(comment.into())
    }

    pub async fn get_comment(&self, comment_id: i64) -> anyhow::Result<Option<Comment>> {
        let row = sqlx::query_as::<_, SqlComment>(&format!("{} WHERE c.id = ?", COMMENT_SELECT))
            .bind(comment_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    /// 按时间升序返回，满足评论树构建的前提
    pub async fn list_comments(&self, article_id: i64) -> anyhow::Result<Vec<Comment>> {
        let rows = sqlx::query_as::<_, SqlComment>(&format!(
            "{} WHERE c.article_id = ? ORDER BY c.create_time ASC, c.id ASC",
            COMMENT_SELECT
        ))
        .bind(article_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// 互动通知：他人评论了我的文章，或他人回复了我的评论
    pub async fn list_notifications(
        &self,
        user_id: i64,
        limit: i64,
    ) -> anyhow::Result<Vec<Notification>> {
        let sql = format!(
            r#"
            SELECT * FROM (
                SELECT
                    sub.*,
                    a.title AS article_title,
                    a.user_id AS article_owner_id
                FROM ({}) sub
                JOIN articles a ON a.id = sub.article_id
                LEFT JOIN comments parent ON parent.id = sub.parent_id
                WHERE (a.user_id = ?1 OR parent.user_id = ?1)
                  AND sub.user_id != ?1
            )
            ORDER BY create_time DESC, id DESC
            LIMIT ?2
            "#,
            COMMENT_SELECT
        );
        let rows = sqlx::query_as::<_, SqlNotification>(&sql)
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let kind = if row.article_owner_id == user_id {
                    NotificationKind::ArticleComment
                } else {
                    NotificationKind::CommentReply
                };
                Notification {
                    kind,
                    article_id: row.comment.article_id,
                    article_title: row.article_title,
                    comment: row.comment.into(),
                }
            })
            .collect())
    }
}
