use crate::{models::SqlSession, Db};
use chrono::{NaiveDateTime, Utc};
use domain::access::AuthUser;

/// 一条未过期的会话：原始 JSON 数据 + 登录用户 (匿名会话为 None)
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: String,
    pub data: String,
    pub expires_at: NaiveDateTime,
    pub user: Option<AuthUser>,
}

impl Db {
    /// 插入或覆盖整条会话 (登录/登出时会话 id 会被轮换)
    pub async fn save_session(
        &self,
        id: &str,
        user_id: Option<i64>,
        data: &str,
        expires_at: NaiveDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions (id, user_id, data, expires_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                user_id = excluded.user_id,
                data = excluded.data,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(data)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn load_session(&self, id: &str) -> anyhow::Result<Option<SessionRecord>> {
        let row = sqlx::query_as::<_, SqlSession>(
            r#"
            SELECT s.id, s.data, s.expires_at, u.id AS user_id, u.username, u.is_superuser
            FROM sessions s
            LEFT JOIN users u ON u.id = s.user_id
            WHERE s.id = ? AND s.expires_at > ?
            "#,
        )
        .bind(id)
        .bind(Utc::now().naive_utc())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| {
            let user = r.auth_user();
            SessionRecord {
                id: r.id,
                data: r.data,
                expires_at: r.expires_at,
                user,
            }
        }))
    }

    pub async fn delete_session(&self, id: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn purge_expired_sessions(&self) -> anyhow::Result<u64> {
        let purged = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(Utc::now().naive_utc())
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use crate::Db;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_session_lifecycle() {
        let db = Db::memory().await;
        let user = db.create_user("ferris", "ferris@example.org", "x").await.unwrap();
        let later = Utc::now().naive_utc() + Duration::hours(1);

        db.save_session("anon", None, "{}", later).await.unwrap();
        let anon = db.load_session("anon").await.unwrap().unwrap();
        assert!(anon.user.is_none());

        db.save_session("anon", Some(user.id), r#"{"k":1}"#, later).await.unwrap();
        let logged_in = db.load_session("anon").await.unwrap().unwrap();
        assert_eq!(logged_in.data, r#"{"k":1}"#);
        let auth = logged_in.user.unwrap();
        assert_eq!((auth.id, auth.username.as_str()), (user.id, "ferris"));

        db.delete_session("anon").await.unwrap();
        assert!(db.load_session("anon").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_sessions_are_invisible_and_purged() {
        let db = Db::memory().await;
        let past = Utc::now().naive_utc() - Duration::seconds(5);
        db.save_session("old", None, "{}", past).await.unwrap();

        assert!(db.load_session("old").await.unwrap().is_none());
        assert_eq!(db.purge_expired_sessions().await.unwrap(), 1);
    }
}
