use crate::{models::SqlUser, Db};
use chrono::{NaiveDate, Utc};
use domain::User;
use std::collections::HashMap;

const USER_SELECT: &str = r#"
    SELECT
        id, username, email, password_hash, first_name,
        avatar, is_guest, is_superuser, date_joined
    FROM users
"#;

impl Db {
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> anyhow::Result<User> {
        let id = sqlx::query(
            r#"
            INSERT INTO users (username, email, password_hash, date_joined)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(Utc::now().naive_utc())
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        self.get_user(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("user {} vanished after insert", id))
    }

    pub async fn get_user(&self, id: i64) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, SqlUser>(&format!("{} WHERE id = ?", USER_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    /// 先按用户名查，不存在再按邮箱查；返回用户及密码哈希 (游客没有可用密码)
    pub async fn find_login_user(
        &self,
        username_or_email: &str,
    ) -> anyhow::Result<Option<(User, Option<String>)>> {
        let mut row = sqlx::query_as::<_, SqlUser>(&format!("{} WHERE username = ?", USER_SELECT))
            .bind(username_or_email)
            .fetch_optional(&self.pool)
            .await?;
        if row.is_none() {
            row = sqlx::query_as::<_, SqlUser>(&format!("{} WHERE email = ?", USER_SELECT))
                .bind(username_or_email)
                .fetch_optional(&self.pool)
                .await?;
        }

        Ok(row.map(|mut r| {
            let hash = r.password_hash.take();
            (r.into(), hash)
        }))
    }

    pub async fn username_exists(&self, username: &str) -> anyhow::Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = ?)")
                .bind(username)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    pub async fn email_exists(&self, email: &str) -> anyhow::Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = ?)")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    /// 游客账号：不存在则创建 (无可用密码)，存在则同步最新昵称
    pub async fn upsert_guest(&self, username: &str, guest_name: &str) -> anyhow::Result<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO users (username, first_name, is_guest, date_joined)
            VALUES (?, ?, TRUE, ?)
            ON CONFLICT(username) DO UPDATE SET first_name = excluded.first_name
            RETURNING id
            "#,
        )
        .bind(username)
        .bind(guest_name)
        .bind(Utc::now().naive_utc())
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    pub async fn promote_superuser(&self, username: &str) -> anyhow::Result<bool> {
        let updated = sqlx::query(
            "UPDATE users SET is_superuser = TRUE WHERE username = ? AND is_guest = FALSE",
        )
        .bind(username)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(updated > 0)
    }

    pub async fn update_avatar(&self, user_id: i64, avatar: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET avatar = ? WHERE id = ?")
            .bind(avatar)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn count_users(&self) -> anyhow::Result<i64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    /// [start, end] 闭区间内每天的注册人数
    pub async fn registrations_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> anyhow::Result<HashMap<NaiveDate, i64>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT date(date_joined) AS day, COUNT(*) AS total
            FROM users
            WHERE date(date_joined) BETWEEN ? AND ?
            GROUP BY day
            "#,
        )
        .bind(start.format("%Y-%m-%d").to_string())
        .bind(end.format("%Y-%m-%d").to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut by_day = HashMap::new();
        for (day, total) in rows {
            match NaiveDate::parse_from_str(&day, "%Y-%m-%d") {
                Ok(d) => {
                    by_day.insert(d, total);
                }
                Err(e) => tracing::warn!("Skipping unparsable registration day {:?}: {}", day, e),
            }
        }
        Ok(by_day)
    }
}

#[cfg(test)]
mod tests {
    use crate::Db;
    use chrono::Utc;

    #[tokio::test]
    async fn test_login_lookup_by_username_then_email() {
        let db = Db::memory().await;
        let user = db.create_user("ferris", "ferris@example.org", "hash").await.unwrap();
        assert!(!user.is_superuser);

        let (by_name, hash) = db.find_login_user("ferris").await.unwrap().unwrap();
        assert_eq!(by_name.id, user.id);
        assert_eq!(hash.as_deref(), Some("hash"));

        let (by_email, _) = db.find_login_user("ferris@example.org").await.unwrap().unwrap();
        assert_eq!(by_email.id, user.id);

        assert!(db.find_login_user("nobody").await.unwrap().is_none());
        assert!(db.username_exists("ferris").await.unwrap());
        assert!(db.email_exists("ferris@example.org").await.unwrap());
        assert!(!db.email_exists("crab@example.org").await.unwrap());
    }

    #[tokio::test]
    async fn test_guest_upsert_keeps_one_row() {
        let db = Db::memory().await;
        let a = db.upsert_guest("guest_0123456789abcdef", "Ferris").await.unwrap();
        let b = db.upsert_guest("guest_0123456789abcdef", "Ferris 2").await.unwrap();
        assert_eq!(a, b);

        let guest = db.get_user(a).await.unwrap().unwrap();
        assert!(guest.is_guest);
        assert_eq!(guest.display_name(), "Ferris 2");

        let (_, hash) = db.find_login_user("guest_0123456789abcdef").await.unwrap().unwrap();
        assert!(hash.is_none());
        // 游客不能被提升为站长
        assert!(!db.promote_superuser("guest_0123456789abcdef").await.unwrap());
    }

    #[tokio::test]
    async fn test_registration_counts() {
        let db = Db::memory().await;
        db.create_user("a1", "a1@example.org", "x").await.unwrap();
        db.create_user("a2", "a2@example.org", "x").await.unwrap();

        let today = Utc::now().date_naive();
        let counts = db.registrations_between(today, today).await.unwrap();
        assert_eq!(counts.get(&today), Some(&2));
        assert_eq!(db.count_users().await.unwrap(), 2);

        assert!(db.promote_superuser("a1").await.unwrap());
        let (a1, _) = db.find_login_user("a1").await.unwrap().unwrap();
        assert!(a1.is_superuser);
    }
}
