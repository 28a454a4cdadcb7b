use crate::Db;
use chrono::{Duration, Utc};

impl Db {
    /// 每个邮箱只保留一条验证码，重复发送时覆盖
    pub async fn upsert_captcha(&self, email: &str, captcha: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO captchas (email, captcha, create_time)
            VALUES (?, ?, ?)
            ON CONFLICT(email) DO UPDATE SET
                captcha = excluded.captcha,
                create_time = excluded.create_time
            "#,
        )
        .bind(email)
        .bind(captcha)
        .bind(Utc::now().naive_utc())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// 校验并消费验证码：匹配且未过期时删除并返回 true
    pub async fn consume_captcha(
        &self,
        email: &str,
        captcha: &str,
        ttl: Duration,
    ) -> anyhow::Result<bool> {
        let threshold = Utc::now().naive_utc() - ttl;
        let deleted = sqlx::query(
            "DELETE FROM captchas WHERE email = ? AND captcha = ? AND create_time >= ?",
        )
        .bind(email)
        .bind(captcha)
        .bind(threshold)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(deleted > 0)
    }
}
