use crate::Db;
use chrono::NaiveDate;
use std::collections::HashMap;

fn day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

impl Db {
    /// 当天访问量原子 +1，当天记录不存在时先创建
    pub async fn record_visit(&self, date: NaiveDate) -> anyhow::Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO daily_visit_stats (date, visit_count)
            VALUES (?, 1)
            ON CONFLICT(date) DO UPDATE SET visit_count = visit_count + 1
            RETURNING visit_count
            "#,
        )
        .bind(day_key(date))
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// 保证当天存在一条记录 (访问量为 0)，已存在时不做任何修改
    pub async fn ensure_day(&self, date: NaiveDate) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO daily_visit_stats (date, visit_count) VALUES (?, 0) ON CONFLICT(date) DO NOTHING",
        )
        .bind(day_key(date))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn visit_count(&self, date: NaiveDate) -> anyhow::Result<i64> {
        let count: Option<i64> =
            sqlx::query_scalar("SELECT visit_count FROM daily_visit_stats WHERE date = ?")
                .bind(day_key(date))
                .fetch_optional(&self.pool)
                .await?;
        Ok(count.unwrap_or(0))
    }

    pub async fn total_visits(&self) -> anyhow::Result<i64> {
        let total: i64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(visit_count), 0) FROM daily_visit_stats")
                .fetch_one(&self.pool)
                .await?;
        Ok(total)
    }

    pub async fn visits_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> anyhow::Result<HashMap<NaiveDate, i64>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT date, visit_count FROM daily_visit_stats WHERE date BETWEEN ? AND ?",
        )
        .bind(day_key(start))
        .bind(day_key(end))
        .fetch_all(&self.pool)
        .await?;

        let mut by_day = HashMap::with_capacity(rows.len());
        for (day, count) in rows {
            match NaiveDate::parse_from_str(&day, "%Y-%m-%d") {
                Ok(d) => {
                    by_day.insert(d, count);
                }
                Err(e) => tracing::warn!("Skipping unparsable visit day {:?}: {}", day, e),
            }
        }
        Ok(by_day)
    }
}
