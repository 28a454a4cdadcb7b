use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::collections::HashMap;

pub const TREND_DAYS: i64 = 14;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Trend {
    /// `MM-DD`
    pub dates: Vec<String>,
    pub values: Vec<i64>,
    pub cumulative: Vec<i64>,
}

/// 以 `end` 为最后一天，向前取 `days` 天；缺失的日期按 0 计
pub fn daily_trend(end: NaiveDate, days: i64, counts: &HashMap<NaiveDate, i64>) -> Trend {
    let days = days.max(1);
    let start = end - Duration::days(days - 1);

    let mut trend = Trend {
        dates: Vec::with_capacity(days as usize),
        values: Vec::with_capacity(days as usize),
        cumulative: Vec::with_capacity(days as usize),
    };
    let mut running = 0;
    for offset in 0..days {
        let day = start + Duration::days(offset);
        let value = counts.get(&day).copied().unwrap_or(0);
        running += value;
        trend.dates.push(day.format("%m-%d").to_string());
        trend.values.push(value);
        trend.cumulative.push(running);
    }
    trend
}

pub fn trend_start(end: NaiveDate, days: i64) -> NaiveDate {
    end - Duration::days(days.max(1) - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trend_fills_gaps() {
        let end = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let mut counts = HashMap::new();
        counts.insert(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(), 4);
        counts.insert(end, 1);
        // 窗口之外的不计入
        counts.insert(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 100);

        let t = daily_trend(end, 4, &counts);
        assert_eq!(t.dates, vec!["02-28", "02-29", "03-01", "03-02"]);
        assert_eq!(t.values, vec![0, 4, 0, 1]);
        assert_eq!(t.cumulative, vec![0, 4, 4, 5]);
        assert_eq!(trend_start(end, 4), NaiveDate::from_ymd_opt(2024, 2, 28).unwrap());
    }
}
