use axum::{extract::State, Json};
use chrono::Utc;
use domain::stats::{daily_trend, trend_start, TREND_DAYS};
use serde_json::{json, Value};

use crate::{error::AppResult, state::AppState};

/// 最近 14 天访问与注册趋势
pub async fn dashboard(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let db = &state.db;
    let end = Utc::now().date_naive();
    let start = trend_start(end, TREND_DAYS);

    let visits = daily_trend(end, TREND_DAYS, &db.visits_between(start, end).await?);
    let registrations = daily_trend(end, TREND_DAYS, &db.registrations_between(start, end).await?);

    Ok(Json(json!({
        "code": 200,
        "data": {
            "visit_dates": visits.dates,
            "visit_values": visits.values,
            "visit_cumulative_values": visits.cumulative,
            "register_values": registrations.values,
            "total_visit_count": db.total_visits().await?,
            "total_user_count": db.count_users().await?,
        },
    })))
}
