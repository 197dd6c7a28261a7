use axum::{extract::State, routing::get, Json, Router};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use time::{Date, Month};
use tracing::instrument;

use super::repo::{self, DayCounts};
use crate::{
    auth::AuthUser,
    error::{method_not_allowed, ApiError, ApiResult},
    extract::QueryParams,
    response::Envelope,
    state::AppState,
    wire::ymd,
};

lazy_static! {
    static ref YEAR_MONTH: Regex = Regex::new(r"^(\d{4})-(\d{2})$").unwrap();
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/calendar", get(month_summary).fallback(method_not_allowed))
}

#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    #[serde(default)]
    pub month: Option<String>,
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySummary {
    #[serde(with = "ymd")]
    pub date: Date,
    pub has_tasks: bool,
    pub pending: i64,
    pub completed: i64,
}

impl From<DayCounts> for DaySummary {
    fn from(d: DayCounts) -> Self {
        Self {
            date: d.date,
            has_tasks: d.pending + d.completed > 0,
            pending: d.pending,
            completed: d.completed,
        }
    }
}

/// `YYYY-MM` into the first day of that month and of the following one.
pub fn month_bounds(raw: &str) -> Result<(Date, Date), ApiError> {
    let bad = || ApiError::BadRequest(format!("invalid month {raw:?}, expected YYYY-MM"));

    let caps = YEAR_MONTH.captures(raw.trim()).ok_or_else(bad)?;
    let year: i32 = caps[1].parse().map_err(|_| bad())?;
    let month: u8 = caps[2].parse().map_err(|_| bad())?;
    let month = Month::try_from(month).map_err(|_| bad())?;

    let first = Date::from_calendar_date(year, month, 1).map_err(|_| bad())?;
    let next_year = if month == Month::December { year + 1 } else { year };
    let next = Date::from_calendar_date(next_year, month.next(), 1).map_err(|_| bad())?;
    Ok((first, next))
}

#[instrument(skip(state, query), fields(user_id = auth.user_id))]
pub async fn month_summary(
    State(state): State<AppState>,
    auth: AuthUser,
    QueryParams(query): QueryParams<MonthQuery>,
) -> ApiResult<Json<Envelope<Vec<DaySummary>>>> {
    let month = query
        .month
        .ok_or_else(|| ApiError::BadRequest("month is required (YYYY-MM)".into()))?;
    let (from, until) = month_bounds(&month)?;
    let db = state.db.pool().await?;

    let days = repo::day_counts(&db, auth.user_id, from, until).await?;
    Ok(Json(Envelope::data(days.into_iter().map(Into::into).collect())))
}
