//! Pass-through endpoints over the data provider. Fixture responses are
//! enriched with the same `_effects` the live channel carries.

use std::str::FromStr;

use axum::Json;
use axum::extract::{Query, State};
use chrono::Local;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::app::AppState;
use crate::enrich::enrich_fixtures;
use crate::error::{ApiError, ApiResult};
use crate::upstream::UpstreamError;

#[derive(Debug, Default, Deserialize)]
pub struct FixturesQuery {
    pub fixture: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatisticsQuery {
    pub fixture: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct H2hQuery {
    pub h2h: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FormQuery {
    pub team: Option<String>,
    pub last: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StandingsQuery {
    pub league: Option<String>,
    pub season: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LeaguesQuery {
    pub id: Option<String>,
    pub country: Option<String>,
    pub season: Option<String>,
    pub search: Option<String>,
    pub current: Option<String>,
}

/// `GET /api/fixtures?date=YYYY-MM-DD` or `GET /api/fixtures?fixture=<id>`
pub async fn get_fixtures(
    State(state): State<AppState>,
    Query(query): Query<FixturesQuery>,
) -> ApiResult<Json<Value>> {
    let upstream = state.upstream()?;

    if let Some(id) = query.fixture.as_deref().and_then(non_empty) {
        let id = id.to_string();
        let fixtures = run_blocking(move || upstream.fixture_by_id(&id)).await?;
        let fixtures = enrich_fixtures(fixtures, &state.store);
        return Ok(Json(json!({ "ok": true, "fixtures": fixtures })));
    }

    let date = query
        .date
        .as_deref()
        .and_then(non_empty)
        .map(str::to_string)
        .unwrap_or_else(|| Local::now().format("%Y-%m-%d").to_string());
    let fetch_date = date.clone();
    let fixtures = run_blocking(move || upstream.fixtures_by_date(&fetch_date)).await?;
    let fixtures = enrich_fixtures(fixtures, &state.store);
    Ok(Json(json!({ "ok": true, "date": date, "fixtures": fixtures })))
}

/// `GET /api/statistics?fixture=<id>`
pub async fn get_statistics(
    State(state): State<AppState>,
    Query(query): Query<StatisticsQuery>,
) -> ApiResult<Json<Value>> {
    let upstream = state.upstream()?;
    let fixture: u64 = required_id(query.fixture.as_deref(), "fixture required")?;
    let stats = run_blocking(move || upstream.statistics_with_halves(fixture)).await?;
    tracing::debug!(fixture, entries = stats.len(), "statistics fetched");
    Ok(respond(stats))
}

/// `GET /api/h2h?h2h=<teamA>-<teamB>`
pub async fn get_h2h(
    State(state): State<AppState>,
    Query(query): Query<H2hQuery>,
) -> ApiResult<Json<Value>> {
    let upstream = state.upstream()?;
    let pair = query
        .h2h
        .as_deref()
        .and_then(non_empty)
        .ok_or_else(|| ApiError::BadRequest("h2h required".into()))?
        .to_string();
    let resp = run_blocking(move || upstream.head_to_head(&pair)).await?;
    Ok(respond(resp))
}

/// `GET /api/form?team=<id>&last=<n>`
pub async fn get_form(
    State(state): State<AppState>,
    Query(query): Query<FormQuery>,
) -> ApiResult<Json<Value>> {
    let upstream = state.upstream()?;
    let team: u64 = required_id(query.team.as_deref(), "team required")?;
    let last = query
        .last
        .as_deref()
        .and_then(|raw| raw.trim().parse::<u32>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(5);
    let resp = run_blocking(move || upstream.team_form(team, last)).await?;
    Ok(respond(resp))
}

/// `GET /api/standings?league=<id>&season=<year>`
pub async fn get_standings(
    State(state): State<AppState>,
    Query(query): Query<StandingsQuery>,
) -> ApiResult<Json<Value>> {
    let upstream = state.upstream()?;
    let missing = || ApiError::BadRequest("league & season required".into());
    let league: u64 = required_id(query.league.as_deref(), "").map_err(|_| missing())?;
    let season: u32 = required_id(query.season.as_deref(), "").map_err(|_| missing())?;
    let resp = run_blocking(move || upstream.standings(league, season)).await?;
    tracing::debug!(league, season, entries = resp.len(), "standings fetched");
    Ok(respond(resp))
}

/// `GET /api/leagues?id=&country=&season=&search=&current=`
pub async fn get_leagues(
    State(state): State<AppState>,
    Query(query): Query<LeaguesQuery>,
) -> ApiResult<Json<Value>> {
    let upstream = state.upstream()?;
    let params: Vec<(&'static str, String)> = [
        ("id", query.id),
        ("country", query.country),
        ("season", query.season),
        ("search", query.search),
        ("current", query.current),
    ]
    .into_iter()
    .filter_map(|(key, val)| {
        val.as_deref()
            .and_then(non_empty)
            .map(|val| (key, val.to_string()))
    })
    .collect();
    let resp = run_blocking(move || upstream.leagues(&params)).await?;
    Ok(respond(resp))
}

fn respond(response: Vec<Value>) -> Json<Value> {
    Json(json!({ "ok": true, "response": response }))
}

/// Runs a blocking upstream call off the async workers.
async fn run_blocking<T, F>(call: F) -> ApiResult<T>
where
    F: FnOnce() -> Result<T, UpstreamError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(call)
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?
        .map_err(ApiError::from)
}

/// A positive integer that fits `T`; anything else is a 400 with `message`.
fn required_id<T>(raw: Option<&str>, message: &str) -> ApiResult<T>
where
    T: FromStr + Default + PartialEq,
{
    raw.and_then(|val| val.trim().parse::<T>().ok())
        .filter(|id| *id != T::default())
        .ok_or_else(|| ApiError::BadRequest(message.to_string()))
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_must_be_positive_integers() {
        assert_eq!(required_id::<u64>(Some(" 42 "), "x").unwrap(), 42);
        assert!(required_id::<u64>(Some("0"), "x").is_err());
        assert!(required_id::<u64>(Some("-3"), "x").is_err());
        assert!(required_id::<u64>(Some("abc"), "x").is_err());
        assert!(required_id::<u64>(None, "team required").is_err());
    }

    #[test]
    fn season_out_of_range_is_rejected_not_truncated() {
        assert_eq!(required_id::<u32>(Some("2026"), "x").unwrap(), 2026);
        // u32::MAX + 2024 would wrap to 2023 under a cast.
        let err = required_id::<u32>(Some("4294969319"), "league & season required").unwrap_err();
        assert_eq!(err.to_string(), "league & season required");
    }

    #[tokio::test]
    async fn proxy_fails_fast_without_key() {
        use crate::hub::LiveHub;
        use crate::state::FixtureStore;

        let state = AppState::new(None, FixtureStore::new(), LiveHub::new(4), false);
        let result = get_h2h(State(state), Query(H2hQuery::default())).await;
        assert!(matches!(result, Err(ApiError::MissingApiKey)));
    }
}
