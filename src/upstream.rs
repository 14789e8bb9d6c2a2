use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::fixture::{FixtureId, MatchEvent};
use crate::http_client::http_client;

const API_KEY_HEADER: &str = "x-apisports-key";

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {endpoint} failed: {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("upstream returned {status} for {endpoint}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("invalid json from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
}

/// What the polling loop needs from the data provider.
pub trait FixtureSource: Send + Sync {
    /// Fixtures for `date` (`YYYY-MM-DD`), or every in-play fixture when
    /// `live_only` is set.
    fn list_fixtures(&self, date: &str, live_only: bool) -> Result<Vec<Value>, UpstreamError>;

    fn list_events(&self, fixture_id: FixtureId) -> Result<Vec<MatchEvent>, UpstreamError>;
}

/// Blocking API-Sports client. Call from the poller thread or inside
/// `spawn_blocking`.
#[derive(Debug, Clone)]
pub struct ApiSportsClient {
    base: String,
    key: String,
    timezone: String,
}

impl ApiSportsClient {
    pub fn new(base: impl Into<String>, key: impl Into<String>, timezone: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            key: key.into(),
            timezone: timezone.into(),
        }
    }

    /// `None` when no API key is configured.
    pub fn from_config(config: &Config) -> Option<Self> {
        let key = config.api_key.as_ref()?;
        Some(Self::new(&config.api_base, key, &config.timezone))
    }

    /// GETs `endpoint` and returns its `response` array.
    pub fn get(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
        with_tz: bool,
    ) -> Result<Vec<Value>, UpstreamError> {
        let client = http_client().map_err(UpstreamError::Client)?;

        let mut query: Vec<(&str, String)> = Vec::with_capacity(params.len() + 1);
        if with_tz {
            query.push(("timezone", self.timezone.clone()));
        }
        query.extend(params.iter().cloned());
        debug!(endpoint, ?query, "upstream fetch");

        let url = format!("{}{}", self.base, endpoint);
        let resp = client
            .get(&url)
            .header(API_KEY_HEADER, &self.key)
            .query(&query)
            .send()
            .map_err(|source| UpstreamError::Request {
                endpoint: endpoint.to_string(),
                source,
            })?;

        let status = resp.status();
        let body = resp.text().map_err(|source| UpstreamError::Request {
            endpoint: endpoint.to_string(),
            source,
        })?;
        if !status.is_success() {
            return Err(UpstreamError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        parse_response_json(&body).map_err(|source| UpstreamError::Decode {
            endpoint: endpoint.to_string(),
            source,
        })
    }

    pub fn fixtures_by_date(&self, date: &str) -> Result<Vec<Value>, UpstreamError> {
        self.get("/fixtures", &[("date", date.to_string())], true)
    }

    pub fn live_fixtures(&self) -> Result<Vec<Value>, UpstreamError> {
        self.get("/fixtures", &[("live", "all".to_string())], true)
    }

    pub fn fixture_by_id(&self, id: &str) -> Result<Vec<Value>, UpstreamError> {
        self.get("/fixtures", &[("id", id.to_string())], true)
    }

    pub fn events(&self, fixture_id: FixtureId) -> Result<Vec<MatchEvent>, UpstreamError> {
        let raw = self.get(
            "/fixtures/events",
            &[("fixture", fixture_id.to_string())],
            false,
        )?;
        Ok(parse_events(raw))
    }

    pub fn statistics(
        &self,
        fixture_id: FixtureId,
        half: Option<u8>,
    ) -> Result<Vec<Value>, UpstreamError> {
        let mut params = vec![("fixture", fixture_id.to_string())];
        if let Some(half) = half {
            params.push(("half", half.to_string()));
        }
        self.get("/fixtures/statistics", &params, false)
    }

    /// Full-match statistics, falling back to both halves concatenated when
    /// the provider has nothing for the whole match yet.
    pub fn statistics_with_halves(&self, fixture_id: FixtureId) -> Result<Vec<Value>, UpstreamError> {
        let stats = self.statistics(fixture_id, None)?;
        if !stats.is_empty() {
            return Ok(stats);
        }
        let mut halves = self.statistics(fixture_id, Some(1))?;
        halves.extend(self.statistics(fixture_id, Some(2))?);
        Ok(halves)
    }

    pub fn head_to_head(&self, pair: &str) -> Result<Vec<Value>, UpstreamError> {
        self.get("/fixtures/headtohead", &[("h2h", pair.to_string())], false)
    }

    pub fn team_form(&self, team: u64, last: u32) -> Result<Vec<Value>, UpstreamError> {
        self.get(
            "/fixtures",
            &[("team", team.to_string()), ("last", last.to_string())],
            true,
        )
    }

    pub fn standings(&self, league: u64, season: u32) -> Result<Vec<Value>, UpstreamError> {
        self.get(
            "/standings",
            &[("league", league.to_string()), ("season", season.to_string())],
            false,
        )
    }

    pub fn leagues(&self, params: &[(&str, String)]) -> Result<Vec<Value>, UpstreamError> {
        self.get("/leagues", params, false)
    }
}

impl FixtureSource for ApiSportsClient {
    fn list_fixtures(&self, date: &str, live_only: bool) -> Result<Vec<Value>, UpstreamError> {
        if live_only {
            self.live_fixtures()
        } else {
            self.fixtures_by_date(date)
        }
    }

    fn list_events(&self, fixture_id: FixtureId) -> Result<Vec<MatchEvent>, UpstreamError> {
        self.events(fixture_id)
    }
}

/// Extracts the `response` array from an API-Sports body. Blank and `null`
/// bodies, or bodies without a `response` array, yield an empty list.
pub fn parse_response_json(raw: &str) -> Result<Vec<Value>, serde_json::Error> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let root: Value = serde_json::from_str(trimmed)?;
    if let Some(errors) = root.get("errors").filter(|e| has_entries(e)) {
        warn!("upstream reported errors: {errors}");
    }
    match root {
        Value::Object(mut map) => match map.remove("response") {
            Some(Value::Array(items)) => Ok(items),
            _ => Ok(Vec::new()),
        },
        _ => Ok(Vec::new()),
    }
}

/// Deserializes events one by one; entries that do not fit are dropped.
pub fn parse_events(raw: Vec<Value>) -> Vec<MatchEvent> {
    raw.into_iter()
        .filter_map(|value| match serde_json::from_value::<MatchEvent>(value) {
            Ok(event) => Some(event),
            Err(err) => {
                debug!("skipping malformed event: {err}");
                None
            }
        })
        .collect()
}

fn has_entries(value: &Value) -> bool {
    match value {
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::String(s) => !s.trim().is_empty(),
        _ => false,
    }
}
