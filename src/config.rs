use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://v3.football.api-sports.io";
pub const DEFAULT_TIMEZONE: &str = "Europe/Istanbul";

/// Runtime settings, read once at startup from the process environment
/// (after `.env` has been loaded).
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub api_base: String,
    pub timezone: String,
    pub host: String,
    pub port: u16,
    pub poll_interval: Duration,
    pub events_budget: usize,
    pub events_stale: Duration,
    pub fetch_parallelism: usize,
    pub upstream_timeout: Duration,
    /// `None` keeps fixture state for the whole process lifetime.
    pub state_max_age: Option<Duration>,
    pub ws_capacity: usize,
    pub fake_feed: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            host: "0.0.0.0".to_string(),
            port: 3001,
            poll_interval: Duration::from_secs(5),
            events_budget: 10,
            events_stale: Duration::from_secs(12),
            fetch_parallelism: 10,
            upstream_timeout: Duration::from_secs(10),
            state_max_age: Some(Duration::from_secs(6 * 60 * 60)),
            ws_capacity: 64,
            fake_feed: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes `env::var`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).and_then(non_blank);

        let state_max_age_secs = parse_or(get("STATE_MAX_AGE_SECS"), 6 * 60 * 60u64);

        Self {
            api_key: get("API_SPORTS_KEY"),
            api_base: get("API_SPORTS_BASE")
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base),
            timezone: get("API_TIMEZONE").unwrap_or(defaults.timezone),
            host: get("HOST").unwrap_or(defaults.host),
            port: parse_or(get("PORT"), defaults.port),
            poll_interval: Duration::from_secs(parse_or(get("POLL_INTERVAL_SECS"), 5u64).max(1)),
            events_budget: parse_or(get("EVENTS_BUDGET"), 10usize).clamp(1, 50),
            events_stale: Duration::from_secs(parse_or(get("EVENTS_STALE_SECS"), 12u64)),
            fetch_parallelism: parse_or(get("FETCH_PARALLELISM"), 10usize).clamp(1, 32),
            upstream_timeout: Duration::from_secs(
                parse_or(get("UPSTREAM_TIMEOUT_SECS"), 10u64).max(1),
            ),
            state_max_age: (state_max_age_secs > 0)
                .then(|| Duration::from_secs(state_max_age_secs)),
            ws_capacity: parse_or(get("WS_CHANNEL_CAPACITY"), 64usize).clamp(4, 4096),
            fake_feed: get("FAKE_FEED").is_some_and(|val| is_truthy(&val)),
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn non_blank(val: String) -> Option<String> {
    let trimmed = val.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|val| val.parse::<T>().ok()).unwrap_or(default)
}

fn is_truthy(val: &str) -> bool {
    matches!(
        val.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
