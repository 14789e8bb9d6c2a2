use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use chrono::Local;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::enrich::enrich_fixtures;
use crate::fixture::{FixtureRef, MatchEvent};
use crate::hub::LiveHub;
use crate::interpret::{self, GOAL_FLASH_MS};
use crate::state::{FixtureStore, SideCounts, now_ms};
use crate::upstream::{FixtureSource, UpstreamError};

#[derive(Debug, Clone)]
pub struct PollSettings {
    pub interval: Duration,
    pub events_budget: usize,
    pub events_stale: Duration,
    pub fetch_parallelism: usize,
    pub state_max_age: Option<Duration>,
}

impl PollSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            interval: config.poll_interval,
            events_budget: config.events_budget,
            events_stale: config.events_stale,
            fetch_parallelism: config.fetch_parallelism,
            state_max_age: config.state_max_age,
        }
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// What one cycle did, for logging and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub date: String,
    pub live: usize,
    pub goal_flashes: usize,
    pub events_fetched: usize,
    pub events_failed: usize,
    pub events_applied: usize,
    pub broadcast: usize,
    pub evicted: usize,
}

pub struct Poller {
    source: Arc<dyn FixtureSource>,
    store: FixtureStore,
    hub: LiveHub,
    settings: PollSettings,
    pool: Option<rayon::ThreadPool>,
}

impl Poller {
    pub fn new(
        source: Arc<dyn FixtureSource>,
        store: FixtureStore,
        hub: LiveHub,
        settings: PollSettings,
    ) -> Self {
        let pool = build_fetch_pool(settings.fetch_parallelism);
        Self {
            source,
            store,
            hub,
            settings,
            pool,
        }
    }

    /// One full cycle for today's local date.
    pub fn run_cycle(&self) -> anyhow::Result<CycleReport> {
        let date = Local::now().format("%Y-%m-%d").to_string();
        self.run_cycle_for(&date)
    }

    /// Live scores, then events within budget, then the enriched full list
    /// for `date` goes out to every subscriber. A failed live or full-list
    /// fetch ends the cycle without broadcasting; a failed events fetch only
    /// costs that fixture its events for this cycle.
    pub fn run_cycle_for(&self, date: &str) -> anyhow::Result<CycleReport> {
        let mut report = CycleReport {
            date: date.to_string(),
            ..CycleReport::default()
        };

        let live_raw = self
            .source
            .list_fixtures(date, true)
            .context("live fixtures fetch failed")?;
        let live: Vec<FixtureRef> = live_raw.iter().filter_map(FixtureRef::from_value).collect();
        report.live = live.len();

        let now = now_ms();
        for fixture in &live {
            let goals = SideCounts::new(fixture.goals_home, fixture.goals_away);
            let flashed = self.store.get_or_create(fixture.id, now, |state| {
                state.last_seen_at = now;
                state.observe_score(goals, now, GOAL_FLASH_MS)
            });
            if flashed {
                report.goal_flashes += 1;
                debug!(
                    fixture = fixture.id,
                    home = goals.home,
                    away = goals.away,
                    "score changed"
                );
            }
        }

        let due = self.select_due(&live, now);
        let fetched = self.fetch_events(&due);
        for (fixture, events) in fetched {
            let now = now_ms();
            let events = match events {
                Ok(events) => {
                    report.events_fetched += 1;
                    events
                }
                Err(err) => {
                    report.events_failed += 1;
                    warn!(fixture = fixture.id, "events fetch failed: {err}");
                    Vec::new()
                }
            };
            report.events_applied += self.store.get_or_create(fixture.id, now, |state| {
                let applied = interpret::apply_events(state, fixture, &events, now);
                state.last_events_fetch_at = now;
                applied
            });
        }

        let all = self
            .source
            .list_fixtures(date, false)
            .context("fixture list fetch failed")?;
        let enriched = enrich_fixtures(all, &self.store);
        report.broadcast = enriched.len();
        self.hub.publish_fixtures(date, enriched);

        if let Some(max_age) = self.settings.state_max_age {
            report.evicted = self
                .store
                .evict_stale(now_ms(), max_age.as_millis() as i64);
        }

        Ok(report)
    }

    /// Live fixtures whose events are stale, in live-list order, capped at
    /// the per-cycle budget.
    fn select_due<'a>(&self, live: &'a [FixtureRef], now: i64) -> Vec<&'a FixtureRef> {
        let stale_ms = self.settings.events_stale.as_millis() as i64;
        self.store.read(|map| {
            live.iter()
                .filter(|fixture| {
                    map.get(&fixture.id)
                        .is_none_or(|state| state.events_due(now, stale_ms))
                })
                .take(self.settings.events_budget)
                .collect()
        })
    }

    fn fetch_events<'a>(
        &self,
        due: &[&'a FixtureRef],
    ) -> Vec<(&'a FixtureRef, Result<Vec<MatchEvent>, UpstreamError>)> {
        let source = &self.source;
        with_fetch_pool(&self.pool, || {
            due.par_iter()
                .map(|fixture| (*fixture, source.list_events(fixture.id)))
                .collect()
        })
    }

    /// One cycle for today with every failure contained: errors and panics
    /// are logged and reported as `false`, never propagated.
    pub fn run_guarded(&self) -> bool {
        match panic::catch_unwind(AssertUnwindSafe(|| self.run_cycle())) {
            Ok(Ok(report)) => {
                info!(
                    date = %report.date,
                    live = report.live,
                    flashes = report.goal_flashes,
                    events_fetched = report.events_fetched,
                    events_failed = report.events_failed,
                    events_applied = report.events_applied,
                    broadcast = report.broadcast,
                    evicted = report.evicted,
                    "poll cycle complete"
                );
                true
            }
            Ok(Err(err)) => {
                warn!("poll cycle failed: {err:#}");
                false
            }
            Err(_) => {
                warn!("poll cycle panicked");
                false
            }
        }
    }

    pub fn interval(&self) -> Duration {
        self.settings.interval
    }
}

/// Runs the poller forever on its own thread. The next cycle starts
/// `interval` after the previous one finished, whatever its outcome.
pub fn spawn_poller(poller: Poller) -> std::io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("fixture-poller".to_string())
        .spawn(move || {
            info!(
                interval_ms = poller.interval().as_millis() as u64,
                "fixture poller started"
            );
            loop {
                poller.run_guarded();
                thread::sleep(poller.interval());
            }
        })
}

fn build_fetch_pool(threads: usize) -> Option<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .thread_name(|idx| format!("events-fetch-{idx}"))
        .build()
        .ok()
}

fn with_fetch_pool<T>(pool: &Option<rayon::ThreadPool>, action: impl FnOnce() -> T + Send) -> T
where
    T: Send,
{
    if let Some(pool) = pool.as_ref() {
        pool.install(action)
    } else {
        action()
    }
}
