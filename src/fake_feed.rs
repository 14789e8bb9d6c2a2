use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{Value, json};

use crate::fixture::{FixtureId, MatchEvent};
use crate::upstream::{FixtureSource, UpstreamError, parse_events};

const TEAMS: &[(u64, &str)] = &[
    (33, "Manchester United"),
    (40, "Liverpool"),
    (42, "Arsenal"),
    (49, "Chelsea"),
    (50, "Manchester City"),
    (529, "Barcelona"),
    (541, "Real Madrid"),
    (157, "Bayern Munich"),
    (489, "AC Milan"),
    (505, "Inter"),
    (85, "Paris Saint Germain"),
    (645, "Galatasaray"),
];

#[derive(Debug, Clone)]
struct FakeFixture {
    id: FixtureId,
    home: (u64, &'static str),
    away: (u64, &'static str),
    status: &'static str,
    elapsed: i64,
    goals: (u32, u32),
    events: Vec<Value>,
}

impl FakeFixture {
    fn is_live(&self) -> bool {
        matches!(self.status, "1H" | "HT" | "2H")
    }

    fn to_value(&self, date: &str) -> Value {
        let started = self.is_live() || self.status == "FT";
        let elapsed = started.then_some(self.elapsed);
        let goals_home = started.then_some(self.goals.0);
        let goals_away = started.then_some(self.goals.1);
        json!({
            "fixture": {
                "id": self.id,
                "date": format!("{date}T19:00:00+03:00"),
                "status": {
                    "short": self.status,
                    "elapsed": elapsed,
                },
            },
            "league": {"id": 203, "name": "Simulated League", "country": "World"},
            "teams": {
                "home": {"id": self.home.0, "name": self.home.1},
                "away": {"id": self.away.0, "name": self.away.1},
            },
            "goals": {
                "home": goals_home,
                "away": goals_away,
            },
        })
    }
}

#[derive(Debug)]
struct World {
    rng: StdRng,
    fixtures: Vec<FakeFixture>,
}

/// In-process stand-in for the provider: a few live matches that advance by
/// a minute and may produce goals, cards, VAR checks or penalties every time
/// the live list is requested.
#[derive(Debug)]
pub struct FakeFeed {
    world: Mutex<World>,
}

impl FakeFeed {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic feed for tests.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(mut rng: StdRng) -> Self {
        let statuses = ["1H", "2H", "1H", "HT", "NS", "FT"];
        let fixtures = TEAMS
            .chunks(2)
            .zip(statuses)
            .enumerate()
            .map(|(idx, (pair, status))| {
                let elapsed = match status {
                    "1H" => rng.gen_range(1..40),
                    "HT" => 45,
                    "2H" => rng.gen_range(46..85),
                    "FT" => 90,
                    _ => 0,
                };
                FakeFixture {
                    id: 900_000 + idx as u64,
                    home: pair[0],
                    away: pair[1],
                    status,
                    elapsed,
                    goals: (0, 0),
                    events: Vec::new(),
                }
            })
            .collect();
        Self {
            world: Mutex::new(World { rng, fixtures }),
        }
    }

    fn tick(world: &mut World) {
        let World { rng, fixtures } = world;
        for fixture in fixtures.iter_mut().filter(|f| f.is_live()) {
            if fixture.status == "HT" {
                if rng.gen_bool(0.2) {
                    fixture.status = "2H";
                }
                continue;
            }
            if fixture.elapsed < 90 {
                fixture.elapsed += 1;
            }
            if fixture.elapsed == 45 && fixture.status == "1H" {
                fixture.status = "HT";
            }
            if rng.gen_bool(0.1) {
                let home_side = rng.gen_bool(0.5);
                let team = if home_side { fixture.home } else { fixture.away };
                let player = rng.gen_range(1000..1100u64);
                let (kind, detail) = match rng.gen_range(0..10) {
                    0..=3 => {
                        if home_side {
                            fixture.goals.0 += 1;
                        } else {
                            fixture.goals.1 += 1;
                        }
                        ("Goal", "Normal Goal")
                    }
                    4..=5 => ("Card", "Yellow Card"),
                    6 => ("Card", "Red Card"),
                    7 => ("Var", "Goal Disallowed - offside"),
                    8 => ("Goal", "Missed Penalty"),
                    _ => ("Var", "Penalty confirmed"),
                };
                fixture.events.push(json!({
                    "time": {"elapsed": fixture.elapsed, "extra": null},
                    "team": {"id": team.0, "name": team.1},
                    "player": {"id": player, "name": format!("Player {player}")},
                    "assist": {"id": null, "name": null},
                    "type": kind,
                    "detail": detail,
                    "comments": null,
                }));
            }
        }
    }
}

impl Default for FakeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl FixtureSource for FakeFeed {
    fn list_fixtures(&self, date: &str, live_only: bool) -> Result<Vec<Value>, UpstreamError> {
        let mut world = self.world.lock().unwrap_or_else(PoisonError::into_inner);
        if live_only {
            Self::tick(&mut world);
        }
        Ok(world
            .fixtures
            .iter()
            .filter(|f| !live_only || f.is_live())
            .map(|f| f.to_value(date))
            .collect())
    }

    fn list_events(&self, fixture_id: FixtureId) -> Result<Vec<MatchEvent>, UpstreamError> {
        let world = self.world.lock().unwrap_or_else(PoisonError::into_inner);
        let raw = world
            .fixtures
            .iter()
            .find(|f| f.id == fixture_id)
            .map(|f| f.events.clone())
            .unwrap_or_default();
        Ok(parse_events(raw))
    }
}
