use serde::Serialize;
use serde_json::Value;

use crate::fixture::fixture_id;
use crate::state::{Effects, FixtureStore, SideCounts};

pub const EFFECTS_KEY: &str = "_effects";

/// Wire shape of `_effects`: the effect windows plus red-card counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EffectsPayload {
    #[serde(flatten)]
    pub effects: Effects,
    pub reds: SideCounts,
}

/// Attaches `_effects` when the store knows the fixture; otherwise the
/// record comes back untouched.
pub fn enrich_fixture(fixture: Value, store: &FixtureStore) -> Value {
    let Some(id) = fixture_id(&fixture) else {
        return fixture;
    };
    match store.effects(id) {
        Some((effects, reds)) => attach(fixture, EffectsPayload { effects, reds }),
        None => fixture,
    }
}

/// Same as [`enrich_fixture`] for a whole list, under a single read lock.
pub fn enrich_fixtures(fixtures: Vec<Value>, store: &FixtureStore) -> Vec<Value> {
    store.read(|map| {
        fixtures
            .into_iter()
            .map(|fixture| {
                let state = fixture_id(&fixture).and_then(|id| map.get(&id));
                match state {
                    Some(state) => attach(
                        fixture,
                        EffectsPayload {
                            effects: state.effects,
                            reds: state.red_cards,
                        },
                    ),
                    None => fixture,
                }
            })
            .collect()
    })
}

fn attach(mut fixture: Value, payload: EffectsPayload) -> Value {
    if let Value::Object(map) = &mut fixture {
        match serde_json::to_value(payload) {
            Ok(value) => {
                map.insert(EFFECTS_KEY.to_string(), value);
            }
            Err(err) => tracing::warn!("failed to serialize effects: {err}"),
        }
    }
    fixture
}
