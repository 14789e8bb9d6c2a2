use serde_json::json;

use pulse_server::enrich::{EFFECTS_KEY, enrich_fixture, enrich_fixtures};
use pulse_server::fixture::Side;
use pulse_server::state::{DangerWindow, FixtureStore};

fn record(id: u64) -> serde_json::Value {
    json!({
        "fixture": {"id": id, "status": {"short": "1H", "elapsed": 9}},
        "teams": {"home": {"id": 1}, "away": {"id": 2}},
        "goals": {"home": 0, "away": 0}
    })
}

#[test]
fn unknown_fixture_passes_through_untouched() {
    let store = FixtureStore::new();
    let raw = record(4);
    assert_eq!(enrich_fixture(raw.clone(), &store), raw);
    assert!(store.is_empty(), "enrichment must not create state");
}

#[test]
fn records_without_an_id_pass_through() {
    let store = FixtureStore::new();
    store.get_or_create(4, 0, |_| ());
    let raw = json!({"league": {"id": 203}});
    assert_eq!(enrich_fixture(raw.clone(), &store), raw);
}

#[test]
fn tracked_fixture_gets_effects_payload() {
    let store = FixtureStore::new();
    store.get_or_create(4, 0, |state| {
        state.red_cards.away = 2;
        state.effects.danger = DangerWindow {
            side: Some(Side::Home),
            until: 1_234,
        };
        state.effects.goal_flash_until = 999;
    });

    let enriched = enrich_fixture(record(4), &store);
    let effects = &enriched[EFFECTS_KEY];
    assert_eq!(effects["danger"], json!({"side": "home", "until": 1_234}));
    assert_eq!(effects["penalty"], json!({"side": null, "until": 0, "missed": false}));
    assert_eq!(effects["var"], json!({"side": null, "until": 0}));
    assert_eq!(effects["goalFlashUntil"], 999);
    assert_eq!(effects["reds"], json!({"home": 0, "away": 2}));

    // Upstream fields survive.
    assert_eq!(enriched["fixture"]["id"], 4);
    assert_eq!(enriched["goals"], record(4)["goals"]);
}

#[test]
fn list_enrichment_matches_single_enrichment() {
    let store = FixtureStore::new();
    store.get_or_create(2, 0, |state| state.red_cards.home = 1);
    let list = vec![record(1), record(2), record(3)];

    let batch = enrich_fixtures(list.clone(), &store);
    let single: Vec<_> = list
        .into_iter()
        .map(|fixture| enrich_fixture(fixture, &store))
        .collect();
    assert_eq!(batch, single);
    assert!(batch[0].get(EFFECTS_KEY).is_none());
    assert_eq!(batch[1][EFFECTS_KEY]["reds"]["home"], 1);
    assert!(batch[2].get(EFFECTS_KEY).is_none());
}
