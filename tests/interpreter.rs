use serde_json::json;

use pulse_server::fixture::{EventPlayer, EventTeam, EventTime, FixtureRef, MatchEvent, Side};
use pulse_server::interpret::{DANGER_MS, PENALTY_MS, VAR_MS, apply_events};
use pulse_server::state::{FixtureState, SideCounts, VarSide};

const HOME: u64 = 611;
const AWAY: u64 = 645;
const NOW: i64 = 1_700_000_000_000;

fn fixture() -> FixtureRef {
    FixtureRef::from_value(&json!({
        "fixture": {"id": 1035, "status": {"short": "2H", "elapsed": 67}},
        "teams": {
            "home": {"id": HOME, "name": "Fenerbahce"},
            "away": {"id": AWAY, "name": "Galatasaray"}
        },
        "goals": {"home": 1, "away": 1}
    }))
    .expect("fixture has an id")
}

fn event(minute: i64, team: Option<u64>, kind: &str, detail: &str) -> MatchEvent {
    MatchEvent {
        time: Some(EventTime {
            elapsed: Some(minute),
            extra: None,
        }),
        team: team.map(|id| EventTeam {
            id: Some(id),
            name: None,
        }),
        player: Some(EventPlayer {
            id: Some(9),
            name: Some("Player".into()),
        }),
        kind: Some(kind.into()),
        detail: Some(detail.into()),
        comments: None,
    }
}

#[test]
fn red_card_counts_once_per_distinct_event() {
    let fixture = fixture();
    let mut state = FixtureState::new(NOW);
    let red = event(30, Some(HOME), "Card", "Red Card");

    assert_eq!(apply_events(&mut state, &fixture, &[red.clone()], NOW), 1);
    assert_eq!(state.red_cards, SideCounts::new(1, 0));

    // Same minute, team, type, detail and player: a duplicate.
    assert_eq!(apply_events(&mut state, &fixture, &[red], NOW + 5_000), 0);
    assert_eq!(state.red_cards, SideCounts::new(1, 0));
}

#[test]
fn reapplying_a_batch_is_a_no_op() {
    let fixture = fixture();
    let mut state = FixtureState::new(NOW);
    let batch = vec![
        event(12, Some(HOME), "Goal", "Normal Goal"),
        event(40, Some(AWAY), "Card", "Second Yellow card"),
        event(55, Some(AWAY), "Var", "Goal cancelled"),
    ];
    apply_events(&mut state, &fixture, &batch, NOW);
    let snapshot = state.clone();

    assert_eq!(apply_events(&mut state, &fixture, &batch, NOW + 3_000), 0);
    assert_eq!(state, snapshot);
}

#[test]
fn second_yellow_counts_as_red() {
    let fixture = fixture();
    let mut state = FixtureState::new(NOW);
    apply_events(
        &mut state,
        &fixture,
        &[event(70, Some(AWAY), "Card", "Second Yellow card")],
        NOW,
    );
    assert_eq!(state.red_cards, SideCounts::new(0, 1));
}

#[test]
fn yellow_card_changes_nothing() {
    let fixture = fixture();
    let mut state = FixtureState::new(NOW);
    apply_events(
        &mut state,
        &fixture,
        &[event(20, Some(HOME), "Card", "Yellow Card")],
        NOW,
    );
    let mut expected = FixtureState::new(NOW);
    expected.seen_events = state.seen_events.clone();
    assert_eq!(state, expected);
}

#[test]
fn var_penalty_confirmed_sets_both_windows() {
    let fixture = fixture();
    let mut state = FixtureState::new(NOW);
    apply_events(
        &mut state,
        &fixture,
        &[event(61, Some(AWAY), "Var", "Penalty confirmed")],
        NOW,
    );

    assert_eq!(state.effects.var.side, Some(VarSide::Away));
    assert_eq!(state.effects.var.until, NOW + VAR_MS);
    assert_eq!(state.effects.penalty.side, Some(Side::Away));
    assert_eq!(state.effects.penalty.until, NOW + PENALTY_MS);
    assert!(!state.effects.penalty.missed);
}

#[test]
fn var_window_never_shrinks() {
    let fixture = fixture();
    let mut state = FixtureState::new(NOW);
    apply_events(
        &mut state,
        &fixture,
        &[event(50, Some(HOME), "Var", "Goal Disallowed - offside")],
        NOW + 15_000,
    );
    let extended = state.effects.var.until;
    assert_eq!(extended, NOW + 15_000 + VAR_MS);

    // A later-processed event stamped with an earlier clock keeps the
    // longer window but takes the new side.
    apply_events(
        &mut state,
        &fixture,
        &[event(52, Some(AWAY), "Var", "Card upgrade")],
        NOW,
    );
    assert_eq!(state.effects.var.until, extended);
    assert_eq!(state.effects.var.side, Some(VarSide::Away));
}

#[test]
fn var_without_known_side_targets_both() {
    let fixture = fixture();
    let mut state = FixtureState::new(NOW);
    apply_events(
        &mut state,
        &fixture,
        &[event(33, None, "Var", "Goal under review")],
        NOW,
    );
    assert_eq!(state.effects.var.side, Some(VarSide::Both));
}

#[test]
fn red_card_for_unknown_team_is_ignored() {
    let fixture = fixture();
    let mut state = FixtureState::new(NOW);
    apply_events(
        &mut state,
        &fixture,
        &[event(44, Some(99_999), "Card", "Red Card")],
        NOW,
    );
    assert_eq!(state.red_cards, SideCounts::default());
}

#[test]
fn goal_sets_danger_and_disallowed_clears_it() {
    let fixture = fixture();
    let mut state = FixtureState::new(NOW);
    apply_events(
        &mut state,
        &fixture,
        &[event(80, Some(HOME), "Goal", "Normal Goal")],
        NOW,
    );
    assert_eq!(state.effects.danger.side, Some(Side::Home));
    assert_eq!(state.effects.danger.until, NOW + DANGER_MS);

    apply_events(
        &mut state,
        &fixture,
        &[event(81, Some(HOME), "Var", "Goal Disallowed - handball")],
        NOW + 2_000,
    );
    assert_eq!(state.effects.danger.side, None);
    assert_eq!(state.effects.danger.until, 0);
}

#[test]
fn missed_penalty_is_flagged() {
    let fixture = fixture();
    let mut state = FixtureState::new(NOW);
    apply_events(
        &mut state,
        &fixture,
        &[event(88, Some(HOME), "Goal", "Missed Penalty")],
        NOW,
    );
    assert_eq!(state.effects.penalty.side, Some(Side::Home));
    assert!(state.effects.penalty.missed);

    apply_events(
        &mut state,
        &fixture,
        &[event(89, Some(AWAY), "Penalty", "Penalty saved")],
        NOW + 1_000,
    );
    assert_eq!(state.effects.penalty.side, Some(Side::Away));
    assert!(state.effects.penalty.missed);
    assert_eq!(state.effects.penalty.until, NOW + 1_000 + PENALTY_MS);
}

#[test]
fn events_match_by_team_name_when_ids_are_missing() {
    let fixture = fixture();
    let mut state = FixtureState::new(NOW);
    let mut red = event(15, None, "Card", "Red Card");
    red.team = Some(EventTeam {
        id: None,
        name: Some("Galatasaray".into()),
    });
    apply_events(&mut state, &fixture, &[red], NOW);
    assert_eq!(state.red_cards, SideCounts::new(0, 1));
}

#[test]
fn red_cards_only_grow() {
    let fixture = fixture();
    let mut state = FixtureState::new(NOW);
    let reds: Vec<MatchEvent> = (1..=4)
        .map(|minute| event(minute * 10, Some(HOME), "Card", "Red Card"))
        .collect();
    let mut previous = 0;
    for red in reds {
        apply_events(&mut state, &fixture, &[red.clone(), red], NOW);
        assert!(state.red_cards.home > previous);
        previous = state.red_cards.home;
    }
    assert_eq!(state.red_cards.home, 4);
}
