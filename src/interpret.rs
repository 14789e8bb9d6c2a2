//! Turns raw upstream match events into effect windows and red-card counts.
//!
//! The provider's `type`/`detail` vocabulary is free text and drifts, so the
//! rules below match on lowercase substrings. Every rule is evaluated for
//! every new event; one event may fire several rules.

use crate::fixture::{FixtureRef, MatchEvent, Side};
use crate::state::{DangerWindow, FixtureState, PenaltyWindow, VarSide, VarWindow};

pub const DANGER_MS: i64 = 10_000;
pub const PENALTY_MS: i64 = 10_000;
pub const VAR_MS: i64 = 20_000;
pub const GOAL_FLASH_MS: i64 = 10_000;

/// A new event after normalization.
#[derive(Debug)]
pub struct Classified {
    pub side: Option<Side>,
    pub kind: String,
    pub detail: String,
}

struct Rule {
    name: &'static str,
    matches: fn(&Classified) -> bool,
    apply: fn(&mut FixtureState, &Classified, i64),
}

const RULES: &[Rule] = &[
    Rule {
        name: "red_card",
        matches: |ev| {
            ev.kind == "card" && (ev.detail.contains("red") || ev.detail.contains("second yellow"))
        },
        apply: |state, ev, _now| {
            if let Some(side) = ev.side {
                *state.red_cards.get_mut(side) += 1;
            }
        },
    },
    Rule {
        name: "var",
        matches: |ev| ev.kind.contains("var") || ev.detail.contains("var"),
        apply: |state, ev, now| {
            let until = state.effects.var.until.max(now + VAR_MS);
            state.effects.var = VarWindow {
                side: Some(ev.side.map(VarSide::from).unwrap_or(VarSide::Both)),
                until,
            };
        },
    },
    Rule {
        name: "penalty",
        matches: |ev| ev.kind.contains("penalty") || ev.detail.contains("penalty"),
        apply: |state, ev, now| {
            state.effects.penalty = PenaltyWindow {
                side: ev.side,
                until: now + PENALTY_MS,
                missed: ev.detail.contains("miss") || ev.detail.contains("save"),
            };
        },
    },
    Rule {
        name: "goal_danger",
        matches: |ev| ev.kind == "goal",
        apply: |state, ev, now| {
            if let Some(side) = ev.side {
                state.effects.danger = DangerWindow {
                    side: Some(side),
                    until: now + DANGER_MS,
                };
            }
        },
    },
    Rule {
        name: "disallowed",
        matches: |ev| ev.detail.contains("disallowed") || ev.detail.contains("cancel"),
        apply: |state, _ev, _now| {
            state.effects.danger = DangerWindow::default();
        },
    },
];

pub fn classify(fixture: &FixtureRef, event: &MatchEvent) -> Classified {
    Classified {
        side: event.team.as_ref().and_then(|team| fixture.side_of(team)),
        kind: event.kind.as_deref().unwrap_or_default().to_lowercase(),
        detail: event.detail.as_deref().unwrap_or_default().to_lowercase(),
    }
}

/// Applies `events` in the order given. Events whose signature was already
/// seen by this state are skipped without side effects. Returns how many
/// events were new.
pub fn apply_events(
    state: &mut FixtureState,
    fixture: &FixtureRef,
    events: &[MatchEvent],
    now: i64,
) -> usize {
    let mut applied = 0;
    for event in events {
        if !state.seen_events.insert(event.signature()) {
            continue;
        }
        applied += 1;

        let classified = classify(fixture, event);
        for rule in RULES {
            if (rule.matches)(&classified) {
                tracing::debug!(
                    fixture = fixture.id,
                    rule = rule.name,
                    side = ?classified.side,
                    "event rule fired"
                );
                (rule.apply)(state, &classified, now);
            }
        }
    }
    applied
}
