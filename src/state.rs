use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;

use crate::fixture::{EventSignature, FixtureId, Side};

/// Milliseconds since the Unix epoch, the unit of every `until` stamp.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SideCounts {
    pub home: u32,
    pub away: u32,
}

impl SideCounts {
    pub fn new(home: u32, away: u32) -> Self {
        Self { home, away }
    }

    pub fn get(&self, side: Side) -> u32 {
        match side {
            Side::Home => self.home,
            Side::Away => self.away,
        }
    }

    pub fn get_mut(&mut self, side: Side) -> &mut u32 {
        match side {
            Side::Home => &mut self.home,
            Side::Away => &mut self.away,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VarSide {
    Home,
    Away,
    Both,
}

impl From<Side> for VarSide {
    fn from(side: Side) -> Self {
        match side {
            Side::Home => VarSide::Home,
            Side::Away => VarSide::Away,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DangerWindow {
    pub side: Option<Side>,
    pub until: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PenaltyWindow {
    pub side: Option<Side>,
    pub until: i64,
    pub missed: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VarWindow {
    pub side: Option<VarSide>,
    pub until: i64,
}

/// Independent time-boxed windows. A window is active iff `now < until`;
/// nothing ever clears an expired window, readers just compare.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Effects {
    pub danger: DangerWindow,
    pub penalty: PenaltyWindow,
    pub var: VarWindow,
    pub goal_flash_until: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixtureState {
    pub last_goals: SideCounts,
    /// Only ever incremented.
    pub red_cards: SideCounts,
    pub effects: Effects,
    pub seen_events: HashSet<EventSignature>,
    /// 0 until the first events fetch attempt.
    pub last_events_fetch_at: i64,
    /// Last time the fixture showed up in the live list (or was created).
    pub last_seen_at: i64,
}

impl FixtureState {
    pub fn new(now: i64) -> Self {
        Self {
            last_seen_at: now,
            ..Self::default()
        }
    }

    /// Records the latest score. Returns `true` when either side's count went
    /// up, which arms the goal flash independently of any fetched event.
    pub fn observe_score(&mut self, goals: SideCounts, now: i64, flash_ms: i64) -> bool {
        let scored = goals.home > self.last_goals.home || goals.away > self.last_goals.away;
        if scored {
            self.effects.goal_flash_until = now + flash_ms;
        }
        self.last_goals = goals;
        scored
    }

    pub fn events_due(&self, now: i64, stale_ms: i64) -> bool {
        now - self.last_events_fetch_at > stale_ms
    }
}

/// Single-writer, many-reader map of fixture id to derived state. Cloning
/// shares the same map.
#[derive(Debug, Clone, Default)]
pub struct FixtureStore {
    inner: Arc<RwLock<HashMap<FixtureId, FixtureState>>>,
}

impl FixtureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` on the fixture's state, inserting a fresh state first when
    /// the fixture has never been seen.
    pub fn get_or_create<R>(
        &self,
        id: FixtureId,
        now: i64,
        f: impl FnOnce(&mut FixtureState) -> R,
    ) -> R {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let state = map.entry(id).or_insert_with(|| FixtureState::new(now));
        f(state)
    }

    /// Snapshot of the fixture's state, without side effects.
    pub fn get(&self, id: FixtureId) -> Option<FixtureState> {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        map.get(&id).cloned()
    }

    /// Effects and red cards only; avoids cloning the dedup set.
    pub fn effects(&self, id: FixtureId) -> Option<(Effects, SideCounts)> {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        map.get(&id).map(|state| (state.effects, state.red_cards))
    }

    /// Runs `f` under one read lock, for callers that look up many ids.
    pub fn read<R>(&self, f: impl FnOnce(&HashMap<FixtureId, FixtureState>) -> R) -> R {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&map)
    }

    pub fn len(&self) -> usize {
        self.read(|map| map.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every entry not seen for longer than `max_age_ms`. Returns how
    /// many were removed.
    pub fn evict_stale(&self, now: i64, max_age_ms: i64) -> usize {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let before = map.len();
        map.retain(|_, state| now - state.last_seen_at <= max_age_ms);
        before - map.len()
    }
}
