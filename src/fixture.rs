use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub type FixtureId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Home,
    Away,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamRef {
    pub id: Option<u64>,
    pub name: Option<String>,
}

impl TeamRef {
    fn from_value(value: Option<&Value>) -> Self {
        let Some(value) = value else {
            return Self::default();
        };
        Self {
            id: value.get("id").and_then(as_u64),
            name: value
                .get("name")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
        }
    }

    fn matches(&self, team: &EventTeam) -> bool {
        let id_match = matches!((self.id, team.id), (Some(a), Some(b)) if a == b);
        let name_match = matches!(
            (self.name.as_deref(), team.name.as_deref()),
            (Some(a), Some(b)) if a == b
        );
        id_match || name_match
    }
}

/// The handful of fields the engine reads from an otherwise opaque upstream
/// fixture record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureRef {
    pub id: FixtureId,
    pub home: TeamRef,
    pub away: TeamRef,
    pub goals_home: u32,
    pub goals_away: u32,
}

impl FixtureRef {
    /// Returns `None` only when the record carries no usable fixture id.
    pub fn from_value(value: &Value) -> Option<Self> {
        let id = fixture_id(value)?;
        let teams = value.get("teams");
        let goals = value.get("goals");

        Some(Self {
            id,
            home: TeamRef::from_value(teams.and_then(|t| t.get("home"))),
            away: TeamRef::from_value(teams.and_then(|t| t.get("away"))),
            goals_home: goal_count(goals.and_then(|g| g.get("home"))),
            goals_away: goal_count(goals.and_then(|g| g.get("away"))),
        })
    }

    /// Resolves which side an event belongs to, by team id first and then
    /// by team name.
    pub fn side_of(&self, team: &EventTeam) -> Option<Side> {
        if self.home.matches(team) {
            Some(Side::Home)
        } else if self.away.matches(team) {
            Some(Side::Away)
        } else {
            None
        }
    }
}

pub fn fixture_id(value: &Value) -> Option<FixtureId> {
    value.get("fixture").and_then(|f| f.get("id")).and_then(as_u64)
}

fn goal_count(value: Option<&Value>) -> u32 {
    value.and_then(as_u64).map(|n| n as u32).unwrap_or(0)
}

fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

// Event payloads are loosely typed upstream. Each leaf below degrades to
// `None` instead of failing the whole event.

fn lenient_u64<'de, D: Deserializer<'de>>(de: D) -> Result<Option<u64>, D::Error> {
    Ok(Option::<Value>::deserialize(de)?.as_ref().and_then(as_u64))
}

fn lenient_i64<'de, D: Deserializer<'de>>(de: D) -> Result<Option<i64>, D::Error> {
    Ok(Option::<Value>::deserialize(de)?.as_ref().and_then(as_i64))
}

fn lenient_text<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(de)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

fn lenient_object<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(Option::<Value>::deserialize(de)?
        .filter(Value::is_object)
        .and_then(|value| serde_json::from_value(value).ok()))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTime {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub elapsed: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub extra: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTeam {
    #[serde(default, deserialize_with = "lenient_u64")]
    pub id: Option<u64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPlayer {
    #[serde(default, deserialize_with = "lenient_u64")]
    pub id: Option<u64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
}

/// One raw entry of `/fixtures/events`. `kind` and `detail` are free text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchEvent {
    #[serde(default, deserialize_with = "lenient_object")]
    pub time: Option<EventTime>,
    #[serde(default, deserialize_with = "lenient_object")]
    pub team: Option<EventTeam>,
    #[serde(default, deserialize_with = "lenient_object")]
    pub player: Option<EventPlayer>,
    #[serde(default, rename = "type", deserialize_with = "lenient_text")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub detail: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub comments: Option<String>,
}

impl MatchEvent {
    pub fn signature(&self) -> EventSignature {
        EventSignature {
            elapsed: self.time.as_ref().and_then(|t| t.elapsed),
            team_id: self.team.as_ref().and_then(|t| t.id),
            kind: self.kind.clone().unwrap_or_default(),
            detail: self.detail.clone().unwrap_or_default(),
            player_id: self.player.as_ref().and_then(|p| p.id),
        }
    }
}

/// Dedup key for raw events: (minute, team, type, detail, player).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventSignature {
    pub elapsed: Option<i64>,
    pub team_id: Option<u64>,
    pub kind: String,
    pub detail: String,
    pub player_id: Option<u64>,
}
