//! Wire types for the balldontlie v1 API.
//!
//! The API is loose about numeric types: weights, jersey numbers and draft
//! fields arrive as strings on some endpoints and as numbers on others, and
//! minutes played can be `"34:12"`, `"34"` or a bare number. The lenient
//! deserializers below absorb that instead of failing the whole page.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Team {
    pub id: i64,
    #[serde(default)]
    pub conference: Option<String>,
    #[serde(default)]
    pub division: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub abbreviation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Player {
    pub id: i64,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub height: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub weight: Option<i32>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub jersey_number: Option<i32>,
    #[serde(default)]
    pub college: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub draft_year: Option<i32>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub draft_round: Option<i32>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub draft_number: Option<i32>,
    /// Present on advanced-stats records.
    #[serde(default)]
    pub team_id: Option<i64>,
    /// Present on `/players` records instead of `team_id`.
    #[serde(default)]
    pub team: Option<Team>,
}

impl Player {
    pub fn current_team_id(&self) -> Option<i64> {
        self.team_id.or_else(|| self.team.as_ref().map(|t| t.id))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Game {
    pub id: i64,
    pub date: String,
    pub season: i32,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub postseason: bool,
    #[serde(default)]
    pub home_team_score: Option<i32>,
    #[serde(default)]
    pub visitor_team_score: Option<i32>,
    #[serde(default)]
    pub home_team_id: Option<i64>,
    #[serde(default)]
    pub visitor_team_id: Option<i64>,
}

/// One row of `/stats/advanced`: a player's efficiency metrics for one game.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AdvancedStat {
    #[serde(default)]
    pub id: Option<i64>,
    pub player: Player,
    #[serde(default)]
    pub team: Option<Team>,
    pub game: Game,
    #[serde(default)]
    pub pie: Option<f64>,
    #[serde(default)]
    pub pace: Option<f64>,
    #[serde(default)]
    pub assist_percentage: Option<f64>,
    #[serde(default)]
    pub assist_ratio: Option<f64>,
    #[serde(default)]
    pub assist_to_turnover: Option<f64>,
    #[serde(default)]
    pub defensive_rating: Option<f64>,
    #[serde(default)]
    pub defensive_rebound_percentage: Option<f64>,
    #[serde(default)]
    pub effective_field_goal_percentage: Option<f64>,
    #[serde(default)]
    pub net_rating: Option<f64>,
    #[serde(default)]
    pub offensive_rating: Option<f64>,
    #[serde(default)]
    pub offensive_rebound_percentage: Option<f64>,
    #[serde(default)]
    pub true_shooting_percentage: Option<f64>,
    #[serde(default)]
    pub turnover_ratio: Option<f64>,
    #[serde(default)]
    pub usage_percentage: Option<f64>,
}

/// One game of `/box_scores?date=`. Box score games carry no game id.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BoxScoreGame {
    pub date: String,
    #[serde(default)]
    pub season: Option<i32>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub postseason: bool,
    #[serde(default)]
    pub home_team_score: Option<i32>,
    #[serde(default)]
    pub visitor_team_score: Option<i32>,
    pub home_team: BoxScoreTeam,
    pub visitor_team: BoxScoreTeam,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BoxScoreTeam {
    #[serde(flatten)]
    pub team: Team,
    #[serde(default)]
    pub players: Vec<PlayerLine>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlayerLine {
    pub player: Player,
    #[serde(default, deserialize_with = "lenient_string")]
    pub min: Option<String>,
    #[serde(default)]
    pub fgm: Option<i32>,
    #[serde(default)]
    pub fga: Option<i32>,
    #[serde(default)]
    pub fg_pct: Option<f64>,
    #[serde(default)]
    pub fg3m: Option<i32>,
    #[serde(default)]
    pub fg3a: Option<i32>,
    #[serde(default)]
    pub fg3_pct: Option<f64>,
    #[serde(default)]
    pub ftm: Option<i32>,
    #[serde(default)]
    pub fta: Option<i32>,
    #[serde(default)]
    pub ft_pct: Option<f64>,
    #[serde(default)]
    pub oreb: Option<i32>,
    #[serde(default)]
    pub dreb: Option<i32>,
    #[serde(default)]
    pub reb: Option<i32>,
    #[serde(default)]
    pub ast: Option<i32>,
    #[serde(default)]
    pub stl: Option<i32>,
    #[serde(default)]
    pub blk: Option<i32>,
    #[serde(default)]
    pub turnover: Option<i32>,
    #[serde(default)]
    pub pf: Option<i32>,
    #[serde(default)]
    pub pts: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Meta {
    /// Opaque token for the next page. Absent or null on the last page.
    #[serde(default, deserialize_with = "lenient_string")]
    pub next_cursor: Option<String>,
    #[serde(default)]
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub meta: Meta,
}

impl<T> Page<T> {
    pub fn next_cursor(&self) -> Option<&str> {
        self.meta
            .next_cursor
            .as_deref()
            .filter(|cursor| !cursor.is_empty())
    }
}

fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().and_then(|v| i32::try_from(v).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
