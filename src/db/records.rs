//! Flat rows, one struct per table, plus the per-work-item batches the
//! loaders hand to the store.

use chrono::NaiveDate;
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct TeamRecord {
    pub team_id: i64,
    pub conference: Option<String>,
    pub division: Option<String>,
    pub city: Option<String>,
    pub name: Option<String>,
    pub full_name: Option<String>,
    pub abbreviation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct PlayerRecord {
    pub player_id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub position: Option<String>,
    pub height: Option<String>,
    pub weight: Option<i32>,
    pub jersey_number: Option<i32>,
    pub college: Option<String>,
    pub country: Option<String>,
    pub draft_year: Option<i32>,
    pub draft_round: Option<i32>,
    pub draft_number: Option<i32>,
    pub team_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct GameRecord {
    pub game_id: i64,
    pub date: NaiveDate,
    pub season: i32,
    pub postseason: bool,
    pub home_team_score: Option<i32>,
    pub away_team_score: Option<i32>,
    pub home_team_id: Option<i64>,
    pub away_team_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct PlayerGameRecord {
    pub player_id: i64,
    pub game_id: i64,
    pub pie: Option<f64>,
    pub pace: Option<f64>,
    pub assist_percentage: Option<f64>,
    pub assist_ratio: Option<f64>,
    pub assist_to_turnover: Option<f64>,
    pub defensive_rating: Option<f64>,
    pub defensive_rebound_percentage: Option<f64>,
    pub effective_field_goal_percentage: Option<f64>,
    pub net_rating: Option<f64>,
    pub offensive_rating: Option<f64>,
    pub offensive_rebound_percentage: Option<f64>,
    pub true_shooting_percentage: Option<f64>,
    pub turnover_ratio: Option<f64>,
    pub usage_percentage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct BoxScoreRecord {
    pub player_id: i64,
    pub date: NaiveDate,
    /// Minutes played as a fraction, `"34:30"` becomes 34.5.
    pub min: f64,
    pub fgm: Option<i32>,
    pub fga: Option<i32>,
    pub fg_pct: Option<f64>,
    pub fg3m: Option<i32>,
    pub fg3a: Option<i32>,
    pub fg3_pct: Option<f64>,
    pub ftm: Option<i32>,
    pub fta: Option<i32>,
    pub ft_pct: Option<f64>,
    pub oreb: Option<i32>,
    pub dreb: Option<i32>,
    pub reb: Option<i32>,
    pub ast: Option<i32>,
    pub stl: Option<i32>,
    pub blk: Option<i32>,
    pub turnover: Option<i32>,
    pub pf: Option<i32>,
    pub pts: Option<i32>,
}

/// Everything one box-score date writes. Teams and players ride along so the
/// lines satisfy their foreign keys inside the same transaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoxScoreBatch {
    pub teams: Vec<TeamRecord>,
    pub players: Vec<PlayerRecord>,
    pub lines: Vec<BoxScoreRecord>,
}

impl BoxScoreBatch {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Everything one page of advanced stats writes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdvancedBatch {
    pub teams: Vec<TeamRecord>,
    pub players: Vec<PlayerRecord>,
    pub games: Vec<GameRecord>,
    pub player_games: Vec<PlayerGameRecord>,
}
