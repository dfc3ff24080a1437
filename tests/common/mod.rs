//! Shared fixtures: a scripted `StatsApi` and a throwaway SQLite store.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::StatusCode;
use serde_json::json;

use hoopstats_loader::api::models::{AdvancedStat, BoxScoreGame, Page, Player, Team};
use hoopstats_loader::api::{ApiError, StatsApi};
use hoopstats_loader::config::DatabaseConfig;
use hoopstats_loader::db::store::Store;

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub async fn temp_store() -> (tempfile::TempDir, Store) {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let config = DatabaseConfig {
        path: dir.path().join("nba_stats.db").display().to_string(),
    };
    let store = Store::new(&config).await.expect("should create store");
    (dir, store)
}

/// Reject every box score row dated `day` at insert time. Opens its own
/// connection to the store's file, so the store itself is untouched.
pub async fn reject_box_scores_on(dir: &tempfile::TempDir, day: &str) {
    let url = format!("sqlite:{}", dir.path().join("nba_stats.db").display());
    let pool = sqlx::SqlitePool::connect(&url)
        .await
        .expect("should open database");
    sqlx::query(&format!(
        "CREATE TRIGGER reject_box_score BEFORE INSERT ON box_score
         WHEN NEW.date = '{day}'
         BEGIN SELECT RAISE(ABORT, 'box score rejected'); END"
    ))
    .execute(&pool)
    .await
    .expect("should create trigger");
    pool.close().await;
}

/// One game on `day` between two teams, each side with the given player ids.
pub fn box_score_game(day: &str, home: (i64, &[i64]), visitor: (i64, &[i64])) -> BoxScoreGame {
    let side = |team_id: i64, players: &[i64]| {
        let lines: Vec<_> = players
            .iter()
            .map(|id| {
                json!({
                    "player": {"id": id, "first_name": "P", "last_name": id.to_string()},
                    "min": "24:30",
                    "pts": 10,
                    "reb": 4,
                    "ast": 3,
                    "fg_pct": 0.5
                })
            })
            .collect();
        json!({
            "id": team_id,
            "abbreviation": format!("T{team_id}"),
            "full_name": format!("Team {team_id}"),
            "players": lines
        })
    };
    serde_json::from_value(json!({
        "date": day,
        "season": 2018,
        "status": "Final",
        "postseason": false,
        "home_team_score": 100,
        "visitor_team_score": 90,
        "home_team": side(home.0, home.1),
        "visitor_team": side(visitor.0, visitor.1)
    }))
    .unwrap()
}

pub fn advanced_stat(player_id: i64, game_id: i64, day: &str) -> AdvancedStat {
    serde_json::from_value(json!({
        "id": player_id * 1000 + game_id,
        "pie": 0.1,
        "usage_percentage": 0.2,
        "player": {"id": player_id, "first_name": "P", "last_name": "Q", "team_id": 1},
        "team": {"id": 1, "abbreviation": "ATL"},
        "game": {
            "id": game_id, "date": day, "season": 2018, "postseason": false,
            "home_team_score": 101, "visitor_team_score": 99,
            "home_team_id": 1, "visitor_team_id": 2
        }
    }))
    .unwrap()
}

pub fn server_error() -> ApiError {
    ApiError::Status {
        status: StatusCode::SERVICE_UNAVAILABLE,
        body: "try later".to_string(),
    }
}

/// Scripted API. Box score dates can fail a fixed number of times before
/// succeeding; advanced stats pages are served by `(season, cursor)`.
#[derive(Default)]
pub struct FakeApi {
    pub box_scores: HashMap<NaiveDate, Vec<BoxScoreGame>>,
    /// Remaining failures per date. `u32::MAX` never recovers.
    pub failures: Mutex<HashMap<NaiveDate, u32>>,
    pub box_score_calls: Mutex<Vec<NaiveDate>>,
    pub teams: Vec<Team>,
    pub player_pages: Vec<Vec<Player>>,
    pub advanced_pages: HashMap<(i32, Option<String>), Page<AdvancedStat>>,
}

impl FakeApi {
    pub fn fail(&self, day: NaiveDate, times: u32) {
        self.failures.lock().unwrap().insert(day, times);
    }

    pub fn calls_for(&self, day: NaiveDate) -> usize {
        self.box_score_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|d| **d == day)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.box_score_calls.lock().unwrap().len()
    }
}

#[async_trait]
impl StatsApi for FakeApi {
    async fn teams(&self) -> Result<Vec<Team>, ApiError> {
        Ok(self.teams.clone())
    }

    async fn players_page(&self, cursor: Option<&str>) -> Result<Page<Player>, ApiError> {
        let index: usize = cursor.map(|c| c.parse().unwrap()).unwrap_or(0);
        let next = (index + 1 < self.player_pages.len()).then(|| (index + 1).to_string());
        Ok(Page {
            data: self.player_pages.get(index).cloned().unwrap_or_default(),
            meta: hoopstats_loader::api::models::Meta {
                next_cursor: next,
                per_page: Some(100),
            },
        })
    }

    async fn advanced_stats_page(
        &self,
        season: i32,
        cursor: Option<&str>,
    ) -> Result<Page<AdvancedStat>, ApiError> {
        self.advanced_pages
            .get(&(season, cursor.map(str::to_string)))
            .cloned()
            .ok_or_else(server_error)
    }

    async fn box_scores(&self, date: NaiveDate) -> Result<Vec<BoxScoreGame>, ApiError> {
        self.box_score_calls.lock().unwrap().push(date);

        {
            let mut failures = self.failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(&date) {
                if *remaining > 0 {
                    if *remaining != u32::MAX {
                        *remaining -= 1;
                    }
                    return Err(server_error());
                }
            }
        }

        Ok(self.box_scores.get(&date).cloned().unwrap_or_default())
    }
}
