use std::collections::BTreeSet;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use crate::config::DatabaseConfig;
use crate::db::records::{
    AdvancedBatch, BoxScoreBatch, BoxScoreRecord, GameRecord, PlayerGameRecord, PlayerRecord,
    TeamRecord,
};

/// Tables owned by the loader, in foreign-key order.
pub const TABLES: [&str; 5] = ["team", "player", "game", "player_game", "box_score"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableStatus {
    Created,
    AlreadyExisted,
}

impl std::fmt::Display for TableStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::AlreadyExisted => write!(f, "already exists"),
        }
    }
}

#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open the database and make sure the schema exists.
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let store = Self::connect(config).await?;
        store.migrate().await?;
        Ok(store)
    }

    /// Open the database without touching the schema.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        Self::open(config, true).await
    }

    /// Open a database that must already exist. Nothing is created.
    pub async fn connect_existing(config: &DatabaseConfig) -> Result<Self> {
        Self::open(config, false).await
    }

    async fn open(config: &DatabaseConfig, create: bool) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.url())
            .context("Invalid database path")?
            .create_if_missing(create)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(30))
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to SQLite database at {}", config.path))?;

        Ok(Self { pool })
    }

    async fn migrate(&self) -> Result<()> {
        let migration_sql = include_str!("../../migrations/001_init.sql");
        // Execute each statement separately (sqlx doesn't support multiple statements in one call)
        for statement in migration_sql.split(';') {
            let trimmed = statement.trim();
            if !trimmed.is_empty() {
                sqlx::query(trimmed)
                    .execute(&self.pool)
                    .await
                    .with_context(|| format!("Failed to execute migration: {trimmed}"))?;
            }
        }
        Ok(())
    }

    /// Create any missing tables and report what was there beforehand.
    pub async fn bootstrap(&self) -> Result<Vec<(&'static str, TableStatus)>> {
        let mut report = Vec::with_capacity(TABLES.len());
        for table in TABLES {
            let status = if self.table_exists(table).await? {
                TableStatus::AlreadyExisted
            } else {
                TableStatus::Created
            };
            report.push((table, status));
        }

        self.migrate().await?;

        for (table, status) in &report {
            info!(table, status = %status, "Table checked");
        }
        Ok(report)
    }

    pub async fn table_exists(&self, table: &str) -> Result<bool> {
        let row: (i64,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?)",
        )
        .bind(table)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("Failed to check for table {table}"))?;
        Ok(row.0 != 0)
    }

    pub async fn count(&self, table: &str) -> Result<i64> {
        if !TABLES.contains(&table) {
            bail!("Unknown table: {table}");
        }
        let row: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("Failed to count rows in {table}"))?;
        Ok(row.0)
    }

    /// Row count per loader table, `None` where the table does not exist.
    pub async fn table_counts(&self) -> Result<Vec<(&'static str, Option<i64>)>> {
        let mut counts = Vec::with_capacity(TABLES.len());
        for table in TABLES {
            let count = if self.table_exists(table).await? {
                Some(self.count(table).await?)
            } else {
                None
            };
            counts.push((table, count));
        }
        Ok(counts)
    }

    // --- Work item sources ---

    /// Every distinct game date, oldest first. These are the box-score work items.
    pub async fn distinct_game_dates(&self) -> Result<Vec<NaiveDate>> {
        let dates = sqlx::query_scalar::<_, NaiveDate>(
            "SELECT DISTINCT date FROM game WHERE date IS NOT NULL ORDER BY date ASC",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch game dates")?;
        Ok(dates)
    }

    /// Game dates that have no box-score rows yet.
    pub async fn pending_box_score_dates(&self) -> Result<Vec<NaiveDate>> {
        let dates = sqlx::query_scalar::<_, NaiveDate>(
            "SELECT DISTINCT g.date FROM game g
             WHERE g.date IS NOT NULL
               AND NOT EXISTS (SELECT 1 FROM box_score b WHERE b.date = g.date)
             ORDER BY g.date ASC",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch pending box score dates")?;
        Ok(dates)
    }

    // --- Reference data ---

    /// Upsert teams. Returns the number of rows written.
    pub async fn upsert_teams(&self, teams: &[TeamRecord]) -> Result<u64> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        let mut written = 0;
        for team in teams {
            written += upsert_team(&mut tx, team).await?;
        }
        tx.commit().await.context("Failed to commit teams")?;
        Ok(written)
    }

    /// Insert players that are not already stored. Returns the number of new rows.
    pub async fn insert_players(&self, players: &[PlayerRecord]) -> Result<u64> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        let team_ids: Vec<i64> = players.iter().filter_map(|p| p.team_id).collect();
        ensure_teams(&mut tx, &team_ids).await?;
        let mut inserted = 0;
        for player in players {
            inserted += insert_player(&mut tx, player).await?;
        }
        tx.commit().await.context("Failed to commit players")?;
        Ok(inserted)
    }

    // --- Batches ---

    /// Write one date's box scores atomically. Returns the number of new lines.
    pub async fn insert_box_score_batch(&self, batch: &BoxScoreBatch) -> Result<u64> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        for team in &batch.teams {
            upsert_team(&mut tx, team).await?;
        }
        let team_ids: Vec<i64> = batch.players.iter().filter_map(|p| p.team_id).collect();
        ensure_teams(&mut tx, &team_ids).await?;
        for player in &batch.players {
            insert_player(&mut tx, player).await?;
        }

        let mut inserted = 0;
        for line in &batch.lines {
            inserted += insert_box_score(&mut tx, line).await?;
        }

        tx.commit().await.context("Failed to commit box score batch")?;
        Ok(inserted)
    }

    /// Write one page of advanced stats atomically. Returns the number of new player_game rows.
    pub async fn insert_advanced_batch(&self, batch: &AdvancedBatch) -> Result<u64> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        for team in &batch.teams {
            upsert_team(&mut tx, team).await?;
        }
        let team_ids: Vec<i64> = batch
            .players
            .iter()
            .filter_map(|p| p.team_id)
            .chain(batch.games.iter().filter_map(|g| g.home_team_id))
            .chain(batch.games.iter().filter_map(|g| g.away_team_id))
            .collect();
        ensure_teams(&mut tx, &team_ids).await?;

        for player in &batch.players {
            insert_player(&mut tx, player).await?;
        }
        for game in &batch.games {
            insert_game(&mut tx, game).await?;
        }

        let mut inserted = 0;
        for row in &batch.player_games {
            inserted += insert_player_game(&mut tx, row).await?;
        }

        tx.commit().await.context("Failed to commit advanced stats page")?;
        Ok(inserted)
    }

    // --- Reads ---

    pub async fn get_team(&self, team_id: i64) -> Result<Option<TeamRecord>> {
        let team = sqlx::query_as::<_, TeamRecord>("SELECT * FROM team WHERE team_id = ?")
            .bind(team_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch team")?;
        Ok(team)
    }

    pub async fn get_player(&self, player_id: i64) -> Result<Option<PlayerRecord>> {
        let player = sqlx::query_as::<_, PlayerRecord>("SELECT * FROM player WHERE player_id = ?")
            .bind(player_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch player")?;
        Ok(player)
    }

    pub async fn get_game(&self, game_id: i64) -> Result<Option<GameRecord>> {
        let game = sqlx::query_as::<_, GameRecord>("SELECT * FROM game WHERE game_id = ?")
            .bind(game_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch game")?;
        Ok(game)
    }

    pub async fn get_box_scores_for_date(&self, date: NaiveDate) -> Result<Vec<BoxScoreRecord>> {
        let lines = sqlx::query_as::<_, BoxScoreRecord>(
            "SELECT * FROM box_score WHERE date = ? ORDER BY player_id",
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch box scores")?;
        Ok(lines)
    }
}

// --- Statement helpers, run inside the caller's transaction ---

/// Known columns fill in what is stored. A missing column never erases a stored value.
async fn upsert_team(conn: &mut SqliteConnection, team: &TeamRecord) -> Result<u64> {
    let result = sqlx::query(
        "INSERT INTO team (team_id, conference, division, city, name, full_name, abbreviation)
         VALUES (?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT (team_id) DO UPDATE SET
             conference = COALESCE(excluded.conference, team.conference),
             division = COALESCE(excluded.division, team.division),
             city = COALESCE(excluded.city, team.city),
             name = COALESCE(excluded.name, team.name),
             full_name = COALESCE(excluded.full_name, team.full_name),
             abbreviation = COALESCE(excluded.abbreviation, team.abbreviation)",
    )
    .bind(team.team_id)
    .bind(&team.conference)
    .bind(&team.division)
    .bind(&team.city)
    .bind(&team.name)
    .bind(&team.full_name)
    .bind(&team.abbreviation)
    .execute(&mut *conn)
    .await
    .with_context(|| format!("Failed to upsert team {}", team.team_id))?;
    Ok(result.rows_affected())
}

/// Insert id-only team rows for references the batch does not describe, so
/// players and games never trip the foreign keys. A later full team upsert
/// fills them in.
async fn ensure_teams(conn: &mut SqliteConnection, team_ids: &[i64]) -> Result<()> {
    let unique: BTreeSet<i64> = team_ids.iter().copied().collect();
    for team_id in unique {
        sqlx::query("INSERT INTO team (team_id) VALUES (?) ON CONFLICT (team_id) DO NOTHING")
            .bind(team_id)
            .execute(&mut *conn)
            .await
            .with_context(|| format!("Failed to ensure team {team_id}"))?;
    }
    Ok(())
}

async fn insert_player(conn: &mut SqliteConnection, player: &PlayerRecord) -> Result<u64> {
    let result = sqlx::query(
        "INSERT INTO player (player_id, first_name, last_name, position, height, weight, jersey_number, college, country, draft_year, draft_round, draft_number, team_id)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT (player_id) DO NOTHING",
    )
    .bind(player.player_id)
    .bind(&player.first_name)
    .bind(&player.last_name)
    .bind(&player.position)
    .bind(&player.height)
    .bind(player.weight)
    .bind(player.jersey_number)
    .bind(&player.college)
    .bind(&player.country)
    .bind(player.draft_year)
    .bind(player.draft_round)
    .bind(player.draft_number)
    .bind(player.team_id)
    .execute(&mut *conn)
    .await
    .with_context(|| format!("Failed to insert player {}", player.player_id))?;
    Ok(result.rows_affected())
}

async fn insert_game(conn: &mut SqliteConnection, game: &GameRecord) -> Result<u64> {
    let result = sqlx::query(
        "INSERT INTO game (game_id, date, season, postseason, home_team_score, away_team_score, home_team_id, away_team_id)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT (game_id) DO NOTHING",
    )
    .bind(game.game_id)
    .bind(game.date)
    .bind(game.season)
    .bind(game.postseason)
    .bind(game.home_team_score)
    .bind(game.away_team_score)
    .bind(game.home_team_id)
    .bind(game.away_team_id)
    .execute(&mut *conn)
    .await
    .with_context(|| format!("Failed to insert game {}", game.game_id))?;
    Ok(result.rows_affected())
}

async fn insert_player_game(conn: &mut SqliteConnection, row: &PlayerGameRecord) -> Result<u64> {
    let result = sqlx::query(
        "INSERT INTO player_game (player_id, game_id, pie, pace, assist_percentage, assist_ratio, assist_to_turnover, defensive_rating, defensive_rebound_percentage, effective_field_goal_percentage, net_rating, offensive_rating, offensive_rebound_percentage, true_shooting_percentage, turnover_ratio, usage_percentage)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT (player_id, game_id) DO NOTHING",
    )
    .bind(row.player_id)
    .bind(row.game_id)
    .bind(row.pie)
    .bind(row.pace)
    .bind(row.assist_percentage)
    .bind(row.assist_ratio)
    .bind(row.assist_to_turnover)
    .bind(row.defensive_rating)
    .bind(row.defensive_rebound_percentage)
    .bind(row.effective_field_goal_percentage)
    .bind(row.net_rating)
    .bind(row.offensive_rating)
    .bind(row.offensive_rebound_percentage)
    .bind(row.true_shooting_percentage)
    .bind(row.turnover_ratio)
    .bind(row.usage_percentage)
    .execute(&mut *conn)
    .await
    .with_context(|| {
        format!(
            "Failed to insert player_game ({}, {})",
            row.player_id, row.game_id
        )
    })?;
    Ok(result.rows_affected())
}

async fn insert_box_score(conn: &mut SqliteConnection, line: &BoxScoreRecord) -> Result<u64> {
    let result = sqlx::query(
        "INSERT INTO box_score (player_id, date, min, fgm, fga, fg_pct, fg3m, fg3a, fg3_pct, ftm, fta, ft_pct, oreb, dreb, reb, ast, stl, blk, turnover, pf, pts)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT (player_id, date) DO NOTHING",
    )
    .bind(line.player_id)
    .bind(line.date)
    .bind(line.min)
    .bind(line.fgm)
    .bind(line.fga)
    .bind(line.fg_pct)
    .bind(line.fg3m)
    .bind(line.fg3a)
    .bind(line.fg3_pct)
    .bind(line.ftm)
    .bind(line.fta)
    .bind(line.ft_pct)
    .bind(line.oreb)
    .bind(line.dreb)
    .bind(line.reb)
    .bind(line.ast)
    .bind(line.stl)
    .bind(line.blk)
    .bind(line.turnover)
    .bind(line.pf)
    .bind(line.pts)
    .execute(&mut *conn)
    .await
    .with_context(|| {
        format!(
            "Failed to insert box score ({}, {})",
            line.player_id, line.date
        )
    })?;
    Ok(result.rows_affected())
}
