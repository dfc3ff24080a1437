//! Teams and players. Teams go first: players and games reference them.

use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::api::StatsApi;
use crate::db::records::{PlayerRecord, TeamRecord};
use crate::db::store::Store;
use crate::etl::transform::{player_record, team_record};
use crate::monitoring::progress::Progress;

#[instrument(skip_all)]
pub async fn load_teams(api: &dyn StatsApi, store: &Store) -> Result<u64> {
    let teams = api.teams().await.context("Failed to fetch teams")?;
    let records: Vec<TeamRecord> = teams.iter().map(team_record).collect();
    let written = store.upsert_teams(&records).await?;
    info!(teams = records.len(), "Teams loaded");
    Ok(written)
}

/// Page through every player. Returns the number of newly inserted players.
#[instrument(skip_all)]
pub async fn load_players(api: &dyn StatsApi, store: &Store) -> Result<u64> {
    let progress = Progress::unbounded("players");
    let mut cursor: Option<String> = None;
    let mut inserted = 0;

    loop {
        let page = api
            .players_page(cursor.as_deref())
            .await
            .with_context(|| format!("Failed to fetch players page {}", progress.done() + 1))?;

        let records: Vec<PlayerRecord> = page.data.iter().map(player_record).collect();
        inserted += store.insert_players(&records).await?;
        progress.tick();

        match page.next_cursor() {
            Some(next) => cursor = Some(next.to_string()),
            None => break,
        }
    }

    info!(pages = progress.done(), inserted, "Players loaded");
    Ok(inserted)
}
