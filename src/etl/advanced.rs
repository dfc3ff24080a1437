//! Advanced stats loader: season by season, page by page, following the cursor.

use anyhow::{Context, Result};
use tracing::{info, instrument, warn};

use crate::api::StatsApi;
use crate::db::store::Store;
use crate::etl::transform::flatten_advanced;
use crate::monitoring::progress::Progress;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeasonSummary {
    pub season: i32,
    pub pages: u64,
    pub records: u64,
    pub rows_inserted: u64,
    /// False when paging stopped early on an API error.
    pub complete: bool,
}

/// Load every season in order.
///
/// An API failure (after the client's retries) ends that season and moves on
/// to the next one. A database failure aborts the whole load.
pub async fn load_advanced_stats(
    api: &dyn StatsApi,
    store: &Store,
    seasons: &[i32],
) -> Result<Vec<SeasonSummary>> {
    let mut summaries = Vec::with_capacity(seasons.len());
    for &season in seasons {
        let summary = load_season(api, store, season).await?;
        summaries.push(summary);
    }
    Ok(summaries)
}

#[instrument(skip(api, store))]
async fn load_season(api: &dyn StatsApi, store: &Store, season: i32) -> Result<SeasonSummary> {
    let progress = Progress::unbounded(format!("season {season}"));
    let mut summary = SeasonSummary {
        season,
        ..SeasonSummary::default()
    };
    let mut cursor: Option<String> = None;

    loop {
        let page = match api.advanced_stats_page(season, cursor.as_deref()).await {
            Ok(page) => page,
            Err(e) => {
                warn!(
                    season,
                    page = summary.pages + 1,
                    error = %e,
                    "Unable to fetch advanced stats page, skipping rest of season"
                );
                return Ok(summary);
            }
        };

        let batch = flatten_advanced(&page.data)
            .with_context(|| format!("Malformed advanced stats page for season {season}"))?;
        let inserted = store
            .insert_advanced_batch(&batch)
            .await
            .with_context(|| format!("Failed to store advanced stats for season {season}"))?;

        summary.pages += 1;
        summary.records += page.data.len() as u64;
        summary.rows_inserted += inserted;
        progress.tick();

        match page.next_cursor() {
            Some(next) => cursor = Some(next.to_string()),
            None => break,
        }
    }

    summary.complete = true;
    info!(
        season,
        pages = summary.pages,
        records = summary.records,
        rows = summary.rows_inserted,
        "Season loaded"
    );
    Ok(summary)
}
