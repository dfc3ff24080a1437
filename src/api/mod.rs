pub mod balldontlie;
pub mod error;
pub mod models;

use async_trait::async_trait;
use chrono::NaiveDate;

pub use error::ApiError;
use models::{AdvancedStat, BoxScoreGame, Page, Player, Team};

/// Read side of the stats API. The loaders only see this trait, so the
/// pipeline can run against a canned source in tests.
#[async_trait]
pub trait StatsApi: Send + Sync {
    /// Every franchise the API knows about, historical ones included.
    async fn teams(&self) -> Result<Vec<Team>, ApiError>;

    async fn players_page(&self, cursor: Option<&str>) -> Result<Page<Player>, ApiError>;

    async fn advanced_stats_page(
        &self,
        season: i32,
        cursor: Option<&str>,
    ) -> Result<Page<AdvancedStat>, ApiError>;

    /// All box scores for games played on `date`. Not paginated.
    async fn box_scores(&self, date: NaiveDate) -> Result<Vec<BoxScoreGame>, ApiError>;
}
