//! Nested API payloads to flat table rows.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::NaiveDate;

use crate::api::models::{AdvancedStat, BoxScoreGame, Game, Player, PlayerLine, Team};
use crate::db::records::{
    AdvancedBatch, BoxScoreBatch, BoxScoreRecord, GameRecord, PlayerGameRecord, PlayerRecord,
    TeamRecord,
};

/// Minutes played as a fraction of minutes.
///
/// `"34:30"` is 34.5, a bare `"34"` is 34.0, and a missing, empty or
/// unreadable value counts as zero minutes.
pub fn parse_minutes(raw: Option<&str>) -> f64 {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return 0.0;
    };

    match raw.split_once(':') {
        Some((minutes, seconds)) => match (minutes.parse::<u32>(), seconds.parse::<u32>()) {
            (Ok(m), Ok(s)) => f64::from(m) + f64::from(s) / 60.0,
            _ => 0.0,
        },
        None => raw.parse::<f64>().ok().filter(|m| m.is_finite() && *m >= 0.0).unwrap_or(0.0),
    }
}

/// Accepts `2019-02-14` as well as `2019-02-14T00:00:00.000Z`.
pub fn parse_game_date(raw: &str) -> Result<NaiveDate> {
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .with_context(|| format!("Invalid game date: {raw}"))
}

pub fn team_record(team: &Team) -> TeamRecord {
    TeamRecord {
        team_id: team.id,
        conference: team.conference.clone(),
        division: team.division.clone(),
        city: team.city.clone(),
        name: team.name.clone(),
        full_name: team.full_name.clone(),
        abbreviation: team.abbreviation.clone(),
    }
}

pub fn player_record(player: &Player) -> PlayerRecord {
    PlayerRecord {
        player_id: player.id,
        first_name: player.first_name.clone(),
        last_name: player.last_name.clone(),
        position: player.position.clone(),
        height: player.height.clone(),
        weight: player.weight,
        jersey_number: player.jersey_number,
        college: player.college.clone(),
        country: player.country.clone(),
        draft_year: player.draft_year,
        draft_round: player.draft_round,
        draft_number: player.draft_number,
        team_id: player.current_team_id(),
    }
}

pub fn game_record(game: &Game) -> Result<GameRecord> {
    Ok(GameRecord {
        game_id: game.id,
        date: parse_game_date(&game.date)?,
        season: game.season,
        postseason: game.postseason,
        home_team_score: game.home_team_score,
        away_team_score: game.visitor_team_score,
        home_team_id: game.home_team_id,
        away_team_id: game.visitor_team_id,
    })
}

fn box_score_record(line: &PlayerLine, date: NaiveDate) -> BoxScoreRecord {
    BoxScoreRecord {
        player_id: line.player.id,
        date,
        min: parse_minutes(line.min.as_deref()),
        fgm: line.fgm,
        fga: line.fga,
        fg_pct: line.fg_pct,
        fg3m: line.fg3m,
        fg3a: line.fg3a,
        fg3_pct: line.fg3_pct,
        ftm: line.ftm,
        fta: line.fta,
        ft_pct: line.ft_pct,
        oreb: line.oreb,
        dreb: line.dreb,
        reb: line.reb,
        ast: line.ast,
        stl: line.stl,
        blk: line.blk,
        turnover: line.turnover,
        pf: line.pf,
        pts: line.pts,
    }
}

/// Flatten one date's box scores: one line per player per game, plus every
/// team and player seen, deduplicated by id.
///
/// Each row takes its date from the game it belongs to, falling back to the
/// requested `date` when the game's own date does not parse.
pub fn flatten_box_scores(date: NaiveDate, games: &[BoxScoreGame]) -> BoxScoreBatch {
    let mut teams = BTreeMap::new();
    let mut players = BTreeMap::new();
    let mut lines = Vec::new();

    for game in games {
        let game_date = parse_game_date(&game.date).unwrap_or(date);

        for side in [&game.home_team, &game.visitor_team] {
            teams.insert(side.team.id, team_record(&side.team));

            for line in &side.players {
                let mut player = player_record(&line.player);
                // Box-score players carry no team of their own; they played for this side.
                player.team_id = player.team_id.or(Some(side.team.id));
                players.insert(player.player_id, player);

                lines.push(box_score_record(line, game_date));
            }
        }
    }

    BoxScoreBatch {
        teams: teams.into_values().collect(),
        players: players.into_values().collect(),
        lines,
    }
}

/// Split advanced-stat records into their team, player, game and player_game rows.
///
/// A record whose game date does not parse is an error: the page is
/// rejected rather than silently loaded without its game.
pub fn flatten_advanced(records: &[AdvancedStat]) -> Result<AdvancedBatch> {
    let mut teams = BTreeMap::new();
    let mut players = BTreeMap::new();
    let mut games = BTreeMap::new();
    let mut player_games = Vec::with_capacity(records.len());

    for record in records {
        if let Some(team) = &record.team {
            teams.insert(team.id, team_record(team));
        }
        players.insert(record.player.id, player_record(&record.player));
        games.insert(record.game.id, game_record(&record.game)?);

        player_games.push(PlayerGameRecord {
            player_id: record.player.id,
            game_id: record.game.id,
            pie: record.pie,
            pace: record.pace,
            assist_percentage: record.assist_percentage,
            assist_ratio: record.assist_ratio,
            assist_to_turnover: record.assist_to_turnover,
            defensive_rating: record.defensive_rating,
            defensive_rebound_percentage: record.defensive_rebound_percentage,
            effective_field_goal_percentage: record.effective_field_goal_percentage,
            net_rating: record.net_rating,
            offensive_rating: record.offensive_rating,
            offensive_rebound_percentage: record.offensive_rebound_percentage,
            true_shooting_percentage: record.true_shooting_percentage,
            turnover_ratio: record.turnover_ratio,
            usage_percentage: record.usage_percentage,
        });
    }

    Ok(AdvancedBatch {
        teams: teams.into_values().collect(),
        players: players.into_values().collect(),
        games: games.into_values().collect(),
        player_games,
    })
}
