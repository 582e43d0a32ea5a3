//! Shared types for the SHARPLINE engine.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that analytics, ensemble,
//! and engine modules can depend on them without circular references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Sides & leagues
// ---------------------------------------------------------------------------

/// Which side of a match a prediction or bet is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Home,
    Away,
    Draw,
}

impl Side {
    /// The opposite side. Draw is its own opposite.
    pub fn opposite(&self) -> Self {
        match self {
            Side::Home => Side::Away,
            Side::Away => Side::Home,
            Side::Draw => Side::Draw,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Home => write!(f, "HOME"),
            Side::Away => write!(f, "AWAY"),
            Side::Draw => write!(f, "DRAW"),
        }
    }
}

/// League code for routing to the appropriate prediction strategy
/// and score profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum League {
    Nba,
    Nfl,
    Mlb,
    Nhl,
    Soccer,
    Other,
}

impl League {
    /// All known leagues (useful for iteration).
    pub const ALL: &'static [League] = &[
        League::Nba,
        League::Nfl,
        League::Mlb,
        League::Nhl,
        League::Soccer,
        League::Other,
    ];

    /// Whether this league supports a three-way (draw) market.
    pub fn has_draw(&self) -> bool {
        matches!(self, League::Soccer)
    }
}

impl fmt::Display for League {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            League::Nba => write!(f, "NBA"),
            League::Nfl => write!(f, "NFL"),
            League::Mlb => write!(f, "MLB"),
            League::Nhl => write!(f, "NHL"),
            League::Soccer => write!(f, "Soccer"),
            League::Other => write!(f, "Other"),
        }
    }
}

/// Attempt to parse a string into a League (case-insensitive).
impl std::str::FromStr for League {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nba" | "basketball" => Ok(League::Nba),
            "nfl" | "football" => Ok(League::Nfl),
            "mlb" | "baseball" => Ok(League::Mlb),
            "nhl" | "hockey" => Ok(League::Nhl),
            "soccer" | "epl" | "mls" => Ok(League::Soccer),
            "other" => Ok(League::Other),
            _ => Err(anyhow::anyhow!("Unknown league code: {s}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Match & market
// ---------------------------------------------------------------------------

/// Current market prices for a match, as decimal odds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketOdds {
    pub home: f64,
    pub away: f64,
    /// Three-way leagues only; `None` for two-way markets.
    pub draw: Option<f64>,
}

impl MarketOdds {
    /// The decimal price quoted for a given side, if the market carries it.
    pub fn price_for(&self, side: Side) -> Option<f64> {
        match side {
            Side::Home => Some(self.home),
            Side::Away => Some(self.away),
            Side::Draw => self.draw,
        }
    }
}

impl fmt::Display for MarketOdds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.draw {
            Some(d) => write!(f, "H {:.2} / D {:.2} / A {:.2}", self.home, d, self.away),
            None => write!(f, "H {:.2} / A {:.2}", self.home, self.away),
        }
    }
}

/// A scheduled match to predict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchInfo {
    /// Unique match identifier; the locking key.
    pub id: String,
    pub league: League,
    pub home_team: String,
    pub away_team: String,
    /// Last-known market odds; the engine may refresh these via the feed.
    pub odds: MarketOdds,
    pub start_time: DateTime<Utc>,
}

impl fmt::Display for MatchInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} @ {} ({})",
            self.league, self.away_team, self.home_team, self.odds,
        )
    }
}

impl MatchInfo {
    /// Helper to build a test/sample match with sensible defaults.
    #[cfg(test)]
    pub fn sample() -> Self {
        MatchInfo {
            id: "nba-2026-01-15-bos-lal".to_string(),
            league: League::Nba,
            home_team: "Celtics".to_string(),
            away_team: "Lakers".to_string(),
            odds: MarketOdds {
                home: 1.72,
                away: 2.20,
                draw: None,
            },
            start_time: Utc::now() + chrono::Duration::hours(6),
        }
    }
}

// ---------------------------------------------------------------------------
// Historical context
// ---------------------------------------------------------------------------

/// Outcome of a single past game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameResult {
    Win,
    Loss,
}

/// Season-to-date statistics for one team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamStats {
    pub wins: u32,
    pub losses: u32,
    pub points_for: f64,
    pub points_against: f64,
    /// Recent results in chronological order (most recent last).
    pub recent: Vec<GameResult>,
    pub rest_days: u32,
}

impl TeamStats {
    pub fn games(&self) -> u32 {
        self.wins + self.losses
    }

    /// Season win percentage. Returns 0.5 with no games played.
    pub fn win_pct(&self) -> f64 {
        let games = self.games();
        if games == 0 {
            0.5
        } else {
            self.wins as f64 / games as f64
        }
    }

    /// Average scoring margin per game. Zero with no games played.
    pub fn avg_margin(&self) -> f64 {
        let games = self.games();
        if games == 0 {
            0.0
        } else {
            (self.points_for - self.points_against) / games as f64
        }
    }

    /// Win rate over the last `n` recent results (all of them if fewer).
    /// Returns 0.5 when no recent results are recorded.
    pub fn recent_win_rate(&self, n: usize) -> f64 {
        if self.recent.is_empty() {
            return 0.5;
        }
        let tail: Vec<_> = self.recent.iter().rev().take(n).collect();
        let wins = tail.iter().filter(|r| ***r == GameResult::Win).count();
        wins as f64 / tail.len() as f64
    }
}

/// Head-to-head aggregate between the two teams.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HeadToHead {
    pub games_played: u32,
    pub home_wins: u32,
}

impl HeadToHead {
    /// Home team's historical win rate in this matchup.
    /// Returns 0.5 when no meetings are recorded.
    pub fn home_rate(&self) -> f64 {
        if self.games_played == 0 {
            0.5
        } else {
            self.home_wins as f64 / self.games_played as f64
        }
    }
}

/// Everything the pipeline knows about the two teams going in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalContext {
    pub home: TeamStats,
    pub away: TeamStats,
    pub head_to_head: Option<HeadToHead>,
}

impl HistoricalContext {
    /// Helper for tests: a context where the home team is clearly stronger.
    #[cfg(test)]
    pub fn sample_home_favored() -> Self {
        HistoricalContext {
            home: TeamStats {
                wins: 30,
                losses: 10,
                points_for: 4520.0,
                points_against: 4210.0,
                recent: vec![
                    GameResult::Win,
                    GameResult::Win,
                    GameResult::Loss,
                    GameResult::Win,
                    GameResult::Win,
                ],
                rest_days: 2,
            },
            away: TeamStats {
                wins: 18,
                losses: 22,
                points_for: 4380.0,
                points_against: 4465.0,
                recent: vec![
                    GameResult::Loss,
                    GameResult::Win,
                    GameResult::Loss,
                    GameResult::Loss,
                    GameResult::Win,
                ],
                rest_days: 1,
            },
            head_to_head: Some(HeadToHead {
                games_played: 10,
                home_wins: 7,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Odds history & bet records
// ---------------------------------------------------------------------------

/// One observation of a market price over time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OddsTick {
    pub timestamp: DateTime<Utc>,
    /// Decimal odds at this moment.
    pub odds: f64,
    pub source: String,
}

/// A closed bet, used for CLV aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetRecord {
    pub match_id: String,
    /// Decimal odds at which the bet was placed.
    pub placed_odds: f64,
    /// Decimal odds at market close.
    pub closing_odds: f64,
    pub stake: f64,
    pub placed_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Ensemble layer contributions
// ---------------------------------------------------------------------------

/// Signed pull of each ensemble layer toward the recommended side.
///
/// `base_learners` is the raw weighted confidence in [0, 1]; the other
/// three are small signed adjustments (roughly ±0.1) where a positive
/// sign agrees with the base pick and a negative sign contradicts it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LayerContributions {
    pub base_learners: f64,
    pub gradient_boosting: f64,
    pub sequential_pattern: f64,
    pub diversity_bonus: f64,
}

// ---------------------------------------------------------------------------
// Prediction
// ---------------------------------------------------------------------------

/// Projected final score pair, in the league's native scale.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProjectedScore {
    pub home: f64,
    pub away: f64,
}

impl fmt::Display for ProjectedScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}-{:.1}", self.home, self.away)
    }
}

/// A fully computed, locked prediction for a match.
///
/// Created exactly once per match id by the `PredictionEngine`; never
/// mutated afterwards. Destroyed only by an explicit local cache clear,
/// which does not affect the persisted copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    /// Opaque audit identifier, assigned when the record is computed.
    pub prediction_id: Uuid,
    pub match_id: String,
    pub league: League,
    pub recommended: Side,
    /// Integer percent, bounded to the configured confidence range.
    pub confidence: u8,
    pub projected_score: ProjectedScore,
    /// Model probability of the recommended side winning, in (0, 1).
    pub true_probability: f64,
    /// Fair decimal odds implied by `true_probability`.
    pub implied_fair_odds: f64,
    /// Expected value per unit staked at the market price.
    pub expected_value: f64,
    pub ev_percentage: f64,
    /// Fractional-Kelly stake as a 0–1 fraction of bankroll.
    pub kelly_fraction: f64,
    /// Stake in currency units, rounded to 2 decimals.
    pub recommended_stake: f64,
    /// Stake expressed in betting units.
    pub stake_units: f64,
    /// Stacked ensemble confidence on the 0–100 display scale.
    pub stacked_confidence: f64,
    pub layers: LayerContributions,
    /// Free-form factor breakdown for display.
    pub reasoning: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}% | p={:.3} fair={:.2} | EV={:+.1}% | kelly={:.4} stake=${:.2}",
            self.match_id,
            self.recommended,
            self.confidence,
            self.true_probability,
            self.implied_fair_odds,
            self.ev_percentage,
            self.kelly_fraction,
            self.recommended_stake,
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for SHARPLINE.
///
/// Validation errors mean the input is out of domain by construction and
/// is never silently clamped; no-signal conditions (missing pattern
/// history, empty aggregates) are not errors and never appear here.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid odds: {0}")]
    InvalidOdds(String),

    #[error("Invalid probability {0}: must be strictly between 0 and 1")]
    InvalidProbability(f64),

    #[error("Invalid bankroll {0}: must be positive")]
    InvalidBankroll(f64),

    #[error("Empty history: {0}")]
    EmptyHistory(&'static str),

    #[error("Market has no {side} price for match {match_id}")]
    MissingPrice { match_id: String, side: Side },

    #[error("Storage error: {0}")]
    Store(String),

    #[error("Odds feed error: {0}")]
    Feed(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
