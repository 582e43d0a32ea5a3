//! Configuration loading from TOML.
//!
//! Reads `sharpline.toml` and deserializes into strongly-typed structs.
//! Every section has defaults, so the engine runs with no config file at
//! all; league score distributions and staking defaults live here rather
//! than as constants so tests can override them deterministically.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

use crate::analytics::kelly::StakingConfig;
use crate::types::League;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub staking: StakingConfig,
    pub leagues: LeaguesConfig,
    pub odds_feed: OddsFeedConfig,
    pub storage: StorageConfig,
    pub dashboard: DashboardConfig,
}

/// Pipeline bounds and timeouts.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EngineConfig {
    /// Bankroll the staking math sizes against.
    pub bankroll: f64,
    /// Lowest confidence percent ever reported.
    pub confidence_floor: u8,
    /// Highest confidence percent on the general path.
    pub confidence_ceiling: u8,
    /// Ceiling when the blended probability sits near a coin flip.
    pub near_even_ceiling: u8,
    /// Half-width of the "near even" probability band around 0.5.
    pub near_even_band: f64,
    /// Budget for a live odds lookup before falling back to last-known.
    pub odds_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bankroll: 1000.0,
            confidence_floor: 40,
            confidence_ceiling: 88,
            near_even_ceiling: 62,
            near_even_band: 0.05,
            odds_timeout_ms: 1500,
        }
    }
}

/// Typical scoring shape of a league, used for score projection.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct ScoreProfile {
    /// Average combined points/goals/runs per game.
    pub avg_total: f64,
    /// Home side's share of the scoring edge, in game points.
    pub home_edge: f64,
    /// Points of projected margin per unit of (2p − 1).
    pub margin_scale: f64,
}

/// Per-league score profiles.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LeaguesConfig {
    pub nba: ScoreProfile,
    pub nfl: ScoreProfile,
    pub mlb: ScoreProfile,
    pub nhl: ScoreProfile,
    pub soccer: ScoreProfile,
    pub other: ScoreProfile,
}

impl Default for LeaguesConfig {
    fn default() -> Self {
        Self {
            nba: ScoreProfile {
                avg_total: 224.0,
                home_edge: 2.5,
                margin_scale: 28.0,
            },
            nfl: ScoreProfile {
                avg_total: 45.0,
                home_edge: 1.5,
                margin_scale: 21.0,
            },
            mlb: ScoreProfile {
                avg_total: 8.7,
                home_edge: 0.2,
                margin_scale: 5.5,
            },
            nhl: ScoreProfile {
                avg_total: 6.1,
                home_edge: 0.25,
                margin_scale: 3.4,
            },
            soccer: ScoreProfile {
                avg_total: 2.7,
                home_edge: 0.35,
                margin_scale: 2.0,
            },
            other: ScoreProfile {
                avg_total: 100.0,
                home_edge: 1.0,
                margin_scale: 20.0,
            },
        }
    }
}

impl LeaguesConfig {
    /// Get the score profile for a given league.
    pub fn profile_for(&self, league: League) -> &ScoreProfile {
        match league {
            League::Nba => &self.nba,
            League::Nfl => &self.nfl,
            League::Mlb => &self.mlb,
            League::Nhl => &self.nhl,
            League::Soccer => &self.soccer,
            League::Other => &self.other,
        }
    }
}

/// Live odds feed. Disabled by default; the engine then uses each
/// match's embedded last-known odds.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OddsFeedConfig {
    pub enabled: bool,
    pub base_url: String,
    /// Env var holding the feed API key (never the key itself).
    pub api_key_env: String,
}

impl Default for OddsFeedConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "https://api.the-odds-api.com/v4".to_string(),
            api_key_env: "ODDS_API_KEY".to_string(),
        }
    }
}

/// Prediction store. `None` runs on the in-memory store.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// e.g. `sqlite://sharpline.db`; omit for in-memory.
    pub database_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8080,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Load from a TOML file if present, defaults otherwise.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if std::path::Path::new(path).exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}
