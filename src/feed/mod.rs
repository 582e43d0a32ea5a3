//! Market odds feed.
//!
//! The engine consults a provider for current prices just before the
//! value math runs. Lookups are bounded by the engine's timeout and fall
//! back to the match's embedded last-known odds, so a slow or dead feed
//! can never leave a match id half-locked.

use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use tracing::debug;

use crate::config::OddsFeedConfig;
use crate::types::{EngineError, MarketOdds, Result};

/// Source of current market prices, keyed by match id.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OddsProvider: Send + Sync {
    async fn latest_odds(&self, match_id: &str) -> Result<MarketOdds>;

    /// Provider name for logging.
    fn name(&self) -> &'static str;
}

// ---------------------------------------------------------------------------
// Static provider
// ---------------------------------------------------------------------------

/// Fixed in-process price table for offline runs and tests.
#[derive(Default)]
pub struct StaticOddsProvider {
    prices: DashMap<String, MarketOdds>,
}

impl StaticOddsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_odds(self, match_id: &str, odds: MarketOdds) -> Self {
        self.prices.insert(match_id.to_string(), odds);
        self
    }

    pub fn set_odds(&self, match_id: &str, odds: MarketOdds) {
        self.prices.insert(match_id.to_string(), odds);
    }
}

#[async_trait]
impl OddsProvider for StaticOddsProvider {
    async fn latest_odds(&self, match_id: &str) -> Result<MarketOdds> {
        self.prices
            .get(match_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| EngineError::Feed(format!("no odds recorded for {match_id}")))
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

// ---------------------------------------------------------------------------
// HTTP provider
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct OddsResponse {
    home: f64,
    away: f64,
    #[serde(default)]
    draw: Option<f64>,
}

/// Odds-API-style HTTP client. The API key is referenced by env-var name
/// in config and resolved at construction.
pub struct HttpOddsFeed {
    http: Client,
    base_url: String,
    api_key: Option<Secret<String>>,
}

impl HttpOddsFeed {
    pub fn new(cfg: &OddsFeedConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .user_agent("SHARPLINE/0.1.0")
            .build()?;
        let api_key = std::env::var(&cfg.api_key_env).ok().map(Secret::new);
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl OddsProvider for HttpOddsFeed {
    async fn latest_odds(&self, match_id: &str) -> Result<MarketOdds> {
        let key = self
            .api_key
            .as_ref()
            .ok_or_else(|| EngineError::Feed("odds feed API key not configured".to_string()))?;

        let url = format!(
            "{}/odds?match={}",
            self.base_url,
            urlencoding::encode(match_id)
        );
        debug!(%url, "Fetching market odds");

        let response = self
            .http
            .get(&url)
            .header("x-api-key", key.expose_secret())
            .send()
            .await
            .map_err(|e| EngineError::Feed(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(EngineError::Feed(format!(
                "odds feed returned {} for {match_id}",
                response.status()
            )));
        }

        let parsed: OddsResponse = response
            .json()
            .await
            .map_err(|e| EngineError::Feed(format!("bad odds payload: {e}")))?;

        Ok(MarketOdds {
            home: parsed.home,
            away: parsed.away,
            draw: parsed.draw,
        })
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
