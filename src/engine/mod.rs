//! Prediction engine — the lock/cache orchestrator.
//!
//! Per match id the engine is a two-state machine: Unlocked (no
//! prediction) → Locked (prediction exists, immutable). The expensive
//! pipeline runs at most once per id: a local cache short-circuits
//! repeat callers, a per-id async mutex serialises concurrent callers,
//! and the store's `insert_if_absent` arbitrates races across server
//! instances — the loser adopts the winner's record.

pub mod factors;
pub mod strategy;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::analytics::kelly::{calculate_stake, StakeRequest};
use crate::config::AppConfig;
use crate::feed::OddsProvider;
use crate::odds::probability_to_fair_odds;
use crate::store::PredictionStore;
use crate::types::{
    EngineError, HistoricalContext, MarketOdds, MatchInfo, Prediction, Result,
};

/// Round to `dp` decimal places (display stability for stored records).
fn round_dp(value: f64, dp: i32) -> f64 {
    let scale = 10f64.powi(dp);
    (value * scale).round() / scale
}

pub struct PredictionEngine {
    config: AppConfig,
    store: Arc<dyn PredictionStore>,
    feed: Option<Arc<dyn OddsProvider>>,
    /// Locked predictions already seen by this process.
    cache: DashMap<String, Prediction>,
    /// Per-match-id locks: concurrent callers for the same id queue here
    /// instead of both running the pipeline.
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl PredictionEngine {
    pub fn new(config: AppConfig, store: Arc<dyn PredictionStore>) -> Self {
        Self {
            config,
            store,
            feed: None,
            cache: DashMap::new(),
            locks: DashMap::new(),
        }
    }

    /// Attach a live odds provider. Lookups are bounded by the configured
    /// timeout and fall back to each match's embedded odds.
    pub fn with_feed(mut self, feed: Arc<dyn OddsProvider>) -> Self {
        self.feed = Some(feed);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Number of predictions in the local cache.
    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }

    /// Get (or compute exactly once) the locked prediction for a match.
    ///
    /// Once a match id is locked, this returns the identical record on
    /// every call, regardless of how the live context has changed.
    pub async fn generate_prediction(
        &self,
        match_info: &MatchInfo,
        ctx: &HistoricalContext,
    ) -> Result<Prediction> {
        let id = &match_info.id;

        // Locked short-circuit, no lock contention.
        if let Some(hit) = self.cache.get(id) {
            debug!(match_id = %id, "Cache hit");
            return Ok(hit.clone());
        }

        let key_lock = self
            .locks
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = key_lock.lock().await;

        // A caller we queued behind may have finished the job.
        if let Some(hit) = self.cache.get(id) {
            debug!(match_id = %id, "Cache hit after lock wait");
            return Ok(hit.clone());
        }

        // Locked in the store by an earlier run or another instance.
        if let Some(locked) = self.store.get(id).await? {
            debug!(match_id = %id, "Adopting persisted lock");
            self.cache.insert(id.clone(), locked.clone());
            return Ok(locked);
        }

        let computed = self.run_pipeline(match_info, ctx).await?;

        // Check-and-set at the storage boundary. Losing the race means
        // another instance locked first: discard ours, take theirs.
        let locked = if self.store.insert_if_absent(&computed).await? {
            info!(match_id = %id, prediction = %computed, "Prediction locked");
            computed
        } else {
            warn!(match_id = %id, "Lost lock race — adopting winner's record");
            self.store.get(id).await?.ok_or_else(|| {
                EngineError::Store(format!("lock race for {id} left no record"))
            })?
        };

        self.cache.insert(id.clone(), locked.clone());
        // Queued callers re-check the cache; the entry is done.
        self.locks.remove(id);
        Ok(locked)
    }

    /// Run predictions for a slate of matches concurrently. Per-id locks
    /// keep duplicate ids at-most-once; distinct ids don't block each
    /// other.
    pub async fn predict_slate(
        &self,
        slate: &[(MatchInfo, HistoricalContext)],
    ) -> Vec<Result<Prediction>> {
        futures::future::join_all(
            slate
                .iter()
                .map(|(m, ctx)| self.generate_prediction(m, ctx)),
        )
        .await
    }

    /// Drop a match from the local cache and recompute. The recompute
    /// first re-checks the persisted lock, so an already-locked record
    /// is returned unchanged rather than overwritten.
    pub async fn regenerate_prediction(
        &self,
        match_info: &MatchInfo,
        ctx: &HistoricalContext,
    ) -> Result<Prediction> {
        self.cache.remove(&match_info.id);
        self.generate_prediction(match_info, ctx).await
    }

    /// Clear the whole local cache. Persisted locks are untouched.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Read-only lookup of an already-locked prediction, if any.
    pub async fn get_locked(&self, match_id: &str) -> Result<Option<Prediction>> {
        if let Some(hit) = self.cache.get(match_id) {
            return Ok(Some(hit.clone()));
        }
        self.store.get(match_id).await
    }

    // -- pipeline ---------------------------------------------------------

    /// Current market odds: live feed when attached (bounded by the
    /// configured timeout), last-known odds from the match otherwise.
    async fn resolve_odds(&self, match_info: &MatchInfo) -> MarketOdds {
        let Some(feed) = &self.feed else {
            return match_info.odds.clone();
        };

        let budget = Duration::from_millis(self.config.engine.odds_timeout_ms);
        match tokio::time::timeout(budget, feed.latest_odds(&match_info.id)).await {
            Ok(Ok(odds)) => odds,
            Ok(Err(e)) => {
                warn!(match_id = %match_info.id, error = %e, "Odds feed failed — using last-known odds");
                match_info.odds.clone()
            }
            Err(_) => {
                warn!(
                    match_id = %match_info.id,
                    timeout_ms = self.config.engine.odds_timeout_ms,
                    "Odds feed timed out — using last-known odds"
                );
                match_info.odds.clone()
            }
        }
    }

    async fn run_pipeline(
        &self,
        match_info: &MatchInfo,
        ctx: &HistoricalContext,
    ) -> Result<Prediction> {
        let picked = strategy::for_league(match_info.league);
        debug!(match_id = %match_info.id, strategy = picked.name(), "Running pipeline");

        let market = self.resolve_odds(match_info).await;
        let draft = picked.evaluate(match_info, ctx, &self.config.leagues);

        let price = market
            .price_for(draft.recommended)
            .ok_or_else(|| EngineError::MissingPrice {
                match_id: match_info.id.clone(),
                side: draft.recommended,
            })?;

        let stake = calculate_stake(
            &StakeRequest::new(draft.probability, price, self.config.engine.bankroll)
                .with_config(self.config.staking.clone()),
        )?;

        let bounds = &self.config.engine;
        // Near-even games use the tighter ceiling.
        let ceiling = if (draft.probability - 0.5).abs() <= bounds.near_even_band {
            bounds.near_even_ceiling
        } else {
            bounds.confidence_ceiling
        };
        let confidence = (draft.stacked_confidence.round() as i64)
            .clamp(bounds.confidence_floor as i64, ceiling as i64) as u8;

        Ok(Prediction {
            prediction_id: uuid::Uuid::new_v4(),
            match_id: match_info.id.clone(),
            league: match_info.league,
            recommended: draft.recommended,
            confidence,
            projected_score: draft.projected_score,
            true_probability: round_dp(draft.probability, 4),
            implied_fair_odds: round_dp(probability_to_fair_odds(draft.probability)?, 2),
            expected_value: round_dp(stake.expected_value.ev, 4),
            ev_percentage: round_dp(stake.expected_value.ev_percentage, 2),
            kelly_fraction: stake.final_kelly,
            recommended_stake: stake.recommended_stake,
            stake_units: stake.stake_units,
            stacked_confidence: round_dp(draft.stacked_confidence, 1),
            layers: draft.layers,
            reasoning: draft.reasoning,
            created_at: Utc::now(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
