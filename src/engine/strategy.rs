//! Per-league prediction strategies.
//!
//! The orchestrator picks a strategy by league code before entering the
//! pipeline. The generic path runs the full ensemble; baseball gets its
//! own path, because the generic learners systematically overrate
//! favorites in a sport this close to a coin flip per game.

use crate::config::LeaguesConfig;
use crate::ensemble::{self, pattern, EnsembleInput};
use crate::types::{
    HistoricalContext, LayerContributions, League, MatchInfo, ProjectedScore, Side,
};

use super::factors;

/// What a strategy produces before market math and staking.
#[derive(Debug, Clone)]
pub struct PredictionDraft {
    pub recommended: Side,
    /// Probability of the recommended side, in (0, 1).
    pub probability: f64,
    /// 0–100 display confidence before the engine's bounds are applied.
    pub stacked_confidence: f64,
    pub projected_score: ProjectedScore,
    pub layers: LayerContributions,
    pub reasoning: Vec<String>,
}

/// A league-specific way of turning context into a draft prediction.
/// Pure computation: strategies never touch the store or the feed.
pub trait PredictionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn evaluate(
        &self,
        match_info: &MatchInfo,
        ctx: &HistoricalContext,
        leagues: &LeaguesConfig,
    ) -> PredictionDraft;
}

/// Select the strategy for a league.
pub fn for_league(league: League) -> &'static dyn PredictionStrategy {
    match league {
        League::Mlb => &BaseballStrategy,
        _ => &GenericStrategy,
    }
}

// ---------------------------------------------------------------------------
// Generic ensemble path
// ---------------------------------------------------------------------------

pub struct GenericStrategy;

impl PredictionStrategy for GenericStrategy {
    fn name(&self) -> &'static str {
        "generic-ensemble"
    }

    fn evaluate(
        &self,
        match_info: &MatchInfo,
        ctx: &HistoricalContext,
        leagues: &LeaguesConfig,
    ) -> PredictionDraft {
        let analysis = factors::analyze(ctx);

        // The pattern detector runs on whichever team the base learners
        // favor, so its adjustment is signed relative to the pick.
        let total_weight: f64 = analysis.models.iter().map(|m| m.weight).sum();
        let home_weighted = if total_weight > 0.0 {
            analysis
                .models
                .iter()
                .map(|m| m.home_probability * m.weight)
                .sum::<f64>()
                / total_weight
        } else {
            0.5
        };
        let favored_stats = if home_weighted >= 0.5 {
            &ctx.home
        } else {
            &ctx.away
        };
        let detected = pattern::detect(&favored_stats.recent, favored_stats.win_pct());

        let score = ensemble::score(&EnsembleInput {
            base_models: analysis.models,
            boosting_signal: analysis.boosting_signal,
            pattern: detected,
            diversity_score: analysis.diversity_score,
        });

        let home_probability = match score.favored {
            Side::Home => score.probability,
            _ => 1.0 - score.probability,
        };
        let projected_score =
            factors::project_score(home_probability, leagues.profile_for(match_info.league));

        let mut reasoning = analysis.reasoning;
        reasoning.push(format!("Ensemble: {}", score.agreement));
        if score.pattern.kind != pattern::PatternKind::None {
            reasoning.push(format!("Pattern: {}", score.pattern.description));
        }

        PredictionDraft {
            recommended: score.favored,
            probability: score.probability,
            stacked_confidence: score.stacked_confidence,
            projected_score,
            layers: score.layers,
            reasoning,
        }
    }
}

// ---------------------------------------------------------------------------
// Baseball path
// ---------------------------------------------------------------------------

/// Dedicated MLB path: Pythagorean run expectation with a hard band.
/// Single-game baseball outcomes are close to coin flips even for great
/// teams, so the band is much tighter than the generic path's.
pub struct BaseballStrategy;

/// Pythagorean exponent for run-based win expectation.
const PYTH_EXPONENT: f64 = 1.83;

/// Single-game probabilities are confined to this band.
const MLB_PROB_FLOOR: f64 = 0.35;
const MLB_PROB_CEIL: f64 = 0.65;

/// Home-field bump in probability terms.
const MLB_HOME_FIELD: f64 = 0.04;

fn pythagorean(points_for: f64, points_against: f64) -> f64 {
    if points_for <= 0.0 && points_against <= 0.0 {
        return 0.5;
    }
    let pf = points_for.max(1e-9).powf(PYTH_EXPONENT);
    let pa = points_against.max(1e-9).powf(PYTH_EXPONENT);
    pf / (pf + pa)
}

impl PredictionStrategy for BaseballStrategy {
    fn name(&self) -> &'static str {
        "baseball-pythagorean"
    }

    fn evaluate(
        &self,
        match_info: &MatchInfo,
        ctx: &HistoricalContext,
        leagues: &LeaguesConfig,
    ) -> PredictionDraft {
        let home_pyth = pythagorean(ctx.home.points_for, ctx.home.points_against);
        let away_pyth = pythagorean(ctx.away.points_for, ctx.away.points_against);

        let raw = 0.5 + (home_pyth - away_pyth) * 0.9 + MLB_HOME_FIELD;
        let home_probability = raw.clamp(MLB_PROB_FLOOR, MLB_PROB_CEIL);

        let (recommended, probability) = if home_probability >= 0.5 {
            (Side::Home, home_probability)
        } else {
            (Side::Away, 1.0 - home_probability)
        };

        let projected_score =
            factors::project_score(home_probability, leagues.profile_for(match_info.league));

        PredictionDraft {
            recommended,
            probability,
            stacked_confidence: probability * 100.0,
            projected_score,
            // The generic adjustment layers don't run on this path.
            layers: LayerContributions {
                base_learners: probability,
                gradient_boosting: 0.0,
                sequential_pattern: 0.0,
                diversity_bonus: 0.0,
            },
            reasoning: vec![
                format!(
                    "Pythagorean expectation: home {:.3} vs away {:.3}",
                    home_pyth, away_pyth
                ),
                format!("Home field: +{:.0}pp", MLB_HOME_FIELD * 100.0),
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
