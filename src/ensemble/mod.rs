//! Ensemble scoring engine.
//!
//! Stacks four signal layers — base statistical learners, a boosting
//! adjustment, a sequential-pattern adjustment, and a diversity bonus —
//! into one blended win probability and a 0–100 stacked confidence.
//! Stateless: the same inputs always produce the same score.
//!
//! Stacking formula (fixed across releases — UI consumers depend on it):
//!
//! ```text
//! stacked = clamp(base·100 + 40·gb + 35·sp + 25·div, 0, 100)
//! ```
//!
//! where `base` is the weighted base-learner probability of the favored
//! side and `gb`/`sp`/`div` are signed adjustments in roughly ±0.1. The
//! per-layer display bars use the affine map `50 + adjustment·500`,
//! clamped to [0, 100], so a neutral layer reads 50.

pub mod pattern;

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::types::{LayerContributions, Side};
use pattern::{PatternKind, SequentialPattern};

// ---------------------------------------------------------------------------
// Stacking constants
// ---------------------------------------------------------------------------

/// Confidence points per unit of gradient-boosting adjustment.
const WEIGHT_BOOSTING: f64 = 40.0;
/// Confidence points per unit of sequential-pattern adjustment.
const WEIGHT_PATTERN: f64 = 35.0;
/// Confidence points per unit of diversity bonus.
const WEIGHT_DIVERSITY: f64 = 25.0;

/// Adjustment layers are capped to this magnitude before stacking.
const MAX_ADJUSTMENT: f64 = 0.1;

/// Diversity below this means the base models strongly agree.
const DIVERSITY_STRONG: f64 = 0.05;
/// Diversity below this means moderate agreement.
const DIVERSITY_MODERATE: f64 = 0.15;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// One base learner's opinion on the match.
#[derive(Debug, Clone, Serialize)]
pub struct ModelScore {
    pub name: &'static str,
    /// Probability of the HOME side winning.
    pub home_probability: f64,
    pub weight: f64,
}

/// Everything the scorer consumes. Pure data: no handles, no clocks.
#[derive(Debug, Clone)]
pub struct EnsembleInput {
    pub base_models: Vec<ModelScore>,
    /// Boosting residual, signed toward the HOME side (roughly ±0.1).
    pub boosting_signal: f64,
    /// Pattern detected on the base-favored team's recent results.
    pub pattern: SequentialPattern,
    /// Dispersion across the base models (standard deviation).
    pub diversity_score: f64,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// How much the base models agree with one another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgreementLevel {
    Strong,
    Moderate,
    Split,
}

impl fmt::Display for AgreementLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgreementLevel::Strong => write!(f, "models strongly agree"),
            AgreementLevel::Moderate => write!(f, "moderate agreement"),
            AgreementLevel::Split => write!(f, "models disagree"),
        }
    }
}

/// Per-layer display bars on a 0–100 scale (see module docs).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LayerBars {
    pub base_learners: f64,
    pub gradient_boosting: f64,
    pub sequential_pattern: f64,
    pub diversity_bonus: f64,
}

/// Stacked score for one match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsembleScore {
    /// The side the base learners favor. Adjustment layers never flip it.
    pub favored: Side,
    /// Blended probability of the favored side, clamped to [0.02, 0.98].
    pub probability: f64,
    /// Stacked confidence on the 0–100 display scale.
    pub stacked_confidence: f64,
    pub layers: LayerContributions,
    pub layer_bars: LayerBars,
    pub diversity_score: f64,
    pub agreement: AgreementLevel,
    pub pattern: SequentialPattern,
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

fn clamp(value: f64, lo: f64, hi: f64) -> f64 {
    value.max(lo).min(hi)
}

/// The fixed affine transform for a layer's display bar.
pub fn layer_bar(adjustment: f64) -> f64 {
    clamp(50.0 + adjustment * 500.0, 0.0, 100.0)
}

/// Weighted base-learner probability of the home side.
/// Returns 0.5 (no-signal) when no models or no weight are present.
fn weighted_home_probability(models: &[ModelScore]) -> f64 {
    let total_weight: f64 = models.iter().map(|m| m.weight).sum();
    if total_weight <= 0.0 {
        return 0.5;
    }
    models
        .iter()
        .map(|m| m.home_probability * m.weight)
        .sum::<f64>()
        / total_weight
}

/// Pattern adjustment toward the favored side.
///
/// The detector runs on the favored team's results, so `winning` means
/// the pattern supports the pick: a live streak reinforces it, a
/// regression-length run dampens it, a breakout reinforces, alternating
/// results always dampen slightly. No pattern, no contribution.
fn pattern_adjustment(pattern: &SequentialPattern) -> f64 {
    let s = pattern.strength;
    match pattern.kind {
        PatternKind::Streak => {
            if pattern.winning {
                0.05 * s
            } else {
                -0.05 * s
            }
        }
        PatternKind::Regression => {
            if pattern.winning {
                -0.04 * s
            } else {
                0.03 * s
            }
        }
        PatternKind::Breakout => 0.04 * s,
        PatternKind::Alternating => -0.02 * s,
        PatternKind::None => 0.0,
    }
}

/// Consensus bonus: tight model agreement earns a nudge, a split field
/// costs one.
fn diversity_bonus(diversity_score: f64) -> (f64, AgreementLevel) {
    if diversity_score < DIVERSITY_STRONG {
        (0.05, AgreementLevel::Strong)
    } else if diversity_score < DIVERSITY_MODERATE {
        (0.02, AgreementLevel::Moderate)
    } else {
        (-0.04, AgreementLevel::Split)
    }
}

/// Stack the layers into a blended probability and confidence.
pub fn score(input: &EnsembleInput) -> EnsembleScore {
    let home_p = weighted_home_probability(&input.base_models);
    let favored = if home_p >= 0.5 { Side::Home } else { Side::Away };
    let base = if favored == Side::Home {
        home_p
    } else {
        1.0 - home_p
    };

    // Align the home-signed boosting residual with the favored side.
    let gb_raw = if favored == Side::Home {
        input.boosting_signal
    } else {
        -input.boosting_signal
    };
    let gb = clamp(gb_raw, -MAX_ADJUSTMENT, MAX_ADJUSTMENT);
    let sp = clamp(
        pattern_adjustment(&input.pattern),
        -MAX_ADJUSTMENT,
        MAX_ADJUSTMENT,
    );
    let (div, agreement) = diversity_bonus(input.diversity_score);

    let stacked_confidence = clamp(
        base * 100.0 + WEIGHT_BOOSTING * gb + WEIGHT_PATTERN * sp + WEIGHT_DIVERSITY * div,
        0.0,
        100.0,
    );
    let probability = clamp(base + gb + sp + div, 0.02, 0.98);

    let layers = LayerContributions {
        base_learners: base,
        gradient_boosting: gb,
        sequential_pattern: sp,
        diversity_bonus: div,
    };

    debug!(
        favored = %favored,
        base = format!("{:.3}", base),
        gb = format!("{:+.3}", gb),
        sp = format!("{:+.3}", sp),
        div = format!("{:+.3}", div),
        stacked = format!("{:.1}", stacked_confidence),
        %agreement,
        "Ensemble scored"
    );

    EnsembleScore {
        favored,
        probability,
        stacked_confidence,
        layers,
        layer_bars: LayerBars {
            base_learners: clamp(base * 100.0, 0.0, 100.0),
            gradient_boosting: layer_bar(gb),
            sequential_pattern: layer_bar(sp),
            diversity_bonus: layer_bar(div),
        },
        diversity_score: input.diversity_score,
        agreement,
        pattern: input.pattern.clone(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn model(p: f64, w: f64) -> ModelScore {
        ModelScore {
            name: "test",
            home_probability: p,
            weight: w,
        }
    }

    fn input(models: Vec<ModelScore>) -> EnsembleInput {
        EnsembleInput {
            base_models: models,
            boosting_signal: 0.0,
            pattern: SequentialPattern::none(),
            diversity_score: 0.10,
        }
    }

    #[test]
    fn test_favored_side_follows_base_learners() {
        let home = score(&input(vec![model(0.62, 1.0)]));
        assert_eq!(home.favored, Side::Home);
        assert!((home.layers.base_learners - 0.62).abs() < 1e-9);

        let away = score(&input(vec![model(0.38, 1.0)]));
        assert_eq!(away.favored, Side::Away);
        assert!((away.layers.base_learners - 0.62).abs() < 1e-9);
    }

    #[test]
    fn test_no_models_is_neutral() {
        let s = score(&input(vec![]));
        assert!((s.layers.base_learners - 0.5).abs() < 1e-9);
        assert!((s.probability - 0.52).abs() < 1e-9); // 0.5 + moderate-agreement bonus
    }

    #[test]
    fn test_weighted_average() {
        let s = score(&input(vec![model(0.60, 3.0), model(0.40, 1.0)]));
        // (0.6·3 + 0.4·1) / 4 = 0.55
        assert!((s.layers.base_learners - 0.55).abs() < 1e-9);
    }

    #[test]
    fn test_boosting_aligned_with_favored_side() {
        let mut inp = input(vec![model(0.40, 1.0)]); // away favored
        inp.boosting_signal = 0.05; // toward HOME → contradicts the pick
        let s = score(&inp);
        assert_eq!(s.favored, Side::Away);
        assert!((s.layers.gradient_boosting + 0.05).abs() < 1e-9);
    }

    #[test]
    fn test_boosting_clamped() {
        let mut inp = input(vec![model(0.60, 1.0)]);
        inp.boosting_signal = 0.5;
        let s = score(&inp);
        assert!((s.layers.gradient_boosting - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_diversity_tiers() {
        let mut inp = input(vec![model(0.60, 1.0)]);

        inp.diversity_score = 0.02;
        let strong = score(&inp);
        assert_eq!(strong.agreement, AgreementLevel::Strong);
        assert!((strong.layers.diversity_bonus - 0.05).abs() < 1e-9);

        inp.diversity_score = 0.10;
        let moderate = score(&inp);
        assert_eq!(moderate.agreement, AgreementLevel::Moderate);
        assert!((moderate.layers.diversity_bonus - 0.02).abs() < 1e-9);

        inp.diversity_score = 0.25;
        let split = score(&inp);
        assert_eq!(split.agreement, AgreementLevel::Split);
        assert!((split.layers.diversity_bonus + 0.04).abs() < 1e-9);
    }

    #[test]
    fn test_pattern_never_flips_the_pick() {
        // Favored home with every adjustment pulling against the pick
        let mut inp = input(vec![model(0.52, 1.0)]);
        inp.boosting_signal = -0.1;
        inp.diversity_score = 0.30;
        inp.pattern = SequentialPattern {
            kind: PatternKind::Regression,
            strength: 1.0,
            winning: true,
            description: String::new(),
        };
        let s = score(&inp);
        assert_eq!(s.favored, Side::Home, "adjustments must not flip the pick");
        assert!(s.probability < 0.52);
    }

    #[test]
    fn test_streak_reinforces_and_regression_dampens() {
        let streak = SequentialPattern {
            kind: PatternKind::Streak,
            strength: 1.0,
            winning: true,
            description: String::new(),
        };
        let regression = SequentialPattern {
            kind: PatternKind::Regression,
            strength: 1.0,
            winning: true,
            description: String::new(),
        };

        let mut inp = input(vec![model(0.60, 1.0)]);
        inp.pattern = streak;
        let hot = score(&inp);
        assert!(hot.layers.sequential_pattern > 0.0);

        inp.pattern = regression;
        let cooled = score(&inp);
        assert!(cooled.layers.sequential_pattern < 0.0);
        assert!(cooled.stacked_confidence < hot.stacked_confidence);
    }

    #[test]
    fn test_no_pattern_contributes_zero() {
        let s = score(&input(vec![model(0.60, 1.0)]));
        assert_eq!(s.layers.sequential_pattern, 0.0);
    }

    #[test]
    fn test_stacking_formula() {
        let mut inp = input(vec![model(0.60, 1.0)]);
        inp.boosting_signal = 0.05;
        inp.diversity_score = 0.02; // strong → +0.05
        let s = score(&inp);
        // 60 + 40·0.05 + 35·0 + 25·0.05 = 63.25
        assert!((s.stacked_confidence - 63.25).abs() < 1e-9);
        // blended p = 0.60 + 0.05 + 0 + 0.05 = 0.70
        assert!((s.probability - 0.70).abs() < 1e-9);
    }

    #[test]
    fn test_layer_bar_transform() {
        assert_eq!(layer_bar(0.0), 50.0);
        assert_eq!(layer_bar(0.05), 75.0);
        assert_eq!(layer_bar(-0.05), 25.0);
        assert_eq!(layer_bar(0.1), 100.0);
        assert_eq!(layer_bar(-0.1), 0.0);
        assert_eq!(layer_bar(0.3), 100.0); // clamped
    }

    #[test]
    fn test_probability_clamped() {
        let mut inp = input(vec![model(0.97, 1.0)]);
        inp.boosting_signal = 0.1;
        inp.diversity_score = 0.01;
        let s = score(&inp);
        assert!(s.probability <= 0.98);
    }
}
