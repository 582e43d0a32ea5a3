//! Closing line value.
//!
//! Grades a bet's price against the market's closing price, analyses
//! line movement over an odds history, and aggregates CLV across a bet
//! ledger. Missing history is fatal for movement analysis but a valid
//! "no data yet" state for aggregation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::odds::{decimal_to_implied_probability, ensure_valid_decimal};
use crate::types::{BetRecord, EngineError, OddsTick, Result};

/// Notional stake used for the dollar-value comparison.
const NOTIONAL_STAKE: f64 = 100.0;

// ---------------------------------------------------------------------------
// Single-bet CLV
// ---------------------------------------------------------------------------

/// Four-tier bet quality grade.
///
/// Buckets include their upper boundary: (5, ∞) excellent, (2, 5] good,
/// (−2, 2] neutral, (−∞, −2] poor. Exactly 5.0% is Good, exactly 2.0%
/// is Neutral, exactly −2.0% is Poor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClvCategory {
    Excellent,
    Good,
    Neutral,
    Poor,
}

impl ClvCategory {
    /// Bucket a CLV percentage. Strict `>` comparisons, so each bucket
    /// includes its upper boundary (see the type docs).
    pub fn from_percentage(clv_percentage: f64) -> Self {
        if clv_percentage > 5.0 {
            ClvCategory::Excellent
        } else if clv_percentage > 2.0 {
            ClvCategory::Good
        } else if clv_percentage > -2.0 {
            ClvCategory::Neutral
        } else {
            ClvCategory::Poor
        }
    }
}

impl fmt::Display for ClvCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClvCategory::Excellent => write!(f, "excellent"),
            ClvCategory::Good => write!(f, "good"),
            ClvCategory::Neutral => write!(f, "neutral"),
            ClvCategory::Poor => write!(f, "poor"),
        }
    }
}

/// CLV grade for one bet. Derived on demand, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClvResult {
    pub predicted_odds: f64,
    pub opening_odds: Option<f64>,
    pub closing_odds: f64,
    /// `100 · (predicted − closing) / closing`.
    pub clv_percentage: f64,
    /// True when the bet got longer odds than the close.
    pub beat_closing_line: bool,
    pub category: ClvCategory,
    /// `100 · (implied(predicted) − implied(closing))`. Negative when the
    /// predicted price was longer than the close, i.e. the price paid
    /// embedded less probability than the market's final estimate.
    pub implied_edge: f64,
    /// Profit difference between the two prices on a $100 notional stake.
    pub dollar_value: f64,
}

/// Grade a predicted/bet price against the closing price.
pub fn calculate_clv(
    predicted_odds: f64,
    closing_odds: f64,
    opening_odds: Option<f64>,
) -> Result<ClvResult> {
    ensure_valid_decimal(predicted_odds)?;
    ensure_valid_decimal(closing_odds)?;
    if let Some(opening) = opening_odds {
        ensure_valid_decimal(opening)?;
    }

    let clv_percentage = 100.0 * (predicted_odds - closing_odds) / closing_odds;
    let implied_edge = 100.0
        * (decimal_to_implied_probability(predicted_odds)?
            - decimal_to_implied_probability(closing_odds)?);

    Ok(ClvResult {
        predicted_odds,
        opening_odds,
        closing_odds,
        clv_percentage,
        beat_closing_line: predicted_odds > closing_odds,
        category: ClvCategory::from_percentage(clv_percentage),
        implied_edge,
        dollar_value: NOTIONAL_STAKE * (predicted_odds - closing_odds),
    })
}

// ---------------------------------------------------------------------------
// Line movement
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementDirection {
    Up,
    Down,
    Stable,
}

/// Summary of how a line moved between open and close.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineMovement {
    pub opening_odds: f64,
    pub closing_odds: f64,
    pub high_odds: f64,
    pub low_odds: f64,
    /// `100 · (closing − opening) / opening`.
    pub total_movement_pct: f64,
    pub direction: MovementDirection,
    /// Absolute movement percent per hour of history span.
    pub velocity_per_hour: f64,
    /// True when the move is both large (> 3%) and fast (> 0.5%/h),
    /// the signature of informed money hitting the line.
    pub sharp_money_indicator: bool,
    pub observations: usize,
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
}

/// Analyse a set of odds observations, sorting them by timestamp first.
/// Requires at least one observation.
pub fn analyze_line_movement(history: &[OddsTick]) -> Result<LineMovement> {
    if history.is_empty() {
        return Err(EngineError::EmptyHistory("odds history"));
    }
    for tick in history {
        ensure_valid_decimal(tick.odds)?;
    }

    let mut ticks: Vec<&OddsTick> = history.iter().collect();
    ticks.sort_by_key(|t| t.timestamp);

    let opening = ticks.first().expect("non-empty");
    let closing = ticks.last().expect("non-empty");
    let high = ticks.iter().map(|t| t.odds).fold(f64::MIN, f64::max);
    let low = ticks.iter().map(|t| t.odds).fold(f64::MAX, f64::min);

    let total_movement_pct = 100.0 * (closing.odds - opening.odds) / opening.odds;
    let direction = if total_movement_pct.abs() < 1.0 {
        MovementDirection::Stable
    } else if total_movement_pct > 0.0 {
        MovementDirection::Up
    } else {
        MovementDirection::Down
    };

    // Velocity floor of one minute keeps single-tick histories finite.
    let span_hours = ((closing.timestamp - opening.timestamp).num_seconds() as f64 / 3600.0)
        .max(1.0 / 60.0);
    let velocity_per_hour = total_movement_pct.abs() / span_hours;

    Ok(LineMovement {
        opening_odds: opening.odds,
        closing_odds: closing.odds,
        high_odds: high,
        low_odds: low,
        total_movement_pct,
        direction,
        velocity_per_hour,
        sharp_money_indicator: total_movement_pct.abs() > 3.0 && velocity_per_hour > 0.5,
        observations: ticks.len(),
        opened_at: opening.timestamp,
        closed_at: closing.timestamp,
    })
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// CLV distribution across a bet ledger.
///
/// An empty ledger is a valid "no data yet" state and yields all zeros,
/// unlike the per-match history above where emptiness is an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClvSummary {
    pub count: usize,
    pub mean_clv: f64,
    pub median_clv: f64,
    pub percent_positive: f64,
    pub total_clv: f64,
    pub std_dev: f64,
}

impl ClvSummary {
    fn empty() -> Self {
        Self {
            count: 0,
            mean_clv: 0.0,
            median_clv: 0.0,
            percent_positive: 0.0,
            total_clv: 0.0,
            std_dev: 0.0,
        }
    }
}

/// Aggregate CLV percentages across closed bets.
pub fn aggregate_clv(bets: &[BetRecord]) -> ClvSummary {
    if bets.is_empty() {
        return ClvSummary::empty();
    }

    let mut clvs: Vec<f64> = bets
        .iter()
        .map(|b| 100.0 * (b.placed_odds - b.closing_odds) / b.closing_odds)
        .collect();
    clvs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let n = clvs.len();
    let total: f64 = clvs.iter().sum();
    let mean = total / n as f64;
    let median = if n % 2 == 1 {
        clvs[n / 2]
    } else {
        (clvs[n / 2 - 1] + clvs[n / 2]) / 2.0
    };
    let positive = clvs.iter().filter(|c| **c > 0.0).count();
    let variance = clvs.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / n as f64;

    ClvSummary {
        count: n,
        mean_clv: mean,
        median_clv: median,
        percent_positive: 100.0 * positive as f64 / n as f64,
        total_clv: total,
        std_dev: variance.sqrt(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn tick(minutes_ago: i64, odds: f64) -> OddsTick {
        OddsTick {
            timestamp: Utc::now() - Duration::minutes(minutes_ago),
            odds,
            source: "book".to_string(),
        }
    }

    fn bet(placed: f64, closing: f64) -> BetRecord {
        BetRecord {
            match_id: "m".to_string(),
            placed_odds: placed,
            closing_odds: closing,
            stake: 50.0,
            placed_at: Utc::now(),
        }
    }

    // -- calculate_clv --

    #[test]
    fn test_clv_symmetry() {
        let clv = calculate_clv(2.0, 2.0, None).unwrap();
        assert_eq!(clv.clv_percentage, 0.0);
        assert!(!clv.beat_closing_line);
        assert_eq!(clv.category, ClvCategory::Neutral);
        assert_eq!(clv.dollar_value, 0.0);
    }

    #[test]
    fn test_clv_beat_the_close() {
        // Bet at 2.2, market closed 1.9: got better value
        let clv = calculate_clv(2.2, 1.9, None).unwrap();
        assert!(clv.beat_closing_line);
        assert!(clv.clv_percentage > 0.0);
        assert!((clv.clv_percentage - 15.789).abs() < 1e-2);
        assert!((clv.dollar_value - 30.0).abs() < 1e-9);
        assert_eq!(clv.category, ClvCategory::Excellent);
        // Longer odds embed less probability than the close
        assert!(clv.implied_edge < 0.0);
    }

    #[test]
    fn test_clv_category_boundaries() {
        // Exactly at each threshold falls into the lower bucket
        assert_eq!(ClvCategory::from_percentage(5.0), ClvCategory::Good);
        assert_eq!(ClvCategory::from_percentage(5.1), ClvCategory::Excellent);
        assert_eq!(ClvCategory::from_percentage(2.0), ClvCategory::Neutral);
        assert_eq!(ClvCategory::from_percentage(2.1), ClvCategory::Good);
        assert_eq!(ClvCategory::from_percentage(-2.0), ClvCategory::Poor);
        assert_eq!(ClvCategory::from_percentage(-1.9), ClvCategory::Neutral);
        assert_eq!(ClvCategory::from_percentage(-8.0), ClvCategory::Poor);
    }

    #[test]
    fn test_clv_mid_bucket_grades() {
        // +10% is excellent, +3% good, 0% neutral, -10% poor
        assert_eq!(
            calculate_clv(2.2, 2.0, None).unwrap().category,
            ClvCategory::Excellent
        );
        assert_eq!(
            calculate_clv(2.06, 2.0, None).unwrap().category,
            ClvCategory::Good
        );
        assert_eq!(
            calculate_clv(2.0, 2.0, None).unwrap().category,
            ClvCategory::Neutral
        );
        assert_eq!(
            calculate_clv(1.8, 2.0, None).unwrap().category,
            ClvCategory::Poor
        );
    }

    #[test]
    fn test_clv_validates_odds() {
        assert!(calculate_clv(1.0, 2.0, None).is_err());
        assert!(calculate_clv(2.0, 0.5, None).is_err());
        assert!(calculate_clv(2.0, 2.0, Some(0.9)).is_err());
    }

    #[test]
    fn test_clv_carries_opening_odds() {
        let clv = calculate_clv(2.1, 2.0, Some(2.3)).unwrap();
        assert_eq!(clv.opening_odds, Some(2.3));
    }

    // -- analyze_line_movement --

    #[test]
    fn test_movement_empty_history_is_error() {
        let err = analyze_line_movement(&[]).unwrap_err();
        assert!(matches!(err, EngineError::EmptyHistory(_)));
    }

    #[test]
    fn test_movement_sorts_unordered_input() {
        // Deliberately shuffled: opening is the oldest tick (2.0)
        let history = vec![tick(30, 2.1), tick(120, 2.0), tick(5, 2.3)];
        let movement = analyze_line_movement(&history).unwrap();
        assert_eq!(movement.opening_odds, 2.0);
        assert_eq!(movement.closing_odds, 2.3);
        assert_eq!(movement.high_odds, 2.3);
        assert_eq!(movement.low_odds, 2.0);
        assert_eq!(movement.observations, 3);
        assert_eq!(movement.direction, MovementDirection::Up);
    }

    #[test]
    fn test_movement_stable_below_one_percent() {
        let history = vec![tick(60, 2.00), tick(10, 2.01)];
        let movement = analyze_line_movement(&history).unwrap();
        assert_eq!(movement.direction, MovementDirection::Stable);
        assert!(!movement.sharp_money_indicator);
    }

    #[test]
    fn test_sharp_money_fast_large_move() {
        // 5% move over 2 hours: velocity 2.5%/h, sharp
        let history = vec![tick(120, 2.0), tick(0, 1.9)];
        let movement = analyze_line_movement(&history).unwrap();
        assert_eq!(movement.direction, MovementDirection::Down);
        assert!(movement.total_movement_pct < -3.0);
        assert!(movement.sharp_money_indicator);
    }

    #[test]
    fn test_no_sharp_money_on_slow_drift() {
        // Same 5% move spread over two weeks: velocity ≈ 0.015%/h
        let slow = vec![
            OddsTick {
                timestamp: Utc::now() - Duration::days(14),
                odds: 2.0,
                source: "book".to_string(),
            },
            OddsTick {
                timestamp: Utc::now(),
                odds: 1.9,
                source: "book".to_string(),
            },
        ];
        let movement = analyze_line_movement(&slow).unwrap();
        assert!(!movement.sharp_money_indicator);
    }

    #[test]
    fn test_single_observation() {
        let movement = analyze_line_movement(&[tick(0, 2.0)]).unwrap();
        assert_eq!(movement.opening_odds, 2.0);
        assert_eq!(movement.closing_odds, 2.0);
        assert_eq!(movement.total_movement_pct, 0.0);
        assert_eq!(movement.direction, MovementDirection::Stable);
    }

    // -- aggregate_clv --

    #[test]
    fn test_aggregate_empty_is_zeroes_not_error() {
        let summary = aggregate_clv(&[]);
        assert_eq!(summary.count, 0);
        assert_eq!(summary.mean_clv, 0.0);
        assert_eq!(summary.median_clv, 0.0);
        assert_eq!(summary.percent_positive, 0.0);
        assert_eq!(summary.std_dev, 0.0);
    }

    #[test]
    fn test_aggregate_known_values() {
        // CLVs: +10%, 0%, -5%
        let bets = vec![bet(2.2, 2.0), bet(2.0, 2.0), bet(1.9, 2.0)];
        let summary = aggregate_clv(&bets);
        assert_eq!(summary.count, 3);
        assert!((summary.mean_clv - (10.0 + 0.0 - 5.0) / 3.0).abs() < 1e-9);
        assert!((summary.median_clv - 0.0).abs() < 1e-9);
        assert!((summary.percent_positive - 100.0 / 3.0).abs() < 1e-9);
        assert!((summary.total_clv - 5.0).abs() < 1e-9);
        assert!(summary.std_dev > 0.0);
    }

    #[test]
    fn test_aggregate_even_count_median() {
        // CLVs: +10%, +5%
        let bets = vec![bet(2.2, 2.0), bet(2.1, 2.0)];
        let summary = aggregate_clv(&bets);
        assert!((summary.median_clv - 7.5).abs() < 1e-9);
        assert_eq!(summary.percent_positive, 100.0);
    }
}
