//! Edge and expected-value math.
//!
//! Given a model's true probability and a bookmaker's decimal price,
//! computes the edge over the market and the expected value per unit
//! staked. Pure functions; invalid inputs are rejected up front.

use serde::{Deserialize, Serialize};

use crate::odds::{decimal_to_implied_probability, ensure_valid_decimal, ensure_valid_probability};
use crate::types::Result;

/// Expected value of a one-unit stake.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExpectedValue {
    /// Expected profit per unit staked: `p·b − q` with `b = d − 1`.
    pub ev: f64,
    /// Same quantity as a percentage (`100 · ev`).
    pub ev_percentage: f64,
    pub is_positive: bool,
}

/// Model probability minus the market's implied probability.
///
/// Positive means the market is underpricing the outcome.
pub fn edge(true_probability: f64, decimal_odds: f64) -> Result<f64> {
    ensure_valid_probability(true_probability)?;
    let implied = decimal_to_implied_probability(decimal_odds)?;
    Ok(true_probability - implied)
}

/// Expected value per unit staked at decimal odds `d`.
///
/// With net odds `b = d − 1` and loss probability `q = 1 − p`:
/// `ev = p·b − q`. At the break-even probability (`p = 1/d`) this is
/// exactly zero up to float epsilon.
pub fn expected_value(true_probability: f64, decimal_odds: f64) -> Result<ExpectedValue> {
    ensure_valid_probability(true_probability)?;
    ensure_valid_decimal(decimal_odds)?;

    let b = decimal_odds - 1.0;
    let q = 1.0 - true_probability;
    let ev = true_probability * b - q;

    Ok(ExpectedValue {
        ev,
        ev_percentage: 100.0 * ev,
        is_positive: ev > 0.0,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_ev_scenario() {
        // 55% true probability at even money: EV = 0.55·1 − 0.45 = +10%
        let ev = expected_value(0.55, 2.0).unwrap();
        assert!((ev.ev - 0.10).abs() < 1e-10);
        assert!((ev.ev_percentage - 10.0).abs() < 1e-8);
        assert!(ev.is_positive);
    }

    #[test]
    fn test_negative_ev() {
        let ev = expected_value(0.45, 2.0).unwrap();
        assert!(ev.ev < 0.0);
        assert!(!ev.is_positive);
    }

    #[test]
    fn test_break_even_is_exactly_zero() {
        for d in [1.5, 1.909, 2.0, 3.5, 7.0] {
            let p = decimal_to_implied_probability(d).unwrap();
            let ev = expected_value(p, d).unwrap();
            assert!(
                ev.ev.abs() < 1e-12,
                "break-even EV at d={d} should be 0, got {}",
                ev.ev
            );
            assert!(!ev.is_positive);
        }
    }

    #[test]
    fn test_edge_sign() {
        // Market implies 50%, model says 55% → +5% edge
        let e = edge(0.55, 2.0).unwrap();
        assert!((e - 0.05).abs() < 1e-10);

        let e = edge(0.45, 2.0).unwrap();
        assert!((e + 0.05).abs() < 1e-10);
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        assert!(expected_value(0.0, 2.0).is_err());
        assert!(expected_value(1.0, 2.0).is_err());
        assert!(expected_value(0.5, 1.0).is_err());
        assert!(expected_value(0.5, 0.8).is_err());
        assert!(edge(1.2, 2.0).is_err());
        assert!(edge(0.5, -3.0).is_err());
    }
}
