//! Odds conversions.
//!
//! Pure functions converting between American odds, decimal odds, and
//! implied probability. The three representations are mutually inverse
//! within floating-point tolerance; inputs outside each form's domain
//! are rejected, never clamped.
//!
//! Quoting conventions:
//!   American +150  →  decimal 2.50  →  implied 40%
//!   American −150  →  decimal 1.667 →  implied 60%
//! No American line is ever quoted strictly between −100 and +100.

use crate::types::{EngineError, Result};

/// Validate a decimal odds value (must be strictly greater than 1.0).
pub fn ensure_valid_decimal(decimal: f64) -> Result<()> {
    if !decimal.is_finite() || decimal <= 1.0 {
        return Err(EngineError::InvalidOdds(format!(
            "decimal odds {decimal} must be > 1.0"
        )));
    }
    Ok(())
}

/// Validate a probability (must lie strictly inside (0, 1)).
pub fn ensure_valid_probability(p: f64) -> Result<()> {
    if !p.is_finite() || p <= 0.0 || p >= 1.0 {
        return Err(EngineError::InvalidProbability(p));
    }
    Ok(())
}

/// Convert American odds to decimal odds.
///
/// For favorites (american ≤ −100): decimal = 100/|american| + 1.
/// For underdogs (american ≥ +100): decimal = american/100 + 1.
/// Values in the open interval (−100, 100) are not quotable and are
/// rejected.
pub fn american_to_decimal(american: i32) -> Result<f64> {
    if american >= 100 {
        Ok(american as f64 / 100.0 + 1.0)
    } else if american <= -100 {
        Ok(100.0 / american.abs() as f64 + 1.0)
    } else {
        Err(EngineError::InvalidOdds(format!(
            "American odds {american} fall inside (-100, 100)"
        )))
    }
}

/// Convert decimal odds back to the nearest quotable American line.
pub fn decimal_to_american(decimal: f64) -> Result<i32> {
    ensure_valid_decimal(decimal)?;
    if decimal >= 2.0 {
        Ok(((decimal - 1.0) * 100.0).round() as i32)
    } else {
        Ok((-100.0 / (decimal - 1.0)).round() as i32)
    }
}

/// The win probability embedded in a decimal price: p = 1/d.
pub fn decimal_to_implied_probability(decimal: f64) -> Result<f64> {
    ensure_valid_decimal(decimal)?;
    Ok(1.0 / decimal)
}

/// Fair decimal odds for a true probability: d = 1/p.
/// Exact inverse of `decimal_to_implied_probability`.
pub fn probability_to_fair_odds(p: f64) -> Result<f64> {
    ensure_valid_probability(p)?;
    Ok(1.0 / p)
}

/// Fair American line for a true probability.
pub fn probability_to_american(p: f64) -> Result<i32> {
    decimal_to_american(probability_to_fair_odds(p)?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
