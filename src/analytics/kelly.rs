//! Kelly criterion staking.
//!
//! Computes a fractional-Kelly recommended stake from a true probability,
//! a bookmaker decimal price, and the bankroll. Out-of-domain inputs are
//! rejected outright; the only clamping that happens here is the stake
//! cap, which is part of the sizing policy itself.

use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ev::{expected_value, ExpectedValue};
use crate::odds::{ensure_valid_decimal, ensure_valid_probability};
use crate::types::{EngineError, Result};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Staking policy knobs, independent of any particular bet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StakingConfig {
    /// Fractional Kelly multiplier (0.25 = quarter-Kelly). Lower = more conservative.
    pub kelly_fraction: f64,
    /// Size of one betting unit in currency.
    pub unit_size: f64,
    /// Minimum EV (in percent) below which no bet is recommended.
    pub min_ev_threshold: f64,
    /// Maximum stake as a percentage of bankroll.
    pub max_bet_percentage: f64,
}

impl Default for StakingConfig {
    fn default() -> Self {
        Self {
            kelly_fraction: 0.25,   // Quarter-Kelly: conservative
            unit_size: 10.0,        // $10 per unit
            min_ev_threshold: 3.0,  // Skip thin edges
            max_bet_percentage: 5.0,
        }
    }
}

/// One staking decision's inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StakeRequest {
    /// Model win probability, strictly inside (0, 1).
    pub true_probability: f64,
    /// Bookmaker decimal odds, strictly greater than 1.0.
    pub bookmaker_odds: f64,
    /// Bankroll in currency units, strictly positive.
    pub bankroll: f64,
    #[serde(flatten)]
    pub config: StakingConfig,
}

impl StakeRequest {
    pub fn new(true_probability: f64, bookmaker_odds: f64, bankroll: f64) -> Self {
        Self {
            true_probability,
            bookmaker_odds,
            bankroll,
            config: StakingConfig::default(),
        }
    }

    pub fn with_config(mut self, config: StakingConfig) -> Self {
        self.config = config;
        self
    }
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// How aggressive the final stake is relative to bankroll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Sized stake recommendation. All fractions are rounded to 4 decimal
/// places and all currency amounts to 2, so output is display-stable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KellyResult {
    /// Raw Kelly fraction `(b·p − q) / b` before any scaling.
    pub full_kelly: f64,
    /// After the fractional multiplier, floored at zero.
    pub adjusted_kelly: f64,
    /// After the max-bet cap; the fraction actually staked.
    pub final_kelly: f64,
    /// Stake in currency units.
    pub recommended_stake: f64,
    /// Stake as a percentage of bankroll.
    pub stake_percentage: f64,
    /// Stake expressed in betting units.
    pub stake_units: f64,
    pub expected_value: ExpectedValue,
    /// Expected log-growth of bankroll at the final fraction.
    pub expected_growth: f64,
    pub risk_level: RiskLevel,
    /// False means a deliberate no-bet signal, not an error.
    pub is_bet: bool,
}

impl KellyResult {
    /// The no-bet result: a valid answer meaning "sit this one out".
    fn no_bet(ev: ExpectedValue) -> Self {
        Self {
            full_kelly: 0.0,
            adjusted_kelly: 0.0,
            final_kelly: 0.0,
            recommended_stake: 0.0,
            stake_percentage: 0.0,
            stake_units: 0.0,
            expected_value: ev,
            expected_growth: 0.0,
            risk_level: RiskLevel::Low,
            is_bet: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Calculator
// ---------------------------------------------------------------------------

/// Round to `dp` decimal places for display-stable output.
fn round_dp(value: f64, dp: u32) -> f64 {
    Decimal::from_f64(value)
        .map(|d| d.round_dp(dp).to_f64().unwrap_or(value))
        .unwrap_or(value)
}

/// Size a stake with fractional Kelly.
///
/// Kelly formula: f* = (b·p − q) / b
/// where b = decimal odds − 1, p = win probability, q = 1 − p.
///
/// Returns a zero-stake result (not an error) when the bet has no
/// positive edge or the edge is below the configured EV threshold.
pub fn calculate_stake(request: &StakeRequest) -> Result<KellyResult> {
    ensure_valid_probability(request.true_probability)?;
    ensure_valid_decimal(request.bookmaker_odds)?;
    if !request.bankroll.is_finite() || request.bankroll <= 0.0 {
        return Err(EngineError::InvalidBankroll(request.bankroll));
    }

    let cfg = &request.config;
    let p = request.true_probability;
    let q = 1.0 - p;
    let b = request.bookmaker_odds - 1.0;

    let ev = expected_value(p, request.bookmaker_odds)?;
    if !ev.is_positive || ev.ev_percentage < cfg.min_ev_threshold {
        debug!(
            ev_pct = format!("{:.2}%", ev.ev_percentage),
            threshold = format!("{:.2}%", cfg.min_ev_threshold),
            "No bet — edge absent or below threshold"
        );
        return Ok(KellyResult::no_bet(ev));
    }

    let full_kelly = (b * p - q) / b;
    let adjusted_kelly = (full_kelly * cfg.kelly_fraction).max(0.0);
    let final_kelly = adjusted_kelly.min(cfg.max_bet_percentage / 100.0);

    let recommended_stake = request.bankroll * final_kelly;
    let expected_growth = p * (1.0 + b * final_kelly).ln() + q * (1.0 - final_kelly).ln();

    let final_kelly_rounded = round_dp(final_kelly, 4);
    let risk_level = if final_kelly_rounded < 0.02 {
        RiskLevel::Low
    } else if final_kelly_rounded < 0.05 {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    };

    let result = KellyResult {
        full_kelly: round_dp(full_kelly, 4),
        adjusted_kelly: round_dp(adjusted_kelly, 4),
        final_kelly: final_kelly_rounded,
        recommended_stake: round_dp(recommended_stake, 2),
        stake_percentage: round_dp(final_kelly * 100.0, 2),
        stake_units: round_dp(recommended_stake / cfg.unit_size, 2),
        expected_value: ev,
        expected_growth: round_dp(expected_growth, 4),
        risk_level,
        is_bet: true,
    };

    debug!(
        full_kelly = format!("{:.2}%", full_kelly * 100.0),
        final_kelly = format!("{:.2}%", final_kelly * 100.0),
        stake = format!("${:.2}", result.recommended_stake),
        ev = format!("{:+.1}%", ev.ev_percentage),
        risk = ?result.risk_level,
        "Stake sized"
    );

    Ok(result)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::odds::decimal_to_implied_probability;

    fn request(p: f64, odds: f64, bankroll: f64) -> StakeRequest {
        StakeRequest::new(p, odds, bankroll)
    }

    #[test]
    fn test_standard_quarter_kelly() {
        // p=0.55 at even money: full Kelly 10%, quarter-Kelly 2.5%
        let result = calculate_stake(&request(0.55, 2.0, 1000.0)).unwrap();
        assert!(result.is_bet);
        assert!((result.full_kelly - 0.10).abs() < 1e-9);
        assert!((result.adjusted_kelly - 0.025).abs() < 1e-9);
        assert!((result.final_kelly - 0.025).abs() < 1e-9);
        assert!((result.recommended_stake - 25.0).abs() < 1e-9);
        assert!((result.stake_percentage - 2.5).abs() < 1e-9);
        assert!(result.stake_percentage <= 5.0);
        assert_eq!(result.risk_level, RiskLevel::Medium);
    }

    #[test]
    fn test_zero_edge_no_bet() {
        let p = decimal_to_implied_probability(2.0).unwrap();
        let result = calculate_stake(&request(p, 2.0, 1000.0)).unwrap();
        assert!(!result.is_bet);
        assert_eq!(result.recommended_stake, 0.0);
        assert_eq!(result.final_kelly, 0.0);
        assert_eq!(result.stake_units, 0.0);
        assert_eq!(result.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_thin_edge_below_threshold_no_bet() {
        // p=0.51 at even money: +2% EV, below the 3% default threshold
        let result = calculate_stake(&request(0.51, 2.0, 1000.0)).unwrap();
        assert!(!result.is_bet);
        assert_eq!(result.recommended_stake, 0.0);
        assert!(result.expected_value.is_positive);
    }

    #[test]
    fn test_cap_respected_on_extreme_edge() {
        let mut req = request(0.8, 2.0, 1000.0);
        req.config.kelly_fraction = 1.0; // Full Kelly would want 60%
        let result = calculate_stake(&req).unwrap();
        assert!((result.full_kelly - 0.6).abs() < 1e-9);
        assert!((result.final_kelly - 0.05).abs() < 1e-9);
        assert!(result.stake_percentage <= 5.0);
        assert!((result.recommended_stake - 50.0).abs() < 1e-9);
        assert_eq!(result.risk_level, RiskLevel::High);
    }

    #[test]
    fn test_monotone_in_kelly_fraction() {
        let mut quarter = request(0.55, 2.0, 1000.0);
        quarter.config.kelly_fraction = 0.25;
        quarter.config.max_bet_percentage = 50.0;

        let mut full = request(0.55, 2.0, 1000.0);
        full.config.kelly_fraction = 1.0;
        full.config.max_bet_percentage = 50.0;

        let q = calculate_stake(&quarter).unwrap();
        let f = calculate_stake(&full).unwrap();
        assert!(
            f.adjusted_kelly >= q.adjusted_kelly,
            "full {} < quarter {}",
            f.adjusted_kelly,
            q.adjusted_kelly
        );
        assert!(f.recommended_stake > q.recommended_stake);
    }

    #[test]
    fn test_validation_fails_fast() {
        assert!(calculate_stake(&request(0.0, 2.0, 1000.0)).is_err());
        assert!(calculate_stake(&request(1.0, 2.0, 1000.0)).is_err());
        assert!(calculate_stake(&request(0.55, 1.0, 1000.0)).is_err());
        assert!(calculate_stake(&request(0.55, 2.0, 0.0)).is_err());
        assert!(calculate_stake(&request(0.55, 2.0, -50.0)).is_err());
    }

    #[test]
    fn test_unit_sizing() {
        let mut req = request(0.55, 2.0, 1000.0);
        req.config.unit_size = 25.0;
        let result = calculate_stake(&req).unwrap();
        // $25 stake at $25/unit = 1 unit
        assert!((result.stake_units - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_low_risk_classification() {
        // Small edge → small fraction → low risk
        // p=0.53 at even money: full Kelly 6%, quarter-Kelly 1.5%
        let result = calculate_stake(&request(0.53, 2.0, 1000.0)).unwrap();
        assert!(result.is_bet);
        assert!(result.final_kelly < 0.02);
        assert_eq!(result.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_expected_growth_positive_for_real_edge() {
        let result = calculate_stake(&request(0.55, 2.0, 1000.0)).unwrap();
        assert!(
            result.expected_growth > 0.0,
            "positive-EV Kelly stake should grow the bankroll: {}",
            result.expected_growth
        );
    }

    #[test]
    fn test_rounding_is_stable() {
        let result = calculate_stake(&request(0.5713, 2.04, 997.31)).unwrap();
        // Currency: 2 dp; fractions: 4 dp
        let cents = result.recommended_stake * 100.0;
        assert!((cents - cents.round()).abs() < 1e-9);
        let frac = result.final_kelly * 10_000.0;
        assert!((frac - frac.round()).abs() < 1e-9);
    }
}
