//! Sequential result-pattern detection.
//!
//! Classifies a team's recent results into one of five shapes. The
//! classification only ever adjusts confidence in the direction the base
//! learners already favor; it never determines the pick itself.
//! Too little history is a no-signal condition, not an error.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::GameResult;

/// Minimum recent results needed before any pattern is claimed.
const MIN_RESULTS: usize = 4;

/// How far back the breakout comparison looks.
const BREAKOUT_WINDOW: usize = 5;

/// Recent-vs-season win-rate gap that qualifies as a breakout.
const BREAKOUT_GAP: f64 = 0.25;

/// Run length at which a streak flips to a regression signal.
const REGRESSION_RUN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    /// 3 to 5 identical results in a row, still live.
    Streak,
    /// Recent form far above the season baseline.
    Breakout,
    /// Strictly alternating W/L tail.
    Alternating,
    /// A run long enough that mean reversion is the better read.
    Regression,
    None,
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternKind::Streak => write!(f, "streak"),
            PatternKind::Breakout => write!(f, "breakout"),
            PatternKind::Alternating => write!(f, "alternating"),
            PatternKind::Regression => write!(f, "regression"),
            PatternKind::None => write!(f, "none"),
        }
    }
}

/// A classified recent-results sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequentialPattern {
    pub kind: PatternKind,
    /// Pattern strength in [0, 1]; explanation weight, not a probability.
    pub strength: f64,
    /// Whether the pattern is built on wins (streak/regression/breakout).
    pub winning: bool,
    pub description: String,
}

impl SequentialPattern {
    /// The no-signal pattern: contributes exactly zero downstream.
    pub fn none() -> Self {
        Self {
            kind: PatternKind::None,
            strength: 0.0,
            winning: false,
            description: "No discernible pattern".to_string(),
        }
    }
}

/// Length of the identical-result run at the end of the sequence.
fn trailing_run(recent: &[GameResult]) -> usize {
    let Some(last) = recent.last() else { return 0 };
    recent.iter().rev().take_while(|r| *r == last).count()
}

/// Whether the last `n` results strictly alternate.
fn tail_alternates(recent: &[GameResult], n: usize) -> bool {
    if recent.len() < n {
        return false;
    }
    let tail = &recent[recent.len() - n..];
    tail.windows(2).all(|w| w[0] != w[1])
}

/// Classify a team's recent results (chronological, most recent last)
/// against its season win percentage.
pub fn detect(recent: &[GameResult], season_win_pct: f64) -> SequentialPattern {
    if recent.len() < MIN_RESULTS {
        return SequentialPattern::none();
    }

    let run = trailing_run(recent);
    let winning = recent.last() == Some(&GameResult::Win);
    let run_word = if winning { "won" } else { "lost" };

    if run >= REGRESSION_RUN {
        let strength = ((run - REGRESSION_RUN + 1) as f64 / 3.0).min(1.0);
        return SequentialPattern {
            kind: PatternKind::Regression,
            strength,
            winning,
            description: format!("{run_word} {run} straight — regression candidate"),
        };
    }

    if run >= 3 {
        // 3 → 0.33, 4 → 0.67, 5 → 1.0
        let strength = ((run - 2) as f64 / 3.0).min(1.0);
        return SequentialPattern {
            kind: PatternKind::Streak,
            strength,
            winning,
            description: format!("{run_word} {run} straight"),
        };
    }

    if tail_alternates(recent, MIN_RESULTS) {
        return SequentialPattern {
            kind: PatternKind::Alternating,
            strength: 0.5,
            winning: false,
            description: "Alternating results — low signal".to_string(),
        };
    }

    let recent_rate = {
        let window: Vec<_> = recent.iter().rev().take(BREAKOUT_WINDOW).collect();
        let wins = window.iter().filter(|r| ***r == GameResult::Win).count();
        wins as f64 / window.len() as f64
    };
    let gap = recent_rate - season_win_pct;
    if gap > BREAKOUT_GAP {
        return SequentialPattern {
            kind: PatternKind::Breakout,
            strength: (gap / 0.5).min(1.0),
            winning: true,
            description: format!(
                "Recent form {:.0}% vs season {:.0}% — breaking out",
                recent_rate * 100.0,
                season_win_pct * 100.0
            ),
        };
    }

    SequentialPattern::none()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GameResult::{Loss as L, Win as W};

    #[test]
    fn test_insufficient_history_is_none() {
        assert_eq!(detect(&[], 0.5).kind, PatternKind::None);
        assert_eq!(detect(&[W, W, W], 0.5).kind, PatternKind::None);
        assert_eq!(detect(&[W, W, W], 0.5).strength, 0.0);
    }

    #[test]
    fn test_winning_streak() {
        let p = detect(&[L, W, W, W], 0.5);
        assert_eq!(p.kind, PatternKind::Streak);
        assert!(p.winning);
        assert!((p.strength - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_losing_streak() {
        let p = detect(&[W, L, L, L, L], 0.5);
        assert_eq!(p.kind, PatternKind::Streak);
        assert!(!p.winning);
        assert!(p.description.contains("lost 4"));
    }

    #[test]
    fn test_long_run_becomes_regression() {
        let p = detect(&[W, W, W, W, W, W], 0.6);
        assert_eq!(p.kind, PatternKind::Regression);
        assert!(p.winning);

        let longer = detect(&[W, W, W, W, W, W, W, W], 0.6);
        assert!(longer.strength > p.strength);
    }

    #[test]
    fn test_alternating() {
        let p = detect(&[W, L, W, L], 0.5);
        assert_eq!(p.kind, PatternKind::Alternating);
        assert!(!p.winning);
    }

    #[test]
    fn test_breakout_over_season_baseline() {
        // 4/5 recent wins for a 0.40 season team, no trailing run of 3+
        let p = detect(&[W, W, L, W, W], 0.40);
        assert_eq!(p.kind, PatternKind::Breakout);
        assert!(p.winning);
        assert!(p.strength > 0.0);
    }

    #[test]
    fn test_hot_recent_form_for_good_team_is_not_breakout() {
        // Same tail, but the team wins 70% anyway
        let p = detect(&[W, W, L, W, W], 0.70);
        assert_eq!(p.kind, PatternKind::None);
    }

    #[test]
    fn test_streak_takes_priority_over_breakout() {
        // Trailing 3-run should classify as streak even if form is hot
        let p = detect(&[L, W, W, W], 0.30);
        assert_eq!(p.kind, PatternKind::Streak);
    }
}
