//! Team-strength analysis factors.
//!
//! Turns historical context into the ensemble's raw inputs: four simple
//! base learners, a boosting residual, and an inter-model diversity
//! score. Each learner is deliberately naive; combining them is the
//! ensemble's job.

use tracing::debug;

use crate::config::ScoreProfile;
use crate::ensemble::ModelScore;
use crate::types::{HistoricalContext, ProjectedScore};

/// Baseline home-court win probability before team quality.
const HOME_COURT_BASE: f64 = 0.55;

/// Each learner's output is kept inside this band.
const MODEL_FLOOR: f64 = 0.05;
const MODEL_CEIL: f64 = 0.95;

/// Raw ensemble inputs derived from historical context.
#[derive(Debug, Clone)]
pub struct AnalysisFactors {
    pub models: Vec<ModelScore>,
    /// Boosting residual, signed toward the home side.
    pub boosting_signal: f64,
    /// Standard deviation across the base learners.
    pub diversity_score: f64,
    /// Human-readable factor breakdown for the prediction record.
    pub reasoning: Vec<String>,
}

fn clamp_model(p: f64) -> f64 {
    p.max(MODEL_FLOOR).min(MODEL_CEIL)
}

/// Run the base learners over a match's historical context.
pub fn analyze(ctx: &HistoricalContext) -> AnalysisFactors {
    let home = &ctx.home;
    let away = &ctx.away;

    // Learner 1: season record differential.
    let season_p = clamp_model(0.5 + (home.win_pct() - away.win_pct()) * 0.75);

    // Learner 2: recent form over the last five games.
    let form_p = clamp_model(0.5 + (home.recent_win_rate(5) - away.recent_win_rate(5)) * 0.5);

    // Learner 3: venue + head-to-head + rest.
    let h2h_component = match ctx.head_to_head {
        Some(h2h) if h2h.games_played >= 3 => {
            0.6 * HOME_COURT_BASE + 0.4 * h2h.home_rate()
        }
        _ => HOME_COURT_BASE,
    };
    let rest_adj = ((home.rest_days as f64 - away.rest_days as f64) * 0.01).clamp(-0.03, 0.03);
    let matchup_p = clamp_model(h2h_component + rest_adj);

    // Learner 4: scoring margin differential.
    let margin_p = clamp_model(0.5 + (home.avg_margin() - away.avg_margin()) * 0.02);

    let models = vec![
        ModelScore {
            name: "season-record",
            home_probability: season_p,
            weight: 0.35,
        },
        ModelScore {
            name: "recent-form",
            home_probability: form_p,
            weight: 0.25,
        },
        ModelScore {
            name: "matchup",
            home_probability: matchup_p,
            weight: 0.20,
        },
        ModelScore {
            name: "scoring-margin",
            home_probability: margin_p,
            weight: 0.20,
        },
    ];

    // Boosting residual: how far the margin model pulls away from the
    // record model. Acts as a small second-stage correction.
    let boosting_signal = ((margin_p - season_p) * 0.35).clamp(-0.08, 0.08);

    let mean = models.iter().map(|m| m.home_probability).sum::<f64>() / models.len() as f64;
    let variance = models
        .iter()
        .map(|m| (m.home_probability - mean).powi(2))
        .sum::<f64>()
        / models.len() as f64;
    let diversity_score = variance.sqrt();

    let mut reasoning = vec![
        format!(
            "Season record: {}-{} ({:.0}%) vs {}-{} ({:.0}%)",
            home.wins,
            home.losses,
            home.win_pct() * 100.0,
            away.wins,
            away.losses,
            away.win_pct() * 100.0,
        ),
        format!(
            "Recent form (L5): home {:.0}% vs away {:.0}%",
            home.recent_win_rate(5) * 100.0,
            away.recent_win_rate(5) * 100.0,
        ),
        format!(
            "Scoring margin: home {:+.1} vs away {:+.1} per game",
            home.avg_margin(),
            away.avg_margin(),
        ),
    ];
    if let Some(h2h) = ctx.head_to_head {
        if h2h.games_played > 0 {
            reasoning.push(format!(
                "Head-to-head: home side {} of last {}",
                h2h.home_wins, h2h.games_played
            ));
        }
    }
    if home.rest_days != away.rest_days {
        reasoning.push(format!(
            "Rest: home {}d vs away {}d",
            home.rest_days, away.rest_days
        ));
    }

    debug!(
        season = format!("{season_p:.3}"),
        form = format!("{form_p:.3}"),
        matchup = format!("{matchup_p:.3}"),
        margin = format!("{margin_p:.3}"),
        diversity = format!("{diversity_score:.3}"),
        "Factors analyzed"
    );

    AnalysisFactors {
        models,
        boosting_signal,
        diversity_score,
        reasoning,
    }
}

/// Project a final score from the home win probability and the league's
/// score profile. Display-only; rounded to one decimal.
pub fn project_score(home_probability: f64, profile: &ScoreProfile) -> ProjectedScore {
    let margin = (2.0 * home_probability - 1.0) * profile.margin_scale;
    let home = (profile.avg_total + margin) / 2.0 + profile.home_edge / 2.0;
    let away = (profile.avg_total - margin) / 2.0 - profile.home_edge / 2.0;
    let round1 = |x: f64| (x * 10.0).round() / 10.0;
    ProjectedScore {
        home: round1(home.max(0.0)),
        away: round1(away.max(0.0)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
