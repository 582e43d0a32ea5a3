//! SHARPLINE — Sports Betting Analytics Engine
//!
//! Entry point. Loads configuration, initialises structured logging,
//! connects the prediction store, and serves the dashboard API with
//! graceful shutdown.

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use sharpline::config::AppConfig;
use sharpline::dashboard;
use sharpline::dashboard::routes::DashboardState;
use sharpline::engine::PredictionEngine;
use sharpline::feed::{HttpOddsFeed, OddsProvider};
use sharpline::store::{MemoryStore, PredictionStore, SqliteStore};

const BANNER: &str = r#"
  ____  _   _    _    ____  ____  _     ___ _   _ _____
 / ___|| | | |  / \  |  _ \|  _ \| |   |_ _| \ | | ____|
 \___ \| |_| | / _ \ | |_) | |_) | |    | ||  \| |  _|
  ___) |  _  |/ ___ \|  _ <|  __/| |___ | || |\  | |___
 |____/|_| |_/_/   \_\_| \_\_|   |_____|___|_| \_|_____|

  Ensemble Predictions · Value Detection · Staking
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = AppConfig::load_or_default("sharpline.toml")?;

    init_logging();

    println!("{BANNER}");
    info!(
        bankroll = cfg.engine.bankroll,
        kelly_fraction = cfg.staking.kelly_fraction,
        max_bet_pct = cfg.staking.max_bet_percentage,
        dashboard_port = cfg.dashboard.port,
        "SHARPLINE starting up"
    );

    // -- Prediction store --------------------------------------------------

    let store: Arc<dyn PredictionStore> = match &cfg.storage.database_url {
        Some(url) => {
            info!(url = %url, "Using SQLite prediction store");
            Arc::new(SqliteStore::connect(url).await?)
        }
        None => {
            info!("No database_url configured — using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    // -- Engine ------------------------------------------------------------

    let mut engine = PredictionEngine::new(cfg.clone(), store);
    if cfg.odds_feed.enabled {
        let feed: Arc<dyn OddsProvider> = Arc::new(HttpOddsFeed::new(&cfg.odds_feed)?);
        info!(base_url = %cfg.odds_feed.base_url, "Live odds feed attached");
        engine = engine.with_feed(feed);
    } else {
        info!("Odds feed disabled — using last-known odds from match records");
    }

    // -- Dashboard ---------------------------------------------------------

    if !cfg.dashboard.enabled {
        warn!("Dashboard disabled in config; nothing to serve. Exiting.");
        return Ok(());
    }

    let state = Arc::new(DashboardState {
        engine: Arc::new(engine),
    });

    tokio::select! {
        result = dashboard::serve(state, cfg.dashboard.port) => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received.");
        }
    }

    info!("SHARPLINE shut down cleanly.");
    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("sharpline=info"));

    let json_logging = std::env::var("SHARPLINE_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt().with_env_filter(env_filter).with_target(true).init();
    }
}
