//! Settlers of Oregon headless self-play simulator.

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod runner;

use config::SimConfig;

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = SimConfig::from_env()?;
    info!(
        games = config.games,
        players = config.players,
        seed = config.seed,
        omens = config.omens,
        policy = ?config.policy,
        "Starting Settlers of Oregon simulation..."
    );

    let summaries = runner::run_all(&config)?;

    let finished = summaries.iter().filter(|s| s.winner.is_some()).count();
    info!(finished, played = summaries.len(), "simulation complete");
    for (name, wins) in runner::tally_wins(&summaries) {
        info!(player = %name, wins, "wins");
    }

    if let Some(dir) = &config.snapshot_dir {
        let path = dir.join("summary.json");
        std::fs::write(&path, serde_json::to_string_pretty(&summaries)?)?;
        info!(path = %path.display(), "summary written");
    }

    Ok(())
}
