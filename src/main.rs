//! Star Arena server entry point
//!
//! Usage: `star-arena [settings.json]`. `ARENA_*` environment variables
//! override the file; `RUST_LOG` controls logging.

use std::path::PathBuf;

use anyhow::Context;
use star_arena::sim::state::Outcome;
use star_arena::{GameServer, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Star Arena starting...");

    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("ARENA_SETTINGS").ok())
        .map(PathBuf::from);
    let settings = Settings::load(path.as_deref()).context("loading settings")?;
    let stats_every = settings.stats_every;

    let server = GameServer::new(settings);
    let bots = server.add_bots();
    log::info!("Added {} bots", bots);

    let mut snapshots = server.subscribe();
    let reporter = server.clone();
    let stats_task = tokio::spawn(async move {
        let mut reported = Outcome::Ongoing;
        while let Some(snapshot) = snapshots.recv().await {
            if snapshot.tick % stats_every == 0 {
                for team in reporter.team_stats().iter().filter(|t| t.players > 0) {
                    log::info!(
                        "tick {} {:?}: {} players ({} alive), {} planets, {} armies, {}/{} K/D",
                        snapshot.tick,
                        team.team,
                        team.players,
                        team.alive,
                        team.planets,
                        team.armies,
                        team.kills,
                        team.deaths
                    );
                }
            }
            if snapshot.outcome != reported {
                reported = snapshot.outcome;
                log::info!("Outcome at tick {}: {:?}", snapshot.tick, reported);
            }
        }
    });

    let driver = server.spawn_driver();

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;
    log::info!("Shutting down");
    server.shutdown();
    driver.await.context("tick driver panicked")?;
    stats_task.abort();

    let liveness = server.liveness();
    log::info!("Stopped after {} ticks", liveness.tick);
    Ok(())
}
