//! Game server: lock discipline, tick driver and snapshot hand-off
//!
//! The world sits behind one reader/writer lock. Ticks and commands take the
//! write lock; statistics take the read lock. Liveness comes from atomics and
//! never touches the world.
//!
//! Each tick builds its snapshot while still holding the write lock and hands
//! it to every subscriber through a bounded queue. A subscriber that falls a
//! whole queue behind is dropped rather than allowed to stall the tick.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::settings::Settings;
use crate::sim::command::{self, Command, CommandError, CommandOutcome};
use crate::sim::ship_class::ShipClass;
use crate::sim::snapshot::{self, TeamStats, WorldSnapshot};
use crate::sim::state::{ShipId, Team, World};
use crate::sim::tick::tick;

/// No tick has run yet
const NEVER: u64 = u64::MAX;

/// Driver health, readable without the world lock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Liveness {
    pub tick: u64,
    pub running: bool,
    pub subscribers: usize,
    /// Time since the last completed tick
    pub since_last_tick: Option<Duration>,
}

#[derive(Debug)]
struct Heartbeat {
    tick: AtomicU64,
    running: AtomicBool,
    subscribers: AtomicUsize,
    /// Microseconds after `started` at which the last tick finished
    last_tick_us: AtomicU64,
    started: Instant,
}

struct Inner {
    world: Arc<RwLock<World>>,
    subscribers: Mutex<Vec<mpsc::Sender<Arc<WorldSnapshot>>>>,
    heartbeat: Heartbeat,
    settings: Settings,
    shutdown: watch::Sender<bool>,
}

/// Handle to a running arena. Cheap to clone.
#[derive(Clone)]
pub struct GameServer {
    inner: Arc<Inner>,
}

impl GameServer {
    pub fn new(settings: Settings) -> Self {
        let world = World::new(settings.seed, settings.rules());
        let (shutdown, _) = watch::channel(false);
        log::info!(
            "Arena created: seed {}, {} slots, {} Hz",
            settings.seed,
            settings.max_ships,
            settings.tick_hz
        );
        Self {
            inner: Arc::new(Inner {
                world: Arc::new(RwLock::new(world)),
                subscribers: Mutex::new(Vec::new()),
                heartbeat: Heartbeat {
                    tick: AtomicU64::new(0),
                    running: AtomicBool::new(false),
                    subscribers: AtomicUsize::new(0),
                    last_tick_us: AtomicU64::new(NEVER),
                    started: Instant::now(),
                },
                settings,
                shutdown,
            }),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    /// Shared world handle for embedders that need direct access
    pub fn world(&self) -> Arc<RwLock<World>> {
        Arc::clone(&self.inner.world)
    }

    /// Apply a command for `actor`, serialized against ticks
    pub fn submit(&self, actor: ShipId, cmd: &Command) -> Result<CommandOutcome, CommandError> {
        let mut world = self.inner.world.write();
        command::apply(&mut world, actor, cmd)
    }

    /// Take a slot for a human player or observer
    pub fn join(
        &self,
        name: &str,
        team: Team,
        class: ShipClass,
        observer: bool,
    ) -> Result<ShipId, CommandError> {
        self.inner.world.write().join(name, team, class, observer)
    }

    /// Add the configured bots. Returns how many joined.
    pub fn add_bots(&self) -> usize {
        let settings = &self.inner.settings;
        let mut world = self.inner.world.write();
        let mut added = 0;
        for &team in &settings.bot_teams {
            for _ in 0..settings.bots_per_team {
                match world.join_bot(team, settings.bot_class) {
                    Ok(_) => added += 1,
                    Err(err) => {
                        log::warn!("Could not add {:?} bot: {}", team, err);
                        return added;
                    }
                }
            }
        }
        added
    }

    /// Register for per-tick snapshots
    pub fn subscribe(&self) -> mpsc::Receiver<Arc<WorldSnapshot>> {
        let (tx, rx) = mpsc::channel(self.inner.settings.snapshot_queue.max(1));
        let mut subscribers = self.inner.subscribers.lock();
        subscribers.push(tx);
        self.inner
            .heartbeat
            .subscribers
            .store(subscribers.len(), Ordering::Relaxed);
        rx
    }

    pub fn team_stats(&self) -> Vec<TeamStats> {
        snapshot::team_stats(&self.inner.world.read())
    }

    /// Current state without events
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot::capture(&self.inner.world.read(), Vec::new())
    }

    pub fn liveness(&self) -> Liveness {
        let beat = &self.inner.heartbeat;
        let last = beat.last_tick_us.load(Ordering::Acquire);
        let since_last_tick = (last != NEVER).then(|| {
            let now = beat.started.elapsed();
            now.saturating_sub(Duration::from_micros(last))
        });
        Liveness {
            tick: beat.tick.load(Ordering::Acquire),
            running: beat.running.load(Ordering::Acquire),
            subscribers: beat.subscribers.load(Ordering::Relaxed),
            since_last_tick,
        }
    }

    /// Run one tick and publish its snapshot
    pub fn step(&self) -> Arc<WorldSnapshot> {
        let snapshot = {
            let mut world = self.inner.world.write();
            let events = tick(&mut world);
            for event in &events {
                log::debug!("tick {}: {:?}", world.tick, event);
            }
            Arc::new(WorldSnapshot::capture(&world, events))
        };

        let beat = &self.inner.heartbeat;
        beat.tick.store(snapshot.tick, Ordering::Release);
        let elapsed = beat.started.elapsed().as_micros().min(u128::from(NEVER - 1)) as u64;
        beat.last_tick_us.store(elapsed, Ordering::Release);

        self.publish(&snapshot);
        snapshot
    }

    fn publish(&self, snapshot: &Arc<WorldSnapshot>) {
        let mut subscribers = self.inner.subscribers.lock();
        subscribers.retain(|tx| match tx.try_send(Arc::clone(snapshot)) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                log::warn!("Snapshot subscriber fell behind at tick {}, dropping it", snapshot.tick);
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                log::debug!("Snapshot subscriber went away");
                false
            }
        });
        self.inner
            .heartbeat
            .subscribers
            .store(subscribers.len(), Ordering::Relaxed);
    }

    /// Start the fixed-rate tick task. Must be called from a tokio runtime.
    pub fn spawn_driver(&self) -> JoinHandle<()> {
        let server = self.clone();
        let mut shutdown = self.inner.shutdown.subscribe();
        let period = self.inner.settings.tick_period();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            server.inner.heartbeat.running.store(true, Ordering::Release);
            log::info!("Tick driver started ({:?} per tick)", period);

            while !*shutdown.borrow() {
                tokio::select! {
                    _ = ticker.tick() => {
                        server.step();
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }

            server.inner.heartbeat.running.store(false, Ordering::Release);
            log::info!("Tick driver stopped at tick {}", server.liveness().tick);
        })
    }

    /// Ask the driver to stop after the current tick
    pub fn shutdown(&self) {
        self.inner.shutdown.send_replace(true);
    }

    /// Start a fresh game with the same seed and rules. Everyone is removed.
    pub fn reset(&self) {
        let mut world = self.inner.world.write();
        world.reset();
        self.inner.heartbeat.tick.store(world.tick, Ordering::Release);
        log::info!("Arena reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::{Outcome, ShipStatus};

    fn small() -> Settings {
        Settings {
            snapshot_queue: 2,
            bots_per_team: 1,
            ..Settings::default()
        }
    }

    #[test]
    fn test_step_publishes_to_subscribers() {
        let server = GameServer::new(small());
        let mut rx = server.subscribe();
        let published = server.step();
        let received = rx.try_recv().expect("snapshot");
        assert_eq!(received.tick, 1);
        assert!(Arc::ptr_eq(&published, &received));
        assert_eq!(server.liveness().tick, 1);
    }

    #[test]
    fn test_slow_subscriber_dropped() {
        let server = GameServer::new(small());
        let _slow = server.subscribe();
        let mut fast = server.subscribe();
        assert_eq!(server.liveness().subscribers, 2);
        for _ in 0..3 {
            server.step();
            while fast.try_recv().is_ok() {}
        }
        // The third snapshot overflowed the unread queue
        assert_eq!(server.liveness().subscribers, 1);
    }

    #[test]
    fn test_closed_subscriber_pruned() {
        let server = GameServer::new(small());
        drop(server.subscribe());
        server.step();
        assert_eq!(server.liveness().subscribers, 0);
    }

    #[test]
    fn test_commands_go_through_the_lock() {
        let server = GameServer::new(small());
        let id = server
            .join("pilot", Team::Orion, ShipClass::Destroyer, false)
            .expect("slot");
        assert_eq!(
            server.submit(id, &Command::SetSpeed { speed: 4 }),
            Err(CommandError::NotInPlay)
        );
        server.step();
        assert_eq!(
            server.submit(id, &Command::SetSpeed { speed: 4 }),
            Ok(CommandOutcome::Applied)
        );
        assert_eq!(server.world().read().ships[id].desired_speed, 4);
    }

    #[test]
    fn test_add_bots_and_stats() {
        let server = GameServer::new(small());
        assert_eq!(server.add_bots(), 2);
        server.step();
        let stats = server.team_stats();
        assert_eq!(stats[Team::Federation.index()].players, 1);
        assert_eq!(stats[Team::Klingon.index()].players, 1);
        assert_eq!(stats[Team::Romulan.index()].players, 0);
    }

    #[test]
    fn test_reset_clears_game() {
        let server = GameServer::new(small());
        server.add_bots();
        for _ in 0..5 {
            server.step();
        }
        server.world().write().outcome = Outcome::Genocide {
            winner: Team::Klingon,
        };
        server.reset();
        let snapshot = server.snapshot();
        assert_eq!(snapshot.tick, 0);
        assert_eq!(snapshot.outcome, Outcome::Ongoing);
        assert!(snapshot.ships.is_empty());
        assert!(
            server
                .world()
                .read()
                .ships
                .iter()
                .all(|s| s.status == ShipStatus::Free)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_ticks_and_stops() {
        let server = GameServer::new(small());
        let mut rx = server.subscribe();
        let driver = server.spawn_driver();

        for expected in 1..=3 {
            let snapshot = rx.recv().await.expect("tick");
            assert_eq!(snapshot.tick, expected);
        }
        assert!(server.liveness().running);
        assert!(server.liveness().since_last_tick.is_some());

        server.shutdown();
        driver.await.expect("driver exits cleanly");
        assert!(!server.liveness().running);

        let stopped_at = server.liveness().tick;
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(server.liveness().tick, stopped_at);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_before_start() {
        let server = GameServer::new(small());
        server.shutdown();
        server.spawn_driver().await.expect("driver exits cleanly");
        assert_eq!(server.liveness().tick, 0);
    }
}
