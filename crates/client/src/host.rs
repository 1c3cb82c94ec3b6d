use ghostsync::net::Appearance;
use ghostsync::scene::BodyParts;
use ghostsync::sync::SELF_GHOST_SLOT;
use ghostsync::{
    AppearanceProvider, ClockStep, CollisionFlags, Credentials, GhostSync, LocalPlayer, Scene,
    Session, SessionEvent, SyncEvent,
};
use glam::IVec2;

use crate::config::ClientConfig;

/// Ticks between network statistics log lines.
const STATS_INTERVAL_TICKS: u64 = 100;

/// Open ground around the local player with no walls.
pub struct FlatScene {
    base: IVec2,
    plane: u8,
}

impl FlatScene {
    /// Centres the scene on `tile`.
    pub fn around(tile: IVec2, plane: u8) -> Self {
        Self {
            base: tile - IVec2::splat(ghostsync::scene::SCENE_SIZE / 2),
            plane,
        }
    }
}

impl Scene for FlatScene {
    fn plane(&self) -> u8 {
        self.plane
    }

    fn base(&self) -> IVec2 {
        self.base
    }

    fn collision_flags(&self, _plane: u8, _scene_tile: IVec2) -> CollisionFlags {
        CollisionFlags::empty()
    }
}

/// Logs appearance changes instead of building models.
#[derive(Default)]
pub struct LoggingModels {
    pub rebuilt: u64,
}

impl AppearanceProvider for LoggingModels {
    fn apply(&mut self, slot: usize, appearance: &Appearance, body_parts: BodyParts, cape_id: u8) {
        self.rebuilt += 1;
        let who = if slot == SELF_GHOST_SLOT {
            String::from("self ghost")
        } else {
            format!("ghost {slot}")
        };
        log::debug!(
            "Rebuilding model for {} (equipment {:?}, kits {:?}, female {}, cape {})",
            who,
            appearance.equipment,
            body_parts,
            appearance.is_female,
            cape_id
        );
    }
}

/// A stationary local player taking part in the relay.
pub struct GhostHost {
    session: Session,
    sync: GhostSync,
    scene: FlatScene,
    local: LocalPlayer,
    models: LoggingModels,
    credentials: Credentials,
    ticks: u64,
}

impl GhostHost {
    pub fn new(config: &ClientConfig) -> anyhow::Result<Self> {
        let credentials = config.credentials()?;
        let local = LocalPlayer {
            name: credentials.name,
            world: config.world,
            tile: config.tile,
            ..Default::default()
        };

        Ok(Self {
            session: Session::new(&config.sync),
            sync: GhostSync::new(&config.sync),
            scene: FlatScene::around(local.tile, local.plane),
            local,
            models: LoggingModels::default(),
            credentials,
            ticks: 0,
        })
    }

    pub fn step(&mut self, step: ClockStep) {
        match step {
            ClockStep::Tick => self.tick(),
            ClockStep::SubTick => self.sync.advance(&self.scene),
        }
    }

    fn tick(&mut self) {
        self.ticks += 1;

        self.session.poll();
        self.session.maintain_login();
        if self.session.state() == ghostsync::ConnectionState::Disconnected {
            self.session.login(self.credentials.clone());
        }

        self.drain_session_events();

        if self.session.is_logged_in() {
            self.sync.ingest(self.session.ring(), &self.scene, &self.local, &mut self.models);

            let (core, extra) = self.sync.build_outgoing(
                &self.local,
                self.session.current_tick(),
                self.session.is_guest(),
            );
            self.session.send_state(core, &extra);
        }

        self.drain_sync_events();

        if self.ticks % STATS_INTERVAL_TICKS == 0 {
            self.log_stats();
        }
    }

    fn drain_session_events(&mut self) {
        for event in self.session.drain_events() {
            match event {
                SessionEvent::LoggedIn { session_id, guest } => {
                    log::info!(
                        "Joined session {} as {} ({} online)",
                        session_id,
                        if guest { "guest" } else { "member" },
                        self.session.online_count()
                    );
                }
                SessionEvent::KeyRejected => {
                    log::warn!("Account key was not accepted, continuing as guest");
                }
                SessionEvent::TimedOut => {
                    log::warn!("Server went silent");
                }
                SessionEvent::Reconnected => {
                    log::info!("Socket reopened");
                }
                SessionEvent::LoggedOut => {
                    self.sync.clear();
                }
            }
        }
    }

    fn drain_sync_events(&mut self) {
        for event in self.sync.drain_events() {
            match event {
                SyncEvent::Chat { world, sender, message } => {
                    log::info!("[W{}] {}: {}", world, sender, message);
                }
                SyncEvent::CapeEarned { cape_id } => {
                    log::info!("Earned hiscores cape {}", cape_id);
                }
            }
        }
    }

    fn log_stats(&self) {
        let ghosts = self.sync.active_ghosts().count();
        match self.session.stats() {
            Some(stats) => log::info!(
                "{} ghosts visible, sent {} received {} dropped {} ({:.1}%), {} models rebuilt",
                ghosts,
                stats.packets_sent,
                stats.packets_received,
                stats.packets_dropped,
                stats.drop_percent(),
                self.models.rebuilt
            ),
            None => log::info!("Not connected, {} ghosts visible", ghosts),
        }
    }

    pub fn shutdown(&mut self) {
        self.session.logout();
        self.drain_session_events();
    }
}
