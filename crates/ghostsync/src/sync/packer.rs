use glam::IVec2;

use super::appearance::BodyPartKits;
use super::hiscores::HiscoresBoard;
use super::outgoing::OutgoingState;
use crate::actor::{MoveRequest, RemoteActor};
use crate::config::SyncConfig;
use crate::net::{
    Appearance, CORE_WORDS, ChatLine, CommandFlags, CoreState, EXTRA_DATA_LEN,
    GHOST_ANCHOR_OFFSET, GHOSTS_PER_PACKET, GAME_PACKETS_PER_TICK, GhostUpdate, HiscoresPage,
    Identity, JAU_PACKING_RATIO, MetadataKind, PacketFrame, SUB_BLOCK_WORDS, TickRing, TickSlot,
    WorldFlags,
};
use crate::scene::{AppearanceProvider, LocalPlayer, PoseAnimations, Scene};

pub const MAX_GHOSTS: usize = GAME_PACKETS_PER_TICK * GHOSTS_PER_PACKET;

/// Provider slot used for the server's view of the local player.
pub const SELF_GHOST_SLOT: usize = MAX_GHOSTS;

/// Cape id meaning no cape.
pub const NO_CAPE: u8 = 31;
pub const FEMALE_MAX_CAPE: u8 = 25;
const OVERALL_SKILL: u8 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    Chat {
        world: u32,
        sender: String,
        message: String,
    },
    CapeEarned {
        cape_id: u8,
    },
}

/// Last appearance handed to the provider for one slot.
#[derive(Debug, Clone, Copy)]
struct ModelState {
    words: [u32; SUB_BLOCK_WORDS],
    cape_id: u8,
    applied_cape_id: u8,
    dirty: bool,
}

impl Default for ModelState {
    fn default() -> Self {
        Self {
            words: [0; SUB_BLOCK_WORDS],
            cape_id: NO_CAPE,
            applied_cape_id: NO_CAPE,
            dirty: true,
        }
    }
}

impl ModelState {
    /// Records `words` as current and reports whether the provider needs to
    /// rebuild the model.
    fn update(&mut self, words: [u32; SUB_BLOCK_WORDS]) -> bool {
        let changed = words != self.words || self.cape_id != self.applied_cape_id || self.dirty;
        self.words = words;
        self.applied_cape_id = self.cape_id;
        self.dirty = false;
        changed
    }

    fn reset(&mut self) {
        *self = Self {
            dirty: self.dirty,
            ..Default::default()
        };
    }
}

/// Turns received tick slots into ghost movement and builds the local
/// player's update each tick.
pub struct GhostSync {
    ghosts: Vec<RemoteActor>,
    models: Vec<ModelState>,
    self_ghost: RemoteActor,
    self_model: ModelState,
    show_self_ghost: bool,
    last_self_tick: Option<u8>,
    cape_id: u8,
    kits: BodyPartKits,
    outgoing: OutgoingState,
    hiscores: HiscoresBoard,
    events: Vec<SyncEvent>,
}

impl GhostSync {
    pub fn new(config: &SyncConfig) -> Self {
        let poses = PoseAnimations::default();
        Self {
            ghosts: vec![RemoteActor::new(poses); MAX_GHOSTS],
            models: vec![ModelState::default(); MAX_GHOSTS],
            self_ghost: RemoteActor::new(poses),
            self_model: ModelState::default(),
            show_self_ghost: config.show_self_ghost,
            last_self_tick: None,
            cape_id: NO_CAPE,
            kits: BodyPartKits::default(),
            outgoing: OutgoingState::new(config.hiscores_skill, config.hiscores_start_rank),
            hiscores: HiscoresBoard::new(),
            events: Vec::new(),
        }
    }

    pub fn with_kits(mut self, kits: BodyPartKits) -> Self {
        self.kits = kits;
        self
    }

    pub fn kits(&self) -> &BodyPartKits {
        &self.kits
    }

    pub fn ghost(&self, slot: usize) -> Option<&RemoteActor> {
        self.ghosts.get(slot)
    }

    /// Active ghosts with their slot numbers.
    pub fn active_ghosts(&self) -> impl Iterator<Item = (usize, &RemoteActor)> {
        self.ghosts.iter().enumerate().filter(|(_, ghost)| ghost.is_active())
    }

    pub fn self_ghost(&self) -> &RemoteActor {
        &self.self_ghost
    }

    pub fn set_show_self_ghost(&mut self, show: bool) {
        self.show_self_ghost = show;
        if !show {
            self.self_ghost.despawn();
            self.self_model.dirty = true;
        }
    }

    pub fn cape_id(&self) -> u8 {
        self.cape_id
    }

    pub fn outgoing(&self) -> &OutgoingState {
        &self.outgoing
    }

    pub fn outgoing_mut(&mut self) -> &mut OutgoingState {
        &mut self.outgoing
    }

    pub fn hiscores(&self) -> &HiscoresBoard {
        &self.hiscores
    }

    pub fn drain_events(&mut self) -> Vec<SyncEvent> {
        std::mem::take(&mut self.events)
    }

    /// Applies every frame the last receive pass stored, oldest tick first.
    pub fn ingest<S, P>(&mut self, ring: &TickRing, scene: &S, local: &LocalPlayer, provider: &mut P)
    where
        S: Scene + ?Sized,
        P: AppearanceProvider + ?Sized,
    {
        for (tick, slot) in ring.oldest_first() {
            if slot.game_packets_sent() > 0 {
                self.ingest_game(tick, slot, scene, local, provider);
            }
            if slot.chat_packets_sent() > 0 {
                self.ingest_chat(slot, local);
            }
        }

        self.refresh_self_ghost(local, provider);
        self.hiscores.on_tick();
    }

    fn ingest_game<S, P>(
        &mut self,
        tick: u8,
        slot: &TickSlot,
        scene: &S,
        local: &LocalPlayer,
        provider: &mut P,
    ) where
        S: Scene + ?Sized,
        P: AppearanceProvider + ?Sized,
    {
        for (packet_id, frame) in slot.game_frames().iter().enumerate() {
            let first = packet_id * GHOSTS_PER_PACKET;

            // Packets the server did not send this tick hold no one.
            if packet_id >= slot.game_packets_sent() {
                (first..first + GHOSTS_PER_PACKET).for_each(|id| self.despawn_ghost(id));
                continue;
            }
            if frame.is_empty() {
                continue;
            }

            let core = CoreState::unpack(&frame.core);
            if !core.commands.contains(CommandFlags::MOVEMENT_UPDATE) || core.world != local.world {
                continue;
            }

            let is_instanced = core.world_flags.contains(WorldFlags::INSTANCED);
            let position = IVec2::new(core.x as i32, core.y as i32);

            if self.show_self_ghost && self.last_self_tick != Some(tick) {
                let request = MoveRequest {
                    tile: position,
                    plane: core.plane,
                    orientation: core.orientation(),
                    animation_id: core.animation_id,
                    is_interacting: core.is_interacting,
                    is_pose_animation: core.is_pose_animation,
                    is_instanced,
                    tick,
                };
                self.self_ghost.move_to(scene, &request);
                self.last_self_tick = Some(tick);
            }

            let anchor = position - IVec2::splat(GHOST_ANCHOR_OFFSET);
            for j in 0..GHOSTS_PER_PACKET {
                let id = first + j;
                match GhostUpdate::unpack(frame.sub_blocks[0][j]) {
                    GhostUpdate::Despawn => self.despawn_ghost(id),
                    GhostUpdate::Move(delta) => {
                        let request = MoveRequest {
                            tile: anchor + IVec2::new(delta.dx as i32, delta.dy as i32),
                            plane: core.plane,
                            orientation: delta.orientation(),
                            animation_id: delta.animation_id,
                            is_interacting: delta.is_interacting,
                            is_pose_animation: delta.is_pose_animation,
                            is_instanced,
                            tick,
                        };
                        self.ghosts[id].move_to(scene, &request);
                        self.apply_metadata(id, tick, frame, provider);
                    }
                }
            }
        }
    }

    fn apply_metadata<P>(&mut self, id: usize, tick: u8, frame: &PacketFrame, provider: &mut P)
    where
        P: AppearanceProvider + ?Sized,
    {
        let block = frame.sub_blocks[id % GHOSTS_PER_PACKET + 1];
        let model = &mut self.models[id];

        match MetadataKind::for_tick(tick) {
            MetadataKind::Appearance => {
                if model.update(block) {
                    let appearance = Appearance::unpack(&block);
                    let body_parts = self.kits.unpack(appearance.body_parts, appearance.is_female);
                    provider.apply(id, &appearance, body_parts, model.cape_id);
                }
            }
            MetadataKind::Identity => {
                let identity = Identity::unpack(&block);
                model.cape_id = identity.cape_id;
                let ghost = &mut self.ghosts[id];
                ghost.set_world(identity.world);
                ghost.set_name(&identity.name);
            }
        }
    }

    fn despawn_ghost(&mut self, id: usize) {
        self.ghosts[id].despawn();
        self.models[id].reset();
    }

    fn ingest_chat(&mut self, slot: &TickSlot, local: &LocalPlayer) {
        for frame in slot.chat_frames().iter().filter(|frame| !frame.is_empty()) {
            let core = CoreState::unpack(&frame.core);

            if core.commands.contains(CommandFlags::MOVEMENT_UPDATE) && core.world == local.world {
                if let Some(line) = ChatLine::unpack(frame) {
                    self.route_chat(line);
                }
            }

            if core.commands.contains(CommandFlags::LIVE_HISCORES) {
                let page = HiscoresPage::unpack(frame);
                self.award_cape(&page, local);
                self.hiscores.push(page);
            }
        }
    }

    fn route_chat(&mut self, line: ChatLine) {
        let sender = line.sender.as_string();
        let ghost = self.ghosts.iter_mut().find(|ghost| {
            u32::from(ghost.world()) == line.world && !ghost.name().is_empty() && ghost.name() == sender
        });

        match ghost {
            Some(ghost) => ghost.set_chat(&line.message),
            None => log::debug!("Chat from {sender} on world {} has no ghost", line.world),
        }

        self.events.push(SyncEvent::Chat {
            world: line.world,
            sender,
            message: line.message,
        });
    }

    fn award_cape(&mut self, page: &HiscoresPage, local: &LocalPlayer) {
        if page.start_rank != 1 || page.entries[0].name.as_string() != local.name.as_string() {
            return;
        }

        let cape_id = if page.skill_id == OVERALL_SKILL && local.is_female {
            FEMALE_MAX_CAPE
        } else {
            page.skill_id
        };

        if cape_id != self.cape_id {
            log::info!("Rank 1 in skill {}, wearing cape {cape_id}", page.skill_id);
            self.cape_id = cape_id;
            self.events.push(SyncEvent::CapeEarned { cape_id });
        }
    }

    fn refresh_self_ghost<P>(&mut self, local: &LocalPlayer, provider: &mut P)
    where
        P: AppearanceProvider + ?Sized,
    {
        if !self.show_self_ghost {
            self.self_ghost.despawn();
            self.self_model.dirty = true;
            return;
        }

        if MetadataKind::for_tick(self.last_self_tick.unwrap_or(0)) != MetadataKind::Appearance {
            return;
        }

        let appearance = Appearance {
            equipment: local.equipment,
            body_parts: self.kits.pack(&local.body_parts, local.is_female),
            is_female: local.is_female,
        };
        self.self_model.cape_id = self.cape_id;
        if self.self_model.update(appearance.pack()) {
            let body_parts = self.kits.unpack(appearance.body_parts, appearance.is_female);
            provider.apply(SELF_GHOST_SLOT, &appearance, body_parts, self.cape_id);
        }
    }

    /// Core words and trailing bytes of the local player's update for `tick`.
    pub fn build_outgoing(
        &mut self,
        local: &LocalPlayer,
        tick: u8,
        guest: bool,
    ) -> ([u32; CORE_WORDS], [u8; EXTRA_DATA_LEN]) {
        let (commands, extra) = self.outgoing.take_payload(local, guest);

        let (animation_id, is_pose_animation) = match local.animation_id {
            Some(id) => (id, false),
            None => (local.pose_animations.for_tick(tick), true),
        };

        let core = CoreState {
            commands: CommandFlags::MOVEMENT_UPDATE | commands,
            world_flags: local.world_flags,
            world: local.world,
            plane: local.plane,
            x: local.tile.x as u16,
            y: local.tile.y as u16,
            cape_id: self.cape_id,
            packed_orientation: (local.orientation / JAU_PACKING_RATIO) as u8,
            animation_id,
            is_interacting: local.is_interacting,
            is_pose_animation,
        };

        (core.pack(), extra)
    }

    /// One render step for every ghost. Ghosts that drop out are rebuilt
    /// from scratch when they return.
    pub fn advance<S: Scene + ?Sized>(&mut self, scene: &S) {
        for (ghost, model) in self.ghosts.iter_mut().zip(self.models.iter_mut()) {
            if !ghost.advance(scene) {
                model.dirty = true;
            }
        }

        if self.show_self_ghost && !self.self_ghost.advance(scene) {
            self.self_model.dirty = true;
        }
    }

    /// Forgets everything received and everything still to send. Used after
    /// logout.
    pub fn clear(&mut self) {
        for id in 0..MAX_GHOSTS {
            self.despawn_ghost(id);
            self.models[id].dirty = true;
        }
        self.self_ghost.despawn();
        self.self_model = ModelState::default();
        self.last_self_tick = None;
        self.hiscores.clear();
        self.outgoing.reset();
        self.cape_id = NO_CAPE;
    }
}
