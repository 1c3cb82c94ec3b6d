use bitflags::bitflags;
use glam::IVec2;

use crate::net::{Appearance, PlayerName, WorldFlags};

pub const SCENE_SIZE: i32 = 104;
pub const LOCAL_TILE_SIZE: i32 = 128;
pub const LOCAL_HALF_TILE: i32 = LOCAL_TILE_SIZE / 2;

bitflags! {
    /// Movement blocking flags of one scene tile.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CollisionFlags: u32 {
        const NORTH_WEST = 0x1;
        const NORTH = 0x2;
        const NORTH_EAST = 0x4;
        const EAST = 0x8;
        const SOUTH_EAST = 0x10;
        const SOUTH = 0x20;
        const SOUTH_WEST = 0x40;
        const WEST = 0x80;
        const OBJECT = 0x100;
        const FLOOR_DECORATION = 0x40000;
        const FLOOR = 0x200000;
        const FULL = Self::OBJECT.bits() | Self::FLOOR_DECORATION.bits() | Self::FLOOR.bits();
    }
}

/// The loaded region around the local player, as seen by the host.
///
/// Scene tiles run from `(0, 0)` to `(scene_size - 1, scene_size - 1)`; world
/// tile `base() + t` is scene tile `t`.
pub trait Scene {
    fn plane(&self) -> u8;

    fn base(&self) -> IVec2;

    fn collision_flags(&self, plane: u8, scene_tile: IVec2) -> CollisionFlags;

    fn scene_size(&self) -> i32 {
        SCENE_SIZE
    }

    fn contains(&self, scene_tile: IVec2) -> bool {
        let size = self.scene_size();
        scene_tile.x >= 0 && scene_tile.y >= 0 && scene_tile.x < size && scene_tile.y < size
    }

    fn to_scene(&self, world_tile: IVec2) -> IVec2 {
        world_tile - self.base()
    }

    fn to_world(&self, scene_tile: IVec2) -> IVec2 {
        scene_tile + self.base()
    }

    /// Centre of a scene tile in local units.
    fn to_local(&self, scene_tile: IVec2) -> IVec2 {
        scene_tile * LOCAL_TILE_SIZE + IVec2::splat(LOCAL_HALF_TILE)
    }

    fn local_to_scene(&self, local: IVec2) -> IVec2 {
        IVec2::new(local.x >> 7, local.y >> 7)
    }

    /// Flags for a tile, with anything outside the scene fully blocked.
    fn flags_at(&self, plane: u8, scene_tile: IVec2) -> CollisionFlags {
        if self.contains(scene_tile) {
            self.collision_flags(plane, scene_tile)
        } else {
            CollisionFlags::FULL
        }
    }
}

/// Builds renderable models for ghosts. Slot `MAX_GHOSTS` is the self ghost.
///
/// `body_parts` is `appearance.body_parts` resolved against the kit table.
pub trait AppearanceProvider {
    fn apply(&mut self, slot: usize, appearance: &Appearance, body_parts: BodyParts, cape_id: u8);
}

/// Body part kit selections: hair, jaw, arms.
pub type BodyParts = [u16; 3];

/// What the host knows about the local player this tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalPlayer {
    pub name: PlayerName,
    pub world: u16,
    pub world_flags: WorldFlags,
    pub plane: u8,
    pub tile: IVec2,
    pub orientation: u16,
    /// Explicit animation, or `None` while the player is in a movement pose.
    pub animation_id: Option<u16>,
    pub is_interacting: bool,
    pub pose_animations: PoseAnimations,
    pub equipment: [u16; 7],
    pub body_parts: BodyParts,
    pub is_female: bool,
    pub skill_xp: [u32; SKILL_COUNT],
}

pub const SKILL_COUNT: usize = 24;

impl Default for LocalPlayer {
    fn default() -> Self {
        Self {
            name: PlayerName::default(),
            world: 0,
            world_flags: WorldFlags::empty(),
            plane: 0,
            tile: IVec2::ZERO,
            orientation: 0,
            animation_id: None,
            is_interacting: false,
            pose_animations: PoseAnimations::default(),
            equipment: [0; 7],
            body_parts: [0; 3],
            is_female: false,
            skill_xp: [0; SKILL_COUNT],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoseAnimations {
    pub idle: u16,
    pub walk: u16,
    pub run: u16,
}

impl Default for PoseAnimations {
    fn default() -> Self {
        Self {
            idle: 808,
            walk: 819,
            run: 824,
        }
    }
}

impl PoseAnimations {
    pub fn as_slots(&self) -> [u16; 3] {
        [self.idle, self.walk, self.run]
    }

    /// Pose a sender advertises on a given tick: 0 and 8 idle, odd ticks walk,
    /// the remaining even ticks run.
    pub fn for_tick(&self, tick: u8) -> u16 {
        self.as_slots()[pose_slot_for_tick(tick)]
    }
}

pub fn pose_slot_for_tick(tick: u8) -> usize {
    match tick {
        0 | 8 => 0,
        t if t & 1 == 1 => 1,
        _ => 2,
    }
}
