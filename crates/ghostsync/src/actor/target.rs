use glam::IVec2;

use super::orientation::JAU_FULL_ROTATION;

pub const TARGET_QUEUE_CAPACITY: usize = 10;

/// Queue length at which pending targets are dropped and the actor jumps
/// straight to the newest one.
pub const HARD_CATCH_UP_LEN: usize = TARGET_QUEUE_CAPACITY - 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MovementSpeed {
    /// Idle, or an instant jump for moves longer than two tiles.
    #[default]
    Stationary,
    Walk,
    Run,
}

impl MovementSpeed {
    pub fn from_distance(distance: i32) -> Self {
        match distance {
            1 => Self::Walk,
            2 => Self::Run,
            _ => Self::Stationary,
        }
    }

    pub fn tiles_per_tick(&self) -> i32 {
        match self {
            Self::Stationary => 0,
            Self::Walk => 1,
            Self::Run => 2,
        }
    }

    pub fn pose_slot(&self) -> usize {
        self.tiles_per_tick() as usize
    }
}

/// A destination as received from the wire, before routing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveRequest {
    pub tile: IVec2,
    pub plane: u8,
    pub orientation: u16,
    pub animation_id: u16,
    pub is_interacting: bool,
    pub is_pose_animation: bool,
    pub is_instanced: bool,
    pub tick: u8,
}

impl MoveRequest {
    /// Sent orientation reduced to a single turn.
    pub fn facing(&self) -> u16 {
        (self.orientation as i32).rem_euclid(JAU_FULL_ROTATION) as u16
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MovementTarget {
    pub tile: IVec2,
    pub plane: u8,
    pub local: IVec2,
    pub orientation: u16,
    pub speed: MovementSpeed,
    pub animation_id: u16,
    pub is_interacting: bool,
    pub is_pose_animation: bool,
    pub is_midpoint: bool,
    pub is_instanced: bool,
    pub tick: u8,
}

impl MovementTarget {
    pub fn from_request(request: &MoveRequest, local: IVec2, speed: MovementSpeed) -> Self {
        Self {
            tile: request.tile,
            plane: request.plane,
            local,
            orientation: request.facing(),
            speed,
            animation_id: request.animation_id,
            is_interacting: request.is_interacting,
            is_pose_animation: request.is_pose_animation,
            is_midpoint: false,
            is_instanced: request.is_instanced,
            tick: request.tick,
        }
    }
}

/// Fixed-capacity FIFO of movement targets.
#[derive(Debug, Clone, Default)]
pub struct TargetQueue {
    targets: [MovementTarget; TARGET_QUEUE_CAPACITY],
    head: usize,
    len: usize,
}

impl TargetQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    /// Returns false without queueing when full.
    pub fn push(&mut self, target: MovementTarget) -> bool {
        if self.len == TARGET_QUEUE_CAPACITY {
            return false;
        }
        let index = (self.head + self.len) % TARGET_QUEUE_CAPACITY;
        self.targets[index] = target;
        self.len += 1;
        true
    }

    pub fn front(&self) -> Option<&MovementTarget> {
        (self.len > 0).then(|| &self.targets[self.head])
    }

    pub fn back(&self) -> Option<&MovementTarget> {
        (self.len > 0).then(|| &self.targets[(self.head + self.len - 1) % TARGET_QUEUE_CAPACITY])
    }

    pub fn pop_front(&mut self) -> Option<MovementTarget> {
        if self.len == 0 {
            return None;
        }
        let target = self.targets[self.head];
        self.head = (self.head + 1) % TARGET_QUEUE_CAPACITY;
        self.len -= 1;
        Some(target)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MovementTarget> {
        (0..self.len).map(move |offset| &self.targets[(self.head + offset) % TARGET_QUEUE_CAPACITY])
    }
}
